use thiserror::Error;

/// Errors that can occur while driving a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// The replay byte stream is exhausted.
    ///
    /// This is a benign termination signal, not a bug: it propagates out of
    /// task code and the dispatch loop via `?` and is caught once, at the
    /// driver boundary.
    #[error("replay input exhausted")]
    EndOfInput,
    /// A producer handle was dropped without resolving its deferred value.
    ///
    /// Raised when the simulator is torn down while tasks are still
    /// suspended; lets those tasks unwind cleanly.
    #[error("task cancelled: promise dropped without a value")]
    TaskCancelled,
    /// A supposedly impossible state was reached.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, SimulationError>`.
pub type SimulationResult<T> = Result<T, SimulationError>;
