//! # Tidepool
//!
//! A deterministic, single-threaded discrete-event simulator for fuzzing
//! cooperative-task code, inspired by FoundationDB's simulation testing
//! approach.
//!
//! ## Key Features
//!
//! - **Deterministic execution**: the whole run is a pure function of the
//!   randomness oracle, so a seed or a byte string pins every interleaving
//! - **Record/replay**: draws record to a byte string that replays the run
//!   bit-exactly, turning any byte-mutating fuzzer into a schedule explorer
//! - **Fault injection**: heavy-tailed delay jitter and random-order
//!   dispatch widen the set of schedules a run explores
//! - **Worked example**: an array service whose `swap` suspends between
//!   read and write, with the invariant checker that catches the race
//!
//! ## Getting Started
//!
//! ```no_run
//! // Hunt for a schedule that breaks the example workload.
//! let mut seed = 0;
//! loop {
//!     println!("Trying seed {seed}");
//!     tidepool::run_seeded(seed, false).expect("simulation error");
//!     seed += 1;
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Deferred values: one-shot promise/future pairs and `wait_any`.
pub mod deferred;

/// Error types for simulation operations.
pub mod error;

/// Randomness oracles: seeded, replay, and recording variants.
pub mod random;

/// The scheduler: virtual clock, pending tasks, dispatch loop.
pub mod sim;

/// Task composition: Poisson arrivals and task collections.
pub mod task;

/// The demonstration workload and its invariant checker.
pub mod workload;

/// Drivers: seeded exploration and byte-buffer replay.
pub mod runner;

pub use deferred::{Deferred, Promise, WaitAny, pair, wait_any};
pub use error::{SimulationError, SimulationResult};
pub use random::{RandomSource, RecordingRandom, ReplayRandom, SeededRandom};
pub use runner::{run_replay, run_seeded, run_simulation};
pub use sim::{SchedulingStrategy, Simulator};
pub use task::{TaskCollection, poisson};
pub use workload::{
    CLIENT_COUNT, ExampleService, SERVICE_SIZE, client, clients, sample_distinct_ordered_pair,
    stop_after,
};
