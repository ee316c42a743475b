//! Drivers wiring an oracle, a simulator and the workload together.
//!
//! All entry points are synchronous: each owns a current-thread tokio
//! runtime and a `LocalSet`, the only executor shape under which the
//! dispatch loop's interleaving is deterministic.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{SimulationError, SimulationResult};
use crate::random::{RandomSource, ReplayRandom, SeededRandom};
use crate::sim::{SchedulingStrategy, Simulator};
use crate::workload::{ExampleService, clients, stop_after};

/// Virtual-time horizon of one simulation run, in seconds.
const STOP_AFTER_SECONDS: f64 = 100.0;

/// Builds and runs one full simulation over `oracle`.
///
/// Spawns the client supervisor and a stop task 100 virtual seconds out,
/// then drives the dispatch loop until it stops, quiesces, or the oracle
/// runs out of input. Exhaustion
/// ([`SimulationError::EndOfInput`]) is the expected end of a replayed run
/// and is absorbed here; an invariant violation never returns at all.
pub fn run_simulation(
    oracle: Rc<RefCell<dyn RandomSource>>,
    strategy: SchedulingStrategy,
    trace: bool,
) -> SimulationResult<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| SimulationError::Internal(format!("failed to build runtime: {e}")))?;
    let local = tokio::task::LocalSet::new();

    let outcome = local.block_on(&runtime, async move {
        if trace {
            println!("Time\t\tOpId\tPhase\tOp");
        }
        let sim = Simulator::new(oracle, strategy)?;
        let service = Rc::new(ExampleService::new(sim.clone(), trace));
        let _supervisor = tokio::task::spawn_local(clients(sim.clone(), Rc::clone(&service)));
        let _stopper = tokio::task::spawn_local(stop_after(sim.clone(), STOP_AFTER_SECONDS));
        sim.run().await?;
        tracing::debug!(
            now = sim.now(),
            dispatches = sim.dispatch_count(),
            "simulation finished"
        );
        Ok(())
    });

    match outcome {
        Err(SimulationError::EndOfInput) => Ok(()),
        other => other,
    }
}

/// Runs one simulation under a seeded oracle with random-order scheduling.
pub fn run_seeded(seed: u64, trace: bool) -> SimulationResult<()> {
    let oracle: Rc<RefCell<dyn RandomSource>> = Rc::new(RefCell::new(SeededRandom::new(seed)));
    run_simulation(oracle, SchedulingStrategy::RandomOrder, trace)
}

/// The fuzz-driver contract: one simulation replayed from an opaque buffer.
///
/// Identical input produces an identical execution. Returns `Ok(())` when
/// the buffer is exhausted; aborts the process if the workload invariant is
/// violated along the way.
pub fn run_replay(data: &[u8]) -> SimulationResult<()> {
    let oracle: Rc<RefCell<dyn RandomSource>> =
        Rc::new(RefCell::new(ReplayRandom::new(data.to_vec())));
    run_simulation(oracle, SchedulingStrategy::RandomOrder, false)
}
