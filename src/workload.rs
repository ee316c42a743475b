//! The demonstration workload: an array service whose `swap` hides a race.
//!
//! `swap` reads both slots, suspends, then writes both back. Two swaps over
//! overlapping slots interleaved at that suspension lose an element, which
//! `check_invariant` later catches. Under an in-order schedule the window
//! never opens for the same seed; under random order it eventually does,
//! which is exactly what the simulator exists to show.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::SimulationResult;
use crate::sim::Simulator;
use crate::task::{TaskCollection, poisson};

/// Number of slots in the example service.
pub const SERVICE_SIZE: i32 = 1000;

/// Number of concurrent client generators.
pub const CLIENT_COUNT: usize = 5;

/// In-memory array service with a buggy `swap` operation.
pub struct ExampleService {
    sim: Simulator,
    elements: RefCell<Vec<i32>>,
    next_swap_id: Cell<u64>,
    trace: bool,
}

impl ExampleService {
    /// Creates the service with elements `0..SERVICE_SIZE`.
    pub fn new(sim: Simulator, trace: bool) -> Self {
        Self {
            sim,
            elements: RefCell::new((0..SERVICE_SIZE).collect()),
            next_swap_id: Cell::new(0),
            trace,
        }
    }

    /// Swaps the elements at `i` and `j`.
    pub async fn swap(&self, i: usize, j: usize) -> SimulationResult<()> {
        let swap_id = self.next_swap_id.get();
        self.next_swap_id.set(swap_id + 1);
        if self.trace {
            println!(
                "{:.6}\t{}\tBegin\tswap({}, {})",
                self.sim.now(),
                swap_id,
                i,
                j
            );
        }
        let (x, y) = {
            let elements = self.elements.borrow();
            (elements[i], elements[j])
        };
        // This suspension is the bug: another swap can read the same slots
        // before the writes below land.
        self.sim.delay(0.0)?.await?;
        {
            let mut elements = self.elements.borrow_mut();
            elements[i] = y;
            elements[j] = x;
        }
        if self.trace {
            println!(
                "{:.6}\t{}\tEnd\tswap({}, {})",
                self.sim.now(),
                swap_id,
                i,
                j
            );
        }
        Ok(())
    }

    /// Checks that the elements are still a permutation of `0..SERVICE_SIZE`.
    ///
    /// A violation aborts the process: fuzz harnesses key on the crash
    /// signature, and no caller is entitled to continue past corrupted
    /// state.
    pub fn check_invariant(&self) {
        if self.trace {
            println!("{:.6}\t\t\tcheck_invariant()", self.sim.now());
        }
        if !self.invariant_holds() {
            tracing::error!(
                now = self.sim.now(),
                "invariant violated: elements are no longer a permutation"
            );
            std::process::abort();
        }
    }

    /// Non-aborting probe of the same invariant, for tests.
    pub fn invariant_holds(&self) -> bool {
        let mut copy = self.elements.borrow().clone();
        copy.sort_unstable();
        copy.iter().enumerate().all(|(i, &value)| value == i as i32)
    }

    /// Copy of the current element array, for diagnostics and tests.
    pub fn snapshot(&self) -> Vec<i32> {
        self.elements.borrow().clone()
    }
}

/// Draws `i < j` uniformly over distinct ordered pairs in `0..size`.
pub fn sample_distinct_ordered_pair(
    sim: &Simulator,
    size: i32,
) -> SimulationResult<(usize, usize)> {
    let i = sim.random_int(0, size - 1)?;
    let j = sim.random_int(i + 1, size)?;
    Ok((i as usize, j as usize))
}

/// A client generator: Poisson arrivals of swaps with occasional checks.
pub async fn client(sim: Simulator, service: Rc<ExampleService>) -> SimulationResult<()> {
    let mut last_time = sim.now();
    loop {
        poisson(&sim, &mut last_time, 1.0).await?;
        if sim.random_int(0, 100)? == 0 {
            service.check_invariant();
        } else {
            let (i, j) = sample_distinct_ordered_pair(&sim, SERVICE_SIZE)?;
            service.swap(i, j).await?;
        }
    }
}

/// Supervisor keeping [`CLIENT_COUNT`] clients alive for the whole run.
///
/// The collection is configured to never resolve on emptiness, so the only
/// legitimate resolution is a member error, which propagates. Resolving
/// without one means the supervisor logic itself is broken.
pub async fn clients(sim: Simulator, service: Rc<ExampleService>) -> SimulationResult<()> {
    let actors = TaskCollection::new(false);
    for _ in 0..CLIENT_COUNT {
        actors.add(client(sim.clone(), Rc::clone(&service)));
    }
    actors.result().await?;
    panic!("client collection resolved while configured to stay open");
}

/// Stops the simulator once virtual time reaches `seconds`.
pub async fn stop_after(sim: Simulator, seconds: f64) -> SimulationResult<()> {
    sim.delay(seconds)?.await?;
    tracing::debug!(now = sim.now(), "stopping simulation");
    sim.stop();
    Ok(())
}
