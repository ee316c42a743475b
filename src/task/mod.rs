//! Task composition utilities built on the deferred-value primitive.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use crate::deferred::{self, Deferred, Promise};
use crate::error::{SimulationError, SimulationResult};
use crate::sim::Simulator;

/// Suspends until the next arrival of a Poisson process with rate
/// `1 / mean_interval`.
///
/// `last` is the caller-owned arrival clock: each call advances it by an
/// exponentially distributed increment and waits until virtual time catches
/// up. Keeping the clock outside the call lets slow consumers observe
/// bursts instead of silently stretching the process.
pub async fn poisson(sim: &Simulator, last: &mut f64, mean_interval: f64) -> SimulationResult<()> {
    *last += mean_interval * -sim.random01()?.ln();
    let remaining = (*last - sim.now()).max(0.0);
    sim.delay(remaining)?.await?;
    Ok(())
}

struct CollectionState {
    active: usize,
    return_when_emptied: bool,
    /// Taken on first resolution; later completions are no-ops.
    outcome: Option<Promise<SimulationResult<()>>>,
}

/// A dynamic set of running tasks with an aggregate completion signal.
///
/// Tasks may be added at any time. The aggregate resolves with the first
/// member error; with `return_when_emptied`, it also resolves with `Ok(())`
/// the first time the set drains after at least one insertion. Built
/// without `return_when_emptied` it never resolves on emptiness, which is
/// what a supervisor that must outlive its children wants.
pub struct TaskCollection {
    state: Rc<RefCell<CollectionState>>,
    result: RefCell<Option<Deferred<SimulationResult<()>>>>,
}

impl TaskCollection {
    /// Creates an empty collection.
    pub fn new(return_when_emptied: bool) -> Self {
        let (outcome, result) = deferred::pair();
        Self {
            state: Rc::new(RefCell::new(CollectionState {
                active: 0,
                return_when_emptied,
                outcome: Some(outcome),
            })),
            result: RefCell::new(Some(result)),
        }
    }

    /// Spawns `future` as a member task.
    pub fn add<F>(&self, future: F)
    where
        F: Future<Output = SimulationResult<()>> + 'static,
    {
        self.state.borrow_mut().active += 1;
        let state = Rc::clone(&self.state);
        // Detached on purpose: completion is reported through the shared
        // state, not the join handle.
        let _ = tokio::task::spawn_local(async move {
            let result = future.await;
            let resolution = {
                let mut state = state.borrow_mut();
                state.active -= 1;
                match result {
                    Err(error) => state.outcome.take().map(|p| (p, Err(error))),
                    Ok(()) if state.active == 0 && state.return_when_emptied => {
                        state.outcome.take().map(|p| (p, Ok(())))
                    }
                    Ok(()) => None,
                }
            };
            if let Some((promise, value)) = resolution {
                promise.send(value);
            }
        });
    }

    /// Number of member tasks still running.
    pub fn active_count(&self) -> usize {
        self.state.borrow().active
    }

    /// Waits for the aggregate signal. Single consumer; a second call is an
    /// internal error.
    pub async fn result(&self) -> SimulationResult<()> {
        let Some(aggregate) = self.result.borrow_mut().take() else {
            return Err(SimulationError::Internal(
                "task collection result consumed twice".to_string(),
            ));
        };
        aggregate.await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{RandomSource, SeededRandom};
    use crate::sim::SchedulingStrategy;

    fn run_local<F: Future>(future: F) -> F::Output {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let local = tokio::task::LocalSet::new();
        local.block_on(&rt, future)
    }

    fn sim(seed: u64) -> Simulator {
        let oracle: Rc<RefCell<dyn RandomSource>> = Rc::new(RefCell::new(SeededRandom::new(seed)));
        Simulator::new_without_buggification(oracle, SchedulingStrategy::InOrder)
    }

    #[test]
    fn collection_resolves_on_drain_when_configured() {
        run_local(async {
            let sim = sim(0);
            let actors = TaskCollection::new(true);
            for i in 0..3u32 {
                let sim = sim.clone();
                actors.add(async move {
                    sim.delay(f64::from(i))?.await?;
                    Ok(())
                });
            }
            let sim_clone = sim.clone();
            let driver = tokio::task::spawn_local(async move { sim_clone.run().await });
            actors.result().await.expect("collection should drain");
            assert_eq!(actors.active_count(), 0);
            driver.await.expect("join").expect("run");
        });
    }

    #[test]
    fn collection_propagates_first_member_error() {
        run_local(async {
            let actors = TaskCollection::new(false);
            actors.add(async { Err(SimulationError::EndOfInput) });
            assert_eq!(actors.result().await, Err(SimulationError::EndOfInput));
        });
    }

    #[test]
    fn supervisor_collection_stays_open_after_drain() {
        use std::task::{Context, Poll, Waker};

        run_local(async {
            let actors = TaskCollection::new(false);
            actors.add(async { Ok(()) });
            tokio::task::yield_now().await;
            assert_eq!(actors.active_count(), 0);

            let mut aggregate = Box::pin(actors.result());
            let mut cx = Context::from_waker(Waker::noop());
            assert_eq!(aggregate.as_mut().poll(&mut cx), Poll::Pending);
        });
    }

    #[test]
    fn poisson_advances_the_arrival_clock() {
        run_local(async {
            let sim = sim(7);
            let sim_clone = sim.clone();
            let worker = tokio::task::spawn_local(async move {
                let mut last = 0.0;
                for _ in 0..5 {
                    poisson(&sim_clone, &mut last, 1.0).await?;
                }
                Ok::<f64, SimulationError>(last)
            });
            sim.run().await.expect("run");
            let arrived = worker.await.expect("join").expect("poisson");
            assert!(arrived > 0.0);
            assert!((sim.now() - arrived).abs() < 1e-9);
        });
    }
}
