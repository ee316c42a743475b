//! Virtual clock and deterministic task dispatch.
//!
//! [`Simulator`] owns all mutable scheduling state behind a cloneable handle
//! and advances a virtual clock as it resumes suspended tasks. Time moves
//! only here: the host executor interleaves ready continuations but never
//! drives the clock itself.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::Rc;

use tracing::instrument;

use crate::deferred::{self, Deferred, Promise};
use crate::error::SimulationResult;
use crate::random::RandomSource;

/// How the dispatch loop picks the next pending task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingStrategy {
    /// Earliest `(deadline, sequence)` first. Equal-deadline tasks resume in
    /// the order they were scheduled.
    InOrder,
    /// Uniformly random choice among all pending tasks, ignoring deadlines.
    /// Deliberately exposes interleavings an ordered schedule would mask.
    RandomOrder,
}

/// A suspended task waiting for its deadline.
#[derive(Debug)]
struct ScheduledTask {
    deadline: f64,
    /// Unique per simulator; breaks deadline ties so equal-deadline tasks
    /// resume in enqueue order.
    sequence: u64,
    waker: Promise<()>,
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max heap, but dispatch wants the earliest task
        // first, so both comparisons are reversed.
        match other.deadline.total_cmp(&self.deadline) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ordering => ordering,
        }
    }
}

/// Pending tasks, shaped by the strategy: a priority heap when dispatch is
/// ordered, a plain bag when dispatch picks uniformly at random.
#[derive(Debug)]
enum PendingTasks {
    Ordered(BinaryHeap<ScheduledTask>),
    Scrambled(Vec<ScheduledTask>),
}

impl PendingTasks {
    fn insert(&mut self, task: ScheduledTask) {
        match self {
            PendingTasks::Ordered(heap) => heap.push(task),
            PendingTasks::Scrambled(bag) => bag.push(task),
        }
    }

    fn len(&self) -> usize {
        match self {
            PendingTasks::Ordered(heap) => heap.len(),
            PendingTasks::Scrambled(bag) => bag.len(),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct SimState {
    now: f64,
    pending: PendingTasks,
    next_sequence: u64,
    running: bool,
    max_buggified_delay: f64,
    dispatches: u64,
}

/// The central simulation coordinator.
///
/// Cloning yields another handle to the same simulator, so tasks can carry
/// one around and call [`Simulator::delay`] from wherever they run. All
/// access is serialised by the cooperative single-threaded model; there are
/// no locks.
///
/// Dropping the last handle (together with the tasks holding clones) drops
/// any pending wakers, which cancels the tasks still suspended on them.
#[derive(Clone)]
pub struct Simulator {
    state: Rc<RefCell<SimState>>,
    oracle: Rc<RefCell<dyn RandomSource>>,
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Simulator")
            .field("now", &state.now)
            .field("pending", &state.pending.len())
            .field("running", &state.running)
            .finish()
    }
}

impl Simulator {
    /// Creates a simulator over `oracle` with fault injection armed.
    ///
    /// Under [`SchedulingStrategy::InOrder`] this draws the run's
    /// `max_buggified_delay` from `[0, 0.2)`. Under
    /// [`SchedulingStrategy::RandomOrder`] the schedule is already
    /// scrambled, so the bound is pinned to zero and no draw is made.
    pub fn new(
        oracle: Rc<RefCell<dyn RandomSource>>,
        strategy: SchedulingStrategy,
    ) -> SimulationResult<Self> {
        let max_buggified_delay = match strategy {
            SchedulingStrategy::InOrder => 0.2 * oracle.borrow_mut().random01()?,
            SchedulingStrategy::RandomOrder => 0.0,
        };
        Ok(Self::with_max_buggified_delay(
            oracle,
            strategy,
            max_buggified_delay,
        ))
    }

    /// Creates a simulator that never inflates delays.
    ///
    /// Used where exact virtual timings matter, e.g. to confirm that a
    /// schedule found under random order is innocuous when replayed in
    /// order.
    pub fn new_without_buggification(
        oracle: Rc<RefCell<dyn RandomSource>>,
        strategy: SchedulingStrategy,
    ) -> Self {
        Self::with_max_buggified_delay(oracle, strategy, 0.0)
    }

    fn with_max_buggified_delay(
        oracle: Rc<RefCell<dyn RandomSource>>,
        strategy: SchedulingStrategy,
        max_buggified_delay: f64,
    ) -> Self {
        let pending = match strategy {
            SchedulingStrategy::InOrder => PendingTasks::Ordered(BinaryHeap::new()),
            SchedulingStrategy::RandomOrder => PendingTasks::Scrambled(Vec::new()),
        };
        Self {
            state: Rc::new(RefCell::new(SimState {
                now: 0.0,
                pending,
                next_sequence: 0,
                running: true,
                max_buggified_delay,
                dispatches: 0,
            })),
            oracle,
        }
    }

    /// Suspends the calling task for `seconds` of virtual time.
    ///
    /// With probability 0.25 the delay is inflated by
    /// `max_buggified_delay * j^1000` for a fresh draw `j`; the heavy tail
    /// keeps most perturbations near zero while occasionally reordering
    /// whole stretches of the schedule.
    ///
    /// Returns the consumer side of the scheduled entry; awaiting it
    /// resumes once the dispatch loop reaches the entry.
    #[instrument(skip(self))]
    pub fn delay(&self, seconds: f64) -> SimulationResult<Deferred<()>> {
        debug_assert!(seconds >= 0.0, "delay must be non-negative: {seconds}");
        let mut seconds = seconds;
        if self.random01()? < 0.25 {
            let jitter = self.random01()?;
            seconds += self.max_buggified_delay() * jitter.powf(1000.0);
        }

        let (waker, resumed) = deferred::pair();
        let mut state = self.state.borrow_mut();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let deadline = state.now + seconds;
        tracing::trace!(deadline, sequence, "scheduling task");
        state.pending.insert(ScheduledTask {
            deadline,
            sequence,
            waker,
        });
        Ok(resumed)
    }

    /// Current virtual time in seconds. Starts at zero, never decreases.
    pub fn now(&self) -> f64 {
        self.state.borrow().now
    }

    /// Uniform draw from `[0, 1)`, delegated to the oracle.
    pub fn random01(&self) -> SimulationResult<f64> {
        self.oracle.borrow_mut().random01()
    }

    /// Uniform draw from `lo..hi`, delegated to the oracle.
    pub fn random_int(&self, lo: i32, hi: i32) -> SimulationResult<i32> {
        self.oracle.borrow_mut().random_int(lo, hi)
    }

    /// Permanently stops the dispatch loop; it exits on its next iteration.
    pub fn stop(&self) {
        self.state.borrow_mut().running = false;
    }

    /// Number of tasks waiting to be dispatched.
    pub fn pending_task_count(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// This run's upper bound on injected delay jitter, in `[0, 0.2)`.
    pub fn max_buggified_delay(&self) -> f64 {
        self.state.borrow().max_buggified_delay
    }

    /// Number of tasks resumed so far.
    pub fn dispatch_count(&self) -> u64 {
        self.state.borrow().dispatches
    }

    /// The dispatch loop: resumes pending tasks until [`Simulator::stop`]
    /// is called or the simulation quiesces.
    ///
    /// Each iteration selects a task per the strategy, winds the clock
    /// forward to its deadline (never backwards; a random-order pick may
    /// already lie in the past), resumes it, and yields so the awakened
    /// continuation runs up to its next suspension before the next
    /// dispatch.
    ///
    /// The loop itself never fails; an [`crate::SimulationError::EndOfInput`]
    /// from a random-order selection draw propagates to the caller.
    #[instrument(skip(self))]
    pub async fn run(&self) -> SimulationResult<()> {
        // Freshly spawned root tasks have not been polled yet; give them
        // one pass to reach their first suspension and register entries.
        tokio::task::yield_now().await;

        loop {
            let Some(task) = self.select_next()? else {
                break;
            };
            {
                let mut state = self.state.borrow_mut();
                state.now = state.now.max(task.deadline);
                state.dispatches += 1;
                tracing::trace!(
                    now = state.now,
                    sequence = task.sequence,
                    remaining = state.pending.len(),
                    "dispatching task"
                );
            }
            task.waker.send(());
            tokio::task::yield_now().await;
        }
        Ok(())
    }

    fn select_next(&self) -> SimulationResult<Option<ScheduledTask>> {
        let mut state = self.state.borrow_mut();
        if !state.running || state.pending.is_empty() {
            return Ok(None);
        }
        let task = match &mut state.pending {
            PendingTasks::Ordered(heap) => heap.pop(),
            PendingTasks::Scrambled(bag) => {
                let index = self.oracle.borrow_mut().random_int(0, bag.len() as i32)?;
                Some(bag.swap_remove(index as usize))
            }
        };
        Ok(task)
    }
}
