//! Single-shot deferred values for suspending and resuming cooperative tasks.
//!
//! A [`Promise`] / [`Deferred`] pair is a one-shot rendezvous between a single
//! producer and a single consumer on the same thread. The scheduler hands the
//! consumer side to a task suspending on [`crate::Simulator::delay`] and keeps
//! the producer side in its pending queue; dispatching the entry sends the
//! unit value and wakes the task.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::{SimulationError, SimulationResult};

/// Shared state between the two halves of a pair.
#[derive(Debug)]
struct Shared<T> {
    value: Option<T>,
    producer_gone: bool,
    waker: Option<Waker>,
}

/// Creates a connected producer/consumer pair.
///
/// Sending before the consumer waits buffers the value; the next wait
/// resolves immediately. Dropping the producer without sending resolves the
/// consumer with [`SimulationError::TaskCancelled`].
pub fn pair<T>() -> (Promise<T>, Deferred<T>) {
    let shared = Rc::new(RefCell::new(Shared {
        value: None,
        producer_gone: false,
        waker: None,
    }));
    (
        Promise {
            shared: Rc::clone(&shared),
        },
        Deferred { shared },
    )
}

/// The producing half of a deferred-value pair.
///
/// Resolution happens at most once: [`Promise::send`] consumes the handle.
#[derive(Debug)]
pub struct Promise<T> {
    shared: Rc<RefCell<Shared<T>>>,
}

impl<T> Promise<T> {
    /// Resolves the pair with `value`, waking the consumer if it is waiting.
    pub fn send(self, value: T) {
        let waker = {
            let mut shared = self.shared.borrow_mut();
            shared.value = Some(value);
            shared.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        let waker = {
            let mut shared = self.shared.borrow_mut();
            shared.producer_gone = true;
            // A drop after send keeps the buffered value intact; only a
            // drop without send cancels the consumer.
            if shared.value.is_none() {
                shared.waker.take()
            } else {
                None
            }
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

/// The consuming half of a deferred-value pair.
///
/// Awaiting suspends the current task until the producer resolves the pair.
/// A resolved consumer can be awaited again and keeps returning the same
/// value.
#[derive(Debug)]
pub struct Deferred<T> {
    shared: Rc<RefCell<Shared<T>>>,
}

impl<T> Deferred<T> {
    /// Returns `true` once the producer has sent a value.
    pub fn is_resolved(&self) -> bool {
        self.shared.borrow().value.is_some()
    }
}

impl<T: Clone> Future for Deferred<T> {
    type Output = SimulationResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut shared = self.shared.borrow_mut();
        if let Some(value) = &shared.value {
            return Poll::Ready(Ok(value.clone()));
        }
        if shared.producer_gone {
            return Poll::Ready(Err(SimulationError::TaskCancelled));
        }
        shared.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

/// Future returned by [`wait_any`].
#[derive(Debug)]
pub struct WaitAny<T> {
    inputs: Vec<Deferred<T>>,
}

impl<T: Clone> Future for WaitAny<T> {
    type Output = (usize, SimulationResult<T>);

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        for (index, input) in self.inputs.iter_mut().enumerate() {
            if let Poll::Ready(result) = Pin::new(input).poll(cx) {
                return Poll::Ready((index, result));
            }
        }
        Poll::Pending
    }
}

/// Resolves with the index and outcome of the first input to resolve.
///
/// Inputs that resolve later are left untouched and can still be awaited.
pub fn wait_any<T: Clone>(inputs: Vec<Deferred<T>>) -> WaitAny<T> {
    WaitAny { inputs }
}
