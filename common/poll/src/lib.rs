// Licensed under the Apache-2.0 license

//! Bounded busy-polling.
//!
//! A condition is sampled back to back with no sleep between samples. What
//! bounds the loop is a [`Deadline`], which callers inject: a poll budget, a
//! monotonic clock, a cancellation token, or any pair of those.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError<E> {
    #[error("condition not met after {attempts} attempts")]
    TimedOut { attempts: u64 },
    #[error("poll condition failed: {0}")]
    Condition(E),
}

/// Decides when a polling loop has to give up.
pub trait Deadline {
    /// Called once after every unsuccessful sample.
    fn expired(&mut self) -> bool;
}

impl<D: Deadline + ?Sized> Deadline for &mut D {
    fn expired(&mut self) -> bool {
        (**self).expired()
    }
}

/// Expires when either deadline expires. Both are advanced on every call.
impl<A: Deadline, B: Deadline> Deadline for (A, B) {
    fn expired(&mut self) -> bool {
        let a = self.0.expired();
        let b = self.1.expired();
        a || b
    }
}

/// Allows a fixed number of samples.
#[derive(Clone, Debug)]
pub struct PollBudget {
    remaining: u64,
}

impl PollBudget {
    /// Allows `max(max_polls, 1)` samples. The condition is always sampled
    /// at least once, so a budget of 0 behaves like a budget of 1.
    pub fn new(max_polls: u64) -> Self {
        Self {
            remaining: max_polls,
        }
    }

    /// A budget that never runs out, i.e. an unbounded busy-wait.
    pub fn unbounded() -> Self {
        Self::new(u64::MAX)
    }
}

impl Deadline for PollBudget {
    fn expired(&mut self) -> bool {
        if self.remaining == 0 {
            return true;
        }
        self.remaining -= 1;
        self.remaining == 0
    }
}

/// Source of monotonic time for [`WallClock`].
pub trait MonotonicClock {
    fn elapsed(&self) -> Duration;
}

/// The host's monotonic clock, measured from construction.
#[derive(Clone, Debug)]
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for StdClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Expires once `timeout` has passed on the given clock.
pub struct WallClock<C: MonotonicClock = StdClock> {
    clock: C,
    deadline: Duration,
}

impl WallClock<StdClock> {
    pub fn from_now(timeout: Duration) -> Self {
        Self::new(StdClock::new(), timeout)
    }
}

impl<C: MonotonicClock> WallClock<C> {
    pub fn new(clock: C, timeout: Duration) -> Self {
        let deadline = clock.elapsed() + timeout;
        Self { clock, deadline }
    }
}

impl<C: MonotonicClock> Deadline for WallClock<C> {
    fn expired(&mut self) -> bool {
        self.clock.elapsed() >= self.deadline
    }
}

/// Expires once [`CancellationToken::cancel`] has been called on any clone.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Deadline for CancellationToken {
    fn expired(&mut self) -> bool {
        self.is_cancelled()
    }
}

/// Samples `condition` until it returns `Ok(true)`, it fails, or `deadline`
/// expires. Returns the number of samples taken.
pub fn poll_until<D, E, F>(deadline: &mut D, mut condition: F) -> Result<u64, PollError<E>>
where
    D: Deadline + ?Sized,
    F: FnMut() -> Result<bool, E>,
{
    let mut attempts = 0u64;
    loop {
        attempts += 1;
        if condition().map_err(PollError::Condition)? {
            return Ok(attempts);
        }
        if deadline.expired() {
            return Err(PollError::TimedOut { attempts });
        }
        std::hint::spin_loop();
    }
}
