//! Poll-until-done with cancellation and an optional deadline.
//!
//! The orchestrator never sleeps directly; it goes through a [`Clock`] so tests
//! can drive the loop without real time passing.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

/// Source of time for the polling loop.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Shared flag set once by a signal handler and read at every poll boundary.
#[derive(Debug, Default, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why [`wait_until`] stopped without a value.
#[derive(Debug, PartialEq, Eq)]
pub enum WaitError<E> {
    /// `poll` itself failed; the error is returned as-is.
    Poll(E),
    Cancelled,
    /// The deadline passed; carries how long we waited.
    TimedOut(Duration),
}

/// How often to poll and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            timeout: None,
        }
    }
}

/// Call `poll` until it yields `Some`, sleeping `policy.interval` in between.
///
/// `poll` runs first, before any cancellation or deadline check, so an
/// already-finished job is reported even when the token is set.  A `poll`
/// error ends the wait immediately.
pub fn wait_until<T, E, F>(
    clock: &dyn Clock,
    cancel: &CancelToken,
    policy: WaitPolicy,
    mut poll: F,
) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Result<Option<T>, E>,
{
    let started = clock.now();
    let deadline = policy.timeout.map(|t| started + t);

    loop {
        if let Some(value) = poll().map_err(WaitError::Poll)? {
            return Ok(value);
        }
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled);
        }
        if let Some(deadline) = deadline {
            let now = clock.now();
            if now >= deadline {
                return Err(WaitError::TimedOut(now - started));
            }
        }
        clock.sleep(policy.interval);
    }
}

// ─── Test clock ───────────────────────────────────────────────────────────────

#[cfg(test)]
pub mod testing {
    use std::cell::{Cell, RefCell};

    use super::*;

    /// A clock whose `sleep` advances time instantly and records each call.
    #[derive(Debug)]
    pub struct ManualClock {
        start: Instant,
        elapsed: Cell<Duration>,
        pub sleeps: RefCell<Vec<Duration>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                start: Instant::now(),
                elapsed: Cell::new(Duration::ZERO),
                sleeps: RefCell::new(Vec::new()),
            }
        }

        pub fn sleep_count(&self) -> usize {
            self.sleeps.borrow().len()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.start + self.elapsed.get()
        }

        fn sleep(&self, duration: Duration) {
            self.elapsed.set(self.elapsed.get() + duration);
            self.sleeps.borrow_mut().push(duration);
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
