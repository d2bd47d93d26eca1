//! Cancellation and deadline propagation.
//!
//! A `Context` is shared by a command's phases and by every per-cluster task.
//! Deriving a timeout returns a `TimeoutScope` guard; dropping the guard
//! cancels the derived context, so the phase releases it on every exit path.

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{CancelReason, Error};

#[derive(Debug)]
struct Scope {
    canceled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    fn err(&self, now: Instant) -> Option<CancelReason> {
        if self.canceled.load(Ordering::Acquire) {
            return Some(CancelReason::Canceled);
        }
        if self.deadline.is_some_and(|deadline| now >= deadline) {
            return Some(CancelReason::DeadlineExceeded);
        }
        self.parent.as_ref().and_then(|parent| parent.err(now))
    }
}

#[derive(Debug, Clone)]
pub struct Context {
    scope: Arc<Scope>,
}

impl Context {
    pub fn background() -> Self {
        Self {
            scope: Arc::new(Scope {
                canceled: AtomicBool::new(false),
                deadline: None,
                parent: None,
            }),
        }
    }

    pub fn cancel(&self) {
        self.scope.canceled.store(true, Ordering::Release);
    }

    /// Derives a child context that expires after `timeout`, or at the
    /// parent's deadline if that comes first.
    pub fn with_timeout(&self, timeout: Duration) -> TimeoutScope {
        let requested = Instant::now() + timeout;
        let deadline = match self.scope.deadline {
            Some(parent) if parent < requested => parent,
            _ => requested,
        };
        TimeoutScope {
            context: Self {
                scope: Arc::new(Scope {
                    canceled: AtomicBool::new(false),
                    deadline: Some(deadline),
                    parent: Some(Arc::clone(&self.scope)),
                }),
            },
        }
    }

    pub fn err(&self) -> Option<CancelReason> {
        self.scope.err(Instant::now())
    }

    pub fn check(&self) -> Result<(), Error> {
        match self.err() {
            Some(reason) => Err(Error::Canceled(reason)),
            None => Ok(()),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.scope.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Sleeps up to `duration`, waking early when the context is done.
    pub fn sleep(&self, duration: Duration) -> Result<(), Error> {
        let step = Duration::from_millis(100);
        let until = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= until {
                return Ok(());
            }
            std::thread::sleep(step.min(until - now));
        }
    }
}

/// Phase-scoped child context, canceled when dropped.
#[derive(Debug)]
pub struct TimeoutScope {
    context: Context,
}

impl Deref for TimeoutScope {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.context
    }
}

impl Drop for TimeoutScope {
    fn drop(&mut self) {
        self.context.cancel();
    }
}
