//! Quiescence tracking for graceful close.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Count of in-flight log operations plus a way to wait for it to drain.
///
/// Producers take an [`OpPermit`] before touching the shared gate; the count
/// only drops when the permit is released. Close waits, with a deadline,
/// for the count to reach zero.
#[derive(Debug, Default)]
pub struct Quiescence {
    active: AtomicUsize,
    lock: Mutex<()>,
    idle: Condvar,
}

impl Quiescence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one in-flight operation.
    pub fn acquire(self: &Arc<Self>) -> OpPermit {
        self.active.fetch_add(1, Ordering::AcqRel);
        OpPermit {
            tracker: self.clone(),
        }
    }

    /// Operations registered and not yet released.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Block until no operation is in flight or `timeout` elapses.
    ///
    /// Returns `true` if quiescence was reached.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (_guard, _) = self
            .idle
            .wait_timeout_while(guard, timeout, |_| self.active() > 0)
            .unwrap_or_else(PoisonError::into_inner);
        self.active() == 0
    }

    fn release(&self) {
        if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Taking the lock orders this notify after a waiter's check.
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.idle.notify_all();
        }
    }
}

/// A RAII guard for one in-flight operation.
#[derive(Debug)]
pub struct OpPermit {
    tracker: Arc<Quiescence>,
}

impl Drop for OpPermit {
    fn drop(&mut self) {
        self.tracker.release();
    }
}
