//! Pending-work counter
//!
//! Counts directory jobs that have been created but whose own listing has
//! not finished yet. Its transition to zero is the only completion signal.
//!
//! Ordering rules the workers follow:
//! - `add` before a job becomes visible on the queue or a backlog
//! - `done` after the job's own listing, never after its children's
//!
//! With those rules the count cannot reach zero while any job is queued,
//! in flight or about to be spawned.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;
use tracing::error;

/// Outstanding directory jobs, with a blocking wait for zero
#[derive(Debug, Default)]
pub struct PendingWork {
    count: Mutex<u64>,
    drained: Condvar,
}

impl PendingWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for `n` new jobs
    pub fn add(&self, n: u64) {
        if n == 0 {
            return;
        }
        *self.count.lock() += n;
    }

    /// Mark one job's own listing as complete
    ///
    /// Wakes all waiters when the count reaches zero.
    pub fn done(&self) {
        let mut count = self.count.lock();
        if *count == 0 {
            error!("Pending-work counter decremented below zero");
            return;
        }
        *count -= 1;
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    /// Current number of outstanding jobs
    pub fn count(&self) -> u64 {
        *self.count.lock()
    }

    /// Block until the count reaches zero or the timeout elapses
    ///
    /// Returns true if the count reached zero.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut count = self.count.lock();
        if *count == 0 {
            return true;
        }
        let result = self.drained.wait_while_for(&mut count, |c| *c != 0, timeout);
        !result.timed_out() || *count == 0
    }
}
