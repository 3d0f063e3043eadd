//! Counting semaphore for the worker pool.

use parking_lot::{Condvar, Mutex};

use crate::cancel::CancellationToken;

/// Counting semaphore whose waits are interrupted by cancellation.
///
/// The work set releases one permit per enqueued item and a burst of
/// permits when shutting down.
#[derive(Default)]
pub(crate) struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Block until a permit is available.
    ///
    /// Returns `false` without taking a permit if `cancellation` is
    /// signalled first.
    pub(crate) fn acquire(&self, cancellation: &CancellationToken) -> bool {
        let mut permits = self.permits.lock();
        loop {
            if cancellation.is_cancelled() {
                return false;
            }
            if *permits > 0 {
                *permits -= 1;
                return true;
            }
            self.available.wait(&mut permits);
        }
    }

    pub(crate) fn release(&self, count: usize) {
        if count == 0 {
            return;
        }

        let mut permits = self.permits.lock();
        *permits += count;
        if count == 1 {
            self.available.notify_one();
        } else {
            self.available.notify_all();
        }
    }

    /// Wake every waiter so it can re-check cancellation.
    pub(crate) fn wake_all(&self) {
        let _permits = self.permits.lock();
        self.available.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn available_permits(&self) -> usize {
        *self.permits.lock()
    }
}
