//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is a shared flag plus a list of wake-up callbacks.
//! Code that blocks (the work set's semaphore and completion barrier)
//! registers a callback so that cancelling the token wakes it up instead of
//! leaving it parked forever.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Callback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, Callback)>>,
}

/// Shared cancellation signal.
///
/// Cloning a token yields a handle to the same signal.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Create a new, unsignalled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh token for callers that have no cancellation to offer.
    ///
    /// Same as [`new`](Self::new): the token only stays unsignalled as long
    /// as no clone of it is cancelled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Signal cancellation and run every registered callback.
    ///
    /// Cancelling twice is a no-op.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        // Run callbacks outside the lock; they may take locks of their own.
        let callbacks: Vec<Callback> = self
            .inner
            .callbacks
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        tracing::debug!(callbacks = callbacks.len(), "cancellation requested");

        for callback in callbacks {
            callback();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Run `callback` when the token is cancelled.
    ///
    /// If the token is already cancelled the callback runs immediately.
    /// Dropping the returned [`Registration`] removes the callback.
    pub fn register<F>(&self, callback: F) -> Registration
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: Callback = Arc::new(callback);

        self.inner
            .callbacks
            .lock()
            .push((id, Arc::clone(&callback)));

        if self.is_cancelled() {
            callback();
        }

        Registration {
            id,
            token: Arc::downgrade(&self.inner),
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Handle to a registered cancellation callback.
///
/// Dropping this handle unregisters the callback.
pub struct Registration {
    id: u64,
    token: Weak<Inner>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(inner) = self.token.upgrade() {
            inner.callbacks.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn cancel_runs_callbacks_once() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let _registration = token.register(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();

        assert!(token.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clones_share_the_signal() {
        let token = CancellationToken::new();
        let other = token.clone();

        other.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn none_is_an_ordinary_token() {
        let token = CancellationToken::none();
        assert!(!token.is_cancelled());

        token.clone().cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn dropped_registration_is_not_called() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let registration = token.register(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        drop(registration);

        token.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn register_after_cancel_runs_immediately() {
        let token = CancellationToken::new();
        token.cancel();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let _registration = token.register(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
