//! Memoized Work
//!
//! A `Memo` wraps a computation that must run at most once. The first call
//! to [`Memo::force`] runs it and caches the value; later calls return the
//! cached value without re-executing.
//!
//! # Thread Safety
//!
//! The computation runs with the memo's lock held, so a second caller that
//! arrives while the first one is still computing blocks until the value is
//! published. Each work item is dequeued exactly once, so in practice the
//! lock is uncontended.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::error::{BoxError, PanicError};

/// Lifecycle of a memoized computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The computation has not run.
    Pending,

    /// The computation ran and produced a value.
    Completed,

    /// The computation ran and failed. Its error was handed to the first
    /// caller; there is no value.
    Faulted,
}

/// A computation of type `F` that yields an `R` at most once.
pub(crate) struct Memo<F, R> {
    compute: Mutex<Option<F>>,
    value: OnceLock<R>,
}

impl<F, R> Memo<F, R> {
    pub(crate) fn new(compute: F) -> Self {
        Self {
            compute: Mutex::new(Some(compute)),
            value: OnceLock::new(),
        }
    }

    /// Run the computation if it has not run yet.
    ///
    /// `run` receives the stored computation and invokes it. A panic inside
    /// `run` is captured and returned as a [`PanicError`].
    ///
    /// Returns the cached value, or `None` if the computation faulted on an
    /// earlier call.
    pub(crate) fn force<G>(&self, run: G) -> Result<Option<&R>, BoxError>
    where
        G: FnOnce(F) -> Result<R, BoxError>,
    {
        let mut slot = self.compute.lock();

        if let Some(compute) = slot.take() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(compute)))
                .unwrap_or_else(|payload| Err(Box::new(panic_error(payload.as_ref())) as BoxError));

            let value = outcome?;
            // Only the holder of the compute slot ever sets the value.
            let _ = self.value.set(value);
        }

        Ok(self.value.get())
    }

    pub(crate) fn state(&self) -> MemoState {
        if self.value.get().is_some() {
            MemoState::Completed
        } else if self.compute.lock().is_some() {
            MemoState::Pending
        } else {
            MemoState::Faulted
        }
    }

    pub(crate) fn into_value(self) -> Option<R> {
        self.value.into_inner()
    }
}

fn panic_error(payload: &(dyn Any + Send)) -> PanicError {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    };

    PanicError { message }
}
