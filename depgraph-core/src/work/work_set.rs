//! Parallel Work Set
//!
//! A [`WorkSet`] runs keyed work items on a fixed pool of background
//! threads. Each key runs at most once; work functions may submit more work
//! while they run, so the set grows while it drains.
//!
//! # Termination
//!
//! An empty queue does not mean the work is done: a running item may be
//! about to submit more. Completion is tracked with a pending counter that
//! is incremented before an item is queued and decremented after it has
//! run. Because an item's children are counted before the item itself is
//! decremented, the counter only reaches zero once nothing is queued or
//! running anywhere.
//!
//! # The Calling Thread
//!
//! [`WorkSet::complete`] does not just wait: the caller runs queued items
//! alongside the workers, and only parks while the queue is momentarily
//! empty and other threads are still running items. With zero workers the
//! caller runs everything.
//!
//! # Shutdown
//!
//! Workers block on a counting semaphore holding one permit per queued item.
//! Once completion has been requested and the pending counter is zero, the
//! work set releases one permit per worker; every worker that wakes up and
//! finds nothing left to do releases another round before exiting, so no
//! worker stays parked.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::{Condvar, Mutex};

use super::memo::{Memo, MemoState};
use super::semaphore::Semaphore;
use crate::cancel::{CancellationToken, Registration};
use crate::error::{BoxError, GraphError, Result, TaskFailure};

/// Default prefix for worker thread names.
pub const DEFAULT_WORKER_NAME: &str = "depgraph-worker";

/// Results of a completed work set, in the order their keys were first
/// registered.
pub type CompletedWork<K, R> = IndexMap<K, R>;

type WorkFn<K, R> =
    Box<dyn FnOnce(&WorkContext<'_, K, R>) -> std::result::Result<R, BoxError> + Send>;

struct WorkItem<K, R> {
    /// Registration order, used to order the completed results.
    seq: usize,
    key: K,
    memo: Memo<WorkFn<K, R>, R>,
}

struct Shared<K, R> {
    work: DashMap<K, Arc<WorkItem<K, R>>>,
    queue: Mutex<VecDeque<Arc<WorkItem<K, R>>>>,
    semaphore: Semaphore,
    pending: AtomicUsize,
    next_seq: AtomicUsize,
    completed: AtomicBool,
    shutdown: AtomicBool,
    failures: Mutex<Vec<TaskFailure>>,
    barrier: Mutex<()>,
    progress: Condvar,
    cancellation: CancellationToken,
    max_degree_of_parallelism: usize,
}

/// Handle passed to running work functions for submitting more work.
pub struct WorkContext<'a, K, R> {
    shared: &'a Shared<K, R>,
}

impl<K, R> WorkContext<'_, K, R>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    /// Submit work for `key`. Same semantics as [`WorkSet::add_work`].
    pub fn add_work<F>(&self, key: K, work: F) -> Result<()>
    where
        F: FnOnce(&WorkContext<'_, K, R>) -> std::result::Result<R, BoxError> + Send + 'static,
    {
        self.shared.add_work(key, Box::new(work))
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancellation.is_cancelled()
    }
}

/// Bounded-concurrency executor for a growing set of keyed work items.
///
/// # Example
///
/// ```rust
/// use depgraph_core::{CancellationToken, WorkSet};
///
/// let work: WorkSet<u32, u32> = WorkSet::new(2, CancellationToken::none()).unwrap();
/// work.add_work(1, |ctx| {
///     ctx.add_work(2, |_| Ok(20))?;
///     Ok(10)
/// })
/// .unwrap();
///
/// let results = work.complete().unwrap();
/// assert_eq!(results[&1], 10);
/// assert_eq!(results[&2], 20);
/// ```
pub struct WorkSet<K, R> {
    shared: Arc<Shared<K, R>>,
    workers: Vec<JoinHandle<()>>,
    _registration: Registration,
}

impl<K, R> WorkSet<K, R>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    /// Create a work set with `max_degree_of_parallelism` background workers.
    ///
    /// The thread that calls [`complete`](Self::complete) runs items too,
    /// so `n` workers give `n + 1` threads of execution.
    pub fn new(max_degree_of_parallelism: usize, cancellation: CancellationToken) -> Result<Self> {
        Self::named(DEFAULT_WORKER_NAME, max_degree_of_parallelism, cancellation)
    }

    /// Like [`new`](Self::new), naming worker threads `{prefix}-{index}`.
    pub fn named(
        prefix: &str,
        max_degree_of_parallelism: usize,
        cancellation: CancellationToken,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            work: DashMap::new(),
            queue: Mutex::new(VecDeque::new()),
            semaphore: Semaphore::new(),
            pending: AtomicUsize::new(0),
            next_seq: AtomicUsize::new(0),
            completed: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            failures: Mutex::new(Vec::new()),
            barrier: Mutex::new(()),
            progress: Condvar::new(),
            cancellation: cancellation.clone(),
            max_degree_of_parallelism,
        });

        let registration = {
            let weak = Arc::downgrade(&shared);
            cancellation.register(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.semaphore.wake_all();
                    shared.notify_progress();
                }
            })
        };

        let mut work_set = Self {
            shared,
            workers: Vec::with_capacity(max_degree_of_parallelism),
            _registration: registration,
        };

        for index in 0..max_degree_of_parallelism {
            let shared = Arc::clone(&work_set.shared);
            let handle = thread::Builder::new()
                .name(format!("{prefix}-{index}"))
                .spawn(move || shared.run_worker(index))
                .map_err(GraphError::SpawnWorker)?;
            work_set.workers.push(handle);
        }

        tracing::debug!(workers = max_degree_of_parallelism, "work set started");

        Ok(work_set)
    }

    /// Register `work` under `key` unless the key is already registered.
    ///
    /// A duplicate key is not an error; the first registration wins and
    /// later ones are dropped. Submitting after cancellation is a silent
    /// no-op. Submitting after [`complete`](Self::complete) was requested
    /// fails with [`GraphError::InvalidState`].
    pub fn add_work<F>(&self, key: K, work: F) -> Result<()>
    where
        F: FnOnce(&WorkContext<'_, K, R>) -> std::result::Result<R, BoxError> + Send + 'static,
    {
        self.shared.add_work(key, Box::new(work))
    }

    /// Whether completion has been requested.
    pub fn is_completed(&self) -> bool {
        self.shared.is_completed()
    }

    /// Number of distinct keys registered so far.
    pub fn len(&self) -> usize {
        self.shared.work.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.work.is_empty()
    }

    /// Lifecycle state of the work registered under `key`.
    pub fn state_of(&self, key: &K) -> Option<MemoState> {
        self.shared.work.get(key).map(|item| item.memo.state())
    }

    /// Stop accepting external work, drain everything outstanding, and
    /// return every result.
    ///
    /// Failed items do not stop the others; once all work has run, every
    /// failure is returned together as [`GraphError::Discovery`]. If the
    /// cancellation token fired, pending work is abandoned and
    /// [`GraphError::Cancelled`] is returned.
    pub fn complete(mut self) -> Result<CompletedWork<K, R>> {
        let shared = Arc::clone(&self.shared);

        if !shared.is_completed() {
            shared.drain_on_caller();
        }

        shared.completed.store(true, Ordering::SeqCst);
        shared.semaphore.release(shared.max_degree_of_parallelism);

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("worker thread panicked during shutdown");
            }
        }

        shared.take_results()
    }

    /// Async form of [`complete`](Self::complete); the blocking drain runs
    /// on tokio's blocking pool.
    pub async fn complete_async(self) -> Result<CompletedWork<K, R>> {
        tokio::task::spawn_blocking(move || self.complete())
            .await
            .map_err(|err| GraphError::invalid_state(format!("completion task failed: {err}")))?
    }
}

impl<K, R> Drop for WorkSet<K, R> {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }

        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.semaphore.release(self.workers.len());

        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl<K, R> Shared<K, R>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    fn add_work(&self, key: K, work: WorkFn<K, R>) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Ok(());
        }

        if self.is_completed() {
            return Err(GraphError::invalid_state(
                "cannot add new work after the work set is marked as completed",
            ));
        }

        let item = match self.work.entry(key) {
            Entry::Occupied(_) => return Ok(()),
            Entry::Vacant(vacant) => {
                let item = Arc::new(WorkItem {
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                    key: vacant.key().clone(),
                    memo: Memo::new(work),
                });
                vacant.insert(Arc::clone(&item));
                item
            }
        };

        tracing::trace!(key = ?item.key, "work queued");

        self.pending.fetch_add(1, Ordering::SeqCst);
        self.queue.lock().push_back(item);
        self.semaphore.release(1);
        self.notify_progress();

        Ok(())
    }

    /// Pop and run one queued item. Returns `false` if nothing was run.
    fn execute_next(&self) -> bool {
        if self.cancellation.is_cancelled() {
            return false;
        }

        let Some(item) = self.queue.lock().pop_front() else {
            return false;
        };

        let context = WorkContext { shared: self };
        if let Err(error) = item.memo.force(|work| work(&context)) {
            tracing::warn!(key = ?item.key, %error, "work item failed");
            self.failures.lock().push(TaskFailure {
                key: format!("{:?}", item.key),
                error,
            });
        }

        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify_progress();
        }

        true
    }

    fn run_worker(&self, index: usize) {
        tracing::debug!(worker = index, "worker started");

        loop {
            let mut stop = !self.semaphore.acquire(&self.cancellation)
                || self.shutdown.load(Ordering::SeqCst);

            if !stop {
                self.execute_next();
                stop = self.pending.load(Ordering::SeqCst) == 0 && self.is_completed();
            }

            if stop {
                self.semaphore.release(self.max_degree_of_parallelism);
                break;
            }
        }

        tracing::debug!(worker = index, "worker stopped");
    }

    /// Run queued items on the calling thread until nothing is pending.
    ///
    /// When the queue is empty but items are still running on workers, park
    /// until one of them queues more work or the last one finishes.
    fn drain_on_caller(&self) {
        while self.has_pending() {
            if self.execute_next() {
                continue;
            }

            let mut guard = self.barrier.lock();
            while self.has_pending() && self.queue.lock().is_empty() {
                self.progress.wait(&mut guard);
            }
        }
    }

    fn has_pending(&self) -> bool {
        !self.cancellation.is_cancelled() && self.pending.load(Ordering::SeqCst) > 0
    }

    /// Wake the caller parked in `drain_on_caller`. Taken under the barrier
    /// lock so a wake-up between its check and its wait is not lost.
    fn notify_progress(&self) {
        let _guard = self.barrier.lock();
        self.progress.notify_all();
    }

    fn take_results(&self) -> Result<CompletedWork<K, R>> {
        self.queue.lock().clear();

        let mut items: Vec<Arc<WorkItem<K, R>>> = self
            .work
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.work.clear();

        let failures = std::mem::take(&mut *self.failures.lock());
        if !failures.is_empty() {
            return Err(GraphError::Discovery { failures });
        }

        if self.cancellation.is_cancelled() {
            return Err(GraphError::Cancelled);
        }

        items.sort_by_key(|item| item.seq);

        let mut completed = IndexMap::with_capacity(items.len());
        for item in items {
            match Arc::try_unwrap(item) {
                Ok(WorkItem { key, memo, .. }) => {
                    if let Some(value) = memo.into_value() {
                        completed.insert(key, value);
                    }
                }
                Err(item) => {
                    tracing::warn!(key = ?item.key, "work item still shared after completion");
                }
            }
        }

        tracing::debug!(results = completed.len(), "work set completed");

        Ok(completed)
    }
}
