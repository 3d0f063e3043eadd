//! Concurrent Work
//!
//! This module implements the bounded worker pool that drives node
//! discovery.
//!
//! # Overview
//!
//! - [`WorkSet`] owns a fixed number of background threads and a map from
//!   key to memoized work. The map is the only serialization point between
//!   workers: the first registration of a key wins, so each key runs at most
//!   once even when several workers discover it at the same moment.
//! - Running work receives a [`WorkContext`] and may submit more work, which
//!   is how discovery fans out across the graph.
//! - [`WorkSet::complete`] is the barrier: it returns only when nothing is
//!   queued or running.

mod memo;
mod semaphore;
mod work_set;

pub use memo::MemoState;
pub use work_set::{CompletedWork, WorkContext, WorkSet, DEFAULT_WORKER_NAME};
