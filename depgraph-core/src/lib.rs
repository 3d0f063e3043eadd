//! Depgraph Core
//!
//! This crate builds dependency graphs concurrently. Given a set of entry
//! keys and a [`GraphFactory`] that knows how to create a node for a key and
//! list its references, it discovers every reachable node in parallel,
//! links them, rejects cycles and hands back a [`DependencyGraph`] that can
//! be walked in dependency order.
//!
//! It implements:
//!
//! - A deduplicating parallel work set with cooperative cancellation
//! - An arena-backed graph with per-edge payloads
//! - Cycle detection and a lazily computed topological order
//!
//! # Architecture
//!
//! - `work`: the [`WorkSet`] that runs each distinct key exactly once
//! - `graph`: nodes, edge payloads, traversal algorithms
//! - `builder`: the two-phase [`GraphBuilder`] on top of both
//! - `adjacency`: a plain-text factory for tests and demos
//!
//! # Example
//!
//! ```rust
//! use depgraph_core::{
//!     AdjacencyFactory, AdjacencyList, CancellationToken, DefaultComparer, GraphBuilder,
//! };
//!
//! let list = AdjacencyList::parse("app -> core; util\nutil -> core\ncore").unwrap();
//! let factory = AdjacencyFactory::new(list, DefaultComparer);
//!
//! let entries = ["app".to_string()];
//! let graph = GraphBuilder::new(entries, DefaultComparer, factory, 4, CancellationToken::none())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(graph.len(), 3);
//! let first = graph.topologically_sorted()[0];
//! assert_eq!(graph[first].item().name, "core");
//! ```

pub mod adjacency;
pub mod builder;
pub mod cancel;
pub mod config;
pub mod error;
pub mod factory;
pub mod graph;
pub mod key;
pub mod work;

pub use adjacency::{AdjacencyError, AdjacencyFactory, AdjacencyList, Vertex};
pub use builder::{Graph, GraphBuilder};
pub use cancel::{CancellationToken, Registration};
pub use config::{BuildConfig, PARALLELISM_ENV};
pub use error::{BoxError, GraphError, PanicError, Result, TaskFailure};
pub use factory::{GraphFactory, Reference};
pub use graph::{DependencyGraph, EdgeStore, Node, NodeId};
pub use key::{CaseInsensitive, DefaultComparer, KeyComparer};
pub use work::{CompletedWork, MemoState, WorkContext, WorkSet};
