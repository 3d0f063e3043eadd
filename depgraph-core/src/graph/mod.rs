//! Dependency Graph
//!
//! This module implements the graph model produced by a build: nodes, edge
//! payloads, and the algorithms that run over them once discovery is done.
//!
//! # Overview
//!
//! The dependency graph is a directed graph where:
//!
//! - Nodes wrap a caller-defined payload
//! - Edges point from a node to each node it references, and carry a
//!   caller-defined payload of their own
//!
//! # Design Decisions
//!
//! 1. Nodes live in a single vector and refer to each other by [`NodeId`]
//!    index rather than by pointer, so two nodes can reference each other
//!    without shared ownership.
//!
//! 2. Edge payloads live beside the nodes in an [`EdgeStore`] keyed by the
//!    `(source, target)` pair.
//!
//! 3. We maintain both outgoing (references) and incoming (referencing
//!    nodes) edges so that roots and in-degrees are cheap to read.

mod dependency_graph;
mod edges;
mod node;
pub mod traversal;

pub use dependency_graph::DependencyGraph;
pub use edges::EdgeStore;
pub use node::{Node, NodeId};

pub(crate) use node::add_reference;
