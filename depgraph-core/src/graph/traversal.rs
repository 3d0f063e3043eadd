//! Graph Traversal
//!
//! Cycle detection, root computation and topological ordering over a linked
//! node list. All three run after discovery has finished, on one thread.
//!
//! # Roots
//!
//! Only entry points are eligible to be roots. A node discovered through a
//! reference always has a referencing node, so in an acyclic graph every
//! zero-indegree node is an entry point anyway.
//!
//! # Topological Order
//!
//! Kahn's algorithm seeded from the roots:
//!
//! 1. Start every node's counter at its number of referencing nodes
//! 2. Queue the roots
//! 3. Pop a node, append it, and decrement the counter of each node it
//!    references; queue any that reach zero
//! 4. Reverse the result
//!
//! After the reversal, leaves come first and roots last, so every node
//! appears after everything it references. Nodes not reachable from a root
//! are left out.

use std::collections::{HashMap, VecDeque};

use smallvec::SmallVec;

use super::node::{Node, NodeId};
use crate::error::{GraphError, Result};

/// Visitation state during cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    /// On the current depth-first path; its references are being explored.
    InProcess,

    /// All of its references have been explored.
    Processed,
}

/// Entry points with no incoming references, in entry order.
pub fn graph_roots<T>(nodes: &[Node<T>], entry_points: &[NodeId]) -> Vec<NodeId> {
    entry_points
        .iter()
        .copied()
        .filter(|id| nodes[id.index()].referencing_nodes().is_empty())
        .collect()
}

/// Depth-first search from every entry point, failing on the first
/// back-edge.
///
/// The reported path runs from the node the back-edge points at, along the
/// current search path, to the node that closed the cycle, and ends with the
/// first node again. A self reference reports `[X, X]`.
pub fn detect_cycles<T>(nodes: &[Node<T>], entry_points: &[NodeId]) -> Result<()> {
    let mut states: HashMap<NodeId, Visit> = HashMap::with_capacity(nodes.len());
    // (node, index of the next reference to explore)
    let mut stack: SmallVec<[(NodeId, usize); 16]> = SmallVec::new();

    for &entry in entry_points {
        if states.contains_key(&entry) {
            continue;
        }

        states.insert(entry, Visit::InProcess);
        stack.push((entry, 0));

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;

            match nodes[node.index()].references().get_index(next) {
                Some(&reference) => {
                    frame.1 += 1;

                    match states.get(&reference) {
                        Some(Visit::InProcess) => {
                            return Err(cycle_error(nodes, &stack, reference));
                        }
                        Some(Visit::Processed) => {}
                        None => {
                            states.insert(reference, Visit::InProcess);
                            stack.push((reference, 0));
                        }
                    }
                }
                None => {
                    states.insert(node, Visit::Processed);
                    stack.pop();
                }
            }
        }
    }

    Ok(())
}

fn cycle_error<T>(nodes: &[Node<T>], stack: &[(NodeId, usize)], revisited: NodeId) -> GraphError {
    let start = stack
        .iter()
        .position(|(id, _)| *id == revisited)
        .unwrap_or(0);

    let path: Vec<String> = stack[start..]
        .iter()
        .map(|(id, _)| *id)
        .chain(std::iter::once(revisited))
        .map(|id| label(nodes, id))
        .collect();

    tracing::debug!(?path, "cycle detected");

    GraphError::CycleDetected { path }
}

fn label<T>(nodes: &[Node<T>], id: NodeId) -> String {
    nodes[id.index()]
        .full_path()
        .map_or_else(|| id.to_string(), str::to_string)
}

/// Kahn's algorithm seeded from `roots`, reversed so that dependencies
/// precede their dependents.
pub fn topological_sort<T>(nodes: &[Node<T>], roots: &[NodeId]) -> Vec<NodeId> {
    let mut in_degree: Vec<usize> = nodes.iter().map(Node::indegree).collect();
    let mut queue: VecDeque<NodeId> = roots.iter().copied().collect();
    let mut result = Vec::with_capacity(nodes.len());

    while let Some(node_id) = queue.pop_front() {
        result.push(node_id);

        for &reference in nodes[node_id.index()].references() {
            let degree = &mut in_degree[reference.index()];
            *degree = degree.saturating_sub(1);
            if *degree == 0 {
                queue.push_back(reference);
            }
        }
    }

    if result.len() != nodes.len() {
        tracing::debug!(
            sorted = result.len(),
            total = nodes.len(),
            "some nodes are not reachable from a root"
        );
    }

    result.reverse();
    result
}
