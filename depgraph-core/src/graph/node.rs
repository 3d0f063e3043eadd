//! Graph Nodes
//!
//! This module defines the node type that lives in the dependency graph.

use std::fmt;

use indexmap::IndexSet;

use super::edges::EdgeStore;

/// Handle to a node in a [`DependencyGraph`](super::DependencyGraph).
///
/// Node identity is the handle, not the key the node was discovered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the graph's node list.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the dependency graph.
///
/// Wraps a caller-defined payload. The adjacency sets are filled in once,
/// by the linking pass that runs after discovery, and never change after
/// that.
#[derive(Debug, Clone)]
pub struct Node<T> {
    /// The caller's payload.
    item: T,

    /// Human-readable identity, used in cycle reports.
    full_path: Option<String>,

    /// Nodes this node references (outgoing edges).
    references: IndexSet<NodeId>,

    /// Nodes that reference this node (incoming edges).
    referencing_nodes: IndexSet<NodeId>,
}

impl<T> Node<T> {
    /// Create a node wrapping `item`, with no references.
    pub fn new(item: T) -> Self {
        Self {
            item,
            full_path: None,
            references: IndexSet::new(),
            referencing_nodes: IndexSet::new(),
        }
    }

    /// Set the path reported for this node in diagnostics.
    pub fn with_full_path(mut self, full_path: impl Into<String>) -> Self {
        self.full_path = Some(full_path.into());
        self
    }

    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn into_item(self) -> T {
        self.item
    }

    pub fn full_path(&self) -> Option<&str> {
        self.full_path.as_deref()
    }

    /// Nodes this node references, in the order the references were added.
    pub fn references(&self) -> &IndexSet<NodeId> {
        &self.references
    }

    /// Nodes that reference this node.
    pub fn referencing_nodes(&self) -> &IndexSet<NodeId> {
        &self.referencing_nodes
    }

    /// Number of incoming references.
    pub fn indegree(&self) -> usize {
        self.referencing_nodes.len()
    }

    /// Number of outgoing references.
    pub fn outdegree(&self) -> usize {
        self.references.len()
    }

    pub(crate) fn set_default_full_path(&mut self, full_path: impl FnOnce() -> String) {
        if self.full_path.is_none() {
            self.full_path = Some(full_path());
        }
    }
}

/// Link `source -> target` and record `edge` for the pair.
///
/// Keeps both directions in step: `target` joins `source`'s references and
/// `source` joins `target`'s referencing nodes. Re-linking the same pair
/// leaves the sets unchanged and replaces the edge payload.
pub(crate) fn add_reference<T, E>(
    nodes: &mut [Node<T>],
    source: NodeId,
    target: NodeId,
    edge: E,
    edges: &EdgeStore<E>,
) {
    nodes[source.index()].references.insert(target);
    nodes[target.index()].referencing_nodes.insert(source);
    edges.add_or_update(source, target, edge);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_nodes() -> Vec<Node<&'static str>> {
        vec![Node::new("a"), Node::new("b"), Node::new("c")]
    }

    #[test]
    fn new_node_has_no_adjacency() {
        let node = Node::new(5).with_full_path("/src/five");
        assert_eq!(*node.item(), 5);
        assert_eq!(node.full_path(), Some("/src/five"));
        assert_eq!(node.indegree(), 0);
        assert_eq!(node.outdegree(), 0);
    }

    #[test]
    fn add_reference_is_symmetric() {
        let mut nodes = three_nodes();
        let edges = EdgeStore::new();
        let (a, b, c) = (NodeId(0), NodeId(1), NodeId(2));

        add_reference(&mut nodes, a, b, "a->b", &edges);
        add_reference(&mut nodes, a, c, "a->c", &edges);
        add_reference(&mut nodes, b, c, "b->c", &edges);

        assert_eq!(nodes[0].references().iter().copied().collect::<Vec<_>>(), vec![b, c]);
        assert!(nodes[2].referencing_nodes().contains(&a));
        assert!(nodes[2].referencing_nodes().contains(&b));
        assert_eq!(nodes[1].indegree(), 1);
        assert_eq!(edges.len(), 3);
    }

    #[test]
    fn relinking_overwrites_edge() {
        let mut nodes = three_nodes();
        let edges = EdgeStore::new();
        let (a, b) = (NodeId(0), NodeId(1));

        add_reference(&mut nodes, a, b, "first", &edges);
        add_reference(&mut nodes, a, b, "second", &edges);

        assert_eq!(nodes[0].outdegree(), 1);
        assert_eq!(nodes[1].indegree(), 1);
        assert_eq!(edges.get(a, b).unwrap(), "second");
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn self_reference() {
        let mut nodes = three_nodes();
        let edges = EdgeStore::new();
        let a = NodeId(0);

        add_reference(&mut nodes, a, a, "loop", &edges);

        assert!(nodes[0].references().contains(&a));
        assert!(nodes[0].referencing_nodes().contains(&a));
    }

    #[test]
    fn default_full_path_does_not_override() {
        let mut named = Node::new(()).with_full_path("kept");
        named.set_default_full_path(|| "fallback".to_string());
        assert_eq!(named.full_path(), Some("kept"));

        let mut unnamed = Node::new(());
        unnamed.set_default_full_path(|| "fallback".to_string());
        assert_eq!(unnamed.full_path(), Some("fallback"));
    }
}
