//! The finished graph.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Index;
use std::sync::OnceLock;

use super::edges::EdgeStore;
use super::node::{Node, NodeId};
use super::traversal;
use crate::error::Result;

/// Immutable result of a graph build.
///
/// Holds every discovered node (with the key it was discovered under), the
/// entry-point and root nodes, and the edge payloads. The topological order
/// is computed on first access and cached; concurrent first accesses
/// compute it once. The key index behind [`find`](Self::find) is built the
/// same way.
#[derive(Debug)]
pub struct DependencyGraph<K, T, E> {
    keys: Vec<K>,
    nodes: Vec<Node<T>>,
    entry_points: Vec<NodeId>,
    roots: Vec<NodeId>,
    edges: EdgeStore<E>,
    sorted: OnceLock<Vec<NodeId>>,
    index: OnceLock<HashMap<K, NodeId>>,
}

impl<K, T, E> DependencyGraph<K, T, E> {
    pub(crate) fn new(
        keys: Vec<K>,
        nodes: Vec<Node<T>>,
        entry_points: Vec<NodeId>,
        roots: Vec<NodeId>,
        edges: EdgeStore<E>,
    ) -> Self {
        debug_assert_eq!(keys.len(), nodes.len());
        Self {
            keys,
            nodes,
            entry_points,
            roots,
            edges,
            sorted: OnceLock::new(),
            index: OnceLock::new(),
        }
    }

    /// A graph with no nodes.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), Vec::new(), EdgeStore::new())
    }

    /// Nodes for the entry keys, in entry order, without duplicates.
    pub fn entry_points(&self) -> &[NodeId] {
        &self.entry_points
    }

    /// Entry points that nothing references.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// All nodes, in discovery order. A node's [`NodeId`] is its index here.
    pub fn nodes(&self) -> &[Node<T>] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(id.index())
    }

    /// The key a node was discovered under.
    pub fn key(&self, id: NodeId) -> Option<&K> {
        self.keys.get(id.index())
    }

    /// Look a node up by the exact key it was discovered under.
    pub fn find(&self, key: &K) -> Option<NodeId>
    where
        K: Eq + Hash + Clone,
    {
        self.index
            .get_or_init(|| {
                let mut index = HashMap::with_capacity(self.keys.len());
                for (position, key) in self.keys.iter().enumerate() {
                    index.entry(key.clone()).or_insert(NodeId::from(position));
                }
                index
            })
            .get(key)
            .copied()
    }

    /// Every node id with its node.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node<T>)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId::from(index), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edges(&self) -> &EdgeStore<E> {
        &self.edges
    }

    /// Payload of the edge `from -> to`.
    pub fn edge(&self, from: NodeId, to: NodeId) -> Result<E>
    where
        E: Clone,
    {
        self.edges.get(from, to)
    }

    /// Nodes ordered so that each node comes after every node it references.
    ///
    /// Computed from the roots on first call and cached. Nodes that are not
    /// reachable from a root are not included.
    pub fn topologically_sorted(&self) -> &[NodeId] {
        self.sorted
            .get_or_init(|| traversal::topological_sort(&self.nodes, &self.roots))
    }

    /// Whether [`topologically_sorted`](Self::topologically_sorted) has
    /// already been computed.
    pub fn is_sorted(&self) -> bool {
        self.sorted.get().is_some()
    }
}

impl<K, T, E> Index<NodeId> for DependencyGraph<K, T, E> {
    type Output = Node<T>;

    fn index(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::add_reference;

    fn chain() -> DependencyGraph<&'static str, &'static str, u32> {
        // a -> b -> c
        let mut nodes = vec![Node::new("a"), Node::new("b"), Node::new("c")];
        let edges = EdgeStore::new();
        add_reference(&mut nodes, NodeId::from(0), NodeId::from(1), 1, &edges);
        add_reference(&mut nodes, NodeId::from(1), NodeId::from(2), 2, &edges);

        let entry_points = vec![NodeId::from(0)];
        let roots = traversal::graph_roots(&nodes, &entry_points);
        DependencyGraph::new(vec!["a", "b", "c"], nodes, entry_points, roots, edges)
    }

    #[test]
    fn empty_graph() {
        let graph: DependencyGraph<u8, u8, u8> = DependencyGraph::empty();
        assert!(graph.is_empty());
        assert!(graph.roots().is_empty());
        assert!(graph.topologically_sorted().is_empty());
    }

    #[test]
    fn lookups() {
        let graph = chain();
        let b = graph.find(&"b").unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(*graph[b].item(), "b");
        assert_eq!(graph.key(b), Some(&"b"));
        assert_eq!(graph.edge(NodeId::from(0), b).unwrap(), 1);
        assert!(graph.find(&"z").is_none());
        assert!(graph.node(NodeId::from(9)).is_none());
    }

    #[test]
    fn find_indexes_every_key() {
        let graph = chain();
        for (position, key) in ["a", "b", "c"].iter().enumerate() {
            assert_eq!(graph.find(key), Some(NodeId::from(position)));
        }
        assert!(graph.index.get().is_some());
    }

    #[test]
    fn sort_is_lazy_and_cached() {
        let graph = chain();
        assert!(!graph.is_sorted());

        let first = graph.topologically_sorted().as_ptr();
        assert!(graph.is_sorted());
        assert_eq!(graph.topologically_sorted().as_ptr(), first);

        let order: Vec<_> = graph
            .topologically_sorted()
            .iter()
            .map(|id| *graph[*id].item())
            .collect();
        assert_eq!(order, vec!["c", "b", "a"]);
    }
}
