//! Edge payload storage.

use dashmap::DashMap;

use super::node::NodeId;
use crate::error::{GraphError, Result};

/// Thread-safe map from an ordered `(source, target)` pair to its edge
/// payload.
///
/// Holds at most one payload per pair; adding a pair again replaces the
/// payload.
#[derive(Debug)]
pub struct EdgeStore<E> {
    edges: DashMap<(NodeId, NodeId), E>,
}

impl<E> EdgeStore<E> {
    pub fn new() -> Self {
        Self {
            edges: DashMap::new(),
        }
    }

    /// Record `edge` for `from -> to`, returning the payload it replaced.
    pub fn add_or_update(&self, from: NodeId, to: NodeId, edge: E) -> Option<E> {
        self.edges.insert((from, to), edge)
    }

    /// Payload recorded for `from -> to`.
    pub fn get(&self, from: NodeId, to: NodeId) -> Result<E>
    where
        E: Clone,
    {
        self.edges
            .get(&(from, to))
            .map(|edge| edge.value().clone())
            .ok_or(GraphError::EdgeNotFound { from, to })
    }

    /// Remove and return the payload for `from -> to`.
    pub fn remove(&self, from: NodeId, to: NodeId) -> Result<E> {
        self.edges
            .remove(&(from, to))
            .map(|(_, edge)| edge)
            .ok_or(GraphError::EdgeNotFound { from, to })
    }

    pub fn contains(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.contains_key(&(from, to))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Snapshot of every recorded pair, in no particular order.
    pub fn pairs(&self) -> Vec<(NodeId, NodeId)> {
        self.edges.iter().map(|entry| *entry.key()).collect()
    }
}

impl<E> Default for EdgeStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_get_remove() {
        let edges = EdgeStore::new();
        let (a, b) = (NodeId::from(0), NodeId::from(1));

        assert!(edges.add_or_update(a, b, 7).is_none());
        assert!(edges.contains(a, b));
        assert!(!edges.contains(b, a));
        assert_eq!(edges.get(a, b).unwrap(), 7);

        assert_eq!(edges.add_or_update(a, b, 8), Some(7));
        assert_eq!(edges.len(), 1);

        assert_eq!(edges.remove(a, b).unwrap(), 8);
        assert!(edges.is_empty());
    }

    #[test]
    fn missing_pair_is_an_error() {
        let edges: EdgeStore<u8> = EdgeStore::new();
        let (a, b) = (NodeId::from(0), NodeId::from(1));

        assert!(matches!(
            edges.get(a, b),
            Err(GraphError::EdgeNotFound { from, to }) if from == a && to == b
        ));
        assert!(matches!(edges.remove(a, b), Err(GraphError::EdgeNotFound { .. })));
    }

    #[test]
    fn concurrent_writers() {
        let edges = std::sync::Arc::new(EdgeStore::new());

        let handles: Vec<_> = (0..4usize)
            .map(|t| {
                let edges = edges.clone();
                std::thread::spawn(move || {
                    for i in 0..100usize {
                        edges.add_or_update(NodeId::from(t), NodeId::from(i), t * i);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(edges.len(), 400);
        assert_eq!(edges.pairs().len(), 400);
    }
}
