//! The seam between the engine and domain logic.
//!
//! A [`GraphFactory`] knows how to turn a key into a node and how to list a
//! node's references. The engine knows nothing else about the domain.

use std::fmt::Debug;

use crate::error::BoxError;
use crate::graph::Node;

/// A reference from one node to the node identified by `key`, carrying an
/// edge payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<K, E> {
    pub key: K,
    pub edge: E,
}

impl<K, E> Reference<K, E> {
    pub fn new(key: K, edge: E) -> Self {
        Self { key, edge }
    }
}

/// Creates nodes and enumerates their references.
///
/// Both methods are called from worker threads. `create_node` is called
/// exactly once per distinct key (as defined by the builder's
/// [`KeyComparer`](crate::KeyComparer)) and should not mutate state shared
/// with other keys. Any shared evaluation context belongs in the factory
/// value itself.
pub trait GraphFactory: Send + Sync + 'static {
    type Key: Clone + Debug + Send + Sync + 'static;
    type Payload: Send + Sync + 'static;
    type Edge: Send + Sync + 'static;

    /// Build the node for `key`.
    fn create_node(&self, key: &Self::Key) -> Result<Node<Self::Payload>, BoxError>;

    /// The outgoing references of `node`. May be empty.
    fn get_references(
        &self,
        node: &Node<Self::Payload>,
    ) -> Result<Vec<Reference<Self::Key, Self::Edge>>, BoxError>;
}
