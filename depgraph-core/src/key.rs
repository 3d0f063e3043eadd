//! Key equality policies.
//!
//! The builder never hashes keys directly. It maps each key to a canonical
//! form through a [`KeyComparer`], and two keys with the same canonical form
//! are the same node.

use std::fmt::Debug;
use std::hash::Hash;

/// Maps keys to the canonical form used for deduplication.
pub trait KeyComparer<K>: Send + Sync + 'static {
    type Canonical: Eq + Hash + Clone + Debug + Send + Sync + 'static;

    fn canonicalize(&self, key: &K) -> Self::Canonical;
}

/// Keys are compared with their own `Eq` and `Hash`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComparer;

impl<K> KeyComparer<K> for DefaultComparer
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    type Canonical = K;

    fn canonicalize(&self, key: &K) -> K {
        key.clone()
    }
}

/// String keys compared without regard to case.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitive;

impl<K> KeyComparer<K> for CaseInsensitive
where
    K: AsRef<str>,
{
    type Canonical = String;

    fn canonicalize(&self, key: &K) -> String {
        key.as_ref().to_lowercase()
    }
}
