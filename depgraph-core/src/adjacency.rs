//! Text adjacency lists.
//!
//! A small line-oriented format for describing graphs by hand, used by the
//! command-line harness, the tests and the benchmarks:
//!
//! ```text
//! # comments and blank lines are ignored
//! app  -> core; util
//! util -> core
//! core
//! ```
//!
//! Each line names a key and, after `->`, the keys it references separated
//! by `;`. Whitespace around tokens is trimmed and empty tokens are dropped.
//! A referenced key without a line of its own is a leaf.

use std::collections::HashMap;

use indexmap::IndexMap;
use thiserror::Error;

use crate::error::BoxError;
use crate::factory::{GraphFactory, Reference};
use crate::graph::Node;
use crate::key::KeyComparer;

const ARROW: &str = "->";
const SEPARATOR: char = ';';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdjacencyError {
    #[error("line {line}: missing key in {content:?}")]
    MalformedLine { line: usize, content: String },
}

/// Parsed adjacency list, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyList {
    entries: IndexMap<String, Vec<String>>,
}

impl AdjacencyList {
    /// Parse the text format. A key declared twice accumulates the
    /// references of both lines.
    pub fn parse(text: &str) -> Result<Self, AdjacencyError> {
        let mut entries: IndexMap<String, Vec<String>> = IndexMap::new();

        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, references) = match line.split_once(ARROW) {
                Some((key, references)) => (key.trim(), references),
                None => (line, ""),
            };

            if key.is_empty() {
                return Err(AdjacencyError::MalformedLine {
                    line: number + 1,
                    content: raw.to_string(),
                });
            }

            let targets = entries.entry(key.to_string()).or_default();
            targets.extend(
                references
                    .split(SEPARATOR)
                    .map(str::trim)
                    .filter(|token| !token.is_empty())
                    .map(str::to_string),
            );
        }

        Ok(Self { entries })
    }

    /// Declared keys, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// References declared for exactly `key`.
    pub fn references(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Node payload produced by [`AdjacencyFactory`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Vertex {
    /// The key as spelled on its declaring line, or as first referenced if
    /// it has none.
    pub name: String,
}

/// [`GraphFactory`] over an [`AdjacencyList`].
///
/// Keys are resolved through the comparer, so with
/// [`CaseInsensitive`](crate::CaseInsensitive) a reference to `CORE` finds
/// the line declaring `core`. Keys with no line become leaves. Each edge
/// carries the reference text as written.
pub struct AdjacencyFactory<C: KeyComparer<String>> {
    list: AdjacencyList,
    comparer: C,
    index: HashMap<C::Canonical, usize>,
}

impl<C: KeyComparer<String>> AdjacencyFactory<C> {
    pub fn new(list: AdjacencyList, comparer: C) -> Self {
        let mut index = HashMap::with_capacity(list.len());
        for (position, key) in list.entries.keys().enumerate() {
            index.entry(comparer.canonicalize(key)).or_insert(position);
        }
        Self {
            list,
            comparer,
            index,
        }
    }

    pub fn list(&self) -> &AdjacencyList {
        &self.list
    }

    fn lookup(&self, key: &String) -> Option<(&String, &Vec<String>)> {
        self.index
            .get(&self.comparer.canonicalize(key))
            .and_then(|position| self.list.entries.get_index(*position))
    }
}

impl<C: KeyComparer<String>> GraphFactory for AdjacencyFactory<C> {
    type Key = String;
    type Payload = Vertex;
    type Edge = String;

    fn create_node(&self, key: &String) -> Result<Node<Vertex>, BoxError> {
        let name = self.lookup(key).map_or(key, |(declared, _)| declared);
        Ok(Node::new(Vertex { name: name.clone() }).with_full_path(name.clone()))
    }

    fn get_references(
        &self,
        node: &Node<Vertex>,
    ) -> Result<Vec<Reference<String, String>>, BoxError> {
        let targets = self.lookup(&node.item().name).map(|(_, targets)| targets);
        Ok(targets
            .into_iter()
            .flatten()
            .map(|target| Reference::new(target.clone(), target.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{CaseInsensitive, DefaultComparer};

    #[test]
    fn parse_lines() {
        let list = AdjacencyList::parse(
            "# header\n\n  A -> B ; C ;;\nB->C\nC\nD ->\n",
        )
        .unwrap();

        assert_eq!(list.keys().collect::<Vec<_>>(), ["A", "B", "C", "D"]);
        assert_eq!(list.references("A").unwrap(), ["B", "C"]);
        assert_eq!(list.references("B").unwrap(), ["C"]);
        assert!(list.references("C").unwrap().is_empty());
        assert!(list.references("D").unwrap().is_empty());
        assert!(list.references("E").is_none());
    }

    #[test]
    fn repeated_keys_accumulate() {
        let list = AdjacencyList::parse("A -> B\nA -> C").unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.references("A").unwrap(), ["B", "C"]);
    }

    #[test]
    fn missing_key_is_malformed() {
        let err = AdjacencyList::parse("A -> B\n  -> C").unwrap_err();
        assert_eq!(
            err,
            AdjacencyError::MalformedLine {
                line: 2,
                content: "  -> C".to_string(),
            }
        );
    }

    #[test]
    fn factory_resolves_through_comparer() {
        let list = AdjacencyList::parse("App -> CORE\ncore").unwrap();
        let factory = AdjacencyFactory::new(list, CaseInsensitive);

        let node = factory.create_node(&"app".to_string()).unwrap();
        assert_eq!(node.item().name, "App");
        assert_eq!(node.full_path(), Some("App"));

        let references = factory.get_references(&node).unwrap();
        assert_eq!(references, [Reference::new("CORE".to_string(), "CORE".to_string())]);

        let core = factory.create_node(&references[0].key).unwrap();
        assert_eq!(core.item().name, "core");
    }

    #[test]
    fn undeclared_keys_are_leaves() {
        let list = AdjacencyList::parse("App -> CORE\ncore").unwrap();
        let factory = AdjacencyFactory::new(list, DefaultComparer);

        let node = factory.create_node(&"CORE".to_string()).unwrap();
        assert_eq!(node.item().name, "CORE");
        assert_eq!(node.full_path(), Some("CORE"));
        assert!(factory.get_references(&node).unwrap().is_empty());
    }
}
