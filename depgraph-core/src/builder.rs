//! Graph Builder
//!
//! The builder turns entry keys into a [`DependencyGraph`] in two phases.
//!
//! # Phase 1: Discovery
//!
//! Each entry key is submitted to a [`WorkSet`]. A discovery task asks the
//! factory for the key's node and references, submits every referenced key
//! as a new task, and records the references for later. The work set runs
//! each distinct key once, so discovery stops when every reachable key has
//! been seen.
//!
//! # Phase 2: Linking
//!
//! With every node known, a single thread resolves each recorded reference
//! to its node and links the pair. Cycle detection and root computation run
//! next; the topological order is left for the graph to compute on demand.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexSet;
use tracing::instrument;

use crate::cancel::CancellationToken;
use crate::config::BuildConfig;
use crate::error::{BoxError, GraphError, Result};
use crate::factory::{GraphFactory, Reference};
use crate::graph::{add_reference, traversal, DependencyGraph, EdgeStore, Node, NodeId};
use crate::key::{DefaultComparer, KeyComparer};
use crate::work::{CompletedWork, WorkContext, WorkSet};

/// The graph type produced for factory `F`.
pub type Graph<F> = DependencyGraph<
    <F as GraphFactory>::Key,
    <F as GraphFactory>::Payload,
    <F as GraphFactory>::Edge,
>;

/// What one discovery task produces.
struct Discovered<F: GraphFactory> {
    key: F::Key,
    node: Node<F::Payload>,
    references: Vec<Reference<F::Key, F::Edge>>,
}

type DiscoveryContext<'a, F, C> =
    WorkContext<'a, <C as KeyComparer<<F as GraphFactory>::Key>>::Canonical, Discovered<F>>;

/// Builds a [`DependencyGraph`] from entry keys and a [`GraphFactory`].
///
/// # Example
///
/// ```rust
/// use depgraph_core::{
///     AdjacencyFactory, AdjacencyList, CancellationToken, CaseInsensitive, GraphBuilder,
/// };
///
/// let list = AdjacencyList::parse("A -> B;C\nB -> C\nC").unwrap();
/// let factory = AdjacencyFactory::new(list, CaseInsensitive);
///
/// let entries = ["A".to_string()];
/// let graph = GraphBuilder::new(entries, CaseInsensitive, factory, 4, CancellationToken::none())
///     .build()
///     .unwrap();
///
/// let order: Vec<_> = graph
///     .topologically_sorted()
///     .iter()
///     .map(|id| graph[*id].item().name.as_str())
///     .collect();
/// assert_eq!(order, ["C", "B", "A"]);
/// ```
pub struct GraphBuilder<F, C = DefaultComparer>
where
    F: GraphFactory,
    C: KeyComparer<F::Key>,
{
    entry_points: Vec<F::Key>,
    comparer: Arc<C>,
    factory: Arc<F>,
    config: BuildConfig,
    cancellation: CancellationToken,
}

impl<F, C> GraphBuilder<F, C>
where
    F: GraphFactory,
    C: KeyComparer<F::Key>,
{
    /// Create a builder.
    ///
    /// `degree_of_parallelism` counts the calling thread, so `n` starts
    /// `n - 1` background workers; `0` and `1` both run discovery entirely
    /// on the thread that calls [`build`](Self::build).
    pub fn new(
        entry_points: impl IntoIterator<Item = F::Key>,
        comparer: C,
        factory: F,
        degree_of_parallelism: usize,
        cancellation: CancellationToken,
    ) -> Self {
        let config = BuildConfig::default().with_degree_of_parallelism(degree_of_parallelism);
        Self::with_config(entry_points, comparer, factory, config, cancellation)
    }

    pub fn with_config(
        entry_points: impl IntoIterator<Item = F::Key>,
        comparer: C,
        factory: F,
        config: BuildConfig,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            entry_points: entry_points.into_iter().collect(),
            comparer: Arc::new(comparer),
            factory: Arc::new(factory),
            config,
            cancellation,
        }
    }

    /// Discover, link and validate the graph.
    ///
    /// Fails with [`GraphError::Discovery`] if any factory call failed,
    /// [`GraphError::CycleDetected`] if the graph has a cycle, and
    /// [`GraphError::Cancelled`] if the token fired. No partial graph is
    /// returned.
    #[instrument(name = "build_graph", skip(self), fields(entries = self.entry_points.len()))]
    pub fn build(self) -> Result<Graph<F>> {
        if self.entry_points.is_empty() {
            tracing::debug!("no entry points, returning an empty graph");
            return Ok(DependencyGraph::empty());
        }

        if self.cancellation.is_cancelled() {
            return Err(GraphError::Cancelled);
        }

        let work = WorkSet::named(
            &self.config.worker_name_prefix,
            self.config.background_workers(),
            self.cancellation.clone(),
        )?;

        for key in &self.entry_points {
            let (canonical, task) = discovery_task(&self.factory, &self.comparer, key.clone());
            work.add_work(canonical, task)?;
        }

        let discovered = work.complete()?;
        tracing::info!(nodes = discovered.len(), "discovery finished");

        self.link(discovered)
    }

    /// Async form of [`build`](Self::build); runs on tokio's blocking pool.
    pub async fn build_async(self) -> Result<Graph<F>> {
        tokio::task::spawn_blocking(move || self.build())
            .await
            .map_err(|err| GraphError::invalid_state(format!("graph build task failed: {err}")))?
    }

    fn link(&self, discovered: CompletedWork<C::Canonical, Discovered<F>>) -> Result<Graph<F>> {
        let count = discovered.len();
        let mut index: HashMap<C::Canonical, NodeId> = HashMap::with_capacity(count);
        let mut keys = Vec::with_capacity(count);
        let mut nodes = Vec::with_capacity(count);
        let mut links = Vec::with_capacity(count);

        for (position, (canonical, entry)) in discovered.into_iter().enumerate() {
            let id = NodeId::from(position);
            index.insert(canonical, id);
            keys.push(entry.key);
            nodes.push(entry.node);
            links.push((id, entry.references));
        }

        let resolve = |key: &F::Key| {
            index
                .get(&self.comparer.canonicalize(key))
                .copied()
                .ok_or_else(|| GraphError::KeyNotFound {
                    key: format!("{key:?}"),
                })
        };

        let edges = EdgeStore::new();
        for (source, references) in links {
            for Reference { key, edge } in references {
                let target = resolve(&key)?;
                add_reference(&mut nodes, source, target, edge, &edges);
            }
        }

        let mut entry_points = IndexSet::with_capacity(self.entry_points.len());
        for key in &self.entry_points {
            entry_points.insert(resolve(key)?);
        }
        let entry_points: Vec<NodeId> = entry_points.into_iter().collect();

        traversal::detect_cycles(&nodes, &entry_points)?;
        let roots = traversal::graph_roots(&nodes, &entry_points);

        tracing::info!(
            nodes = nodes.len(),
            edges = edges.len(),
            roots = roots.len(),
            "graph linked"
        );

        Ok(DependencyGraph::new(keys, nodes, entry_points, roots, edges))
    }
}

/// Canonical key plus the work function that discovers `key`.
fn discovery_task<F, C>(
    factory: &Arc<F>,
    comparer: &Arc<C>,
    key: F::Key,
) -> (
    C::Canonical,
    impl FnOnce(&DiscoveryContext<'_, F, C>) -> std::result::Result<Discovered<F>, BoxError>
        + Send
        + 'static,
)
where
    F: GraphFactory,
    C: KeyComparer<F::Key>,
{
    let canonical = comparer.canonicalize(&key);
    let factory = Arc::clone(factory);
    let comparer = Arc::clone(comparer);

    (canonical, move |work: &DiscoveryContext<'_, F, C>| {
        discover(&factory, &comparer, key, work)
    })
}

#[instrument(level = "debug", skip(factory, comparer, work))]
fn discover<F, C>(
    factory: &Arc<F>,
    comparer: &Arc<C>,
    key: F::Key,
    work: &DiscoveryContext<'_, F, C>,
) -> std::result::Result<Discovered<F>, BoxError>
where
    F: GraphFactory,
    C: KeyComparer<F::Key>,
{
    let mut node = factory.create_node(&key)?;
    node.set_default_full_path(|| format!("{key:?}"));

    let references = factory.get_references(&node)?;
    for reference in &references {
        let (canonical, task) = discovery_task(factory, comparer, reference.key.clone());
        work.add_work(canonical, task)?;
    }

    tracing::trace!(references = references.len(), "node discovered");

    Ok(Discovered {
        key,
        node,
        references,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::CaseInsensitive;
    use std::collections::HashMap as Map;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Factory over a fixed map of `key -> [references]`, recording the
    /// edge as `"from->to"`.
    struct MapFactory {
        graph: Map<&'static str, Vec<&'static str>>,
    }

    impl MapFactory {
        fn new(entries: &[(&'static str, &[&'static str])]) -> Self {
            Self {
                graph: entries.iter().map(|(k, refs)| (*k, refs.to_vec())).collect(),
            }
        }
    }

    impl GraphFactory for MapFactory {
        type Key = &'static str;
        type Payload = &'static str;
        type Edge = String;

        fn create_node(
            &self,
            key: &&'static str,
        ) -> std::result::Result<Node<&'static str>, BoxError> {
            Ok(Node::new(*key))
        }

        fn get_references(
            &self,
            node: &Node<&'static str>,
        ) -> std::result::Result<Vec<Reference<&'static str, String>>, BoxError> {
            let from = *node.item();
            Ok(self
                .graph
                .get(from)
                .into_iter()
                .flatten()
                .map(|to| Reference::new(*to, format!("{from}->{to}")))
                .collect())
        }
    }

    #[test]
    fn default_full_path_is_debug_key() {
        let factory = MapFactory::new(&[("a", &[])]);
        let graph = GraphBuilder::new(["a"], DefaultComparer, factory, 1, CancellationToken::none())
            .build()
            .unwrap();

        assert_eq!(graph[NodeId::from(0)].full_path(), Some("\"a\""));
    }

    #[test]
    fn edges_carry_payloads() {
        let factory = MapFactory::new(&[("a", &["b"]), ("b", &[])]);
        let graph = GraphBuilder::new(["a"], DefaultComparer, factory, 2, CancellationToken::none())
            .build()
            .unwrap();

        let a = graph.find(&"a").unwrap();
        let b = graph.find(&"b").unwrap();
        assert_eq!(graph.edge(a, b).unwrap(), "a->b");
        assert!(graph.edge(b, a).is_err());
    }

    #[test]
    fn duplicate_entry_points_collapse() {
        struct Upper;

        impl GraphFactory for Upper {
            type Key = String;
            type Payload = String;
            type Edge = ();

            fn create_node(&self, key: &String) -> std::result::Result<Node<String>, BoxError> {
                Ok(Node::new(key.to_uppercase()))
            }

            fn get_references(
                &self,
                _: &Node<String>,
            ) -> std::result::Result<Vec<Reference<String, ()>>, BoxError> {
                Ok(Vec::new())
            }
        }

        let graph = GraphBuilder::new(
            ["a".to_string(), "A".to_string()],
            CaseInsensitive,
            Upper,
            1,
            CancellationToken::none(),
        )
        .build()
        .unwrap();

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.entry_points().len(), 1);
        assert_eq!(graph.roots().len(), 1);
    }

    /// Gives every key a fresh canonical form on each call, so no reference
    /// recorded during discovery can be resolved when linking.
    #[derive(Default)]
    struct Drifting {
        calls: AtomicUsize,
    }

    impl KeyComparer<&'static str> for Drifting {
        type Canonical = String;

        fn canonicalize(&self, key: &&'static str) -> String {
            format!("{key}#{}", self.calls.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[test]
    fn unresolvable_reference_is_key_not_found() {
        let factory = MapFactory::new(&[("a", &["b"]), ("b", &[])]);
        let result = GraphBuilder::new(
            ["a"],
            Drifting::default(),
            factory,
            1,
            CancellationToken::none(),
        )
        .build();

        match result {
            Err(GraphError::KeyNotFound { key }) => assert_eq!(key, "\"b\""),
            Err(other) => panic!("expected KeyNotFound, got {other:?}"),
            Ok(graph) => panic!("expected no graph, got {} nodes", graph.len()),
        }
    }

    #[test]
    fn cancelled_token_fails_fast() {
        let token = CancellationToken::new();
        token.cancel();

        let factory = MapFactory::new(&[("a", &[])]);
        let result = GraphBuilder::new(["a"], DefaultComparer, factory, 4, token).build();
        assert!(matches!(result, Err(GraphError::Cancelled)));
    }
}
