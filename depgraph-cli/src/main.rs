//! Depgraph CLI
//!
//! Builds a dependency graph from a text adjacency list and prints it in
//! dependency order.
//!
//! ```text
//! depgraph graph.txt --entry app -j 4
//! ```

mod logger;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use depgraph_core::{
    AdjacencyFactory, AdjacencyList, BuildConfig, CancellationToken, CaseInsensitive,
    DefaultComparer, Graph, GraphBuilder, KeyComparer, NodeId,
};

#[derive(Parser, Debug)]
#[command(name = "depgraph", version, about = "Build a dependency graph from an adjacency list")]
struct Cli {
    /// Adjacency list: one `key -> ref; ref` line per node
    graph: PathBuf,

    /// Entry key to start discovery from (repeatable; defaults to every declared key)
    #[arg(short, long = "entry")]
    entries: Vec<String>,

    /// Total discovery threads, counting the main thread
    #[arg(short = 'j', long)]
    parallelism: Option<usize>,

    /// JSON build configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Treat keys that differ only in case as different nodes
    #[arg(long)]
    case_sensitive: bool,

    /// Print the graph as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[arg(long)]
    no_color: bool,
}

#[derive(Serialize)]
struct Report {
    roots: Vec<String>,
    order: Vec<NodeReport>,
}

#[derive(Serialize)]
struct NodeReport {
    name: String,
    references: Vec<String>,
}

impl Report {
    fn new<C: KeyComparer<String>>(graph: &Graph<AdjacencyFactory<C>>) -> Self {
        let name = |id: NodeId| graph[id].item().name.clone();
        Self {
            roots: graph.roots().iter().copied().map(name).collect(),
            order: graph
                .topologically_sorted()
                .iter()
                .map(|id| NodeReport {
                    name: name(*id),
                    references: graph[*id].references().iter().copied().map(name).collect(),
                })
                .collect(),
        }
    }

    fn print_text(&self) {
        println!("roots: {}", self.roots.join(", "));
        for node in &self.order {
            if node.references.is_empty() {
                println!("  {}", node.name);
            } else {
                println!("  {} -> {}", node.name, node.references.join(", "));
            }
        }
    }
}

fn load_config(cli: &Cli) -> Result<BuildConfig> {
    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            BuildConfig::from_json(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => BuildConfig::default(),
    };

    let config = config.with_env_overrides()?;
    Ok(match cli.parallelism {
        Some(parallelism) => config.with_degree_of_parallelism(parallelism),
        None => config,
    })
}

async fn build<C>(
    list: AdjacencyList,
    entries: Vec<String>,
    comparer: C,
    config: BuildConfig,
) -> Result<Report>
where
    C: KeyComparer<String> + Clone,
{
    let cancellation = CancellationToken::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling discovery");
            on_interrupt.cancel();
        }
    });

    let factory = AdjacencyFactory::new(list, comparer.clone());
    let graph = GraphBuilder::with_config(entries, comparer, factory, config, cancellation)
        .build_async()
        .await?;

    Ok(Report::new::<C>(&graph))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_logger(cli.verbose, cli.quiet, cli.no_color);

    let config = load_config(&cli)?;

    let text = std::fs::read_to_string(&cli.graph)
        .with_context(|| format!("failed to read {}", cli.graph.display()))?;
    let list = AdjacencyList::parse(&text)
        .with_context(|| format!("failed to parse {}", cli.graph.display()))?;

    let entries = if cli.entries.is_empty() {
        list.keys().map(str::to_string).collect()
    } else {
        cli.entries.clone()
    };

    tracing::debug!(
        entries = entries.len(),
        parallelism = config.degree_of_parallelism,
        "building graph"
    );

    let report = if cli.case_sensitive {
        build(list, entries, DefaultComparer, config).await?
    } else {
        build(list, entries, CaseInsensitive, config).await?
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print_text();
    }

    Ok(())
}
