//! depgraph CLI entry point.

use clap::{Parser, Subcommand};
use depgraph_core::CachePolicy;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "depgraph")]
#[command(about = "Persistent typed code-dependency graph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Project root path (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the project, extract declarations and imports, and persist
    /// the resulting graph.
    Index {
        /// When the inference cache is recomputed: eager (every index),
        /// lazy (never automatic), or manual (only via `validate`/a
        /// future explicit refresh command).
        #[arg(long, value_enum, default_value = "eager")]
        cache_policy: CliCachePolicy,
    },
    /// Delete the persisted graph store for this project.
    Clear,
    /// Print node/edge counts by type.
    Stats,
    /// Check the edge-type hierarchy and scan for cycles in transitive
    /// edge types; exits non-zero if any errors are found.
    Validate,
    /// Enumerate circular dependencies.
    Cycles {
        /// Restrict to one edge type (and its registered descendants).
        #[arg(long)]
        edge_type: Option<String>,
        #[arg(long, default_value_t = 50)]
        max_depth: u32,
        #[arg(long, default_value_t = 1000)]
        max_cycles: usize,
    },
    /// Resolve `unknown` placeholder nodes against concrete graph nodes.
    ResolveUnknowns {
        #[arg(long, default_value_t = 10)]
        max_alias_depth: u32,
    },
    /// Run an inference query.
    Query {
        #[command(subcommand)]
        kind: QueryCommands,
    },
    /// Per-node metrics: fan-in/out, instability, criticality, impact radius.
    Inspect {
        /// Node identifier or name.
        node: String,
        #[arg(long, default_value_t = 10)]
        max_depth: u32,
    },
}

#[derive(Subcommand)]
enum QueryCommands {
    /// Relabel direct edges up/down the edge-type hierarchy.
    Hierarchical {
        edge_type: String,
        #[arg(long)]
        include_children: bool,
        #[arg(long)]
        include_parents: bool,
    },
    /// Transitive closure of a transitive edge type from one node.
    Transitive {
        from: String,
        edge_type: String,
        #[arg(long, default_value_t = 10)]
        max_path_length: u32,
    },
    /// Compose a containment-shaped parent relation with an inheritable
    /// edge type (e.g. file `contains` class `extends` base).
    Inheritable {
        from: String,
        #[arg(long, default_value = "contains")]
        parent_rel_type: String,
        #[arg(long, default_value = "extends")]
        inheritable_type: String,
        #[arg(long, default_value_t = 10)]
        max_inheritance_depth: u32,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliCachePolicy {
    Eager,
    Lazy,
    Manual,
}

impl From<CliCachePolicy> for CachePolicy {
    fn from(policy: CliCachePolicy) -> Self {
        match policy {
            CliCachePolicy::Eager => CachePolicy::Eager,
            CliCachePolicy::Lazy => CachePolicy::Lazy,
            CliCachePolicy::Manual => CachePolicy::Manual,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("depgraph={}", log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("depgraph v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Index { cache_policy } => commands::index(cli.root, cache_policy.into()),
        Commands::Clear => commands::clear(cli.root),
        Commands::Stats => commands::stats(cli.root),
        Commands::Validate => commands::validate(cli.root),
        Commands::Cycles { edge_type, max_depth, max_cycles } => {
            commands::cycles(cli.root, edge_type, max_depth, max_cycles)
        }
        Commands::ResolveUnknowns { max_alias_depth } => commands::resolve_unknowns(cli.root, max_alias_depth),
        Commands::Query { kind } => match kind {
            QueryCommands::Hierarchical { edge_type, include_children, include_parents } => {
                commands::query_hierarchical(cli.root, edge_type, include_children, include_parents)
            }
            QueryCommands::Transitive { from, edge_type, max_path_length } => {
                commands::query_transitive(cli.root, from, edge_type, max_path_length)
            }
            QueryCommands::Inheritable { from, parent_rel_type, inheritable_type, max_inheritance_depth } => {
                commands::query_inheritable(cli.root, from, parent_rel_type, inheritable_type, max_inheritance_depth)
            }
        },
        Commands::Inspect { node, max_depth } => commands::inspect(cli.root, node, max_depth),
    }
}
