//! CLI command implementations.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use depgraph_core::{
    detect_cycles, CachePolicy, CycleDetectionOptions, EdgeTypeRegistry, HierarchicalOptions,
    InferenceEngine, InheritableOptions, NodeCentricAnalyzer, NodeFilter, NodeId, Store,
    TransitiveOptions, UnknownResolver,
};
use depgraph_indexer::Coordinator;

/// Where a project's graph lives relative to its root, mirroring the
/// `.git`-style convention of a hidden per-project directory.
fn db_path(root: &Path) -> PathBuf {
    root.join(".depgraph").join("graph.db")
}

fn open_store(root: &Path) -> Result<Store> {
    let path = db_path(root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    Store::open(&path).with_context(|| format!("opening graph store at {}", path.display()))
}

fn seeded_registry(store: &Store) -> Result<EdgeTypeRegistry> {
    let registry = EdgeTypeRegistry::new();
    store
        .sync_edge_type_defs(&registry.types_for_dynamic_registration())
        .context("syncing edge-type registry to storage")?;
    Ok(registry)
}

pub fn index(root: PathBuf, cache_policy: CachePolicy) -> Result<()> {
    let root = root.canonicalize().unwrap_or(root);
    tracing::info!("indexing {}", root.display());

    let store = open_store(&root)?;
    let registry = seeded_registry(&store)?;

    let coordinator = Coordinator::new();
    let report = coordinator.run_full_index(&root, &store)?;

    let total_created: usize = report.files.iter().map(|f| f.created_nodes).sum();
    let total_rels: usize = report.files.iter().map(|f| f.created_relationships).sum();
    let total_missing: usize = report.files.iter().map(|f| f.missing_links).sum();

    tracing::info!(
        "indexed {} files ({} skipped): {} nodes, {} relationships, {} missing links",
        report.files.len(),
        report.skipped.len(),
        total_created,
        total_rels,
        total_missing,
    );
    for (path, reason) in &report.skipped {
        tracing::warn!("skipped {}: {}", path, reason);
    }

    let resolver = UnknownResolver::with_symbols(&store, &report.symbols);
    let resolutions = resolver.resolve_all()?;
    let resolved_count = resolutions
        .iter()
        .filter(|(_, outcome)| matches!(outcome, depgraph_core::ResolutionOutcome::Resolved { .. }))
        .count();
    let dissolved = resolver.dissolve_alias_chains(10)?;
    tracing::info!(
        "unknown resolution: {}/{} resolved, {} alias chains dissolved",
        resolved_count,
        resolutions.len(),
        dissolved
    );

    let ie = InferenceEngine::new(&store, &registry);
    let cached = ie.sync_cache(cache_policy, false)?;
    tracing::info!("inference cache: {} entries", cached);

    Ok(())
}

pub fn clear(root: PathBuf) -> Result<()> {
    let path = db_path(&root);
    if path.exists() {
        std::fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        tracing::info!("cleared graph store at {}", path.display());
    } else {
        tracing::info!("no graph store to clear at {}", path.display());
    }
    Ok(())
}

pub fn stats(root: PathBuf) -> Result<()> {
    let store = open_store(&root)?;
    let stats = store.statistics();

    println!("nodes: {}", stats.total_nodes);
    let mut node_types: Vec<_> = stats.nodes_by_type.iter().collect();
    node_types.sort_by_key(|(name, _)| name.clone());
    for (node_type, count) in node_types {
        println!("  {:<12} {}", node_type, count);
    }

    println!("edges: {}", stats.total_edges);
    let mut edge_types: Vec<_> = stats.edges_by_type.iter().collect();
    edge_types.sort_by_key(|(name, _)| name.clone());
    for (edge_type, count) in edge_types {
        println!("  {:<16} {}", edge_type, count);
    }

    Ok(())
}

pub fn validate(root: PathBuf) -> Result<()> {
    let store = open_store(&root)?;
    let registry = seeded_registry(&store)?;
    let ie = InferenceEngine::new(&store, &registry);
    let report = ie.validate();

    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }
    for error in &report.errors {
        tracing::error!("{}", error);
    }

    if report.errors.is_empty() {
        println!("valid: no errors ({} warnings)", report.warnings.len());
        Ok(())
    } else {
        Err(anyhow!("{} validation error(s) found, see log", report.errors.len()))
    }
}

pub fn cycles(root: PathBuf, edge_type: Option<String>, max_depth: u32, max_cycles: usize) -> Result<()> {
    let store = open_store(&root)?;
    let opts = CycleDetectionOptions {
        edge_types: edge_type.map(|t| vec![t]),
        exclude_node_types: Vec::new(),
        max_depth,
        max_cycles,
        timeout: None,
    };
    let result = detect_cycles(&store, &opts);

    for cycle in &result.cycles {
        let names: Vec<String> = cycle
            .nodes
            .iter()
            .map(|id| store.node(*id).map(|n| n.identifier).unwrap_or_else(|| format!("{:?}", id)))
            .collect();
        println!("cycle (weight {:.1}): {}", cycle.weight, names.join(" -> "));
    }
    if result.truncated {
        tracing::warn!("cycle search was truncated before exhausting the graph");
    }
    println!("{} cycle(s) found", result.cycles.len());

    Ok(())
}

pub fn resolve_unknowns(root: PathBuf, max_alias_depth: u32) -> Result<()> {
    let store = open_store(&root)?;
    let resolver = UnknownResolver::new(&store);

    let dissolved = resolver.dissolve_alias_chains(max_alias_depth)?;
    let resolutions = resolver.resolve_all()?;

    let mut resolved = 0;
    let mut unresolved = 0;
    for (id, outcome) in &resolutions {
        match outcome {
            depgraph_core::ResolutionOutcome::Resolved { target } => {
                resolved += 1;
                tracing::debug!("{:?} -> {:?}", id, target);
            }
            depgraph_core::ResolutionOutcome::Unresolved { reason } => {
                unresolved += 1;
                tracing::debug!("{:?} unresolved: {:?}", id, reason);
            }
        }
    }

    println!("{} resolved, {} unresolved, {} alias chains dissolved", resolved, unresolved, dissolved);
    Ok(())
}

fn find_node(store: &Store, identifier: &str) -> Result<NodeId> {
    let nodes = store.find_nodes(&NodeFilter::default());
    nodes
        .into_iter()
        .find(|n| n.identifier == identifier || n.name == identifier)
        .map(|n| n.id)
        .ok_or_else(|| anyhow!("no node matching {}", identifier))
}

pub fn query_hierarchical(root: PathBuf, edge_type: String, include_children: bool, include_parents: bool) -> Result<()> {
    let store = open_store(&root)?;
    let registry = seeded_registry(&store)?;
    let ie = InferenceEngine::new(&store, &registry);

    let opts = HierarchicalOptions { include_children, include_parents, max_depth: None };
    let results = ie.query_hierarchical(&edge_type, &opts)?;
    print_relationships(&store, &results);
    Ok(())
}

pub fn query_transitive(root: PathBuf, from: String, edge_type: String, max_path_length: u32) -> Result<()> {
    let store = open_store(&root)?;
    let registry = seeded_registry(&store)?;
    let ie = InferenceEngine::new(&store, &registry);
    let from_id = find_node(&store, &from)?;

    let opts = TransitiveOptions { max_path_length, detect_cycles: true, relationship_types: None };
    let results = ie.query_transitive(from_id, &edge_type, &opts)?;
    print_relationships(&store, &results);
    Ok(())
}

pub fn query_inheritable(
    root: PathBuf,
    from: String,
    parent_rel_type: String,
    inheritable_type: String,
    max_inheritance_depth: u32,
) -> Result<()> {
    let store = open_store(&root)?;
    let registry = seeded_registry(&store)?;
    let ie = InferenceEngine::new(&store, &registry);
    let from_id = find_node(&store, &from)?;

    let opts = InheritableOptions { max_inheritance_depth };
    let results = ie.query_inheritable(from_id, &parent_rel_type, &inheritable_type, &opts)?;
    print_relationships(&store, &results);
    Ok(())
}

pub fn inspect(root: PathBuf, node: String, max_depth: u32) -> Result<()> {
    let store = open_store(&root)?;
    let node_id = find_node(&store, &node)?;
    let nca = NodeCentricAnalyzer::new(&store);
    let metrics = nca.metrics(node_id);

    println!("fan-in:              {}", metrics.fan_in);
    println!("fan-out:             {}", metrics.fan_out);
    println!("instability:         {:.2}", metrics.instability);
    println!("criticality:         {:.2}", metrics.criticality);
    println!("participates_cycle:  {}", metrics.participates_in_cycle);

    let radius = nca.impact_radius(node_id, max_depth);
    println!("impact radius ({} hops): {} node(s)", max_depth, radius.len());

    Ok(())
}

fn print_relationships(store: &Store, results: &[depgraph_core::InferredRelationship]) {
    for r in results {
        let from = store.node(r.from_node_id).map(|n| n.identifier).unwrap_or_else(|| format!("{:?}", r.from_node_id));
        let to = store.node(r.to_node_id).map(|n| n.identifier).unwrap_or_else(|| format!("{:?}", r.to_node_id));
        println!("{} --[{}, depth {}]--> {}", from, r.inferred_type, r.path.depth, to);
    }
    println!("{} relationship(s)", results.len());
}
