//! Circular-Dependency Detector (§4.8): bounded DFS cycle enumeration
//! over the graph store, with per-edge-type weighting and
//! lexicographic-rotation normalization so the same cycle found from two
//! different start nodes dedupes to one result.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::model::{EdgeId, NodeFilter, NodeId, NodeType};
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct CycleDetectionOptions {
    pub edge_types: Option<Vec<String>>,
    pub exclude_node_types: Vec<NodeType>,
    pub max_depth: u32,
    pub max_cycles: usize,
    pub timeout: Option<Duration>,
}

impl Default for CycleDetectionOptions {
    fn default() -> Self {
        CycleDetectionOptions {
            edge_types: None,
            exclude_node_types: Vec::new(),
            max_depth: 50,
            max_cycles: 1000,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct CycleDetectionResult {
    pub cycles: Vec<Cycle>,
    /// Set when `max_depth`, `max_cycles`, or `timeout` cut the search
    /// short — the result is a lower bound, not a guaranteed-complete
    /// enumeration (§4.8 edge cases).
    pub truncated: bool,
}

/// Relative weight of an edge type within a cycle's total weight. Names
/// not listed fall back to `1.0`.
fn edge_type_weight(edge_type: &str) -> f64 {
    use crate::edge_types::names;
    match edge_type {
        t if t == names::IMPORTS => 1.0,
        t if t == names::DEPENDS_ON => 2.0,
        t if t == names::CALLS => 3.0,
        t if t == names::EXTENDS => 4.0,
        t if t == names::IMPLEMENTS => 2.0,
        _ => 1.0,
    }
}

pub fn detect_cycles(store: &Store, opts: &CycleDetectionOptions) -> CycleDetectionResult {
    let start_time = Instant::now();
    let mut found: HashMap<Vec<NodeId>, Cycle> = HashMap::new();
    let mut truncated = false;

    let mut roots: Vec<NodeId> = store
        .find_nodes(&NodeFilter::default())
        .into_iter()
        .filter(|n| !opts.exclude_node_types.contains(&n.node_type))
        .map(|n| n.id)
        .collect();
    roots.sort();

    for origin in roots {
        if truncated {
            break;
        }
        if let Some(timeout) = opts.timeout {
            if start_time.elapsed() > timeout {
                truncated = true;
                break;
            }
        }
        if found.len() >= opts.max_cycles {
            truncated = true;
            break;
        }

        let mut path_nodes = vec![origin];
        let mut path_edges: Vec<EdgeId> = Vec::new();
        dfs(store, opts, origin, origin, &mut path_nodes, &mut path_edges, &mut found, start_time, &mut truncated);
    }

    let mut cycles: Vec<Cycle> = found.into_values().collect();
    cycles.sort_by(|a, b| a.nodes.len().cmp(&b.nodes.len()).then_with(|| a.nodes.cmp(&b.nodes)));
    CycleDetectionResult { cycles, truncated }
}

/// Convenience entry point used by `inference::InferenceEngine::validate`:
/// cycle search restricted to a single edge type.
pub fn detect_cycles_for_edge_type(
    store: &Store,
    edge_type: &str,
    max_depth: u32,
    max_cycles: usize,
    timeout: Option<Duration>,
) -> CycleDetectionResult {
    detect_cycles(
        store,
        &CycleDetectionOptions {
            edge_types: Some(vec![edge_type.to_string()]),
            exclude_node_types: Vec::new(),
            max_depth,
            max_cycles,
            timeout,
        },
    )
}

#[allow(clippy::too_many_arguments)]
fn dfs(
    store: &Store,
    opts: &CycleDetectionOptions,
    origin: NodeId,
    current: NodeId,
    path_nodes: &mut Vec<NodeId>,
    path_edges: &mut Vec<EdgeId>,
    found: &mut HashMap<Vec<NodeId>, Cycle>,
    start_time: Instant,
    truncated: &mut bool,
) {
    if *truncated {
        return;
    }
    if let Some(timeout) = opts.timeout {
        if start_time.elapsed() > timeout {
            *truncated = true;
            return;
        }
    }
    if path_nodes.len() as u32 > opts.max_depth {
        *truncated = true;
        return;
    }

    for edge in store.find_node_dependencies(current, opts.edge_types.as_deref()) {
        let next = edge.to_node_id;
        if let Some(next_node) = store.node(next) {
            if opts.exclude_node_types.contains(&next_node.node_type) {
                continue;
            }
        }

        if next == origin {
            let cycle_nodes = path_nodes.clone();
            let mut cycle_edges = path_edges.clone();
            cycle_edges.push(edge.id);
            let (normalized_nodes, normalized_edges) = normalize_cycle(&cycle_nodes, &cycle_edges);
            let weight: f64 = normalized_edges
                .iter()
                .filter_map(|id| store.edge(*id))
                .map(|e| edge_type_weight(&e.edge_type))
                .sum();
            found
                .entry(normalized_nodes.clone())
                .or_insert(Cycle { nodes: normalized_nodes, edges: normalized_edges, weight });
            if found.len() >= opts.max_cycles {
                *truncated = true;
                return;
            }
            continue;
        }

        if path_nodes.contains(&next) {
            // A cycle not containing `origin` — it will be (or was)
            // found by the DFS rooted at its own smallest node.
            continue;
        }

        path_nodes.push(next);
        path_edges.push(edge.id);
        dfs(store, opts, origin, next, path_nodes, path_edges, found, start_time, truncated);
        path_nodes.pop();
        path_edges.pop();
        if *truncated {
            return;
        }
    }
}

/// Rotate `nodes`/`edges` so the lexicographically-smallest node id
/// leads, keeping `edges[i]` as the edge from `nodes[i]` to
/// `nodes[(i+1) % n]`. Two DFS runs that find the same cycle starting
/// from different nodes normalize to the same key.
fn normalize_cycle(nodes: &[NodeId], edges: &[EdgeId]) -> (Vec<NodeId>, Vec<EdgeId>) {
    let n = nodes.len();
    let min_idx = (0..n).min_by_key(|&i| nodes[i]).unwrap_or(0);
    let rotated_nodes: Vec<NodeId> = (0..n).map(|i| nodes[(min_idx + i) % n]).collect();
    let rotated_edges: Vec<EdgeId> = (0..n).map(|i| edges[(min_idx + i) % n]).collect();
    (rotated_nodes, rotated_edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge_types::names;
    use crate::model::GraphEdge;
    use crate::model::GraphNode;
    use std::collections::HashMap as Map;

    fn node(store: &Store, identifier: &str) -> NodeId {
        store
            .upsert_node(GraphNode {
                id: NodeId(0),
                identifier: identifier.to_string(),
                node_type: NodeType::File,
                name: identifier.to_string(),
                source_file: None,
                language: None,
                metadata: Map::new(),
                start_line: None,
                start_column: None,
                end_line: None,
                end_column: None,
            })
            .unwrap()
    }

    fn edge(store: &Store, from: NodeId, to: NodeId, edge_type: &str) -> EdgeId {
        store
            .upsert_relationship(GraphEdge {
                id: EdgeId(0),
                from_node_id: from,
                to_node_id: to,
                edge_type: edge_type.to_string(),
                label: None,
                metadata: Map::new(),
                weight: 1.0,
                source_file: None,
            })
            .unwrap()
    }

    #[test]
    fn detects_a_simple_three_node_cycle() {
        let store = Store::open_in_memory().unwrap();
        let a = node(&store, "p/a");
        let b = node(&store, "p/b");
        let c = node(&store, "p/c");
        edge(&store, a, b, names::DEPENDS_ON);
        edge(&store, b, c, names::DEPENDS_ON);
        edge(&store, c, a, names::DEPENDS_ON);

        let result = detect_cycles(&store, &CycleDetectionOptions::default());
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(result.cycles[0].nodes.len(), 3);
        assert!(!result.truncated);
    }

    #[test]
    fn same_cycle_found_from_different_roots_dedupes_to_one() {
        let store = Store::open_in_memory().unwrap();
        let a = node(&store, "p/a");
        let b = node(&store, "p/b");
        edge(&store, a, b, names::DEPENDS_ON);
        edge(&store, b, a, names::DEPENDS_ON);

        let result = detect_cycles(&store, &CycleDetectionOptions::default());
        assert_eq!(result.cycles.len(), 1);
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let store = Store::open_in_memory().unwrap();
        let a = node(&store, "p/a");
        let b = node(&store, "p/b");
        edge(&store, a, b, names::DEPENDS_ON);

        let result = detect_cycles(&store, &CycleDetectionOptions::default());
        assert!(result.cycles.is_empty());
    }

    #[test]
    fn max_cycles_of_zero_truncates_immediately_when_a_cycle_exists() {
        let store = Store::open_in_memory().unwrap();
        let a = node(&store, "p/a");
        let b = node(&store, "p/b");
        edge(&store, a, b, names::DEPENDS_ON);
        edge(&store, b, a, names::DEPENDS_ON);

        let opts = CycleDetectionOptions { max_cycles: 0, ..Default::default() };
        let result = detect_cycles(&store, &opts);
        assert!(result.truncated);
    }

    #[test]
    fn weight_reflects_edge_type_table() {
        let store = Store::open_in_memory().unwrap();
        let a = node(&store, "p/a");
        let b = node(&store, "p/b");
        edge(&store, a, b, names::EXTENDS);
        edge(&store, b, a, names::IMPORTS);

        let result = detect_cycles(&store, &CycleDetectionOptions::default());
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(result.cycles[0].weight, 4.0 + 1.0);
    }
}
