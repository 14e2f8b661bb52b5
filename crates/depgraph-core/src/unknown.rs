//! Unknown Resolver (§4.7): best-effort resolution of `unknown`
//! placeholder nodes (symbols referenced but never declared/imported
//! anywhere the analyzer walked) against real nodes already in the
//! graph, plus dissolution of `aliasOf` re-export chains.

use std::collections::{HashMap, HashSet};

use crate::edge_types::names;
use crate::errors::StorageError;
use crate::model::{EdgeId, GraphEdge, GraphNode, NodeFilter, NodeId, NodeType};
use crate::store::Store;
use crate::symbols::SymbolTable;

pub struct UnknownResolver<'a> {
    store: &'a Store,
    symbols: Option<&'a SymbolTable>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    NoCandidates,
    Ambiguous(Vec<NodeId>),
    External,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Resolved { target: NodeId },
    Unresolved { reason: UnresolvedReason },
}

impl<'a> UnknownResolver<'a> {
    pub fn new(store: &'a Store) -> Self {
        UnknownResolver { store, symbols: None }
    }

    /// Same as `new`, but narrows same-file candidates through `symbols`
    /// (the table built during indexing) instead of scanning the store.
    pub fn with_symbols(store: &'a Store, symbols: &'a SymbolTable) -> Self {
        UnknownResolver { store, symbols: Some(symbols) }
    }

    pub fn unknown_nodes(&self) -> Vec<GraphNode> {
        self.store.find_nodes(&NodeFilter { node_types: vec![NodeType::Unknown], ..Default::default() })
    }

    /// Candidates are nodes in the same `sourceFile` as `unknown` whose
    /// `name` (or `metadata["name"]`) matches and whose type is in
    /// `NodeType::UR_PRIORITY`, narrowed to the single highest-priority
    /// tier present (§4.7 step 2–3).
    pub fn find_candidates(&self, unknown: &GraphNode) -> Vec<GraphNode> {
        let Some(source_file) = unknown.source_file.as_deref() else {
            return Vec::new();
        };

        let same_file_nodes: Vec<GraphNode> = match self.symbols {
            Some(symbols) => symbols.symbols_in_file(source_file).into_iter().filter_map(|id| self.store.node(id)).collect(),
            None => self.store.find_nodes(&NodeFilter { source_files: vec![source_file.to_string()], ..Default::default() }),
        };

        let mut candidates: Vec<GraphNode> = same_file_nodes
            .into_iter()
            .filter(|n| n.node_type != NodeType::Unknown)
            .filter(|n| ur_priority_rank(n.node_type) != usize::MAX)
            .filter(|n| n.name == unknown.name || n.metadata.get("name").map(|v| v.as_str()) == Some(unknown.name.as_str()))
            .collect();

        candidates.sort_by_key(|n| ur_priority_rank(n.node_type));

        let Some(best_rank) = candidates.first().map(|n| ur_priority_rank(n.node_type)) else {
            return candidates;
        };
        candidates.into_iter().filter(|n| ur_priority_rank(n.node_type) == best_rank).collect()
    }

    /// Resolve a single unknown node against the current graph state,
    /// without persisting anything.
    pub fn resolve_one(&self, unknown: &GraphNode) -> ResolutionOutcome {
        let candidates = self.find_candidates(unknown);
        match candidates.len() {
            1 => ResolutionOutcome::Resolved { target: candidates[0].id },
            _ => ResolutionOutcome::Unresolved { reason: classify_failure(unknown, &candidates) },
        }
    }

    /// Resolve every unknown node in the graph, persisting a
    /// `resolvedTo` edge for each one that resolved uniquely.
    pub fn resolve_all(&self) -> Result<Vec<(NodeId, ResolutionOutcome)>, StorageError> {
        let unknowns = self.unknown_nodes();
        let mut results = Vec::with_capacity(unknowns.len());
        for unknown in &unknowns {
            let outcome = self.resolve_one(unknown);
            if let ResolutionOutcome::Resolved { target } = outcome {
                self.store.upsert_relationship(GraphEdge {
                    id: EdgeId(0),
                    from_node_id: unknown.id,
                    to_node_id: target,
                    edge_type: names::RESOLVED_TO.to_string(),
                    label: None,
                    metadata: HashMap::new(),
                    weight: 1.0,
                    source_file: unknown.source_file.clone(),
                })?;
            }
            results.push((unknown.id, outcome));
        }
        Ok(results)
    }

    /// Walk `aliasOf` chains from every unknown node up to `max_depth`
    /// hops (cycle-safe), and if a chain terminates at a concrete node,
    /// persist a direct `resolvedTo` edge short-circuiting it. Returns
    /// the number of chains dissolved.
    pub fn dissolve_alias_chains(&self, max_depth: u32) -> Result<usize, StorageError> {
        let unknowns = self.unknown_nodes();
        let mut dissolved = 0;

        for unknown in &unknowns {
            let mut current = unknown.id;
            let mut visited = HashSet::new();
            visited.insert(current);
            let mut depth = 0;
            let mut final_target = None;

            while depth < max_depth {
                let alias_edges =
                    self.store.find_node_dependencies(current, Some(&[names::ALIAS_OF.to_string()]));
                let Some(next_edge) = alias_edges.first() else { break };
                let next = next_edge.to_node_id;
                if !visited.insert(next) {
                    break; // cycle in the alias chain — leave unresolved
                }
                current = next;
                depth += 1;
                match self.store.node(current) {
                    Some(node) if node.node_type != NodeType::Unknown => {
                        final_target = Some(current);
                        break;
                    }
                    _ => continue,
                }
            }

            if let Some(target) = final_target {
                if target != unknown.id {
                    self.store.upsert_relationship(GraphEdge {
                        id: EdgeId(0),
                        from_node_id: unknown.id,
                        to_node_id: target,
                        edge_type: names::RESOLVED_TO.to_string(),
                        label: None,
                        metadata: HashMap::new(),
                        weight: 1.0,
                        source_file: unknown.source_file.clone(),
                    })?;
                    dissolved += 1;
                }
            }
        }
        Ok(dissolved)
    }
}

fn ur_priority_rank(node_type: NodeType) -> usize {
    NodeType::UR_PRIORITY.iter().position(|t| *t == node_type).unwrap_or(usize::MAX)
}

const VENDOR_MARKERS: &[&str] = &["node_modules", "vendor", "site-packages", "target/"];

/// `dynamic` is flagged in metadata by the producer (parser front-end)
/// when the reference came from a computed expression it couldn't
/// statically bind; `external` is inferred from the source path itself
/// containing a vendor marker (§4.7 failure classification).
fn classify_failure(unknown: &GraphNode, candidates: &[GraphNode]) -> UnresolvedReason {
    if candidates.len() > 1 {
        return UnresolvedReason::Ambiguous(candidates.iter().map(|c| c.id).collect());
    }
    if unknown.metadata.get("dynamic").map(|v| v == "true").unwrap_or(false) {
        return UnresolvedReason::Dynamic;
    }
    if let Some(source_file) = &unknown.source_file {
        if VENDOR_MARKERS.iter().any(|marker| source_file.contains(marker)) {
            return UnresolvedReason::External;
        }
    }
    UnresolvedReason::NoCandidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unknown_node(store: &Store, identifier: &str, name: &str, source_file: &str) -> GraphNode {
        let id = store
            .upsert_node(GraphNode {
                id: NodeId(0),
                identifier: identifier.to_string(),
                node_type: NodeType::Unknown,
                name: name.to_string(),
                source_file: Some(source_file.to_string()),
                language: None,
                metadata: HashMap::new(),
                start_line: None,
                start_column: None,
                end_line: None,
                end_column: None,
            })
            .unwrap();
        store.node(id).unwrap()
    }

    fn concrete_node(store: &Store, identifier: &str, node_type: NodeType, name: &str, source_file: &str) -> NodeId {
        store
            .upsert_node(GraphNode {
                id: NodeId(0),
                identifier: identifier.to_string(),
                node_type,
                name: name.to_string(),
                source_file: Some(source_file.to_string()),
                language: None,
                metadata: HashMap::new(),
                start_line: None,
                start_column: None,
                end_line: None,
                end_column: None,
            })
            .unwrap()
    }

    #[test]
    fn resolves_unique_candidate_by_name_in_same_source_file() {
        let store = Store::open_in_memory().unwrap();
        let target = concrete_node(&store, "p/a.ts#Class:Widget", NodeType::Class, "Widget", "a.ts");
        let unknown = unknown_node(&store, "unknown#Widget", "Widget", "a.ts");

        let resolver = UnknownResolver::new(&store);
        let outcome = resolver.resolve_one(&unknown);
        assert_eq!(outcome, ResolutionOutcome::Resolved { target });
    }

    #[test]
    fn candidate_in_a_different_file_does_not_count() {
        let store = Store::open_in_memory().unwrap();
        concrete_node(&store, "p/b.ts#Class:Widget", NodeType::Class, "Widget", "b.ts");
        let unknown = unknown_node(&store, "unknown#Widget", "Widget", "a.ts");

        let resolver = UnknownResolver::new(&store);
        let outcome = resolver.resolve_one(&unknown);
        assert_eq!(outcome, ResolutionOutcome::Unresolved { reason: UnresolvedReason::NoCandidates });
    }

    #[test]
    fn ambiguous_when_multiple_same_tier_candidates_in_same_file() {
        let store = Store::open_in_memory().unwrap();
        concrete_node(&store, "p/a.ts#Class:Widget", NodeType::Class, "Widget", "a.ts");
        concrete_node(&store, "p/a.ts#Function:Widget", NodeType::Function, "Widget", "a.ts");
        let unknown = unknown_node(&store, "unknown#Widget", "Widget", "a.ts");

        let resolver = UnknownResolver::new(&store);
        let outcome = resolver.resolve_one(&unknown);
        assert!(matches!(outcome, ResolutionOutcome::Unresolved { reason: UnresolvedReason::Ambiguous(_) }));
    }

    #[test]
    fn no_candidates_reason_when_nothing_matches() {
        let store = Store::open_in_memory().unwrap();
        let unknown = unknown_node(&store, "unknown#Ghost", "Ghost", "a.ts");
        let resolver = UnknownResolver::new(&store);
        let outcome = resolver.resolve_one(&unknown);
        assert_eq!(outcome, ResolutionOutcome::Unresolved { reason: UnresolvedReason::NoCandidates });
    }

    #[test]
    fn external_when_source_file_has_a_vendor_marker() {
        let store = Store::open_in_memory().unwrap();
        let unknown = unknown_node(&store, "unknown#Ghost", "Ghost", "node_modules/pkg/index.js");
        let resolver = UnknownResolver::new(&store);
        let outcome = resolver.resolve_one(&unknown);
        assert_eq!(outcome, ResolutionOutcome::Unresolved { reason: UnresolvedReason::External });
    }

    #[test]
    fn dissolves_alias_chain_to_final_concrete_node() {
        let store = Store::open_in_memory().unwrap();
        let target = concrete_node(&store, "p/a.ts#Class:Real", NodeType::Class, "Real", "a.ts");
        let mid = unknown_node(&store, "unknown#mid", "mid", "a.ts");
        let start = unknown_node(&store, "unknown#start", "start", "a.ts");

        store
            .upsert_relationship(GraphEdge {
                id: EdgeId(0),
                from_node_id: start.id,
                to_node_id: mid.id,
                edge_type: names::ALIAS_OF.to_string(),
                label: None,
                metadata: HashMap::new(),
                weight: 1.0,
                source_file: None,
            })
            .unwrap();
        store
            .upsert_relationship(GraphEdge {
                id: EdgeId(0),
                from_node_id: mid.id,
                to_node_id: target,
                edge_type: names::ALIAS_OF.to_string(),
                label: None,
                metadata: HashMap::new(),
                weight: 1.0,
                source_file: None,
            })
            .unwrap();

        let resolver = UnknownResolver::new(&store);
        let dissolved = resolver.dissolve_alias_chains(10).unwrap();
        assert!(dissolved >= 1);

        let resolved_edges = store.find_node_dependencies(start.id, Some(&[names::RESOLVED_TO.to_string()]));
        assert_eq!(resolved_edges.len(), 1);
        assert_eq!(resolved_edges[0].to_node_id, target);
    }
}
