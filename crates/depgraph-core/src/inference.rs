//! Inference Engine (§4.6): hierarchical, transitive, and inheritable
//! queries over the graph store, plus materialized-cache management.
//!
//! Every query is pure over the current `Store` snapshot plus whatever is
//! in the cache; none of them mutate the graph itself (only `sync_cache`
//! writes, and only to the cache table).

use std::collections::{HashMap, HashSet, VecDeque};

use crate::edge_types::{names, EdgeTypeRegistry};
use crate::errors::{EdgeTypeError, InferenceQueryError};
use crate::model::*;
use crate::store::Store;

pub struct InferenceEngine<'a> {
    store: &'a Store,
    registry: &'a EdgeTypeRegistry,
}

#[derive(Debug, Clone, Default)]
pub struct HierarchicalOptions {
    pub include_children: bool,
    pub include_parents: bool,
    pub max_depth: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct TransitiveOptions {
    pub max_path_length: u32,
    pub detect_cycles: bool,
    pub relationship_types: Option<Vec<String>>,
}

impl Default for TransitiveOptions {
    fn default() -> Self {
        TransitiveOptions { max_path_length: 10, detect_cycles: true, relationship_types: None }
    }
}

#[derive(Debug, Clone)]
pub struct InheritableOptions {
    pub max_inheritance_depth: u32,
}

impl Default for InheritableOptions {
    fn default() -> Self {
        InheritableOptions { max_inheritance_depth: 10 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Eager,
    Lazy,
    Manual,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl<'a> InferenceEngine<'a> {
    pub fn new(store: &'a Store, registry: &'a EdgeTypeRegistry) -> Self {
        InferenceEngine { store, registry }
    }

    // -----------------------------------------------------------
    // Hierarchical
    // -----------------------------------------------------------

    /// Relabel every persisted edge whose type generalizes to (or
    /// specializes from) `edge_type` as an `edge_type` relationship. This
    /// never traverses the graph — it's a relabeling over direct edges.
    pub fn query_hierarchical(
        &self,
        edge_type: &str,
        opts: &HierarchicalOptions,
    ) -> Result<Vec<InferredRelationship>, InferenceQueryError> {
        self.registry
            .get(edge_type)
            .ok_or_else(|| EdgeTypeError::UnknownType(edge_type.to_string()))?;

        let mut type_depths: HashMap<String, u32> = HashMap::new();
        type_depths.insert(edge_type.to_string(), 0);

        if opts.include_children {
            collect_descendant_depths(self.registry, edge_type, 0, opts.max_depth, &mut type_depths);
        }
        if opts.include_parents {
            let path = self.registry.hierarchy_path(edge_type);
            for (depth, name) in path.iter().enumerate() {
                if let Some(max) = opts.max_depth {
                    if depth as u32 > max {
                        break;
                    }
                }
                type_depths.entry(name.clone()).or_insert(depth as u32);
            }
        }

        let filter = EdgeFilter {
            edge_types: type_depths.keys().cloned().collect(),
            ..Default::default()
        };

        let mut results: Vec<InferredRelationship> = self
            .store
            .find_relationships(&filter)
            .into_iter()
            .map(|edge| {
                let depth = *type_depths.get(&edge.edge_type).unwrap_or(&0);
                InferredRelationship {
                    from_node_id: edge.from_node_id,
                    to_node_id: edge.to_node_id,
                    inferred_type: edge_type.to_string(),
                    path: InferencePath {
                        edge_ids: vec![edge.id],
                        depth,
                        inference_type: InferenceKind::Hierarchical,
                        description: format!("{} generalizes {}", edge_type, edge.edge_type),
                    },
                    inferred_at: chrono::Utc::now(),
                    source_file: edge.source_file.clone(),
                }
            })
            .collect();

        results.sort_by_key(|r| (r.path.depth, r.from_node_id, r.to_node_id));
        Ok(results)
    }

    // -----------------------------------------------------------
    // Transitive
    // -----------------------------------------------------------

    pub fn query_transitive(
        &self,
        from_node_id: NodeId,
        edge_type: &str,
        opts: &TransitiveOptions,
    ) -> Result<Vec<InferredRelationship>, InferenceQueryError> {
        let def = self
            .registry
            .get(edge_type)
            .ok_or_else(|| EdgeTypeError::UnknownType(edge_type.to_string()))?;
        if !def.is_transitive {
            return Err(EdgeTypeError::NotTransitive(edge_type.to_string()).into());
        }

        let allowed_types: HashSet<String> = match &opts.relationship_types {
            Some(types) => types.iter().cloned().collect(),
            None => self.registry.descendants_including_self(edge_type),
        };

        let mut best_at_depth: HashMap<NodeId, (u32, Vec<EdgeId>)> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back((from_node_id, Vec::<EdgeId>::new(), vec![from_node_id]));

        while let Some((current, path, visited_nodes)) = queue.pop_front() {
            let depth = path.len() as u32;
            if depth as usize >= opts.max_path_length as usize {
                continue;
            }
            for edge in self.store.find_node_dependencies(current, None) {
                if !allowed_types.contains(&edge.edge_type) {
                    continue;
                }
                if opts.detect_cycles && visited_nodes.contains(&edge.to_node_id) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(edge.id);
                let next_depth = next_path.len() as u32;

                if next_depth >= 2 {
                    let better = match best_at_depth.get(&edge.to_node_id) {
                        Some((existing_depth, _)) => next_depth < *existing_depth,
                        None => true,
                    };
                    if better {
                        best_at_depth.insert(edge.to_node_id, (next_depth, next_path.clone()));
                    }
                }

                let mut next_visited = visited_nodes.clone();
                next_visited.push(edge.to_node_id);
                queue.push_back((edge.to_node_id, next_path, next_visited));
            }
        }

        let mut results: Vec<InferredRelationship> = best_at_depth
            .into_iter()
            .map(|(to_node_id, (depth, edge_path))| InferredRelationship {
                from_node_id,
                to_node_id,
                inferred_type: edge_type.to_string(),
                path: InferencePath {
                    edge_ids: edge_path,
                    depth,
                    inference_type: InferenceKind::Transitive,
                    description: format!("transitive closure of {}", edge_type),
                },
                inferred_at: chrono::Utc::now(),
                source_file: None,
            })
            .collect();

        results.sort_by_key(|r| (r.path.depth, r.from_node_id, r.to_node_id));
        Ok(results)
    }

    // -----------------------------------------------------------
    // Inheritable
    // -----------------------------------------------------------

    pub fn query_inheritable(
        &self,
        from_node_id: NodeId,
        parent_rel_type: &str,
        inheritable_type: &str,
        opts: &InheritableOptions,
    ) -> Result<Vec<InferredRelationship>, InferenceQueryError> {
        let def = self
            .registry
            .get(inheritable_type)
            .ok_or_else(|| EdgeTypeError::UnknownType(inheritable_type.to_string()))?;
        if !def.is_inheritable {
            return Err(EdgeTypeError::NotInheritable(inheritable_type.to_string()).into());
        }
        self.registry
            .get(parent_rel_type)
            .ok_or_else(|| EdgeTypeError::UnknownType(parent_rel_type.to_string()))?;

        let mut results = Vec::new();
        let mut seen_targets = HashSet::new();
        let mut frontier = vec![(from_node_id, Vec::<EdgeId>::new())];

        for depth_level in 0..opts.max_inheritance_depth {
            let mut next_frontier = Vec::new();
            for (node, path_so_far) in &frontier {
                for parent_edge in self.store.find_node_dependencies(*node, Some(std::slice::from_ref(&parent_rel_type.to_string()))) {
                    let child = parent_edge.to_node_id;
                    for inherit_edge in
                        self.store.find_node_dependencies(child, Some(std::slice::from_ref(&inheritable_type.to_string())))
                    {
                        let target = inherit_edge.to_node_id;
                        let mut edge_path = path_so_far.clone();
                        edge_path.push(parent_edge.id);
                        edge_path.push(inherit_edge.id);

                        if seen_targets.insert(target) {
                            results.push(InferredRelationship {
                                from_node_id,
                                to_node_id: target,
                                inferred_type: inheritable_type.to_string(),
                                path: InferencePath {
                                    edge_ids: edge_path.clone(),
                                    depth: edge_path.len() as u32,
                                    inference_type: InferenceKind::Inheritable,
                                    description: format!(
                                        "{} via {} then {}",
                                        inheritable_type, parent_rel_type, inheritable_type
                                    ),
                                },
                                inferred_at: chrono::Utc::now(),
                                source_file: None,
                            });
                        }
                        // Recurse: the target now stands in `node`'s place one
                        // level up for further inheritance composition.
                        next_frontier.push((target, edge_path));
                    }
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
            let _ = depth_level;
        }

        results.sort_by_key(|r| (r.path.depth, r.to_node_id));
        Ok(results)
    }

    // -----------------------------------------------------------
    // Cache materialization
    // -----------------------------------------------------------

    /// Recompute the full inference cache: every transitive closure pair
    /// with `depth >= 2` for every transitive edge type, and every
    /// `(parent, inheritable) -> inferred` pair for every inheritable
    /// type (using `contains` as the structural parent relation, the
    /// only containment-shaped core edge type). No-ops if caching policy
    /// is `manual` and `force` is false.
    pub fn sync_cache(&self, policy: CachePolicy, force: bool) -> Result<usize, InferenceQueryError> {
        if policy == CachePolicy::Manual && !force {
            return Ok(0);
        }

        let mut entries = Vec::new();
        let all_node_ids: Vec<NodeId> = self.store.find_nodes(&NodeFilter::default()).into_iter().map(|n| n.id).collect();

        for def in self.registry.types_for_dynamic_registration() {
            if def.is_transitive {
                for &node_id in &all_node_ids {
                    let results = self.query_transitive(node_id, &def.name, &TransitiveOptions::default())?;
                    for r in results {
                        entries.push(InferenceCacheEntry {
                            start_node_id: r.from_node_id,
                            end_node_id: r.to_node_id,
                            inferred_type: r.inferred_type,
                            edge_path: r.path.edge_ids,
                            depth: r.path.depth,
                        });
                    }
                }
            }
            if def.is_inheritable {
                for &node_id in &all_node_ids {
                    let results = self.query_inheritable(
                        node_id,
                        names::CONTAINS,
                        &def.name,
                        &InheritableOptions::default(),
                    )?;
                    for r in results {
                        entries.push(InferenceCacheEntry {
                            start_node_id: r.from_node_id,
                            end_node_id: r.to_node_id,
                            inferred_type: r.inferred_type,
                            edge_path: r.path.edge_ids,
                            depth: r.path.depth,
                        });
                    }
                }
            }
        }

        let count = entries.len();
        self.store.replace_cache(entries).map_err(InferenceQueryError::Storage)?;
        Ok(count)
    }

    // -----------------------------------------------------------
    // Validation
    // -----------------------------------------------------------

    /// Registry hierarchy validity plus graph-level cycle enumeration
    /// (up to depth 50) for every transitive edge type.
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if let Err(hierarchy_errors) = self.registry.validate_hierarchy() {
            errors.extend(hierarchy_errors.into_iter().map(|e| e.to_string()));
        }

        for def in self.registry.types_for_dynamic_registration() {
            if !def.is_transitive {
                continue;
            }
            let cycles = crate::cycles::detect_cycles_for_edge_type(self.store, &def.name, 50, usize::MAX, None);
            for cycle in cycles.cycles.iter().take(5) {
                warnings.push(format!(
                    "cycle of length {} in edge type {}: {:?}",
                    cycle.nodes.len(),
                    def.name,
                    cycle.nodes
                ));
            }
            if !cycles.cycles.is_empty() {
                errors.push(format!(
                    "{} cycle(s) detected in transitive edge type {}",
                    cycles.cycles.len(),
                    def.name
                ));
            }
        }

        ValidationReport { errors, warnings }
    }
}

fn collect_descendant_depths(
    registry: &EdgeTypeRegistry,
    edge_type: &str,
    depth: u32,
    max_depth: Option<u32>,
    out: &mut HashMap<String, u32>,
) {
    if let Some(max) = max_depth {
        if depth > max {
            return;
        }
    }
    for child in registry.children_of(edge_type) {
        out.entry(child.name.clone()).or_insert(depth + 1);
        collect_descendant_depths(registry, &child.name, depth + 1, max_depth, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge_types::names;
    use std::collections::HashMap as Map;

    fn node(store: &Store, identifier: &str, node_type: NodeType) -> NodeId {
        store
            .upsert_node(GraphNode {
                id: NodeId(0),
                identifier: identifier.to_string(),
                node_type,
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

    fn edge(store: &Store, from: NodeId, to: NodeId, edge_type: &str) {
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
            .unwrap();
    }

    #[test]
    fn transitive_chain_of_depends_on_depth_two() {
        let store = Store::open_in_memory().unwrap();
        let registry = EdgeTypeRegistry::new();
        let a = node(&store, "p/1", NodeType::File);
        let b = node(&store, "p/2", NodeType::File);
        let c = node(&store, "p/3", NodeType::File);
        edge(&store, a, b, names::DEPENDS_ON);
        edge(&store, b, c, names::DEPENDS_ON);

        let ie = InferenceEngine::new(&store, &registry);
        let results = ie.query_transitive(a, names::DEPENDS_ON, &TransitiveOptions::default()).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].to_node_id, c);
        assert_eq!(results[0].path.depth, 2);
        assert_eq!(results[0].path.inference_type, InferenceKind::Transitive);
    }

    #[test]
    fn transitive_refuses_non_transitive_type() {
        let store = Store::open_in_memory().unwrap();
        let registry = EdgeTypeRegistry::new();
        let a = node(&store, "p/1", NodeType::File);
        let ie = InferenceEngine::new(&store, &registry);
        let err = ie.query_transitive(a, names::IMPORTS_FILE, &TransitiveOptions::default());
        assert!(matches!(err, Err(InferenceQueryError::EdgeType(EdgeTypeError::NotTransitive(_)))));
    }

    #[test]
    fn inheritable_composition_file_contains_class_extends_base() {
        let store = Store::open_in_memory().unwrap();
        let registry = EdgeTypeRegistry::new();
        let file = node(&store, "p/f.ts#File", NodeType::File);
        let class_c = node(&store, "p/f.ts#Class:C", NodeType::Class);
        let class_b = node(&store, "p/f.ts#Class:B", NodeType::Class);
        edge(&store, file, class_c, names::CONTAINS);
        edge(&store, class_c, class_b, names::EXTENDS);

        let ie = InferenceEngine::new(&store, &registry);
        let results = ie
            .query_inheritable(file, names::CONTAINS, names::EXTENDS, &InheritableOptions::default())
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].to_node_id, class_b);
        assert_eq!(results[0].inferred_type, names::EXTENDS);
    }

    #[test]
    fn cache_sync_only_stores_depth_two_or_more() {
        let store = Store::open_in_memory().unwrap();
        let registry = EdgeTypeRegistry::new();
        let a = node(&store, "p/1", NodeType::File);
        let b = node(&store, "p/2", NodeType::File);
        let c = node(&store, "p/3", NodeType::File);
        edge(&store, a, b, names::DEPENDS_ON);
        edge(&store, b, c, names::DEPENDS_ON);

        let ie = InferenceEngine::new(&store, &registry);
        ie.sync_cache(CachePolicy::Eager, false).unwrap();

        let entries = store.cache_entries();
        assert!(entries.iter().all(|e| e.depth >= 2));
        assert!(entries.iter().any(|e| e.start_node_id == a && e.end_node_id == c));
    }

    #[test]
    fn validate_reports_no_errors_on_builtin_registry_and_acyclic_graph() {
        let store = Store::open_in_memory().unwrap();
        let registry = EdgeTypeRegistry::new();
        let ie = InferenceEngine::new(&store, &registry);
        let report = ie.validate();
        assert!(report.errors.is_empty());
    }
}
