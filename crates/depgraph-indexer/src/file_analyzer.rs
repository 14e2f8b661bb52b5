//! File-Dependency Analyzer (§4.5): turns a file's `ImportSource` stream
//! into graph nodes/edges, plus declaration records into `contains`/
//! `extends` edges (§4.9 AMBIENT).

use std::collections::HashMap;

use depgraph_core::{
    edge_type_names as names, identifier, AnalysisError, EdgeId, GraphEdge, GraphNode, Language, MissingLink,
    MissingLinkDiagnostic, MissingLinkReason, NodeId, NodeType, Store, StoreTransaction,
};

use crate::extractor::{Declaration, ImportKind, ImportSource};
use crate::path_resolver;

/// Injected so FDA stays testable without a real filesystem (§4.4: PR
/// never touches disk, FDA is the layer that does).
pub trait FileExists: Send + Sync {
    fn exists(&self, path: &str) -> bool;
}

pub struct DiskFileExists;

impl FileExists for DiskFileExists {
    fn exists(&self, path: &str) -> bool {
        std::path::Path::new(path).is_file()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisStats {
    pub created_nodes: usize,
    pub created_relationships: usize,
    pub missing_links: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisOutput {
    pub created_nodes: Vec<NodeId>,
    pub created_relationships: Vec<EdgeId>,
    pub missing_links: Vec<MissingLink>,
    pub stats: AnalysisStats,
}

impl AnalysisOutput {
    pub fn merge(&mut self, other: AnalysisOutput) {
        self.created_nodes.extend(other.created_nodes);
        self.created_relationships.extend(other.created_relationships);
        self.missing_links.extend(other.missing_links);
        self.stats.created_nodes += other.stats.created_nodes;
        self.stats.created_relationships += other.stats.created_relationships;
        self.stats.missing_links += other.stats.missing_links;
    }
}

pub struct FileDependencyAnalyzer<'a> {
    store: &'a Store,
    file_exists: &'a dyn FileExists,
}

impl<'a> FileDependencyAnalyzer<'a> {
    pub fn new(store: &'a Store, file_exists: &'a dyn FileExists) -> Self {
        FileDependencyAnalyzer { store, file_exists }
    }

    /// Step 1–4 of §4.5, restricted to the `ImportSource` stream, run as
    /// one SQLite transaction so a mid-loop failure leaves the store in
    /// its pre-call state rather than a half-reanalyzed one.
    /// Idempotent: re-running on the same `(file_path, imports)` yields
    /// the same node ids and a functionally identical edge set.
    pub fn analyze(
        &self,
        file_path: &str,
        language: Language,
        project_name: &str,
        imports: &[ImportSource],
    ) -> Result<AnalysisOutput, AnalysisError> {
        self.store.transaction(|tx| {
            let file_identifier = identifier::create(NodeType::File, file_path, project_name, Some(file_path));
            let file_id = tx.upsert_node(GraphNode {
                id: NodeId(0),
                identifier: file_identifier,
                node_type: NodeType::File,
                name: base_name(file_path),
                source_file: Some(file_path.to_string()),
                language: Some(language),
                metadata: HashMap::new(),
                start_line: None,
                start_column: None,
                end_line: None,
                end_column: None,
            })?;

            tx.delete_relationships_by_source_file(file_path)?;

            let mut output = AnalysisOutput::default();
            output.created_nodes.push(file_id);
            output.stats.created_nodes += 1;

            for import in imports {
                match import.kind {
                    ImportKind::Library | ImportKind::Builtin => {
                        let lib_identifier = identifier::create(NodeType::Library, &import.source, project_name, None);
                        let lib_id = tx.upsert_node(GraphNode {
                            id: NodeId(0),
                            identifier: lib_identifier,
                            node_type: NodeType::Library,
                            name: import.source.clone(),
                            source_file: None,
                            language: None,
                            metadata: HashMap::new(),
                            start_line: None,
                            start_column: None,
                            end_line: None,
                            end_column: None,
                        })?;
                        let weight = library_weight(import);
                        let edge_id = tx.upsert_relationship(GraphEdge {
                            id: EdgeId(0),
                            from_node_id: file_id,
                            to_node_id: lib_id,
                            edge_type: names::IMPORTS_LIBRARY.to_string(),
                            label: Some(import.source.clone()),
                            metadata: HashMap::new(),
                            weight,
                            source_file: Some(file_path.to_string()),
                        })?;
                        output.created_nodes.push(lib_id);
                        output.created_relationships.push(edge_id);
                        output.stats.created_nodes += 1;
                        output.stats.created_relationships += 1;
                    }
                    ImportKind::Relative | ImportKind::Absolute => {
                        let attempted = path_resolver::candidates(file_path, &import.source, language);
                        let resolved = attempted.iter().find(|p| self.file_exists.exists(p)).cloned();

                        match resolved {
                            Some(target_path) => {
                                let target_identifier =
                                    identifier::create(NodeType::File, &target_path, project_name, Some(&target_path));
                                let target_id = tx.upsert_node(GraphNode {
                                    id: NodeId(0),
                                    identifier: target_identifier,
                                    node_type: NodeType::File,
                                    name: base_name(&target_path),
                                    source_file: Some(target_path.clone()),
                                    language: Some(Language::from_extension(
                                        std::path::Path::new(&target_path)
                                            .extension()
                                            .and_then(|e| e.to_str())
                                            .unwrap_or(""),
                                    )),
                                    metadata: HashMap::new(),
                                    start_line: None,
                                    start_column: None,
                                    end_line: None,
                                    end_column: None,
                                })?;
                                let weight = imports_file_weight(import);
                                let edge_id = tx.upsert_relationship(GraphEdge {
                                    id: EdgeId(0),
                                    from_node_id: file_id,
                                    to_node_id: target_id,
                                    edge_type: names::IMPORTS_FILE.to_string(),
                                    label: Some(import.source.clone()),
                                    metadata: HashMap::new(),
                                    weight,
                                    source_file: Some(file_path.to_string()),
                                })?;
                                output.created_nodes.push(target_id);
                                output.created_relationships.push(edge_id);
                                output.stats.created_nodes += 1;
                                output.stats.created_relationships += 1;
                            }
                            None => {
                                output.missing_links.push(MissingLink {
                                    from_node: file_id,
                                    import_specifier: import.source.clone(),
                                    reason: MissingLinkReason::FileNotFound,
                                    diagnostic: MissingLinkDiagnostic {
                                        attempted_paths: attempted,
                                        suggested_extensions: language
                                            .preferred_extensions()
                                            .iter()
                                            .map(|s| s.to_string())
                                            .collect(),
                                    },
                                });
                                output.stats.missing_links += 1;
                            }
                        }
                    }
                }
            }

            Ok(output)
        })
        .map_err(AnalysisError::from)
    }

    /// Declarations pass (§4.9 AMBIENT): upserts a node per declaration
    /// with a `contains` edge from the file, and an `extends` edge to
    /// either a same-file sibling or a freshly-created `unknown`
    /// placeholder (left for the Unknown Resolver to bind later).
    pub fn analyze_declarations(
        &self,
        file_id: NodeId,
        file_path: &str,
        project_name: &str,
        declarations: &[Declaration],
    ) -> Result<AnalysisOutput, AnalysisError> {
        self.store
            .transaction(|tx| {
                let mut output = AnalysisOutput::default();
                let mut by_name: HashMap<&str, NodeId> = HashMap::new();

                for decl in declarations {
                    let identifier = identifier::create(decl.node_type, &decl.name, project_name, Some(file_path));
                    let node_id = tx.upsert_node(GraphNode {
                        id: NodeId(0),
                        identifier,
                        node_type: decl.node_type,
                        name: decl.name.clone(),
                        source_file: Some(file_path.to_string()),
                        language: None,
                        metadata: HashMap::new(),
                        start_line: Some(decl.location.line),
                        start_column: Some(decl.location.column),
                        end_line: None,
                        end_column: None,
                    })?;
                    by_name.insert(decl.name.as_str(), node_id);

                    let contains_edge = tx.upsert_relationship(GraphEdge {
                        id: EdgeId(0),
                        from_node_id: file_id,
                        to_node_id: node_id,
                        edge_type: names::CONTAINS.to_string(),
                        label: None,
                        metadata: HashMap::new(),
                        weight: 1.0,
                        source_file: Some(file_path.to_string()),
                    })?;
                    output.created_nodes.push(node_id);
                    output.created_relationships.push(contains_edge);
                    output.stats.created_nodes += 1;
                    output.stats.created_relationships += 1;
                }

                for decl in declarations {
                    let Some(base_name) = &decl.extends else { continue };
                    let from_id = by_name[decl.name.as_str()];
                    let to_id = match by_name.get(base_name.as_str()) {
                        Some(&id) => id,
                        None => {
                            let unknown_identifier =
                                identifier::create(NodeType::Unknown, base_name, project_name, Some(file_path));
                            tx.upsert_node(GraphNode {
                                id: NodeId(0),
                                identifier: unknown_identifier,
                                node_type: NodeType::Unknown,
                                name: base_name.clone(),
                                source_file: Some(file_path.to_string()),
                                language: None,
                                metadata: HashMap::new(),
                                start_line: None,
                                start_column: None,
                                end_line: None,
                                end_column: None,
                            })?
                        }
                    };
                    let extends_edge = tx.upsert_relationship(GraphEdge {
                        id: EdgeId(0),
                        from_node_id: from_id,
                        to_node_id: to_id,
                        edge_type: names::EXTENDS.to_string(),
                        label: None,
                        metadata: HashMap::new(),
                        weight: 1.0,
                        source_file: Some(file_path.to_string()),
                    })?;
                    output.created_relationships.push(extends_edge);
                    output.stats.created_relationships += 1;
                }

                Ok(output)
            })
            .map_err(AnalysisError::from)
    }
}

fn base_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// `imports_file` always outranks both library weights (§4.5 step 4);
/// ties within a category break on import-symbol count.
fn imports_file_weight(import: &ImportSource) -> f64 {
    100.0 + import.imports.len() as f64
}

fn library_weight(import: &ImportSource) -> f64 {
    match import.kind {
        ImportKind::Library => 50.0 + import.imports.len() as f64,
        _ => 10.0 + import.imports.len() as f64,
    }
}
