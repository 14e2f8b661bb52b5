//! Orchestrates a full-repository index: walks the project tree,
//! dispatches each file to its language front-end in parallel, and
//! feeds the results through the File-Dependency Analyzer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use depgraph_core::{project_name, Language, Store, SymbolTable};
use ignore::WalkBuilder;
use rayon::prelude::*;

use crate::file_analyzer::{DiskFileExists, FileDependencyAnalyzer};
use crate::languages::frontend_for;
use crate::parser_pool::{create_parser_pool, ParserPool};

/// Per-file outcome, aggregated by `Coordinator::run_full_index`.
pub struct FileIndexReport {
    pub file_path: String,
    pub created_nodes: usize,
    pub created_relationships: usize,
    pub missing_links: usize,
}

pub struct IndexReport {
    pub files: Vec<FileIndexReport>,
    pub skipped: Vec<(String, String)>,
    /// Declaration-name -> file index built while indexing, handed back
    /// so callers can wire it into `UnknownResolver` without a second pass.
    pub symbols: SymbolTable,
}

pub struct Coordinator {
    pool: Arc<ParserPool>,
}

impl Coordinator {
    pub fn new() -> Self {
        Coordinator { pool: Arc::new(create_parser_pool()) }
    }

    /// Walk `root` (honoring `.gitignore`), extract every recognized
    /// source file in parallel, then serialize the per-file analysis
    /// into `store` (the Store's writer side is already single-threaded
    /// via its internal `Mutex<Connection>`, so the parallelism here is
    /// confined to parsing/extraction, not the upsert itself).
    pub fn run_full_index(&self, root: &Path, store: &Store) -> Result<IndexReport> {
        let project = project_name(root);
        let symbols = SymbolTable::new();

        let files: Vec<PathBuf> = WalkBuilder::new(root)
            .hidden(false)
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map_or(false, |ft| ft.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| language_of(path).is_some())
            .collect();

        let extracted: Vec<(PathBuf, Language, Result<crate::extractor::ExtractionResult>)> = files
            .into_par_iter()
            .map(|path| {
                let language = language_of(&path).expect("filtered above");
                let content = std::fs::read_to_string(&path);
                let result = match content {
                    Ok(content) => frontend_for(language, Arc::clone(&self.pool)).extract(&path, &content),
                    Err(e) => Err(anyhow::anyhow!("could not read {}: {}", path.display(), e)),
                };
                (path, language, result)
            })
            .collect();

        let file_exists = DiskFileExists;
        let fda = FileDependencyAnalyzer::new(store, &file_exists);

        let mut indexed = Vec::new();
        let mut skipped = Vec::new();

        for (path, language, extraction) in extracted {
            let rel_path = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().replace('\\', "/");
            let extraction = match extraction {
                Ok(extraction) => extraction,
                Err(e) => {
                    skipped.push((rel_path, e.to_string()));
                    continue;
                }
            };

            let mut analysis = match fda.analyze(&rel_path, language, &project, &extraction.imports) {
                Ok(analysis) => analysis,
                Err(e) => {
                    skipped.push((rel_path, e.to_string()));
                    continue;
                }
            };

            if !extraction.declarations.is_empty() {
                let file_id = depgraph_core::NodeId::from_identifier(&depgraph_core::identifier::create(
                    depgraph_core::NodeType::File,
                    &rel_path,
                    &project,
                    Some(&rel_path),
                ));
                match fda.analyze_declarations(file_id, &rel_path, &project, &extraction.declarations) {
                    Ok(decl_output) => {
                        for (decl, node_id) in extraction.declarations.iter().zip(decl_output.created_nodes.iter()) {
                            symbols.insert(decl.name.clone(), *node_id, rel_path.clone());
                        }
                        analysis.merge(decl_output);
                    }
                    Err(e) => {
                        skipped.push((rel_path, e.to_string()));
                        continue;
                    }
                }
            }

            indexed.push(FileIndexReport {
                file_path: rel_path,
                created_nodes: analysis.stats.created_nodes,
                created_relationships: analysis.stats.created_relationships,
                missing_links: analysis.stats.missing_links,
            });
        }

        Ok(IndexReport { files: indexed, skipped, symbols })
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

fn language_of(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?;
    let language = Language::from_extension(ext);
    if matches!(language, Language::Other) {
        None
    } else {
        Some(language)
    }
}
