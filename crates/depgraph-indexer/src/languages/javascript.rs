//! JavaScript extractor: same shape as the TypeScript one, minus
//! interfaces and type-only constructs.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use depgraph_core::NodeType;
use tree_sitter::{Node, Point};

use crate::extractor::{Declaration, ExtractionResult, ImportKind, ImportSource, ImportedSymbol, LanguageFrontend, SourceLocation};
use crate::languages::NODE_BUILTINS;
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

pub struct JavaScriptExtractor {
    pool: Arc<ParserPool>,
}

impl JavaScriptExtractor {
    pub fn new(pool: Arc<ParserPool>) -> Self {
        Self { pool }
    }
}

impl LanguageFrontend for JavaScriptExtractor {
    fn extract(&self, path: &Path, content: &str) -> Result<ExtractionResult> {
        let request =
            ParseRequest { file_type: FileType::JavaScript, content: content.to_string(), path: path.to_path_buf() };
        let parsed = self.pool.parse_blocking(request)?;

        let mut imports = Vec::new();
        let mut declarations = Vec::new();
        walk(parsed.tree.root_node(), content.as_bytes(), &mut imports, &mut declarations);

        Ok(ExtractionResult { imports, declarations })
    }
}

fn walk(node: Node, source: &[u8], imports: &mut Vec<ImportSource>, declarations: &mut Vec<Declaration>) {
    match node.kind() {
        "import_statement" => {
            if let Some(import) = extract_import(node, source) {
                imports.push(import);
            }
        }
        "call_expression" => {
            if let Some(import) = extract_require(node, source) {
                imports.push(import);
            }
        }
        "class_declaration" => {
            if let Some(decl) = extract_declaration(node, source) {
                declarations.push(decl);
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, imports, declarations);
    }
}

fn extract_import(node: Node, source: &[u8]) -> Option<ImportSource> {
    let source_node = find_descendant(node, "string")?;
    let raw = source_node.utf8_text(source).ok()?;
    let specifier = raw.trim_matches(|c| c == '"' || c == '\'').to_string();

    let kind = classify(&specifier);
    let symbols = extract_imported_symbols(node, source);
    Some(ImportSource { kind, source: specifier, imports: symbols, location: point_to_location(node.start_position()) })
}

/// CommonJS `require("mod")` calls, treated the same as ES imports with
/// no destructured symbols recorded (the destructuring is on the
/// assignment side, out of scope here).
fn extract_require(node: Node, source: &[u8]) -> Option<ImportSource> {
    let callee = node.child_by_field_name("function")?;
    if callee.utf8_text(source).ok()? != "require" {
        return None;
    }
    let args = node.child_by_field_name("arguments")?;
    let source_node = find_descendant(args, "string")?;
    let raw = source_node.utf8_text(source).ok()?;
    let specifier = raw.trim_matches(|c| c == '"' || c == '\'').to_string();
    let kind = classify(&specifier);
    Some(ImportSource { kind, source: specifier, imports: vec![], location: point_to_location(node.start_position()) })
}

fn extract_imported_symbols(node: Node, source: &[u8]) -> Vec<ImportedSymbol> {
    let mut symbols = Vec::new();
    let Some(clause) = find_descendant(node, "import_clause") else { return symbols };

    let mut cursor = clause.walk();
    for child in clause.children(&mut cursor) {
        match child.kind() {
            "identifier" => {
                if let Ok(name) = child.utf8_text(source) {
                    symbols.push(ImportedSymbol { name: name.to_string(), is_default: true, is_namespace: false });
                }
            }
            "namespace_import" => {
                if let Some(name_node) = find_descendant(child, "identifier") {
                    if let Ok(name) = name_node.utf8_text(source) {
                        symbols.push(ImportedSymbol { name: name.to_string(), is_default: false, is_namespace: true });
                    }
                }
            }
            "named_imports" => {
                let mut spec_cursor = child.walk();
                for spec in child.children(&mut spec_cursor) {
                    if spec.kind() == "import_specifier" {
                        if let Some(name_node) = find_descendant(spec, "identifier") {
                            if let Ok(name) = name_node.utf8_text(source) {
                                symbols.push(ImportedSymbol {
                                    name: name.to_string(),
                                    is_default: false,
                                    is_namespace: false,
                                });
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    symbols
}

fn extract_declaration(node: Node, source: &[u8]) -> Option<Declaration> {
    let name_node = node.child_by_field_name("name")?;
    let name = name_node.utf8_text(source).ok()?.to_string();
    let extends = find_descendant(node, "class_heritage")
        .and_then(|heritage| find_descendant(heritage, "identifier"))
        .and_then(|n| n.utf8_text(source).ok())
        .map(|s| s.to_string());

    Some(Declaration { node_type: NodeType::Class, name, extends, location: point_to_location(node.start_position()) })
}

fn classify(specifier: &str) -> ImportKind {
    if specifier.starts_with('.') {
        ImportKind::Relative
    } else if specifier.starts_with('/') {
        ImportKind::Absolute
    } else if NODE_BUILTINS.contains(&specifier) {
        ImportKind::Builtin
    } else {
        ImportKind::Library
    }
}

fn find_descendant<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    if node.kind() == kind {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = find_descendant(child, kind) {
            return Some(found);
        }
    }
    None
}

fn point_to_location(point: Point) -> SourceLocation {
    SourceLocation { line: point.row as u32 + 1, column: point.column as u32 }
}
