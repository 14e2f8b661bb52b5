//! TypeScript extractor: walks the tree-sitter AST for `import`
//! statements and `class`/`interface` declarations.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use depgraph_core::NodeType;
use tree_sitter::{Node, Point};

use crate::extractor::{Declaration, ExtractionResult, ImportKind, ImportSource, ImportedSymbol, LanguageFrontend, SourceLocation};
use crate::languages::NODE_BUILTINS;
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

pub struct TypeScriptExtractor {
    pool: Arc<ParserPool>,
}

impl TypeScriptExtractor {
    pub fn new(pool: Arc<ParserPool>) -> Self {
        Self { pool }
    }
}

impl LanguageFrontend for TypeScriptExtractor {
    fn extract(&self, path: &Path, content: &str) -> Result<ExtractionResult> {
        let request =
            ParseRequest { file_type: FileType::TypeScript, content: content.to_string(), path: path.to_path_buf() };
        let parsed = self.pool.parse_blocking(request)?;

        let mut imports = Vec::new();
        let mut declarations = Vec::new();
        walk(parsed.tree.root_node(), content.as_bytes(), &mut imports, &mut declarations);

        Ok(ExtractionResult { imports, declarations })
    }
}

fn walk(node: Node, source: &[u8], imports: &mut Vec<ImportSource>, declarations: &mut Vec<Declaration>) {
    match node.kind() {
        "import_statement" | "export_statement" => {
            if let Some(import) = extract_import(node, source) {
                imports.push(import);
            }
        }
        "class_declaration" | "interface_declaration" => {
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
    let location = point_to_location(node.start_position());

    Some(ImportSource { kind, source: specifier, imports: symbols, location })
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

    let node_type = if node.kind() == "interface_declaration" { NodeType::Interface } else { NodeType::Class };

    let extends = find_descendant(node, "class_heritage")
        .or_else(|| find_descendant(node, "extends_clause"))
        .and_then(|heritage| find_descendant(heritage, "type_identifier").or_else(|| find_descendant(heritage, "identifier")))
        .and_then(|n| n.utf8_text(source).ok())
        .map(|s| s.to_string());

    Some(Declaration { node_type, name, extends, location: point_to_location(node.start_position()) })
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn extracts_default_and_named_imports_with_kind() {
        let extractor = TypeScriptExtractor::new(Arc::new(crate::parser_pool::create_parser_pool()));
        let content = "import React, { useState } from 'react';\nimport './styles.css';\n";
        let result = extractor.extract(&PathBuf::from("src/App.tsx"), content).unwrap();

        assert_eq!(result.imports.len(), 2);
        assert_eq!(result.imports[0].source, "react");
        assert_eq!(result.imports[0].kind, ImportKind::Library);
        assert!(result.imports[0].imports.iter().any(|s| s.is_default));
        assert!(result.imports[0].imports.iter().any(|s| s.name == "useState"));

        assert_eq!(result.imports[1].source, "./styles.css");
        assert_eq!(result.imports[1].kind, ImportKind::Relative);
    }

    #[test]
    fn extracts_class_with_extends_clause() {
        let extractor = TypeScriptExtractor::new(Arc::new(crate::parser_pool::create_parser_pool()));
        let content = "class Base {}\nclass Derived extends Base {}\n";
        let result = extractor.extract(&PathBuf::from("src/shapes.ts"), content).unwrap();

        let derived = result.declarations.iter().find(|d| d.name == "Derived").unwrap();
        assert_eq!(derived.extends.as_deref(), Some("Base"));
    }
}
