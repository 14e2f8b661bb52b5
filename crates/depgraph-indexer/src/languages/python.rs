//! Python extractor: walks `import`/`from ... import` statements and
//! `class` definitions, grounded on the same manual-AST-walk shape the
//! teacher uses for its (GraphNode-producing) Python extractor.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use depgraph_core::NodeType;
use tree_sitter::{Node, Point};

use crate::extractor::{Declaration, ExtractionResult, ImportKind, ImportSource, ImportedSymbol, LanguageFrontend, SourceLocation};
use crate::languages::PYTHON_BUILTINS;
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

pub struct PythonExtractor {
    pool: Arc<ParserPool>,
}

impl PythonExtractor {
    pub fn new(pool: Arc<ParserPool>) -> Self {
        Self { pool }
    }
}

impl LanguageFrontend for PythonExtractor {
    fn extract(&self, path: &Path, content: &str) -> Result<ExtractionResult> {
        let request = ParseRequest { file_type: FileType::Python, content: content.to_string(), path: path.to_path_buf() };
        let parsed = self.pool.parse_blocking(request)?;

        let mut imports = Vec::new();
        let mut declarations = Vec::new();
        walk(parsed.tree.root_node(), content.as_bytes(), &mut imports, &mut declarations);

        Ok(ExtractionResult { imports, declarations })
    }
}

fn walk(node: Node, source: &[u8], imports: &mut Vec<ImportSource>, declarations: &mut Vec<Declaration>) {
    match node.kind() {
        "import_statement" => imports.extend(extract_plain_import(node, source)),
        "import_from_statement" => {
            if let Some(import) = extract_from_import(node, source) {
                imports.push(import);
            }
        }
        "class_definition" => {
            if let Some(decl) = extract_class(node, source) {
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

/// `import a, b.c` — one `ImportSource` per dotted module.
fn extract_plain_import(node: Node, source: &[u8]) -> Vec<ImportSource> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if matches!(child.kind(), "dotted_name" | "aliased_import") {
            let name_node = if child.kind() == "aliased_import" {
                child.child_by_field_name("name").unwrap_or(child)
            } else {
                child
            };
            if let Ok(module) = name_node.utf8_text(source) {
                out.push(ImportSource {
                    kind: classify(module),
                    source: module.to_string(),
                    imports: vec![],
                    location: point_to_location(node.start_position()),
                });
            }
        }
    }
    out
}

fn extract_from_import(node: Node, source: &[u8]) -> Option<ImportSource> {
    let module_node = node.child_by_field_name("module_name")?;
    let module = module_node.utf8_text(source).ok()?.to_string();

    let kind = if module_node.kind() == "relative_import" { ImportKind::Relative } else { classify(&module) };

    let mut symbols = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "dotted_name" && child != module_node {
            if let Ok(name) = child.utf8_text(source) {
                symbols.push(ImportedSymbol { name: name.to_string(), is_default: false, is_namespace: false });
            }
        } else if child.kind() == "aliased_import" {
            if let Some(name_node) = child.child_by_field_name("name") {
                if let Ok(name) = name_node.utf8_text(source) {
                    symbols.push(ImportedSymbol { name: name.to_string(), is_default: false, is_namespace: false });
                }
            }
        } else if child.kind() == "wildcard_import" {
            symbols.push(ImportedSymbol { name: "*".to_string(), is_default: false, is_namespace: true });
        }
    }

    Some(ImportSource { kind, source: module, imports: symbols, location: point_to_location(node.start_position()) })
}

fn extract_class(node: Node, source: &[u8]) -> Option<Declaration> {
    let name_node = node.child_by_field_name("name")?;
    let name = name_node.utf8_text(source).ok()?.to_string();

    let extends = node.child_by_field_name("superclasses").and_then(|args| {
        let mut cursor = args.walk();
        args.children(&mut cursor).find(|c| c.kind() == "identifier").and_then(|n| n.utf8_text(source).ok()).map(|s| s.to_string())
    });

    Some(Declaration { node_type: NodeType::Class, name, extends, location: point_to_location(node.start_position()) })
}

fn classify(module: &str) -> ImportKind {
    if module.starts_with('.') {
        ImportKind::Relative
    } else {
        let root = module.split('.').next().unwrap_or(module);
        if PYTHON_BUILTINS.contains(&root) {
            ImportKind::Builtin
        } else {
            ImportKind::Library
        }
    }
}

fn point_to_location(point: Point) -> SourceLocation {
    SourceLocation { line: point.row as u32 + 1, column: point.column as u32 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn extracts_plain_and_from_imports() {
        let extractor = PythonExtractor::new(Arc::new(crate::parser_pool::create_parser_pool()));
        let content = "import os\nfrom typing import List\n";
        let result = extractor.extract(&PathBuf::from("app.py"), content).unwrap();

        assert_eq!(result.imports.len(), 2);
        assert_eq!(result.imports[0].source, "os");
        assert_eq!(result.imports[0].kind, ImportKind::Builtin);
        assert_eq!(result.imports[1].source, "typing");
        assert!(result.imports[1].imports.iter().any(|s| s.name == "List"));
    }

    #[test]
    fn extracts_class_with_single_base() {
        let extractor = PythonExtractor::new(Arc::new(crate::parser_pool::create_parser_pool()));
        let content = "class Animal:\n    pass\n\nclass Dog(Animal):\n    pass\n";
        let result = extractor.extract(&PathBuf::from("models.py"), content).unwrap();

        let dog = result.declarations.iter().find(|d| d.name == "Dog").unwrap();
        assert_eq!(dog.extends.as_deref(), Some("Animal"));
    }
}
