//! Rust extractor: walks `use` declarations and `struct`/`enum`/`trait`
//! items. Rust has no single-inheritance `extends`, so declarations
//! never carry a base name — `contains` edges are still worth having.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use depgraph_core::NodeType;
use tree_sitter::{Node, Point};

use crate::extractor::{Declaration, ExtractionResult, ImportKind, ImportSource, LanguageFrontend, SourceLocation};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

const STD_CRATES: &[&str] = &["std", "core", "alloc", "proc_macro", "test"];

pub struct RustExtractor {
    pool: Arc<ParserPool>,
}

impl RustExtractor {
    pub fn new(pool: Arc<ParserPool>) -> Self {
        Self { pool }
    }
}

impl LanguageFrontend for RustExtractor {
    fn extract(&self, path: &Path, content: &str) -> Result<ExtractionResult> {
        let request = ParseRequest { file_type: FileType::Rust, content: content.to_string(), path: path.to_path_buf() };
        let parsed = self.pool.parse_blocking(request)?;

        let mut imports = Vec::new();
        let mut declarations = Vec::new();
        walk(parsed.tree.root_node(), content.as_bytes(), path, &mut imports, &mut declarations);

        Ok(ExtractionResult { imports, declarations })
    }
}

fn walk(node: Node, source: &[u8], path: &Path, imports: &mut Vec<ImportSource>, declarations: &mut Vec<Declaration>) {
    match node.kind() {
        "use_declaration" => {
            if let Some(import) = extract_use(node, source, path) {
                imports.push(import);
            }
        }
        "struct_item" | "enum_item" | "trait_item" => {
            if let Some(decl) = extract_item(node, source) {
                declarations.push(decl);
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, path, imports, declarations);
    }
}

fn extract_use(node: Node, source: &[u8], path: &Path) -> Option<ImportSource> {
    let clause = node.named_child(0)?;
    let path_text = clause.utf8_text(source).ok()?;
    let root_segment = path_text.split("::").next().unwrap_or(path_text);

    let kind = match root_segment {
        "crate" | "self" | "super" => ImportKind::Relative,
        s if STD_CRATES.contains(&s) => ImportKind::Builtin,
        _ => ImportKind::Library,
    };

    let source = if kind == ImportKind::Relative {
        translate_path(path_text, path).unwrap_or_else(|| path_text.to_string())
    } else {
        path_text.to_string()
    };

    Some(ImportSource { kind, source, imports: vec![], location: point_to_location(node.start_position()) })
}

/// Translates a `::`-separated `crate`/`self`/`super`-rooted path (e.g.
/// `crate::model::NodeId`) into a `/`-joined path relative to the
/// importing file's own directory, the form the Path Resolver expects.
fn translate_path(path_text: &str, file_path: &Path) -> Option<String> {
    let mut segments: Vec<&str> = path_text.split("::").collect();
    if segments.is_empty() {
        return None;
    }
    let root = segments.remove(0);
    if !segments.is_empty() {
        segments.pop(); // drop the trailing imported symbol name
    }

    let rel = match root {
        "self" => segments.join("/"),
        "super" => {
            let mut parts = vec!["..".to_string()];
            parts.extend(segments.iter().map(|s| s.to_string()));
            parts.join("/")
        }
        "crate" => {
            let depth = crate_depth(file_path);
            let mut parts: Vec<String> = std::iter::repeat("..".to_string()).take(depth).collect();
            parts.extend(segments.iter().map(|s| s.to_string()));
            parts.join("/")
        }
        _ => return None,
    };

    if rel.is_empty() {
        None
    } else {
        Some(rel)
    }
}

/// Number of directories between `file_path` and its nearest `src/`
/// ancestor, used to compute how many `..` steps a `crate::`-rooted
/// import needs to reach the crate root from the importing file's dir.
fn crate_depth(file_path: &Path) -> usize {
    let components: Vec<&std::ffi::OsStr> = file_path.parent().map(|p| p.iter().collect()).unwrap_or_default();
    match components.iter().position(|c| *c == "src") {
        Some(pos) => components.len() - pos - 1,
        None => 0,
    }
}

fn extract_item(node: Node, source: &[u8]) -> Option<Declaration> {
    let name_node = node.child_by_field_name("name")?;
    let name = name_node.utf8_text(source).ok()?.to_string();
    let node_type = match node.kind() {
        "enum_item" => NodeType::Enum,
        "trait_item" => NodeType::Interface,
        _ => NodeType::Struct,
    };
    Some(Declaration { node_type, name, extends: None, location: point_to_location(node.start_position()) })
}

fn point_to_location(point: Point) -> SourceLocation {
    SourceLocation { line: point.row as u32 + 1, column: point.column as u32 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn classifies_std_crate_and_external_crate_uses() {
        let extractor = RustExtractor::new(Arc::new(crate::parser_pool::create_parser_pool()));
        let content = "use std::collections::HashMap;\nuse serde::Serialize;\nuse crate::model::NodeId;\n";
        let result = extractor.extract(&PathBuf::from("src/lib.rs"), content).unwrap();

        assert_eq!(result.imports.len(), 3);
        assert_eq!(result.imports[0].kind, ImportKind::Builtin);
        assert_eq!(result.imports[1].kind, ImportKind::Library);
        assert_eq!(result.imports[2].kind, ImportKind::Relative);
    }

    #[test]
    fn extracts_struct_and_trait_declarations() {
        let extractor = RustExtractor::new(Arc::new(crate::parser_pool::create_parser_pool()));
        let content = "struct Foo { x: i32 }\ntrait Bar {}\n";
        let result = extractor.extract(&PathBuf::from("src/lib.rs"), content).unwrap();

        assert!(result.declarations.iter().any(|d| d.name == "Foo" && d.node_type == NodeType::Struct));
        assert!(result.declarations.iter().any(|d| d.name == "Bar" && d.node_type == NodeType::Interface));
    }
}
