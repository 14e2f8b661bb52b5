//! Parser contract (§6 "Parser contract (inbound)"): the wire shape every
//! language front-end produces, consumed by the File-Dependency Analyzer.

use std::path::Path;

use depgraph_core::NodeType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Relative,
    Absolute,
    Library,
    Builtin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedSymbol {
    pub name: String,
    pub is_default: bool,
    pub is_namespace: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSource {
    pub kind: ImportKind,
    pub source: String,
    pub imports: Vec<ImportedSymbol>,
    pub location: SourceLocation,
}

/// A declaration found in a file — not part of the spec's `ImportSource`
/// wire shape, but the minimum the contains/extends testable scenario
/// (§8 scenario 4) needs some producer of.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub node_type: NodeType,
    pub name: String,
    /// Name of the base class/interface this declaration extends, if
    /// any syntactically present (not yet resolved to a node).
    pub extends: Option<String>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    pub imports: Vec<ImportSource>,
    pub declarations: Vec<Declaration>,
}

pub trait LanguageFrontend: Send + Sync {
    fn extract(&self, path: &Path, content: &str) -> anyhow::Result<ExtractionResult>;
}
