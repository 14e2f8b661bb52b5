//! Core data structures for the code dependency graph

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Surrogate identifier for a node. Deterministic: the hash of the node's
/// canonical `identifier` string, so two upserts of the same identifier
/// always produce the same id without a round-trip lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn from_identifier(identifier: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        identifier.hash(&mut hasher);
        NodeId(hasher.finish())
    }
}

/// Surrogate identifier for an edge. Deterministic: the hash of
/// `(from, to, type, label)`, matching invariant 1's sibling requirement
/// for edges — re-upserting the same tuple must land on the same edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord)]
pub struct EdgeId(pub u64);

impl EdgeId {
    pub fn from_parts(from: NodeId, to: NodeId, edge_type: &str, label: Option<&str>) -> Self {
        let mut hasher = DefaultHasher::new();
        from.hash(&mut hasher);
        to.hash(&mut hasher);
        edge_type.hash(&mut hasher);
        label.hash(&mut hasher);
        EdgeId(hasher.finish())
    }
}

/// Discriminates what kind of program entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Directory,
    File,
    Module,
    Class,
    Struct,
    Enum,
    Interface,
    Function,
    Method,
    Constant,
    Variable,
    TypeAlias,
    Symbol,
    HeadingBlock,
    Library,
    Package,
    WorkspaceRoot,
    Unknown,
}

impl NodeType {
    /// UpperCamel form used in the canonical identifier grammar's
    /// `#<CapitalizedNodeType>:<symbol>` suffix (`class` -> `Class`).
    pub fn as_capitalized(&self) -> &'static str {
        match self {
            NodeType::Directory => "Directory",
            NodeType::File => "File",
            NodeType::Module => "Module",
            NodeType::Class => "Class",
            NodeType::Struct => "Struct",
            NodeType::Enum => "Enum",
            NodeType::Interface => "Interface",
            NodeType::Function => "Function",
            NodeType::Method => "Method",
            NodeType::Constant => "Constant",
            NodeType::Variable => "Variable",
            NodeType::TypeAlias => "TypeAlias",
            NodeType::Symbol => "Symbol",
            NodeType::HeadingBlock => "HeadingBlock",
            NodeType::Library => "Library",
            NodeType::Package => "Package",
            NodeType::WorkspaceRoot => "WorkspaceRoot",
            NodeType::Unknown => "Unknown",
        }
    }

    pub fn from_capitalized(s: &str) -> Option<Self> {
        Some(match s {
            "Directory" => NodeType::Directory,
            "File" => NodeType::File,
            "Module" => NodeType::Module,
            "Class" => NodeType::Class,
            "Struct" => NodeType::Struct,
            "Enum" => NodeType::Enum,
            "Interface" => NodeType::Interface,
            "Function" => NodeType::Function,
            "Method" => NodeType::Method,
            "Constant" => NodeType::Constant,
            "Variable" => NodeType::Variable,
            "TypeAlias" => NodeType::TypeAlias,
            "Symbol" => NodeType::Symbol,
            "HeadingBlock" => NodeType::HeadingBlock,
            "Library" => NodeType::Library,
            "Package" => NodeType::Package,
            "WorkspaceRoot" => NodeType::WorkspaceRoot,
            "Unknown" => NodeType::Unknown,
            _ => return None,
        })
    }

    /// File/directory-like node types omit the `#...` suffix in their
    /// identifier (§3 canonical identifier grammar).
    pub fn is_pathlike(&self) -> bool {
        matches!(self, NodeType::Directory | NodeType::File | NodeType::WorkspaceRoot)
    }

    /// Library/package nodes use the no-project-prefix `library#name` /
    /// `package#name` form.
    pub fn is_unprefixed(&self) -> bool {
        matches!(self, NodeType::Library | NodeType::Package)
    }

    /// UR's priority list for candidate resolution of `unknown` nodes
    /// (§4.7 step 2), highest priority first.
    pub const UR_PRIORITY: &'static [NodeType] = &[
        NodeType::Class,
        NodeType::Function,
        NodeType::Interface,
        NodeType::TypeAlias,
        NodeType::Method,
        NodeType::Variable,
        NodeType::Constant,
        NodeType::Symbol,
    ];
}

/// Supported languages for syntax-aware parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Rust,
    TypeScript,
    JavaScript,
    Python,
    Go,
    Java,
    C,
    Cpp,
    Markdown,
    Other,
}

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "rs" => Language::Rust,
            "ts" | "tsx" | "d.ts" => Language::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "py" | "pyi" => Language::Python,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" => Language::Cpp,
            "md" | "mdx" => Language::Markdown,
            _ => Language::Other,
        }
    }

    /// Extensions tried by the Path Resolver (§4.4), in the order seeded
    /// by the importing file's own language.
    pub fn preferred_extensions(&self) -> &'static [&'static str] {
        match self {
            Language::TypeScript => &["tsx", "ts", "jsx", "js", "d.ts"],
            Language::JavaScript => &["jsx", "js", "tsx", "ts"],
            Language::Python => &["py"],
            Language::Java => &["java"],
            Language::Go => &["go"],
            Language::Rust => &["rs"],
            _ => &["tsx", "ts", "jsx", "js", "d.ts", "py", "java", "go", "md"],
        }
    }
}

/// A single node in the code graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,
    /// Canonical RDF-style identifier; immutable once assigned (§3 invariant 1).
    pub identifier: String,
    pub node_type: NodeType,
    pub name: String,
    pub source_file: Option<String>,
    pub language: Option<Language>,
    pub metadata: HashMap<String, String>,
    pub start_line: Option<u32>,
    pub start_column: Option<u32>,
    pub end_line: Option<u32>,
    pub end_column: Option<u32>,
}

/// A directed edge in the code graph. `edge_type` is a name resolved
/// against the Edge-Type Registry rather than a closed Rust enum, because
/// the registry accepts dynamically-registered extended types (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    pub edge_type: String,
    pub label: Option<String>,
    pub metadata: HashMap<String, String>,
    pub weight: f64,
    pub source_file: Option<String>,
}

/// A row in the materialized inference cache (§3, invariant 4: only
/// `depth >= 2` entries live here — direct edges are never duplicated
/// into the cache).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceCacheEntry {
    pub start_node_id: NodeId,
    pub end_node_id: NodeId,
    pub inferred_type: String,
    pub edge_path: Vec<EdgeId>,
    pub depth: u32,
}

/// Diagnostic detail attached to a `MissingLink`: every path the Path
/// Resolver attempted, and which extensions were considered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MissingLinkDiagnostic {
    pub attempted_paths: Vec<String>,
    pub suggested_extensions: Vec<String>,
}

/// A would-be edge whose target could not be located on disk. Never
/// persisted as an edge (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissingLink {
    pub from_node: NodeId,
    pub import_specifier: String,
    pub reason: MissingLinkReason,
    pub diagnostic: MissingLinkDiagnostic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingLinkReason {
    FileNotFound,
}

/// Filter surface for `find_nodes` / `find_relationships` (§6).
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub node_types: Vec<NodeType>,
    pub source_files: Vec<String>,
    pub languages: Vec<Language>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct EdgeFilter {
    pub edge_types: Vec<String>,
    pub from_node_ids: Vec<NodeId>,
    pub to_node_ids: Vec<NodeId>,
    pub source_files: Vec<String>,
    pub limit: Option<usize>,
}

/// Aggregate counts returned by `Store::statistics`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub nodes_by_type: HashMap<String, usize>,
    pub edges_by_type: HashMap<String, usize>,
    pub total_nodes: usize,
    pub total_edges: usize,
}

/// A returned inference record (§6, "Returned records").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferredRelationship {
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    pub inferred_type: String,
    pub path: InferencePath,
    pub inferred_at: chrono::DateTime<chrono::Utc>,
    pub source_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InferenceKind {
    Hierarchical,
    Transitive,
    Inheritable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferencePath {
    pub edge_ids: Vec<EdgeId>,
    pub depth: u32,
    pub inference_type: InferenceKind,
    pub description: String,
}
