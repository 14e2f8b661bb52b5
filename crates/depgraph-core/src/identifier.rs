//! Canonical RDF-style node identifiers (§3, §4.1).
//!
//! Grammar: `<projectName>/<relativePath>[#<CapitalizedNodeType>:<symbol>]`.
//! File/directory nodes omit the `#...` suffix. Library/package nodes use
//! `library#<name>` / `package#<name>` with no project prefix.
//!
//! Only the RDF form is implemented; the source's second, hash-prefixed
//! identifier scheme is out of scope (§9, Open Questions).

use crate::errors::IdentifierError;
use crate::model::NodeType;

/// The parsed pieces of a canonical identifier, recoverable via `parse`.
/// Locations and extra metadata supplied to `create` are not recoverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub node_type: NodeType,
    pub name: String,
    /// `None` for library/package nodes (they carry no project/path).
    pub project_name: Option<String>,
    pub file_path: Option<String>,
    pub symbol: Option<String>,
}

/// Build the canonical identifier for a node.
///
/// `context` is the project name (ignored for `Library`/`Package`, which
/// use the unprefixed `library#name` / `package#name` form). `name` is
/// used verbatim as the `<symbol>` component for non-pathlike node types.
pub fn create(node_type: NodeType, name: &str, context: &str, file_path: Option<&str>) -> String {
    if node_type.is_unprefixed() {
        return format!(
            "{}#{}",
            node_type.as_capitalized().to_lowercase(),
            name
        );
    }

    let rel_path = normalize_path(file_path.unwrap_or(name));

    if node_type.is_pathlike() {
        return format!("{}/{}", context, rel_path);
    }

    format!(
        "{}/{}#{}:{}",
        context,
        rel_path,
        node_type.as_capitalized(),
        name
    )
}

/// Normalize a path the way the identifier grammar requires: backslashes
/// become forward slashes, and any trailing slash (e.g. on a project
/// root) is stripped.
pub fn normalize_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    normalized.trim_end_matches('/').to_string()
}

/// Parse a canonical identifier back into its components. Returns `None`
/// (per spec: `NodeIdentity | None`) when the identifier's form is
/// ambiguous rather than erroring — `validate` is the boolean-returning
/// sibling that distinguishes malformed from merely-unparseable forms.
pub fn parse(identifier: &str) -> Option<NodeIdentity> {
    if identifier.is_empty() {
        return None;
    }

    if let Some(name) = identifier.strip_prefix("library#") {
        return Some(NodeIdentity {
            node_type: NodeType::Library,
            name: name.to_string(),
            project_name: None,
            file_path: None,
            symbol: None,
        });
    }
    if let Some(name) = identifier.strip_prefix("package#") {
        return Some(NodeIdentity {
            node_type: NodeType::Package,
            name: name.to_string(),
            project_name: None,
            file_path: None,
            symbol: None,
        });
    }

    let (path_part, suffix) = match identifier.split_once('#') {
        Some((path, suffix)) => (path, Some(suffix)),
        None => (identifier, None),
    };

    let (project_name, file_path) = path_part.split_once('/')?;
    if project_name.is_empty() {
        return None;
    }

    match suffix {
        None => Some(NodeIdentity {
            node_type: NodeType::File,
            name: file_path.rsplit('/').next().unwrap_or(file_path).to_string(),
            project_name: Some(project_name.to_string()),
            file_path: Some(file_path.to_string()),
            symbol: None,
        }),
        Some(suffix) => {
            let (type_str, symbol) = suffix.split_once(':')?;
            let node_type = NodeType::from_capitalized(type_str)?;
            Some(NodeIdentity {
                node_type,
                name: symbol.to_string(),
                project_name: Some(project_name.to_string()),
                file_path: Some(file_path.to_string()),
                symbol: Some(symbol.to_string()),
            })
        }
    }
}

/// Validate an identifier's grammar without needing the original
/// creation inputs.
pub fn validate(identifier: &str) -> Result<(), IdentifierError> {
    if identifier.is_empty() {
        return Err(IdentifierError::Empty);
    }
    parse(identifier).map(|_| ()).ok_or_else(|| IdentifierError::Malformed(identifier.to_string()))
}

/// True iff both identifiers parse to the same `projectName` and
/// `filePath` (library/package identifiers, having neither, are never
/// related to anything but themselves).
pub fn are_related(a: &str, b: &str) -> bool {
    match (parse(a), parse(b)) {
        (Some(ia), Some(ib)) => {
            ia.project_name.is_some()
                && ia.project_name == ib.project_name
                && ia.file_path == ib.file_path
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_parse_roundtrip_for_class() {
        let id = create(NodeType::Class, "Foo", "myproj", Some("src/foo.ts"));
        assert_eq!(id, "myproj/src/foo.ts#Class:Foo");
        let parsed = parse(&id).unwrap();
        assert_eq!(parsed.node_type, NodeType::Class);
        assert_eq!(parsed.name, "Foo");
        assert_eq!(parsed.project_name.as_deref(), Some("myproj"));
        assert_eq!(parsed.file_path.as_deref(), Some("src/foo.ts"));
    }

    #[test]
    fn file_nodes_omit_suffix() {
        let id = create(NodeType::File, "App.tsx", "myproj", Some("src/App.tsx"));
        assert_eq!(id, "myproj/src/App.tsx");
        let parsed = parse(&id).unwrap();
        assert_eq!(parsed.node_type, NodeType::File);
        assert_eq!(parsed.symbol, None);
    }

    #[test]
    fn library_nodes_have_no_project_prefix() {
        let id = create(NodeType::Library, "react", "myproj", None);
        assert_eq!(id, "library#react");
        let parsed = parse(&id).unwrap();
        assert_eq!(parsed.node_type, NodeType::Library);
        assert_eq!(parsed.project_name, None);
    }

    #[test]
    fn windows_separators_are_normalized() {
        let id = create(NodeType::File, "App.tsx", "myproj", Some("src\\ui\\App.tsx"));
        assert_eq!(id, "myproj/src/ui/App.tsx");
    }

    #[test]
    fn trailing_slash_on_root_is_stripped() {
        assert_eq!(normalize_path("src/foo/"), "src/foo");
    }

    #[test]
    fn empty_path_identifier_is_invalid() {
        assert!(validate("").is_err());
    }

    #[test]
    fn are_related_checks_project_and_path() {
        let a = create(NodeType::Class, "A", "p", Some("src/a.ts"));
        let b = create(NodeType::Function, "f", "p", Some("src/a.ts"));
        let c = create(NodeType::Class, "A", "other", Some("src/a.ts"));
        assert!(are_related(&a, &b));
        assert!(!are_related(&a, &c));
    }

    #[test]
    fn deterministic_same_inputs_same_identifier() {
        let a = create(NodeType::Method, "run", "p", Some("src/a.ts"));
        let b = create(NodeType::Method, "run", "p", Some("src/a.ts"));
        assert_eq!(a, b);
    }
}
