//! Edge-Type Registry (§4.2): a process-wide, initialized-once table of
//! `EdgeTypeDef`s. Core types mirror the persisted schema; analyzers can
//! register further extended types at startup via `register`.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::errors::EdgeTypeError;

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeTypeDef {
    pub name: String,
    pub description: String,
    pub parent_type: Option<String>,
    pub is_transitive: bool,
    pub is_inheritable: bool,
    /// Always true in this core (§4.2) — kept as a field rather than
    /// assumed so a caller inspecting a `EdgeTypeDef` doesn't need to
    /// special-case the registry's own invariant.
    pub is_directed: bool,
    pub priority: i32,
}

impl EdgeTypeDef {
    fn core(
        name: &str,
        description: &str,
        parent_type: Option<&str>,
        is_transitive: bool,
        is_inheritable: bool,
        priority: i32,
    ) -> Self {
        EdgeTypeDef {
            name: name.to_string(),
            description: description.to_string(),
            parent_type: parent_type.map(str::to_string),
            is_transitive,
            is_inheritable,
            is_directed: true,
            priority,
        }
    }
}

/// Core edge-type names, stable and always present in a fresh registry.
pub mod names {
    pub const CONTAINS: &str = "contains";
    pub const DEPENDS_ON: &str = "depends_on";
    pub const IMPORTS: &str = "imports";
    pub const IMPORTS_FILE: &str = "imports_file";
    pub const IMPORTS_LIBRARY: &str = "imports_library";
    pub const CALLS: &str = "calls";
    pub const EXTENDS: &str = "extends";
    pub const IMPLEMENTS: &str = "implements";
    pub const ALIAS_OF: &str = "aliasOf";
    pub const RESOLVED_TO: &str = "resolvedTo";
}

fn core_defs() -> Vec<EdgeTypeDef> {
    use names::*;
    vec![
        EdgeTypeDef::core(CONTAINS, "filesystem/declaration containment", None, true, false, 100),
        EdgeTypeDef::core(DEPENDS_ON, "generalized dependency relation", None, true, true, 90),
        EdgeTypeDef::core(IMPORTS, "generalized import relation", Some(DEPENDS_ON), true, true, 80),
        EdgeTypeDef::core(IMPORTS_FILE, "imports a sibling source file", Some(IMPORTS), false, false, 70),
        EdgeTypeDef::core(IMPORTS_LIBRARY, "imports a third-party/builtin library", Some(IMPORTS), false, false, 70),
        EdgeTypeDef::core(CALLS, "invokes a function/method", Some(DEPENDS_ON), true, false, 60),
        EdgeTypeDef::core(EXTENDS, "class/interface inheritance", Some(DEPENDS_ON), true, true, 60),
        EdgeTypeDef::core(IMPLEMENTS, "interface implementation", Some(DEPENDS_ON), false, true, 60),
        EdgeTypeDef::core(ALIAS_OF, "unknown placeholder aliases another name", None, true, false, 50),
        EdgeTypeDef::core(RESOLVED_TO, "unknown placeholder resolved to a concrete node", None, false, false, 50),
    ]
}

/// Process-wide registry. Read-mostly after construction; extensions are
/// added once at analyzer load time (§4.2, §9 "Global registries").
pub struct EdgeTypeRegistry {
    defs: RwLock<HashMap<String, EdgeTypeDef>>,
}

impl EdgeTypeRegistry {
    /// Build a registry seeded with the core types.
    pub fn new() -> Self {
        let mut defs = HashMap::new();
        for def in core_defs() {
            defs.insert(def.name.clone(), def);
        }
        EdgeTypeRegistry { defs: RwLock::new(defs) }
    }

    /// Register an additional (extended) edge type. Returns an error if
    /// its declared parent isn't already registered, or if registering it
    /// would introduce a cycle.
    pub fn register(&self, def: EdgeTypeDef) -> Result<(), EdgeTypeError> {
        let mut defs = self.defs.write().unwrap();
        if let Some(parent) = &def.parent_type {
            if !defs.contains_key(parent) && parent != &def.name {
                return Err(EdgeTypeError::UndefinedParent {
                    child: def.name.clone(),
                    parent: parent.clone(),
                });
            }
        }
        let previous = defs.insert(def.name.clone(), def.clone());
        if let Err(e) = validate_hierarchy(&defs) {
            // Roll back — the registry must never hold a cyclic hierarchy.
            match previous {
                Some(prev) => {
                    defs.insert(def.name.clone(), prev);
                }
                None => {
                    defs.remove(&def.name);
                }
            }
            return Err(e.into_iter().next().unwrap());
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<EdgeTypeDef> {
        self.defs.read().unwrap().get(name).cloned()
    }

    pub fn children_of(&self, parent: &str) -> Vec<EdgeTypeDef> {
        self.defs
            .read()
            .unwrap()
            .values()
            .filter(|d| d.parent_type.as_deref() == Some(parent))
            .cloned()
            .collect()
    }

    /// `[name, parent, grandparent, ...]`, ending at a type with no parent.
    pub fn hierarchy_path(&self, name: &str) -> Vec<String> {
        let defs = self.defs.read().unwrap();
        let mut path = Vec::new();
        let mut current = name.to_string();
        let mut seen = HashSet::new();
        loop {
            if !seen.insert(current.clone()) {
                break; // defensive: a cycle should never reach here post-validation
            }
            path.push(current.clone());
            match defs.get(&current).and_then(|d| d.parent_type.clone()) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        path
    }

    /// All edge types whose type name equals `edge_type` or is a
    /// descendant of it in the hierarchy (used by hierarchical queries
    /// to normalize a concrete type up to a general one, and vice versa).
    pub fn descendants_including_self(&self, edge_type: &str) -> HashSet<String> {
        let defs = self.defs.read().unwrap();
        let mut result = HashSet::new();
        let mut frontier = vec![edge_type.to_string()];
        while let Some(current) = frontier.pop() {
            if result.insert(current.clone()) {
                for (name, def) in defs.iter() {
                    if def.parent_type.as_deref() == Some(current.as_str()) {
                        frontier.push(name.clone());
                    }
                }
            }
        }
        result
    }

    pub fn validate_hierarchy(&self) -> Result<(), Vec<EdgeTypeError>> {
        validate_hierarchy(&self.defs.read().unwrap())
    }

    /// Returned verbatim to the store at startup so the persisted
    /// `edge_types` table is a superset of the registry (§4.2).
    pub fn types_for_dynamic_registration(&self) -> Vec<EdgeTypeDef> {
        self.defs.read().unwrap().values().cloned().collect()
    }
}

impl Default for EdgeTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_hierarchy(defs: &HashMap<String, EdgeTypeDef>) -> Result<(), Vec<EdgeTypeError>> {
    let mut errors = Vec::new();

    for def in defs.values() {
        if let Some(parent) = &def.parent_type {
            if !defs.contains_key(parent) {
                errors.push(EdgeTypeError::UndefinedParent {
                    child: def.name.clone(),
                    parent: parent.clone(),
                });
            }
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    // DFS cycle check over the parent links.
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn visit<'a>(
        name: &'a str,
        defs: &'a HashMap<String, EdgeTypeDef>,
        marks: &mut HashMap<&'a str, Mark>,
        errors: &mut Vec<EdgeTypeError>,
    ) {
        match marks.get(name) {
            Some(Mark::Done) => return,
            Some(Mark::Visiting) => {
                errors.push(EdgeTypeError::HierarchyCycle(name.to_string()));
                return;
            }
            None => {}
        }
        marks.insert(name, Mark::Visiting);
        if let Some(parent) = defs.get(name).and_then(|d| d.parent_type.as_deref()) {
            visit(parent, defs, marks, errors);
        }
        marks.insert(name, Mark::Done);
    }

    for name in defs.keys() {
        visit(name, defs, &mut marks, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_hierarchy_is_valid() {
        let reg = EdgeTypeRegistry::new();
        assert!(reg.validate_hierarchy().is_ok());
    }

    #[test]
    fn imports_file_normalizes_up_to_depends_on() {
        let reg = EdgeTypeRegistry::new();
        let path = reg.hierarchy_path(names::IMPORTS_FILE);
        assert_eq!(
            path,
            vec![
                names::IMPORTS_FILE.to_string(),
                names::IMPORTS.to_string(),
                names::DEPENDS_ON.to_string(),
            ]
        );
    }

    #[test]
    fn children_of_imports_includes_file_and_library() {
        let reg = EdgeTypeRegistry::new();
        let children: HashSet<_> = reg.children_of(names::IMPORTS).into_iter().map(|d| d.name).collect();
        assert!(children.contains(names::IMPORTS_FILE));
        assert!(children.contains(names::IMPORTS_LIBRARY));
    }

    #[test]
    fn registering_with_undefined_parent_fails() {
        let reg = EdgeTypeRegistry::new();
        let err = reg.register(EdgeTypeDef::core("widgets_of", "custom", Some("no_such_parent"), false, false, 10));
        assert!(matches!(err, Err(EdgeTypeError::UndefinedParent { .. })));
    }

    #[test]
    fn registering_a_cycle_is_rejected_and_rolled_back() {
        let reg = EdgeTypeRegistry::new();
        reg.register(EdgeTypeDef::core("a_type", "custom a", Some(names::CONTAINS), false, false, 10)).unwrap();
        // Re-register CONTAINS-like type whose parent is a_type, then try to
        // make a_type's parent point back — simulate via direct re-registration.
        let cyclic = EdgeTypeDef::core("a_type", "custom a", Some("a_type"), false, false, 10);
        let err = reg.register(cyclic);
        assert!(err.is_err());
        // original a_type must still be present (rollback)
        assert_eq!(reg.get("a_type").unwrap().parent_type.as_deref(), Some(names::CONTAINS));
    }

    #[test]
    fn descendants_including_self_covers_whole_subtree() {
        let reg = EdgeTypeRegistry::new();
        let descendants = reg.descendants_including_self(names::DEPENDS_ON);
        assert!(descendants.contains(names::IMPORTS_FILE));
        assert!(descendants.contains(names::CALLS));
        assert!(descendants.contains(names::DEPENDS_ON));
    }
}
