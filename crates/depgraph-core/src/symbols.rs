//! Symbol table for cross-file resolution, used by the Unknown Resolver
//! to shortlist same-file candidates before falling back to a
//! whole-graph scan.

use dashmap::DashMap;

use crate::model::NodeId;

/// Maps qualified names to `NodeId`s. Thread-safe for concurrent
/// population during indexing.
pub struct SymbolTable {
    symbols: DashMap<String, NodeId>,
    file_symbols: DashMap<String, Vec<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { symbols: DashMap::new(), file_symbols: DashMap::new() }
    }

    pub fn insert(&self, qualified_name: String, node_id: NodeId, file_path: String) {
        self.symbols.insert(qualified_name.clone(), node_id);
        self.file_symbols.entry(file_path).or_insert_with(Vec::new).push(qualified_name);
    }

    pub fn lookup(&self, qualified_name: &str) -> Option<NodeId> {
        self.symbols.get(qualified_name).map(|r| *r.value())
    }

    pub fn symbols_in_file(&self, file_path: &str) -> Vec<NodeId> {
        self.file_symbols
            .get(file_path)
            .map(|r| r.value().iter().filter_map(|name| self.symbols.get(name).map(|n| *n.value())).collect())
            .unwrap_or_default()
    }

    /// Drop all symbols for a file — called before re-indexing it so
    /// stale declarations don't shadow fresh ones.
    pub fn remove_file(&self, file_path: &str) {
        if let Some((_, symbols)) = self.file_symbols.remove(file_path) {
            for name in symbols {
                self.symbols.remove(&name);
            }
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_lookup_roundtrips() {
        let table = SymbolTable::new();
        table.insert("Widget".to_string(), NodeId(42), "a.ts".to_string());
        assert_eq!(table.lookup("Widget"), Some(NodeId(42)));
    }

    #[test]
    fn remove_file_drops_its_symbols() {
        let table = SymbolTable::new();
        table.insert("Widget".to_string(), NodeId(1), "a.ts".to_string());
        table.remove_file("a.ts");
        assert_eq!(table.lookup("Widget"), None);
        assert!(table.symbols_in_file("a.ts").is_empty());
    }
}
