//! Graph Store (§4.3): a persisted, typed graph with upsert semantics,
//! filtered queries, and a materialized inference cache.
//!
//! Persistence is SQLite (`rusqlite`), mirrored by an in-memory
//! `petgraph::stable_graph::StableDiGraph` so traversal-heavy queries
//! (IE, CDD, NCA) don't round-trip through SQL for every hop. Writers are
//! serialized through a single `Mutex<Connection>`; the in-memory mirror
//! is behind an `RwLock` so readers don't block each other (§5).

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rusqlite::{params, Connection, OptionalExtension};

use crate::edge_types::EdgeTypeDef;
use crate::errors::StorageError;
use crate::model::*;

struct Mirror {
    graph: StableDiGraph<GraphNode, GraphEdge>,
    node_index: HashMap<NodeId, NodeIndex>,
    edge_index: HashMap<EdgeId, EdgeIndex>,
    cache: HashMap<(NodeId, NodeId, String), InferenceCacheEntry>,
    cache_state: CacheState,
}

/// The inference-cache state machine (§4.6 "State machine of the cache").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Warm,
    Dirty,
}

pub struct Store {
    conn: Mutex<Connection>,
    mirror: RwLock<Mirror>,
}

impl Store {
    /// Open (or create) a persisted store at `path`. Pass `:memory:` for
    /// an ephemeral, test-only store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path.as_ref().to_str().unwrap_or(":memory:"))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        Self::init_schema(&conn)?;
        let store = Store {
            conn: Mutex::new(conn),
            mirror: RwLock::new(Mirror {
                graph: StableDiGraph::new(),
                node_index: HashMap::new(),
                edge_index: HashMap::new(),
                cache: HashMap::new(),
                cache_state: CacheState::Empty,
            }),
        };
        store.load_mirror_from_disk()?;
        Ok(store)
    }

    fn init_schema(conn: &Connection) -> Result<(), StorageError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY,
                identifier TEXT UNIQUE NOT NULL,
                type TEXT NOT NULL,
                name TEXT NOT NULL,
                source_file TEXT,
                language TEXT,
                metadata TEXT NOT NULL,
                start_line INTEGER,
                start_column INTEGER,
                end_line INTEGER,
                end_column INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_nodes_identifier ON nodes(identifier);
            CREATE INDEX IF NOT EXISTS idx_nodes_type ON nodes(type);
            CREATE INDEX IF NOT EXISTS idx_nodes_source_file ON nodes(source_file);

            CREATE TABLE IF NOT EXISTS edges (
                id INTEGER PRIMARY KEY,
                start_node_id INTEGER NOT NULL,
                end_node_id INTEGER NOT NULL,
                type TEXT NOT NULL,
                label TEXT,
                metadata TEXT NOT NULL,
                weight REAL NOT NULL,
                source_file TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_edges_start ON edges(start_node_id, type);
            CREATE INDEX IF NOT EXISTS idx_edges_end ON edges(end_node_id, type);
            CREATE INDEX IF NOT EXISTS idx_edges_type ON edges(type);

            CREATE TABLE IF NOT EXISTS edge_types (
                type TEXT PRIMARY KEY,
                description TEXT,
                schema TEXT,
                is_directed INTEGER NOT NULL DEFAULT 1,
                parent_type TEXT,
                is_transitive INTEGER NOT NULL DEFAULT 0,
                is_inheritable INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS edge_inference_cache (
                start_node_id INTEGER NOT NULL,
                end_node_id INTEGER NOT NULL,
                inferred_type TEXT NOT NULL,
                edge_path TEXT NOT NULL,
                depth INTEGER NOT NULL,
                PRIMARY KEY (start_node_id, end_node_id, inferred_type)
            );

            CREATE TABLE IF NOT EXISTS projects (
                name TEXT PRIMARY KEY,
                root TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Seed `edge_types` with the registry's current definitions so the
    /// persisted table is a superset of the in-process registry (§4.2).
    pub fn sync_edge_type_defs(&self, defs: &[EdgeTypeDef]) -> Result<(), StorageError> {
        let conn = self.conn.lock().unwrap();
        for def in defs {
            conn.execute(
                "INSERT INTO edge_types (type, description, schema, is_directed, parent_type, is_transitive, is_inheritable)
                 VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6)
                 ON CONFLICT(type) DO UPDATE SET
                    description=excluded.description,
                    is_directed=excluded.is_directed,
                    parent_type=excluded.parent_type,
                    is_transitive=excluded.is_transitive,
                    is_inheritable=excluded.is_inheritable",
                params![
                    def.name,
                    def.description,
                    def.is_directed as i32,
                    def.parent_type,
                    def.is_transitive as i32,
                    def.is_inheritable as i32,
                ],
            )?;
        }
        Ok(())
    }

    fn load_mirror_from_disk(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().unwrap();
        let mut mirror = self.mirror.write().unwrap();

        let mut node_stmt = conn.prepare(
            "SELECT id, identifier, type, name, source_file, language, metadata,
                    start_line, start_column, end_line, end_column FROM nodes",
        )?;
        let node_rows = node_stmt.query_map([], |row| {
            let metadata_json: String = row.get(6)?;
            Ok((
                NodeId(row.get::<_, i64>(0)? as u64),
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                metadata_json,
                row.get::<_, Option<i64>>(7)?,
                row.get::<_, Option<i64>>(8)?,
                row.get::<_, Option<i64>>(9)?,
                row.get::<_, Option<i64>>(10)?,
            ))
        })?;

        for row in node_rows {
            let (id, identifier, type_str, name, source_file, language, metadata_json, sl, sc, el, ec) = row?;
            let node_type = NodeType::from_capitalized(&type_str).unwrap_or(NodeType::Unknown);
            let metadata: HashMap<String, String> = serde_json::from_str(&metadata_json)?;
            let node = GraphNode {
                id,
                identifier,
                node_type,
                name,
                source_file,
                language: language.and_then(|l| language_from_str(&l)),
                metadata,
                start_line: sl.map(|v| v as u32),
                start_column: sc.map(|v| v as u32),
                end_line: el.map(|v| v as u32),
                end_column: ec.map(|v| v as u32),
            };
            let idx = mirror.graph.add_node(node);
            mirror.node_index.insert(id, idx);
        }
        drop(node_stmt);

        let mut edge_stmt = conn.prepare(
            "SELECT id, start_node_id, end_node_id, type, label, metadata, weight, source_file FROM edges",
        )?;
        let edge_rows = edge_stmt.query_map([], |row| {
            Ok((
                EdgeId(row.get::<_, i64>(0)? as u64),
                NodeId(row.get::<_, i64>(1)? as u64),
                NodeId(row.get::<_, i64>(2)? as u64),
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;
        for row in edge_rows {
            let (id, from, to, edge_type, label, metadata_json, weight, source_file) = row?;
            let metadata: HashMap<String, String> = serde_json::from_str(&metadata_json)?;
            if let (Some(&from_idx), Some(&to_idx)) =
                (mirror.node_index.get(&from), mirror.node_index.get(&to))
            {
                let edge = GraphEdge {
                    id,
                    from_node_id: from,
                    to_node_id: to,
                    edge_type,
                    label,
                    metadata,
                    weight,
                    source_file,
                };
                let idx = mirror.graph.add_edge(from_idx, to_idx, edge);
                mirror.edge_index.insert(id, idx);
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Node / edge upsert
    // ---------------------------------------------------------------

    /// Upsert a node keyed by `identifier`. On conflict, the surrogate
    /// `id` is preserved (it is a hash of `identifier` so it cannot
    /// change), `metadata` is merged (caller-supplied keys win), and
    /// `node_type`/`name`/`source_file`/`language` are overwritten with
    /// the supplied values (§4.3).
    pub fn upsert_node(&self, node: GraphNode) -> Result<NodeId, StorageError> {
        let conn = self.conn.lock().unwrap();
        let mut mirror = self.mirror.write().unwrap();
        upsert_node_impl(&conn, &mut mirror, node)
    }

    /// Upsert a relationship. A new edge is created unless
    /// `(from, to, type, label)` already exists, in which case metadata
    /// and weight are merged (weight takes the max of old/new, metadata
    /// keys from the new edge win).
    pub fn upsert_relationship(&self, edge: GraphEdge) -> Result<EdgeId, StorageError> {
        let conn = self.conn.lock().unwrap();
        let mut mirror = self.mirror.write().unwrap();
        upsert_relationship_impl(&conn, &mut mirror, edge)
    }

    /// Run `f` against a single SQLite transaction: every node/edge
    /// upsert and source-file deletion `f` performs through the passed
    /// `StoreTransaction` commits together, or none of them do (§4.3 "no
    /// partial writes are observable after a failed transaction"). The
    /// writer lock and the mirror lock are held for the whole closure, so
    /// callers must not re-enter `Store` from within `f`.
    pub fn transaction<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: for<'tx> FnOnce(&mut StoreTransaction<'tx>) -> Result<T, StorageError>,
    {
        let mut conn = self.conn.lock().unwrap();
        let mut mirror = self.mirror.write().unwrap();
        let tx = conn.transaction()?;
        let mut store_tx = StoreTransaction { tx, mirror: &mut *mirror };

        match f(&mut store_tx) {
            Ok(value) => {
                store_tx.tx.commit()?;
                Ok(value)
            }
            Err(e) => Err(e),
        }
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<GraphNode> {
        let mirror = self.mirror.read().unwrap();
        mirror.node_index.get(&id).map(|&idx| mirror.graph[idx].clone())
    }

    pub fn edge(&self, id: EdgeId) -> Option<GraphEdge> {
        let mirror = self.mirror.read().unwrap();
        mirror.edge_index.get(&id).map(|&idx| mirror.graph[idx].clone())
    }

    pub fn node_count(&self) -> usize {
        self.mirror.read().unwrap().graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.mirror.read().unwrap().graph.edge_count()
    }

    pub fn find_nodes(&self, filter: &NodeFilter) -> Vec<GraphNode> {
        let mirror = self.mirror.read().unwrap();
        let mut results: Vec<GraphNode> = mirror
            .graph
            .node_weights()
            .filter(|n| filter.node_types.is_empty() || filter.node_types.contains(&n.node_type))
            .filter(|n| {
                filter.source_files.is_empty()
                    || n.source_file.as_deref().map_or(false, |f| filter.source_files.iter().any(|sf| sf == f))
            })
            .filter(|n| filter.languages.is_empty() || n.language.map_or(false, |l| filter.languages.contains(&l)))
            .cloned()
            .collect();

        results.sort_by(|a, b| {
            (a.source_file.as_deref().unwrap_or(""), a.start_line.unwrap_or(0), a.start_column.unwrap_or(0))
                .cmp(&(b.source_file.as_deref().unwrap_or(""), b.start_line.unwrap_or(0), b.start_column.unwrap_or(0)))
        });

        if let Some(limit) = filter.limit {
            results.truncate(limit);
        }
        results
    }

    pub fn find_relationships(&self, filter: &EdgeFilter) -> Vec<GraphEdge> {
        let mirror = self.mirror.read().unwrap();
        let mut results: Vec<GraphEdge> = mirror
            .graph
            .edge_weights()
            .filter(|e| filter.edge_types.is_empty() || filter.edge_types.contains(&e.edge_type))
            .filter(|e| filter.from_node_ids.is_empty() || filter.from_node_ids.contains(&e.from_node_id))
            .filter(|e| filter.to_node_ids.is_empty() || filter.to_node_ids.contains(&e.to_node_id))
            .filter(|e| {
                filter.source_files.is_empty()
                    || e.source_file.as_deref().map_or(false, |f| filter.source_files.iter().any(|sf| sf == f))
            })
            .cloned()
            .collect();

        results.sort_by_key(|e| (e.from_node_id, e.to_node_id));

        if let Some(limit) = filter.limit {
            results.truncate(limit);
        }
        results
    }

    pub fn find_node_dependencies(&self, id: NodeId, edge_types: Option<&[String]>) -> Vec<GraphEdge> {
        let mirror = self.mirror.read().unwrap();
        let Some(&idx) = mirror.node_index.get(&id) else { return Vec::new() };
        mirror
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.weight().clone())
            .filter(|e| edge_types.map_or(true, |types| types.iter().any(|t| t == &e.edge_type)))
            .collect()
    }

    pub fn find_node_dependents(&self, id: NodeId, edge_types: Option<&[String]>) -> Vec<GraphEdge> {
        let mirror = self.mirror.read().unwrap();
        let Some(&idx) = mirror.node_index.get(&id) else { return Vec::new() };
        mirror
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| e.weight().clone())
            .filter(|e| edge_types.map_or(true, |types| types.iter().any(|t| t == &e.edge_type)))
            .collect()
    }

    /// Bounded BFS, returns the shortest path of edges from `from` to
    /// `to`, or `None` if unreachable within `max_depth` hops.
    pub fn find_dependency_path(&self, from: NodeId, to: NodeId, max_depth: u32) -> Option<Vec<EdgeId>> {
        use std::collections::{HashSet, VecDeque};

        let mirror = self.mirror.read().unwrap();
        let start_idx = *mirror.node_index.get(&from)?;
        let target_idx = *mirror.node_index.get(&to)?;

        if start_idx == target_idx {
            return Some(Vec::new());
        }

        let mut visited = HashSet::new();
        visited.insert(start_idx);
        let mut queue = VecDeque::new();
        queue.push_back((start_idx, Vec::<EdgeId>::new(), 0u32));

        while let Some((current, path, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for edge_ref in mirror.graph.edges_directed(current, Direction::Outgoing) {
                let next = edge_ref.target();
                if next == target_idx {
                    let mut full_path = path.clone();
                    full_path.push(edge_ref.weight().id);
                    return Some(full_path);
                }
                if visited.insert(next) {
                    let mut next_path = path.clone();
                    next_path.push(edge_ref.weight().id);
                    queue.push_back((next, next_path, depth + 1));
                }
            }
        }
        None
    }

    // ---------------------------------------------------------------
    // Deletion / invalidation
    // ---------------------------------------------------------------

    pub fn delete_relationship(&self, id: EdgeId) -> Result<(), StorageError> {
        let conn = self.conn.lock().unwrap();
        let mut mirror = self.mirror.write().unwrap();
        conn.execute("DELETE FROM edges WHERE id = ?1", params![id.0 as i64])?;
        if let Some(idx) = mirror.edge_index.remove(&id) {
            mirror.graph.remove_edge(idx);
        }
        invalidate_cache_for_edge(&mut mirror, id);
        Ok(())
    }

    /// Delete every edge whose `source_file` matches `path`, atomically
    /// invalidating any inference-cache row whose `edge_path` referenced
    /// one of them (§4.5 step 2, §3 invariant 5).
    pub fn delete_relationships_by_source_file(&self, path: &str) -> Result<Vec<EdgeId>, StorageError> {
        let conn = self.conn.lock().unwrap();
        let mut mirror = self.mirror.write().unwrap();
        delete_relationships_by_source_file_impl(&conn, &mut mirror, path)
    }

    pub fn statistics(&self) -> GraphStatistics {
        let mirror = self.mirror.read().unwrap();
        let mut stats = GraphStatistics {
            total_nodes: mirror.graph.node_count(),
            total_edges: mirror.graph.edge_count(),
            ..Default::default()
        };
        for node in mirror.graph.node_weights() {
            *stats.nodes_by_type.entry(node.node_type.as_capitalized().to_string()).or_insert(0) += 1;
        }
        for edge in mirror.graph.edge_weights() {
            *stats.edges_by_type.entry(edge.edge_type.clone()).or_insert(0) += 1;
        }
        stats
    }

    // ---------------------------------------------------------------
    // Inference-cache access (used by `inference::InferenceEngine`)
    // ---------------------------------------------------------------

    pub fn cache_state(&self) -> CacheState {
        self.mirror.read().unwrap().cache_state
    }

    pub fn cache_entries(&self) -> Vec<InferenceCacheEntry> {
        self.mirror.read().unwrap().cache.values().cloned().collect()
    }

    /// Replace the cache wholesale with `entries`, persist it, and mark
    /// the cache `Warm`.
    pub fn replace_cache(&self, entries: Vec<InferenceCacheEntry>) -> Result<(), StorageError> {
        let conn = self.conn.lock().unwrap();
        let mut mirror = self.mirror.write().unwrap();

        conn.execute("DELETE FROM edge_inference_cache", [])?;
        for entry in &entries {
            let edge_path_json = serde_json::to_string(&entry.edge_path)?;
            conn.execute(
                "INSERT INTO edge_inference_cache (start_node_id, end_node_id, inferred_type, edge_path, depth)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.start_node_id.0 as i64,
                    entry.end_node_id.0 as i64,
                    entry.inferred_type,
                    edge_path_json,
                    entry.depth,
                ],
            )?;
        }

        mirror.cache.clear();
        for entry in entries {
            mirror
                .cache
                .insert((entry.start_node_id, entry.end_node_id, entry.inferred_type.clone()), entry);
        }
        mirror.cache_state = CacheState::Warm;
        Ok(())
    }

    pub fn clear_cache(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().unwrap();
        let mut mirror = self.mirror.write().unwrap();
        conn.execute("DELETE FROM edge_inference_cache", [])?;
        mirror.cache.clear();
        mirror.cache_state = CacheState::Empty;
        Ok(())
    }

    /// Purge any cache entry whose `edge_path` references an edge that no
    /// longer exists. Used by `lazy` cache policy before serving a query
    /// from a `Dirty` cache (§4.6).
    pub fn purge_stale_cache_entries(&self) -> Result<usize, StorageError> {
        let conn = self.conn.lock().unwrap();
        let mut mirror = self.mirror.write().unwrap();

        let live_edges: std::collections::HashSet<EdgeId> = mirror.edge_index.keys().copied().collect();
        let stale_keys: Vec<(NodeId, NodeId, String)> = mirror
            .cache
            .iter()
            .filter(|(_, entry)| entry.edge_path.iter().any(|e| !live_edges.contains(e)))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &stale_keys {
            mirror.cache.remove(key);
            conn.execute(
                "DELETE FROM edge_inference_cache WHERE start_node_id = ?1 AND end_node_id = ?2 AND inferred_type = ?3",
                params![key.0 .0 as i64, key.1 .0 as i64, key.2],
            )?;
        }
        if mirror.cache.is_empty() && !stale_keys.is_empty() {
            mirror.cache_state = CacheState::Empty;
        }
        Ok(stale_keys.len())
    }
}

/// A single SQLite transaction plus its exclusive hold on the mirror
/// lock, handed to the closure passed to `Store::transaction`. Exposes
/// the subset of `Store`'s writer API that needs to compose atomically
/// (§4.3, §4.5 step 1-4).
pub struct StoreTransaction<'a> {
    tx: rusqlite::Transaction<'a>,
    mirror: &'a mut Mirror,
}

impl<'a> StoreTransaction<'a> {
    pub fn upsert_node(&mut self, node: GraphNode) -> Result<NodeId, StorageError> {
        upsert_node_impl(&self.tx, self.mirror, node)
    }

    pub fn upsert_relationship(&mut self, edge: GraphEdge) -> Result<EdgeId, StorageError> {
        upsert_relationship_impl(&self.tx, self.mirror, edge)
    }

    pub fn delete_relationships_by_source_file(&mut self, path: &str) -> Result<Vec<EdgeId>, StorageError> {
        delete_relationships_by_source_file_impl(&self.tx, self.mirror, path)
    }
}

fn upsert_node_impl(conn: &Connection, mirror: &mut Mirror, mut node: GraphNode) -> Result<NodeId, StorageError> {
    node.id = NodeId::from_identifier(&node.identifier);

    let existing_metadata: Option<String> = conn
        .query_row("SELECT metadata FROM nodes WHERE identifier = ?1", params![node.identifier], |row| row.get(0))
        .optional()?;

    if let Some(existing_json) = existing_metadata {
        let mut merged: HashMap<String, String> = serde_json::from_str(&existing_json)?;
        for (k, v) in node.metadata.drain() {
            merged.insert(k, v);
        }
        node.metadata = merged;
    }

    let metadata_json = serde_json::to_string(&node.metadata)?;
    conn.execute(
        "INSERT INTO nodes (id, identifier, type, name, source_file, language, metadata,
                             start_line, start_column, end_line, end_column)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(identifier) DO UPDATE SET
            type=excluded.type,
            name=excluded.name,
            source_file=excluded.source_file,
            language=excluded.language,
            metadata=excluded.metadata,
            start_line=excluded.start_line,
            start_column=excluded.start_column,
            end_line=excluded.end_line,
            end_column=excluded.end_column",
        params![
            node.id.0 as i64,
            node.identifier,
            node.node_type.as_capitalized(),
            node.name,
            node.source_file,
            node.language.map(language_to_str),
            metadata_json,
            node.start_line.map(|v| v as i64),
            node.start_column.map(|v| v as i64),
            node.end_line.map(|v| v as i64),
            node.end_column.map(|v| v as i64),
        ],
    )?;

    match mirror.node_index.get(&node.id).copied() {
        Some(idx) => {
            mirror.graph[idx] = node.clone();
        }
        None => {
            let idx = mirror.graph.add_node(node.clone());
            mirror.node_index.insert(node.id, idx);
        }
    }

    Ok(node.id)
}

/// Validates both endpoints exist in the mirror *before* writing the
/// edge row, so a missing endpoint fails the whole call with nothing
/// committed (§3 invariant 2: an edge's endpoints exist at the moment
/// the edge is persisted).
fn upsert_relationship_impl(conn: &Connection, mirror: &mut Mirror, mut edge: GraphEdge) -> Result<EdgeId, StorageError> {
    edge.id = EdgeId::from_parts(edge.from_node_id, edge.to_node_id, &edge.edge_type, edge.label.as_deref());

    let from_idx = *mirror
        .node_index
        .get(&edge.from_node_id)
        .ok_or(StorageError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;
    let to_idx = *mirror
        .node_index
        .get(&edge.to_node_id)
        .ok_or(StorageError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;

    let existing: Option<(String, f64)> = conn
        .query_row("SELECT metadata, weight FROM edges WHERE id = ?1", params![edge.id.0 as i64], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()?;

    if let Some((existing_json, existing_weight)) = existing {
        let mut merged: HashMap<String, String> = serde_json::from_str(&existing_json)?;
        for (k, v) in edge.metadata.drain() {
            merged.insert(k, v);
        }
        edge.metadata = merged;
        edge.weight = edge.weight.max(existing_weight);
    }

    let metadata_json = serde_json::to_string(&edge.metadata)?;
    conn.execute(
        "INSERT INTO edges (id, start_node_id, end_node_id, type, label, metadata, weight, source_file)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
            metadata=excluded.metadata,
            weight=excluded.weight,
            source_file=excluded.source_file",
        params![
            edge.id.0 as i64,
            edge.from_node_id.0 as i64,
            edge.to_node_id.0 as i64,
            edge.edge_type,
            edge.label,
            metadata_json,
            edge.weight,
            edge.source_file,
        ],
    )?;

    match mirror.edge_index.get(&edge.id).copied() {
        Some(idx) => {
            mirror.graph[idx] = edge.clone();
        }
        None => {
            let idx = mirror.graph.add_edge(from_idx, to_idx, edge.clone());
            mirror.edge_index.insert(edge.id, idx);
        }
    }

    invalidate_cache_for_edge(mirror, edge.id);
    Ok(edge.id)
}

fn delete_relationships_by_source_file_impl(
    conn: &Connection,
    mirror: &mut Mirror,
    path: &str,
) -> Result<Vec<EdgeId>, StorageError> {
    let mut stmt = conn.prepare("SELECT id FROM edges WHERE source_file = ?1")?;
    let ids: Vec<EdgeId> = stmt
        .query_map(params![path], |row| Ok(EdgeId(row.get::<_, i64>(0)? as u64)))?
        .collect::<Result<_, _>>()?;
    drop(stmt);

    conn.execute("DELETE FROM edges WHERE source_file = ?1", params![path])?;

    for id in &ids {
        if let Some(idx) = mirror.edge_index.remove(id) {
            mirror.graph.remove_edge(idx);
        }
    }
    for id in &ids {
        invalidate_cache_for_edge(mirror, *id);
    }
    Ok(ids)
}

fn invalidate_cache_for_edge(mirror: &mut Mirror, edge_id: EdgeId) {
    let affected: Vec<_> = mirror
        .cache
        .iter()
        .filter(|(_, entry)| entry.edge_path.contains(&edge_id))
        .map(|(k, _)| k.clone())
        .collect();
    if !affected.is_empty() {
        for key in affected {
            mirror.cache.remove(&key);
        }
        mirror.cache_state = CacheState::Dirty;
    } else if mirror.cache_state == CacheState::Warm {
        // A mutation touched the graph but not (yet known to touch) any
        // cached inference; conservatively mark dirty so a `lazy` reader
        // re-validates before trusting cache hits of a type it hasn't
        // checked yet. Transitive/inheritable re-sync is idempotent.
        mirror.cache_state = CacheState::Dirty;
    }
}

fn language_to_str(l: Language) -> &'static str {
    match l {
        Language::Rust => "rust",
        Language::TypeScript => "typescript",
        Language::JavaScript => "javascript",
        Language::Python => "python",
        Language::Go => "go",
        Language::Java => "java",
        Language::C => "c",
        Language::Cpp => "cpp",
        Language::Markdown => "markdown",
        Language::Other => "other",
    }
}

fn language_from_str(s: &str) -> Option<Language> {
    Some(match s {
        "rust" => Language::Rust,
        "typescript" => Language::TypeScript,
        "javascript" => Language::JavaScript,
        "python" => Language::Python,
        "go" => Language::Go,
        "java" => Language::Java,
        "c" => Language::C,
        "cpp" => Language::Cpp,
        "markdown" => Language::Markdown,
        "other" => Language::Other,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(identifier: &str, node_type: NodeType, name: &str) -> GraphNode {
        GraphNode {
            id: NodeId(0),
            identifier: identifier.to_string(),
            node_type,
            name: name.to_string(),
            source_file: None,
            language: None,
            metadata: HashMap::new(),
            start_line: None,
            start_column: None,
            end_line: None,
            end_column: None,
        }
    }

    #[test]
    fn upsert_node_is_idempotent_on_identifier() {
        let store = Store::open_in_memory().unwrap();
        let id1 = store.upsert_node(node("proj/a.ts", NodeType::File, "a.ts")).unwrap();
        let id2 = store.upsert_node(node("proj/a.ts", NodeType::File, "a.ts")).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn upsert_node_merges_metadata_caller_keys_win() {
        let store = Store::open_in_memory().unwrap();
        let mut n1 = node("proj/a.ts", NodeType::File, "a.ts");
        n1.metadata.insert("loc".to_string(), "10".to_string());
        store.upsert_node(n1).unwrap();

        let mut n2 = node("proj/a.ts", NodeType::File, "a.ts");
        n2.metadata.insert("lang".to_string(), "ts".to_string());
        let id = store.upsert_node(n2).unwrap();

        let merged = store.node(id).unwrap();
        assert_eq!(merged.metadata.get("loc"), Some(&"10".to_string()));
        assert_eq!(merged.metadata.get("lang"), Some(&"ts".to_string()));
    }

    #[test]
    fn upsert_relationship_dedupes_by_from_to_type_label() {
        let store = Store::open_in_memory().unwrap();
        let a = store.upsert_node(node("proj/a.ts", NodeType::File, "a.ts")).unwrap();
        let b = store.upsert_node(node("proj/b.ts", NodeType::File, "b.ts")).unwrap();

        let edge = GraphEdge {
            id: EdgeId(0),
            from_node_id: a,
            to_node_id: b,
            edge_type: crate::edge_types::names::IMPORTS_FILE.to_string(),
            label: None,
            metadata: HashMap::new(),
            weight: 1.0,
            source_file: Some("a.ts".to_string()),
        };
        let e1 = store.upsert_relationship(edge.clone()).unwrap();
        let e2 = store.upsert_relationship(edge).unwrap();
        assert_eq!(e1, e2);
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn delete_by_source_file_invalidates_dependent_cache_rows() {
        let store = Store::open_in_memory().unwrap();
        let a = store.upsert_node(node("proj/a.ts", NodeType::File, "a.ts")).unwrap();
        let b = store.upsert_node(node("proj/b.ts", NodeType::File, "b.ts")).unwrap();
        let edge = GraphEdge {
            id: EdgeId(0),
            from_node_id: a,
            to_node_id: b,
            edge_type: crate::edge_types::names::DEPENDS_ON.to_string(),
            label: None,
            metadata: HashMap::new(),
            weight: 1.0,
            source_file: Some("a.ts".to_string()),
        };
        let edge_id = store.upsert_relationship(edge).unwrap();

        store
            .replace_cache(vec![InferenceCacheEntry {
                start_node_id: a,
                end_node_id: b,
                inferred_type: "depends_on".to_string(),
                edge_path: vec![edge_id],
                depth: 2,
            }])
            .unwrap();
        assert_eq!(store.cache_entries().len(), 1);

        store.delete_relationships_by_source_file("a.ts").unwrap();
        assert!(store.cache_entries().is_empty());
        assert_eq!(store.cache_state(), CacheState::Empty);
    }

    #[test]
    fn find_dependency_path_returns_shortest_path() {
        let store = Store::open_in_memory().unwrap();
        let a = store.upsert_node(node("proj/a.ts", NodeType::File, "a.ts")).unwrap();
        let b = store.upsert_node(node("proj/b.ts", NodeType::File, "b.ts")).unwrap();
        let c = store.upsert_node(node("proj/c.ts", NodeType::File, "c.ts")).unwrap();

        for (from, to) in [(a, b), (b, c)] {
            store
                .upsert_relationship(GraphEdge {
                    id: EdgeId(0),
                    from_node_id: from,
                    to_node_id: to,
                    edge_type: crate::edge_types::names::DEPENDS_ON.to_string(),
                    label: None,
                    metadata: HashMap::new(),
                    weight: 1.0,
                    source_file: None,
                })
                .unwrap();
        }

        let path = store.find_dependency_path(a, c, 10).unwrap();
        assert_eq!(path.len(), 2);
    }
}
