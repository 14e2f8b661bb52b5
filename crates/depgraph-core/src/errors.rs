//! Typed error kinds (§7). Storage failures bubble unchanged; analysis and
//! per-edge-type inference failures are collected rather than aborting a
//! batch — see `inference::InferenceEngine::sync_cache` and
//! `indexer`'s per-file analysis loop.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,
    #[error("malformed identifier: {0}")]
    Malformed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EdgeTypeError {
    #[error("unknown edge type: {0}")]
    UnknownType(String),
    #[error("edge type {0} is not transitive")]
    NotTransitive(String),
    #[error("edge type {0} is not inheritable")]
    NotInheritable(String),
    #[error("edge type {0} has a parent cycle")]
    HierarchyCycle(String),
    #[error("edge type {child} declares undefined parent {parent}")]
    UndefinedParent { child: String, parent: String },
}

#[derive(Debug, Error)]
pub enum InferenceQueryError {
    #[error(transparent)]
    EdgeType(#[from] EdgeTypeError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("query exceeded its deadline")]
    Timeout,
}

#[derive(Debug, Error)]
#[error("operation timed out")]
pub struct TimeoutError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("could not analyze {path}: {reason}")]
    Skipped { path: String, reason: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
