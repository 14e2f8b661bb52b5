//! depgraph-core — persisted typed code-dependency graph: identifiers,
//! edge-type registry, storage, inference, unknown resolution, cycle
//! detection, and node-centric metrics.

pub mod analysis;
pub mod cycles;
pub mod edge_types;
pub mod errors;
pub mod identifier;
pub mod inference;
pub mod model;
pub mod store;
pub mod symbols;
pub mod unknown;
pub mod workspace;

pub use analysis::{NodeCentricAnalyzer, NodeMetrics};
pub use cycles::{detect_cycles, Cycle, CycleDetectionOptions, CycleDetectionResult};
pub use edge_types::{names as edge_type_names, EdgeTypeDef, EdgeTypeRegistry};
pub use errors::{AnalysisError, EdgeTypeError, IdentifierError, InferenceQueryError, StorageError, TimeoutError};
pub use inference::{CachePolicy, HierarchicalOptions, InferenceEngine, InheritableOptions, TransitiveOptions, ValidationReport};
pub use model::{
    EdgeFilter, EdgeId, GraphEdge, GraphNode, GraphStatistics, InferenceCacheEntry, InferenceKind, InferencePath,
    InferredRelationship, Language, MissingLink, MissingLinkDiagnostic, MissingLinkReason, NodeFilter, NodeId,
    NodeType,
};
pub use store::{CacheState, Store, StoreTransaction};
pub use symbols::SymbolTable;
pub use unknown::{ResolutionOutcome, UnknownResolver, UnresolvedReason};
pub use workspace::{detect_workspace, project_name, WorkspaceType};
