//! depgraph-indexer — turns a project tree into the inputs the Graph
//! Store needs: parser contract types, the Path Resolver, the
//! File-Dependency Analyzer, per-language front-ends, and the
//! coordinator that ties a full-repository index together.

pub mod coordinator;
pub mod extractor;
pub mod file_analyzer;
pub mod languages;
pub mod parser_pool;
pub mod path_resolver;

pub use coordinator::{Coordinator, FileIndexReport, IndexReport};
pub use extractor::{Declaration, ExtractionResult, ImportKind, ImportSource, ImportedSymbol, LanguageFrontend, SourceLocation};
pub use file_analyzer::{AnalysisOutput, AnalysisStats, DiskFileExists, FileDependencyAnalyzer, FileExists};
pub use languages::frontend_for;
pub use parser_pool::{create_parser_pool, FileType, ParseRequest, ParseResult, ParserPool};
