//! Per-language front-ends implementing `LanguageFrontend` (§4.9 AMBIENT).
//!
//! TypeScript, JavaScript, Python and Rust get real tree-sitter walks;
//! the rest fall back to a generic extractor that parses (so syntax
//! errors surface) but reports no imports or declarations.

pub mod c;
pub mod cpp;
pub mod generic;
pub mod go;
pub mod java;
pub mod javascript;
pub mod python;
pub mod rust;
pub mod typescript;

use std::sync::Arc;

use depgraph_core::Language;

use crate::extractor::LanguageFrontend;
use crate::parser_pool::ParserPool;

/// Node.js builtin module specifiers, used to classify TS/JS imports
/// that aren't relative/absolute paths.
pub(crate) const NODE_BUILTINS: &[&str] = &[
    "fs", "path", "http", "https", "os", "crypto", "util", "events", "stream", "child_process",
    "assert", "url", "querystring", "buffer", "net", "dns", "zlib", "readline", "process",
];

pub(crate) const PYTHON_BUILTINS: &[&str] = &[
    "os", "sys", "re", "json", "math", "collections", "itertools", "functools", "typing",
    "pathlib", "logging", "subprocess", "datetime", "asyncio", "io", "abc",
];

/// Pick the front-end for `language`, sharing `pool` across all of them
/// since tree-sitter parsers are expensive to spin up per file.
pub fn frontend_for(language: Language, pool: Arc<ParserPool>) -> Box<dyn LanguageFrontend> {
    match language {
        Language::TypeScript => Box::new(typescript::TypeScriptExtractor::new(pool)),
        Language::JavaScript => Box::new(javascript::JavaScriptExtractor::new(pool)),
        Language::Python => Box::new(python::PythonExtractor::new(pool)),
        Language::Rust => Box::new(rust::RustExtractor::new(pool)),
        Language::Go => Box::new(go::GoExtractor::new(pool)),
        Language::Java => Box::new(java::JavaExtractor::new(pool)),
        Language::C => Box::new(c::CExtractor::new(pool)),
        Language::Cpp => Box::new(cpp::CppExtractor::new(pool)),
        Language::Markdown | Language::Other => Box::new(generic::GenericExtractor::new(pool)),
    }
}
