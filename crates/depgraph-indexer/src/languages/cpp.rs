//! C++ extractor — parses only. TODO: `#include` / class declaration walk.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::extractor::{ExtractionResult, LanguageFrontend};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

pub struct CppExtractor {
    pool: Arc<ParserPool>,
}

impl CppExtractor {
    pub fn new(pool: Arc<ParserPool>) -> Self {
        Self { pool }
    }
}

impl LanguageFrontend for CppExtractor {
    fn extract(&self, path: &Path, content: &str) -> Result<ExtractionResult> {
        let request = ParseRequest { file_type: FileType::Cpp, content: content.to_string(), path: path.to_path_buf() };
        let _parsed = self.pool.parse_blocking(request)?;
        Ok(ExtractionResult::default())
    }
}
