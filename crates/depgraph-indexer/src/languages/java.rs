//! Java extractor — parses only, same as `go`. TODO: import_declaration
//! / class_declaration walk.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::extractor::{ExtractionResult, LanguageFrontend};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

pub struct JavaExtractor {
    pool: Arc<ParserPool>,
}

impl JavaExtractor {
    pub fn new(pool: Arc<ParserPool>) -> Self {
        Self { pool }
    }
}

impl LanguageFrontend for JavaExtractor {
    fn extract(&self, path: &Path, content: &str) -> Result<ExtractionResult> {
        let request = ParseRequest { file_type: FileType::Java, content: content.to_string(), path: path.to_path_buf() };
        let _parsed = self.pool.parse_blocking(request)?;
        Ok(ExtractionResult::default())
    }
}
