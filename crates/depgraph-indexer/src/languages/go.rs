//! Go extractor — parses so malformed Go surfaces as an error, but
//! doesn't yet extract imports or declarations.
//! TODO: walk import_spec / type_declaration nodes once Go is a worked
//! scenario rather than a supported-but-untested language.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::extractor::{ExtractionResult, LanguageFrontend};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

pub struct GoExtractor {
    pool: Arc<ParserPool>,
}

impl GoExtractor {
    pub fn new(pool: Arc<ParserPool>) -> Self {
        Self { pool }
    }
}

impl LanguageFrontend for GoExtractor {
    fn extract(&self, path: &Path, content: &str) -> Result<ExtractionResult> {
        let request = ParseRequest { file_type: FileType::Go, content: content.to_string(), path: path.to_path_buf() };
        let _parsed = self.pool.parse_blocking(request)?;
        Ok(ExtractionResult::default())
    }
}
