//! Generic fallback extractor: used for languages with no dedicated
//! front-end. Parses (so files that fail to parse are visible in logs)
//! but never extracts imports or declarations.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::extractor::{ExtractionResult, LanguageFrontend};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};

pub struct GenericExtractor {
    pool: Arc<ParserPool>,
}

impl GenericExtractor {
    pub fn new(pool: Arc<ParserPool>) -> Self {
        Self { pool }
    }
}

impl LanguageFrontend for GenericExtractor {
    fn extract(&self, path: &Path, content: &str) -> Result<ExtractionResult> {
        let request = ParseRequest { file_type: FileType::Generic, content: content.to_string(), path: path.to_path_buf() };
        let _parsed = self.pool.parse_blocking(request)?;
        Ok(ExtractionResult::default())
    }
}
