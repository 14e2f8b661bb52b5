//! Thread-safe parser pool for tree-sitter parsers
//!
//! Tree-sitter parsers are not Send + Sync, so we use a channel-based
//! approach with dedicated parser threads to work around this limitation.

use std::path::PathBuf;
use anyhow::Result;
use tree_sitter::{Parser, Language as TsLanguage};

use depgraph_core::Language;

/// Which tree-sitter grammar to load for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Rust,
    TypeScript,
    JavaScript,
    Python,
    Go,
    Java,
    C,
    Cpp,
    Generic,
}

impl FileType {
    pub fn from_language(language: Language) -> Self {
        match language {
            Language::Rust => FileType::Rust,
            Language::TypeScript => FileType::TypeScript,
            Language::JavaScript => FileType::JavaScript,
            Language::Python => FileType::Python,
            Language::Go => FileType::Go,
            Language::Java => FileType::Java,
            Language::C => FileType::C,
            Language::Cpp => FileType::Cpp,
            Language::Markdown | Language::Other => FileType::Generic,
        }
    }

    pub fn get_language(&self) -> TsLanguage {
        match self {
            FileType::Rust => tree_sitter_rust::LANGUAGE.into(),
            FileType::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            FileType::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            FileType::Python => tree_sitter_python::LANGUAGE.into(),
            FileType::Go => tree_sitter_go::LANGUAGE.into(),
            FileType::Java => tree_sitter_java::LANGUAGE.into(),
            FileType::C => tree_sitter_c::LANGUAGE.into(),
            FileType::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            FileType::Generic => tree_sitter_rust::LANGUAGE.into(),
        }
    }
}

#[derive(Debug)]
pub struct ParseRequest {
    pub file_type: FileType,
    pub content: String,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct ParseResult {
    pub tree: tree_sitter::Tree,
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug)]
struct WorkerRequest {
    request: ParseRequest,
    response_sender: std::sync::mpsc::Sender<Result<ParseResult>>,
}

pub struct ParserPool {
    sender: std::sync::mpsc::Sender<WorkerRequest>,
}

impl ParserPool {
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = std::sync::mpsc::channel::<WorkerRequest>();
        let receiver = std::sync::Arc::new(std::sync::Mutex::new(receiver));

        for i in 0..num_workers {
            let receiver = receiver.clone();
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender }
    }

    fn worker_thread(
        worker_id: usize,
        receiver: std::sync::Arc<std::sync::Mutex<std::sync::mpsc::Receiver<WorkerRequest>>>,
    ) {
        tracing::debug!("parser worker {} started", worker_id);

        let mut parser = Parser::new();

        loop {
            let request = match receiver.lock().unwrap().recv() {
                Ok(req) => req,
                Err(_) => {
                    tracing::debug!("parser worker {} shutting down", worker_id);
                    break;
                }
            };

            let WorkerRequest { request, response_sender } = request;

            let language = request.file_type.get_language();
            if let Err(e) = parser.set_language(&language) {
                let _ = response_sender.send(Err(anyhow::anyhow!("failed to set language: {}", e)));
                continue;
            }

            let result = match parser.parse(&request.content, None) {
                Some(tree) => Ok(ParseResult { tree, path: request.path, content: request.content }),
                None => Err(anyhow::anyhow!("failed to parse content")),
            };

            if response_sender.send(result).is_err() {
                tracing::warn!("failed to send parse result back to caller");
            }
        }
    }

    pub fn parse_blocking(&self, request: ParseRequest) -> Result<ParseResult> {
        let (response_sender, response_receiver) = std::sync::mpsc::channel();
        let worker_request = WorkerRequest { request, response_sender };

        self.sender.send(worker_request).map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;
        response_receiver.recv().map_err(|_| anyhow::anyhow!("parser worker died"))?
    }

    pub async fn parse(&self, request: ParseRequest) -> Result<ParseResult> {
        let sender = self.sender.clone();
        tokio::task::spawn_blocking(move || {
            let (response_sender, response_receiver) = std::sync::mpsc::channel();
            let worker_request = WorkerRequest { request, response_sender };

            sender.send(worker_request).map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;
            response_receiver.recv().map_err(|_| anyhow::anyhow!("parser worker died"))?
        })
        .await
        .map_err(|e| anyhow::anyhow!("task join error: {}", e))?
    }
}

impl Clone for ParserPool {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

/// Worker count defaults to the number of CPU cores, floored at 2.
pub fn create_parser_pool() -> ParserPool {
    let num_workers = std::thread::available_parallelism().map(|n| n.get().max(2)).unwrap_or(2);
    ParserPool::new(num_workers)
}
