use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::splitter::TextSplitter;
use crate::types::Chunk;

/// File extensions the ingestion pipeline accepts (lowercase).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "xlsx", "csv", "docx", "txt", "md"];

/// A file in the input collection. Only its chunks are ever persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    /// Filename relative to the input directory, `/`-separated.
    pub source: String,
    pub format: String,
}

pub struct DataProcessor {
    splitter: TextSplitter,
}

impl DataProcessor {
    pub fn new(chunking: ChunkingConfig) -> Result<Self> {
        Ok(Self { splitter: TextSplitter::new(chunking)? })
    }

    /// Supported files under `data_dir`, sorted by source name.
    ///
    /// A missing directory is treated like an empty one.
    pub fn list_documents(&self, data_dir: &Path) -> Vec<SourceDocument> {
        if !data_dir.is_dir() {
            warn!(dir = %data_dir.display(), "input directory does not exist");
            return vec![];
        }
        let mut docs = Vec::new();
        for entry in walkdir::WalkDir::new(data_dir).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            let Some(format) = format_of(path) else {
                debug!(file = %path.display(), "skipping unsupported file");
                continue;
            };
            let relative = path.strip_prefix(data_dir).unwrap_or(path);
            let source = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
            docs.push(SourceDocument { path: path.to_path_buf(), source, format });
        }
        docs.sort_by(|a, b| a.source.cmp(&b.source));
        docs
    }

    /// Split one converted document into chunks with fresh ids.
    ///
    /// The filename is prepended as a text field so filename tokens are searchable.
    pub fn chunk_document(&self, source: &str, converted: &str) -> Vec<Chunk> {
        let augmented = augment_with_filename(source, converted);
        self.splitter.split(&augmented).into_iter().map(|text| Chunk::new(text, source)).collect()
    }
}

pub fn augment_with_filename(source: &str, text: &str) -> String {
    format!("filename: {}\n\n{}", source, text)
}

fn format_of(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}
