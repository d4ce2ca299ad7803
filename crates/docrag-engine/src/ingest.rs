//! Offline indexing: convert → chunk → embed → append to both stores.
//!
//! Files are processed sequentially. A file is all-or-nothing: its chunks
//! reach the Vector Index and the Content Store only after every one of them
//! has been embedded.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use docrag_core::config::WriteMode;
use docrag_core::content_store::ContentStore;
use docrag_core::data_processor::{DataProcessor, SourceDocument};
use docrag_core::error::{Error, Result, Stage};
use docrag_core::types::{Chunk, IndexEntry};

use crate::context::EngineContext;

#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestReport {
    pub files_seen: usize,
    pub files_indexed: usize,
    /// `(source, reason)` for every skipped file.
    pub files_failed: Vec<(String, String)>,
    pub chunks_written: usize,
}

pub struct Ingestor<'a> {
    ctx: &'a EngineContext,
    processor: DataProcessor,
}

enum FileError {
    /// Skip this file and keep going.
    Skip(String),
    /// The index write failed; the run cannot continue.
    Fatal(Error),
}

impl<'a> Ingestor<'a> {
    pub fn new(ctx: &'a EngineContext) -> Result<Self> {
        Ok(Self { ctx, processor: DataProcessor::new(ctx.settings.chunking)? })
    }

    pub async fn run(&self) -> Result<IngestReport> {
        let settings = &self.ctx.settings;
        let input_dir = settings.input_dir();
        let store_path = settings.content_store_path();

        let mut store = match settings.store.write_mode {
            WriteMode::Replace => ContentStore::new(),
            WriteMode::Merge => ContentStore::load(&store_path)?,
        };
        let docs = self.processor.list_documents(&input_dir);
        let mut report = IngestReport { files_seen: docs.len(), ..Default::default() };

        if docs.is_empty() {
            warn!(dir = %input_dir.display(), "no supported documents found; writing empty content store");
            store.persist(&store_path)?;
            return Ok(report);
        }
        info!(files = docs.len(), dir = %input_dir.display(), mode = ?settings.store.write_mode, "indexing started");

        let pb = ProgressBar::new(docs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        for doc in &docs {
            pb.set_message(doc.source.clone());
            match self.ingest_file(doc).await {
                Ok(chunks) => {
                    store.insert_chunks(&chunks)?;
                    report.files_indexed += 1;
                    report.chunks_written += chunks.len();
                    debug!(file = %doc.source, chunks = chunks.len(), "file indexed");
                }
                Err(FileError::Skip(reason)) => {
                    warn!(file = %doc.source, error = %reason, "skipping file");
                    report.files_failed.push((doc.source.clone(), reason));
                }
                Err(FileError::Fatal(e)) => {
                    pb.abandon_with_message("aborted");
                    // Keep the store in step with the rows already appended.
                    store.persist(&store_path)?;
                    error!(file = %doc.source, error = %e, "vector index write failed; aborting run");
                    return Err(e);
                }
            }
            pb.inc(1);
        }
        pb.finish_with_message("done");

        store.persist(&store_path)?;
        info!(
            indexed = report.files_indexed,
            failed = report.files_failed.len(),
            chunks = report.chunks_written,
            store_records = store.len(),
            "indexing finished"
        );
        Ok(report)
    }

    async fn ingest_file(&self, doc: &SourceDocument) -> std::result::Result<Vec<Chunk>, FileError> {
        let text = self
            .ctx
            .converter
            .convert(&doc.path)
            .await
            .map_err(|e| FileError::Skip(format!("conversion failed: {e:#}")))?;
        let chunks = self.processor.chunk_document(&doc.source, &text);
        if chunks.is_empty() {
            return Ok(chunks);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .ctx
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| FileError::Skip(format!("embedding failed: {e:#}")))?;
        if vectors.len() != chunks.len() {
            return Err(FileError::Skip(format!(
                "embedding returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(vectors)
            .map(|(c, vector)| IndexEntry { id: c.id.clone(), source: c.source.clone(), vector })
            .collect();
        self.ctx
            .index
            .add(&entries)
            .await
            .map_err(|e| FileError::Fatal(Error::unavailable(Stage::VectorIndex)(e)))?;
        Ok(chunks)
    }
}
