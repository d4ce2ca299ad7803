use std::path::Path;

use async_trait::async_trait;

use crate::types::{IndexEntry, VectorHit};

/// Turns a source file into normalized, markdown-like text.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    fn supports(&self, path: &Path) -> bool;
    async fn convert(&self, path: &Path) -> anyhow::Result<String>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `ollama:nomic-embed-text`).
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Scores passages against a query.
///
/// Returns exactly one score per passage, in input order; higher is more relevant.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, passages: &[String]) -> anyhow::Result<Vec<f32>>;
}

/// A deterministic text completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Append entries. Existing rows are never removed.
    async fn add(&self, entries: &[IndexEntry]) -> anyhow::Result<()>;
    /// Up to `k` hits ordered by descending score, ties by insertion order.
    async fn search(&self, query: &[f32], k: usize) -> anyhow::Result<Vec<VectorHit>>;
    async fn count(&self) -> anyhow::Result<usize>;
}
