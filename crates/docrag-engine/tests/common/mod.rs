#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;

use docrag_core::config::{Settings, WriteMode};
use docrag_core::traits::{DocumentConverter, Embedder, LanguageModel, Reranker, VectorIndex};
use docrag_core::types::{IndexEntry, VectorHit};
use docrag_embed::HashEmbedder;
use docrag_engine::EngineContext;
use docrag_models::LexicalReranker;
use docrag_vector::LanceVectorIndex;

pub const DIM: usize = 64;

/// Reads every file as text; any file named `broken*` fails to convert.
pub struct FakeConverter;

#[async_trait]
impl DocumentConverter for FakeConverter {
    fn supports(&self, _path: &Path) -> bool {
        true
    }

    async fn convert(&self, path: &Path) -> Result<String> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.starts_with("broken") {
            bail!("unreadable document");
        }
        Ok(std::fs::read_to_string(path)?)
    }
}

/// Hash embeddings, except texts containing `EMBED_FAIL` (or everything when `down`).
pub struct FlakyEmbedder {
    inner: HashEmbedder,
    pub down: bool,
}

impl FlakyEmbedder {
    pub fn new() -> Self {
        Self { inner: HashEmbedder::new(DIM), down: false }
    }
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dim(&self) -> usize {
        DIM
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.down || texts.iter().any(|t| t.contains("EMBED_FAIL")) {
            bail!("embedding service unreachable");
        }
        self.inner.embed_batch(texts).await
    }
}

#[derive(Default)]
pub struct CountingReranker {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Reranker for CountingReranker {
    async fn rerank(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        LexicalReranker.rerank(query, passages).await
    }
}

/// Summarizes the context it was given; fails when `down`.
#[derive(Default)]
pub struct CountingLlm {
    pub calls: AtomicUsize,
    pub down: bool,
    pub last_prompt: std::sync::Mutex<String>,
}

#[async_trait]
impl LanguageModel for CountingLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down {
            bail!("model backend unreachable");
        }
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = prompt.to_string();
        }
        if prompt.contains("gloves") {
            Ok("Use protective gear: gloves and goggles.".to_string())
        } else {
            Ok("I do not know.".to_string())
        }
    }
}

/// Fails outright, or (when `short`) returns one score too few.
pub struct FailingReranker {
    pub short: bool,
}

#[async_trait]
impl Reranker for FailingReranker {
    async fn rerank(&self, _query: &str, passages: &[String]) -> Result<Vec<f32>> {
        if self.short {
            return Ok(vec![0.5; passages.len().saturating_sub(1)]);
        }
        bail!("rerank service unreachable")
    }
}

pub struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn add(&self, _entries: &[IndexEntry]) -> Result<()> {
        bail!("index offline")
    }

    async fn search(&self, _query: &[f32], _k: usize) -> Result<Vec<VectorHit>> {
        bail!("index offline")
    }

    async fn count(&self) -> Result<usize> {
        bail!("index offline")
    }
}

pub struct Harness {
    pub ctx: Arc<EngineContext>,
    pub reranker: Arc<CountingReranker>,
    pub llm: Arc<CountingLlm>,
}

pub fn settings(root: &Path, write_mode: WriteMode) -> Settings {
    let mut s = Settings::default();
    s.paths.input_dir = root.join("data").to_string_lossy().into_owned();
    s.paths.storage_dir = root.join("storage").to_string_lossy().into_owned();
    s.store.write_mode = write_mode;
    s
}

pub async fn harness_with(settings: Settings, embedder: FlakyEmbedder, llm: CountingLlm) -> Harness {
    let index = LanceVectorIndex::open(&settings.vector_index_path(), DIM).await.expect("open index");
    let reranker = Arc::new(CountingReranker::default());
    let llm = Arc::new(llm);
    let ctx = EngineContext::new(
        settings,
        Arc::new(FakeConverter),
        Arc::new(embedder),
        Arc::new(index),
        reranker.clone(),
        llm.clone(),
    );
    Harness { ctx: Arc::new(ctx), reranker, llm }
}

/// Context over explicit index and reranker backends with hash embeddings.
pub fn context_with(
    settings: Settings,
    index: Arc<dyn VectorIndex>,
    reranker: Arc<dyn Reranker>,
    llm: Arc<CountingLlm>,
) -> Arc<EngineContext> {
    Arc::new(EngineContext::new(settings, Arc::new(FakeConverter), Arc::new(FlakyEmbedder::new()), index, reranker, llm))
}

pub async fn harness(root: &Path, write_mode: WriteMode) -> Harness {
    harness_with(settings(root, write_mode), FlakyEmbedder::new(), CountingLlm::default()).await
}

pub fn write_doc(root: &Path, name: &str, text: &str) {
    let path = root.join("data").join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdir");
    }
    std::fs::write(path, text).expect("write doc");
}

pub fn calls(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
