use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use docrag_core::config::{EmbeddingProvider, RerankProvider, Settings};
use docrag_core::traits::{DocumentConverter, Embedder, LanguageModel, Reranker, VectorIndex};
use docrag_embed::{get_default_embedder, HashEmbedder, BGE_M3_DIM};
use docrag_models::{HttpReranker, LexicalReranker, OllamaClient, RoutingConverter};
use docrag_vector::LanceVectorIndex;

/// Every backend handle ingestion and querying need, built once by the caller.
pub struct EngineContext {
    pub settings: Settings,
    pub converter: Arc<dyn DocumentConverter>,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub reranker: Arc<dyn Reranker>,
    pub llm: Arc<dyn LanguageModel>,
}

impl EngineContext {
    pub fn new(
        settings: Settings,
        converter: Arc<dyn DocumentConverter>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        reranker: Arc<dyn Reranker>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self { settings, converter, embedder, index, reranker, llm }
    }

    /// Wire up the configured backends. The on-disk Vector Index is opened, and
    /// only created once ingestion appends to it.
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let ollama = OllamaClient::new(settings.ollama.base_url.clone())
            .with_embedding_model(settings.embedding.model.clone(), settings.embedding.dim)
            .with_generation_model(settings.llm.model.clone());

        let embedder: Arc<dyn Embedder> = match settings.embedding.provider {
            EmbeddingProvider::Ollama => Arc::new(ollama.clone()),
            EmbeddingProvider::Local => get_default_embedder()?,
            EmbeddingProvider::Hash => Arc::new(HashEmbedder::new(settings.embedding.dim.unwrap_or(BGE_M3_DIM))),
        };
        let reranker: Arc<dyn Reranker> = match settings.rerank.provider {
            RerankProvider::Lexical => Arc::new(LexicalReranker),
            RerankProvider::Http => Arc::new(HttpReranker::new(settings.rerank.url.clone(), settings.rerank.model.clone())),
        };
        let index_path = settings.vector_index_path();
        let index = Arc::new(LanceVectorIndex::open(&index_path, embedder.dim()).await?);
        let converter = Arc::new(RoutingConverter::with_docling(settings.convert.docling_bin.clone()));
        info!(
            embedder = embedder.model_id(),
            dim = embedder.dim(),
            llm = %settings.llm.model,
            index = %index_path.display(),
            "engine context ready"
        );

        Ok(Self::new(settings, converter, embedder, index, reranker, Arc::new(ollama)))
    }
}
