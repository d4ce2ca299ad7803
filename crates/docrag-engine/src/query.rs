//! Query serving: retrieve → join → rerank → prompt → generate.
//!
//! The engine holds only shared read-only state, so one instance can serve
//! concurrent callers.

use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use docrag_core::content_store::ContentStore;
use docrag_core::error::{Error, Result, Stage};
use docrag_core::request::QueryRequest;
use docrag_core::types::{unique_sources, Answer, RerankedResult, RetrievalCandidate, VectorHit};

use crate::context::EngineContext;
use crate::prompt::build_prompt;

pub const NOT_FOUND_ANSWER: &str = "Sorry, I could not find any relevant information in the documents.";

#[derive(Clone)]
pub struct QueryEngine {
    ctx: Arc<EngineContext>,
    store: Arc<ContentStore>,
}

impl QueryEngine {
    pub fn new(ctx: Arc<EngineContext>, store: ContentStore) -> Self {
        Self { ctx, store: Arc::new(store) }
    }

    /// Load the Content Store snapshot named by the context's settings.
    pub fn load(ctx: Arc<EngineContext>) -> Result<Self> {
        let index_path = ctx.settings.vector_index_path();
        if !index_path.exists() {
            warn!(path = %index_path.display(), "vector index not found; run the indexer first");
        }
        let path = ctx.settings.content_store_path();
        let store = ContentStore::load(&path)?;
        info!(records = store.len(), path = %path.display(), "content store loaded");
        Ok(Self::new(ctx, store))
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Nearest chunks to the question, at most `retrieval.top_k`, best first.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<VectorHit>> {
        let k = self.ctx.settings.retrieval.top_k;
        let mut vectors = self
            .ctx
            .embedder
            .embed_batch(&[question.to_string()])
            .await
            .map_err(Error::unavailable(Stage::Embedding))?;
        let query_vec = vectors
            .pop()
            .ok_or_else(|| Error::unavailable(Stage::Embedding)(anyhow!("embedder returned no vector")))?;
        let mut hits = self
            .ctx
            .index
            .search(&query_vec, k)
            .await
            .map_err(Error::unavailable(Stage::VectorIndex))?;
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.seq.cmp(&b.seq)));
        hits.truncate(k);
        Ok(hits)
    }

    /// Attach stored text to each hit. Ids missing from the store are dropped.
    pub fn join(&self, hits: Vec<VectorHit>) -> Vec<RetrievalCandidate> {
        hits.into_iter()
            .filter_map(|hit| match self.store.get(&hit.id) {
                Some(record) => Some(RetrievalCandidate {
                    id: hit.id,
                    text: record.text.clone(),
                    source: record.source.clone(),
                    score: hit.score,
                }),
                None => {
                    debug!(id = %hit.id, "index hit missing from content store; dropped");
                    None
                }
            })
            .collect()
    }

    /// Best `retrieval.top_n` candidates by relevance; ties keep candidate order.
    pub async fn rerank(&self, question: &str, candidates: Vec<RetrievalCandidate>) -> Result<Vec<RerankedResult>> {
        let passages: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let scores = self
            .ctx
            .reranker
            .rerank(question, &passages)
            .await
            .map_err(Error::unavailable(Stage::Rerank))?;
        if scores.len() != candidates.len() {
            return Err(Error::unavailable(Stage::Rerank)(anyhow!(
                "reranker returned {} scores for {} passages",
                scores.len(),
                candidates.len()
            )));
        }
        let mut ranked: Vec<RerankedResult> = candidates
            .into_iter()
            .zip(scores)
            .map(|(c, relevance)| RerankedResult { id: c.id, text: c.text, source: c.source, relevance })
            .collect();
        // sort_by is stable
        ranked.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        ranked.truncate(self.ctx.settings.retrieval.top_n);
        Ok(ranked)
    }

    pub async fn respond(&self, request: &QueryRequest) -> Result<Answer> {
        Ok(self.respond_detailed(request).await?.0)
    }

    /// Like [`QueryEngine::respond`], also returning the reranked context the answer was built from.
    pub async fn respond_detailed(&self, request: &QueryRequest) -> Result<(Answer, Vec<RerankedResult>)> {
        let question = request.question();
        let hits = self.retrieve(question).await?;
        let retrieved = hits.len();
        let candidates = self.join(hits);
        if candidates.is_empty() {
            info!(retrieved, "no candidates survived the join");
            return Ok((Answer { text: NOT_FOUND_ANSWER.to_string(), sources: vec![] }, vec![]));
        }
        let joined = candidates.len();

        let top = self.rerank(question, candidates).await?;
        let prompt = build_prompt(question, &top);
        let text = self.ctx.llm.complete(&prompt).await.map_err(Error::unavailable(Stage::Generation))?;
        let sources = unique_sources(top.iter().map(|r| r.source.as_str()));
        debug!(retrieved, joined, reranked = top.len(), sources = ?sources, "answer generated");
        Ok((Answer { text, sources }, top))
    }

    /// `generate_response(query) -> (answer, sources)` over a raw string.
    pub async fn generate_response(&self, query: &str) -> Result<Answer> {
        self.respond(&QueryRequest::new(query)?).await
    }
}
