use std::collections::HashSet;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use docrag_core::traits::Reranker;

/// Scores a passage by the fraction of distinct query terms it contains.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalReranker;

fn terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

impl LexicalReranker {
    pub fn score(query: &str, passage: &str) -> f32 {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return 0.0;
        }
        let passage_terms: HashSet<String> = terms(passage).into_iter().collect();
        let hits = query_terms.iter().filter(|t| passage_terms.contains(*t)).count();
        hits as f32 / query_terms.len() as f32
    }
}

#[async_trait]
impl Reranker for LexicalReranker {
    async fn rerank(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        Ok(passages.iter().map(|p| Self::score(query, p)).collect())
    }
}

/// Cross-encoder served over HTTP (`POST {url}` with `{model, query, texts}`).
pub struct HttpReranker {
    client: reqwest::Client,
    url: String,
    model: String,
}

#[derive(Deserialize)]
struct RerankScore {
    index: usize,
    score: f32,
}

impl HttpReranker {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), url: url.into(), model: model.into() }
    }
}

/// Put `[{index, score}]` back into input order; every index must be present once.
fn scores_in_input_order(scored: Vec<RerankScore>, len: usize) -> Result<Vec<f32>> {
    let mut out: Vec<Option<f32>> = vec![None; len];
    for s in scored {
        let slot = out.get_mut(s.index).ok_or_else(|| anyhow!("rerank index {} out of range", s.index))?;
        *slot = Some(s.score);
    }
    out.into_iter()
        .enumerate()
        .map(|(i, s)| s.ok_or_else(|| anyhow!("reranker returned no score for passage {}", i)))
        .collect()
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(vec![]);
        }
        let body = json!({ "model": self.model, "query": query, "texts": passages });
        let scored: Vec<RerankScore> = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("rerank request failed")?
            .error_for_status()?
            .json()
            .await
            .context("rerank response was not valid JSON")?;
        scores_in_input_order(scored, passages.len())
    }
}
