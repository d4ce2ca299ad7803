//! Ollama HTTP client for embeddings (`/api/embed`) and generation (`/api/generate`).

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use docrag_core::traits::{Embedder, LanguageModel};

/// Known output widths of common Ollama embedding models.
pub fn known_embedding_dim(model: &str) -> usize {
    let base = model.split(':').next().unwrap_or(model);
    match base {
        "nomic-embed-text" => 768,
        "mxbai-embed-large" => 1024,
        "bge-m3" => 1024,
        "all-minilm" => 384,
        "snowflake-arctic-embed" => 1024,
        _ => 768,
    }
}

#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    embed_model: String,
    embed_model_id: String,
    dim: usize,
    generate_model: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let embed_model = "nomic-embed-text".to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            embed_model_id: format!("ollama:{}", embed_model),
            dim: known_embedding_dim(&embed_model),
            embed_model,
            generate_model: "llama3.2:3b".to_string(),
        }
    }

    /// Embedding model; `dim` overrides the known width for that model.
    pub fn with_embedding_model(mut self, model: impl Into<String>, dim: Option<usize>) -> Self {
        self.embed_model = model.into();
        self.embed_model_id = format!("ollama:{}", self.embed_model);
        self.dim = dim.unwrap_or_else(|| known_embedding_dim(&self.embed_model));
        self
    }

    pub fn with_generation_model(mut self, model: impl Into<String>) -> Self {
        self.generate_model = model.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    fn model_id(&self) -> &str {
        &self.embed_model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let body = json!({ "model": self.embed_model, "input": texts });
        let resp: EmbedResponse = self
            .client
            .post(self.url("/api/embed"))
            .json(&body)
            .send()
            .await
            .context("ollama embed request failed")?
            .error_for_status()?
            .json()
            .await
            .context("ollama embed response was not valid JSON")?;
        ensure!(
            resp.embeddings.len() == texts.len(),
            "ollama returned {} embeddings for {} inputs",
            resp.embeddings.len(),
            texts.len()
        );
        if let Some(bad) = resp.embeddings.iter().find(|v| v.len() != self.dim) {
            return Err(anyhow!(
                "model {} returned {} dims, expected {} (set embedding.dim)",
                self.embed_model,
                bad.len(),
                self.dim
            ));
        }
        debug!(count = texts.len(), model = %self.embed_model, "ollama embeddings");
        Ok(resp.embeddings)
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let req = GenerateRequest {
            model: &self.generate_model,
            prompt,
            stream: false,
            options: json!({ "temperature": 0, "seed": 0 }),
        };
        let resp: GenerateResponse = self
            .client
            .post(self.url("/api/generate"))
            .json(&req)
            .send()
            .await
            .context("ollama generate request failed")?
            .error_for_status()?
            .json()
            .await
            .context("ollama generate response was not valid JSON")?;
        Ok(resp.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_dims_ignore_tags() {
        assert_eq!(known_embedding_dim("nomic-embed-text"), 768);
        assert_eq!(known_embedding_dim("mxbai-embed-large:latest"), 1024);
        assert_eq!(known_embedding_dim("something-new"), 768);
    }

    #[test]
    fn dim_override_wins() {
        let c = OllamaClient::new("http://localhost:11434/").with_embedding_model("custom", Some(512));
        assert_eq!(c.dim(), 512);
        assert_eq!(c.model_id(), "ollama:custom");
        assert_eq!(c.url("/api/embed"), "http://localhost:11434/api/embed");
    }

    #[test]
    fn generate_request_is_deterministic() {
        let req = GenerateRequest { model: "m", prompt: "p", stream: false, options: json!({ "temperature": 0, "seed": 0 }) };
        let v = serde_json::to_value(&req).expect("serialize");
        assert_eq!(v["stream"], json!(false));
        assert_eq!(v["options"]["temperature"], json!(0));
    }
}
