//! docrag-models
//!
//! Backends for the opaque capabilities the engine depends on: document
//! conversion, remote embeddings, reranking and text generation.

pub mod convert;
pub mod ollama;
pub mod rerank;

pub use convert::{DoclingConverter, PlainTextConverter, RoutingConverter};
pub use ollama::OllamaClient;
pub use rerank::{HttpReranker, LexicalReranker};
