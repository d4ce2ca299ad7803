//! docrag-engine
//!
//! Ingestion and query serving over an explicitly constructed [`EngineContext`].

pub mod context;
pub mod ingest;
pub mod judge;
pub mod prompt;
pub mod query;

pub use context::EngineContext;
pub use ingest::{IngestReport, Ingestor};
pub use judge::{Judge, Verdict};
pub use query::{QueryEngine, NOT_FOUND_ANSWER};
