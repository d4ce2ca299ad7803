//! Domain types shared by ingestion and query serving.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ChunkId = String;

/// A bounded slice of one source document's text.
///
/// - `id`: globally unique, minted when the chunk is created
/// - `text`: the chunk payload, stored verbatim in the Content Store
/// - `source`: originating filename relative to the input directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub source: String,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4().to_string(), text: text.into(), source: source.into() }
    }
}

/// One row appended to the Vector Index. Carries no chunk text.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: ChunkId,
    pub source: String,
    pub vector: Vec<f32>,
}

/// Nearest-neighbour result from the Vector Index.
///
/// `score` is a similarity (higher is better). `seq` is the insertion
/// position of the row and breaks score ties.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: ChunkId,
    pub source: String,
    pub score: f32,
    pub seq: i64,
}

/// A vector hit joined with its Content Store record. Lives for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalCandidate {
    pub id: ChunkId,
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// A candidate that survived reranking, with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankedResult {
    pub id: ChunkId,
    pub text: String,
    pub source: String,
    pub relevance: f32,
}

/// The engine's output: answer text plus the unique sources it was grounded on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<String>,
}

/// Order-preserving de-duplication of source filenames.
pub fn unique_sources<'a, I>(sources: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out: Vec<String> = Vec::new();
    for s in sources {
        if !out.iter().any(|seen| seen == s) {
            out.push(s.to_string());
        }
    }
    out
}
