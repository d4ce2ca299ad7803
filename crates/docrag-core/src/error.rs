use std::fmt;

use thiserror::Error;

/// Remote or opaque capability that a query depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    VectorIndex,
    Rerank,
    Generation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Embedding => "embedding",
            Stage::VectorIndex => "vector index",
            Stage::Rerank => "rerank",
            Stage::Generation => "generation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    /// A backend the engine depends on failed; no partial answer is produced.
    #[error("Engine unavailable: {stage} failed")]
    Unavailable {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Adapter for `map_err` at a capability call site.
    pub fn unavailable(stage: Stage) -> impl FnOnce(anyhow::Error) -> Error {
        move |source| Error::Unavailable { stage, source }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Unavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
