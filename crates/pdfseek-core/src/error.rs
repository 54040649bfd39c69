use thiserror::Error;

/// Failure reported by the embedding / vector-search collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("embedding service unavailable: {0}")]
pub struct EmbeddingError(pub String);

impl EmbeddingError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Invalid semantic weight {0}: expected a finite value in [0, 1]")]
    InvalidWeight(f32),

    #[error("Retrieval failed (semantic: {semantic}; keyword: {keyword})")]
    Retrieval { semantic: String, keyword: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Operation(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
