use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid parameter. Fatal, never retried.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Empty or whitespace-only query, rejected before any index is touched.
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// Every retriever needed to answer the query failed.
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Initialization required: call initialize() before searching")]
    NotInitialized,

    #[error("Index build failed: {0}")]
    Index(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
