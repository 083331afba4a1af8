use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("no supported document files in {0}")]
    EmptyCorpus(String),
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("index request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
