use async_openai::error::OpenAIError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("extraction result does not match the expected shape: {0}")]
    SchemaViolation(String),

    #[error("upstream unavailable: {0}")]
    Upstream(String),

    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("run cancelled")]
    Cancelled,

    #[error("Missing arg: {0}")]
    MissingArg(String),

    #[error("Json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Openai error: {0}")]
    OpenaiError(#[from] OpenAIError),

    #[error("Qdrant error: {0}")]
    QdrantError(#[from] qdrant_client::QdrantError),

    #[error("Http error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}

impl Error {
    /// Rate-limit classification used by the fetch client's retry policy:
    /// the dedicated variant, or any upstream message mentioning it.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Error::RateLimited(_) => true,
            other => other.to_string().to_lowercase().contains("rate limit"),
        }
    }
}
