use thiserror::Error;

/// Failure from an embedding or generation provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Timeout, rate limit, connection refused — worth one retry.
    #[error("provider temporarily unavailable: {0}")]
    Transient(String),
    /// The provider rejected the request (bad model name, malformed
    /// response, auth failure). Retrying will not help.
    #[error("provider rejected request: {0}")]
    Rejected(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// Errors surfaced at the engine boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("archive contains no readable source files")]
    EmptyArchive,

    #[error("upload size {actual} bytes exceeds limit of {limit} bytes")]
    SizeLimitExceeded { actual: u64, limit: u64 },

    #[error("no repository with id {0}")]
    UnknownRepository(uuid::Uuid),

    #[error("query text is empty")]
    EmptyQuery,

    /// Query/stored vector dimension disagreement. Configuration error —
    /// never silently truncated or padded.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl EngineError {
    /// Whether the caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Provider(p) if p.is_transient())
    }
}
