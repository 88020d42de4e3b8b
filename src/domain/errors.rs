//! Domain errors for the retrieval-augmented reply core.

use thiserror::Error;

use crate::domain::models::EmbeddingStatus;

/// Maximum number of characters of an upstream response body kept in an error.
pub const MAX_ERROR_BODY_CHARS: usize = 512;

/// Truncate an upstream body for diagnostics, appending an ellipsis when cut.
pub fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        return body.to_string();
    }
    let mut cut: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    cut.push_str("...");
    cut
}

fn format_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "n/a".to_string(), |s| s.to_string())
}

/// Errors produced by the embedding, vector store, retrieval and reply paths.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("Embedding provider is not configured: {0}")]
    ProviderUnconfigured(String),

    #[error("{provider} call failed (status {}): {body}", format_status(.status))]
    ProviderCall {
        provider: String,
        status: Option<u16>,
        body: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Vector database {operation} failed: {message}")]
    VectorDatabase { operation: String, message: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Length mismatch: {0}")]
    LengthMismatch(String),

    #[error("Collection migration failed: {0}")]
    Migration(String),

    #[error("No content could be extracted from the model response")]
    NoContentExtracted,

    #[error("No AI configuration found: {0}")]
    NoConfigurationFound(String),

    #[error("AI configuration {0} is disabled")]
    ConfigurationDisabled(u64),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Unsupported model type: {0}")]
    UnsupportedModelType(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Background queue is closed or full")]
    QueueClosed,

    #[error("Timed out during {0}")]
    Timeout(&'static str),

    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error("Embedding status of item {id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        id: u64,
        from: EmbeddingStatus,
        to: EmbeddingStatus,
    },
}

pub type RagResult<T> = Result<T, RagError>;

impl RagError {
    /// Build a provider call error from an HTTP status and raw body.
    pub fn provider_call(provider: impl Into<String>, status: Option<u16>, body: &str) -> Self {
        Self::ProviderCall {
            provider: provider.into(),
            status,
            body: truncate_body(body),
        }
    }

    /// Build a vector database error for the named operation.
    pub fn vector_db(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::VectorDatabase {
            operation: operation.into(),
            message: truncate_body(&message.to_string()),
        }
    }

    /// Returns true if retrying the same call may succeed.
    ///
    /// Transport failures, timeouts, rate limiting (429) and server errors (5xx)
    /// are transient. Everything else is a permanent failure.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::ProviderCall { status, .. } => {
                matches!(status, Some(429 | 500..=599))
            }
            _ => false,
        }
    }

    /// Returns true if this error means the embedding provider has no usable configuration.
    pub fn is_unconfigured(&self) -> bool {
        matches!(self, Self::ProviderUnconfigured(_))
    }
}

/// Best-effort text of a caught panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout("http request")
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
