//! Placeholder embedding provider used when no configuration exists.
//!
//! Keeps the type system satisfied while making every embed call fail with a
//! clear "not configured" error instead of crashing the caller.

use async_trait::async_trait;

use super::embedding::EmbeddingProvider;
use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{EmbeddingVector, DEFAULT_EMBEDDING_DIMENSION};

/// Embedding provider that reports the default dimension and refuses to embed.
#[derive(Debug, Clone)]
pub struct UnconfiguredEmbeddingProvider {
    reason: String,
}

impl UnconfiguredEmbeddingProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for UnconfiguredEmbeddingProvider {
    fn default() -> Self {
        Self::new("no embedding configuration has been saved")
    }
}

#[async_trait]
impl EmbeddingProvider for UnconfiguredEmbeddingProvider {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    fn model_name(&self) -> &str {
        "unconfigured"
    }

    fn dimension(&self) -> usize {
        DEFAULT_EMBEDDING_DIMENSION
    }

    async fn embed_texts(&self, _texts: &[String]) -> RagResult<Vec<EmbeddingVector>> {
        Err(RagError::ProviderUnconfigured(self.reason.clone()))
    }
}
