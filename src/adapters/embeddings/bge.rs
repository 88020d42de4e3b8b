//! BGE embedding provider adapter.
//!
//! Speaks the HuggingFace inference format served by text-embeddings-inference
//! and similar local servers: `{"inputs": [...]}` in, `[[f32]]` out.

use async_trait::async_trait;
use serde::Serialize;

use super::http::{embeddings_url, send_json, warn_on_count_mismatch, EmbeddingTimeouts};
use crate::domain::errors::RagResult;
use crate::domain::models::{EmbeddingProviderKind, EmbeddingSettings, EmbeddingVector};
use crate::domain::ports::EmbeddingProvider;

#[derive(Debug, Clone)]
pub struct BgeEmbeddingConfig {
    /// Default: `http://localhost:8080`.
    pub base_url: String,
    /// Optional bearer token for hosted inference endpoints.
    pub api_key: Option<String>,
    /// Default: `bge-small-zh-v1.5`.
    pub model: String,
    pub dimension: usize,
    pub timeouts: EmbeddingTimeouts,
    pub max_batch_size: usize,
}

impl BgeEmbeddingConfig {
    pub fn from_settings(settings: &EmbeddingSettings, timeouts: EmbeddingTimeouts) -> Self {
        Self {
            base_url: settings.base_url(),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: settings.model_name(),
            dimension: settings.resolved_dimension(),
            timeouts,
            max_batch_size: 32,
        }
    }
}

pub struct BgeEmbeddingProvider {
    config: BgeEmbeddingConfig,
    client: reqwest::Client,
}

impl BgeEmbeddingProvider {
    pub fn new(config: BgeEmbeddingConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl EmbeddingProvider for BgeEmbeddingProvider {
    fn name(&self) -> &'static str {
        EmbeddingProviderKind::Bge.as_str()
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed_texts(&self, texts: &[String]) -> RagResult<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(embeddings_url(&self.config.base_url))
            .timeout(self.config.timeouts.for_batch(texts.len()))
            .json(&InferenceRequest { inputs: texts });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let vectors: Vec<EmbeddingVector> = send_json(self.name(), request).await?;
        warn_on_count_mismatch(self.name(), texts.len(), vectors.len());
        Ok(vectors)
    }

    fn max_batch_size(&self) -> usize {
        self.config.max_batch_size
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a [String],
}
