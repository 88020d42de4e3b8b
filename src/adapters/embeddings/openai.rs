//! OpenAI embedding provider adapter.
//!
//! Calls an OpenAI-compatible `/embeddings` endpoint (OpenAI, Azure OpenAI,
//! self-hosted gateways). The configured base URL may already end in
//! `/embeddings`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::{embeddings_url, send_json, warn_on_count_mismatch, EmbeddingTimeouts};
use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{EmbeddingProviderKind, EmbeddingSettings, EmbeddingVector};
use crate::domain::ports::EmbeddingProvider;

/// Configuration for the OpenAI embedding provider.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingConfig {
    pub api_key: String,
    /// Base URL for the API. Default: `https://api.openai.com/v1`.
    pub base_url: String,
    /// Embedding model. Default: `text-embedding-3-small`.
    pub model: String,
    /// Output dimension. Default: looked up from the model name.
    pub dimension: usize,
    pub timeouts: EmbeddingTimeouts,
    /// Maximum texts per single API request. Default: 2048.
    pub max_batch_size: usize,
}

impl OpenAiEmbeddingConfig {
    /// Build from stored settings. Fails when no API key is configured.
    pub fn from_settings(settings: &EmbeddingSettings, timeouts: EmbeddingTimeouts) -> RagResult<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                RagError::ProviderUnconfigured("OpenAI embedding API key is not set".to_string())
            })?;
        Ok(Self {
            api_key,
            base_url: settings.base_url(),
            model: settings.model_name(),
            dimension: settings.resolved_dimension(),
            timeouts,
            max_batch_size: 2048,
        })
    }
}

/// OpenAI embedding provider.
pub struct OpenAiEmbeddingProvider {
    config: OpenAiEmbeddingConfig,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: OpenAiEmbeddingConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &'static str {
        EmbeddingProviderKind::OpenAi.as_str()
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

        let url = embeddings_url(&self.config.base_url);
        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.timeouts.for_batch(texts.len()))
            .json(&EmbeddingsRequest {
                model: &self.config.model,
                input: texts,
            });

        let result: EmbeddingsResponse = send_json(self.name(), request).await?;

        // Sort by index to maintain input order
        let mut data = result.data;
        data.sort_by_key(|d| d.index);
        warn_on_count_mismatch(self.name(), texts.len(), data.len());

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn max_batch_size(&self) -> usize {
        self.config.max_batch_size
    }
}

// -- OpenAI API request/response types --

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(api_key: Option<&str>) -> EmbeddingSettings {
        EmbeddingSettings {
            kind: EmbeddingProviderKind::OpenAi,
            base_url: None,
            api_key: api_key.map(str::to_string),
            model: Some("text-embedding-3-large".to_string()),
            dimension: None,
        }
    }

    #[test]
    fn test_config_from_settings() {
        let config =
            OpenAiEmbeddingConfig::from_settings(&settings(Some("sk-test")), EmbeddingTimeouts::default())
                .unwrap();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "text-embedding-3-large");
        assert_eq!(config.dimension, 3072);
        assert_eq!(config.max_batch_size, 2048);
    }

    #[test]
    fn test_config_requires_api_key() {
        let err = OpenAiEmbeddingConfig::from_settings(&settings(Some("  ")), EmbeddingTimeouts::default())
            .unwrap_err();
        assert!(err.is_unconfigured());
        assert!(OpenAiEmbeddingConfig::from_settings(&settings(None), EmbeddingTimeouts::default()).is_err());
    }

    fn provider(server: &mockito::ServerGuard) -> OpenAiEmbeddingProvider {
        let mut settings = settings(Some("sk-test"));
        settings.base_url = Some(format!("{}/v1", server.url()));
        settings.dimension = Some(3);
        let config =
            OpenAiEmbeddingConfig::from_settings(&settings, EmbeddingTimeouts::default()).unwrap();
        OpenAiEmbeddingProvider::new(config, reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_embed_reorders_by_index() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "text-embedding-3-large",
                "input": ["first", "second"]
            })))
            .with_status(200)
            .with_body(
                r#"{"data":[
                    {"embedding":[0.0,1.0,0.0],"index":1},
                    {"embedding":[1.0,0.0,0.0],"index":0}
                ]}"#,
            )
            .create_async()
            .await;

        let vectors = provider(&server)
            .embed_texts(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_200_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/embeddings")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let err = provider(&server).embed("hello").await.unwrap_err();
        assert!(err.is_transient());
        match err {
            RagError::ProviderCall { status, body, .. } => {
                assert_eq!(status, Some(429));
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_html_body_points_at_url_and_key() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_body("<html><body>Sign in</body></html>")
            .create_async()
            .await;

        let err = provider(&server).embed("hello").await.unwrap_err();
        assert!(err.to_string().contains("check the embedding API URL and key"));
    }
}
