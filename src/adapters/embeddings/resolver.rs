//! Configuration-backed embedding provider source.
//!
//! Builds a fresh provider from the latest stored settings on every call, so a
//! saved change to the URL, key or model applies to the next operation.

use std::sync::Arc;

use async_trait::async_trait;

use super::bge::{BgeEmbeddingConfig, BgeEmbeddingProvider};
use super::http::EmbeddingTimeouts;
use super::openai::{OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
use crate::domain::errors::RagResult;
use crate::domain::models::{EmbeddingConfig, EmbeddingProviderKind, EmbeddingSettings};
use crate::domain::ports::{
    EmbeddingProvider, EmbeddingProviderSource, EmbeddingSettingsSource,
    UnconfiguredEmbeddingProvider,
};
use crate::infrastructure::logging::mask_secret;

/// Resolution order: stored settings carrying an API key, then the static
/// fallback section, then the unconfigured placeholder.
pub struct ConfigBackedProviderSource {
    stored: Option<Arc<dyn EmbeddingSettingsSource>>,
    fallback: Option<EmbeddingSettings>,
    timeouts: EmbeddingTimeouts,
    client: reqwest::Client,
}

impl ConfigBackedProviderSource {
    pub fn new(
        stored: Option<Arc<dyn EmbeddingSettingsSource>>,
        config: &EmbeddingConfig,
        client: reqwest::Client,
    ) -> Self {
        Self {
            stored,
            fallback: config.to_settings(),
            timeouts: EmbeddingTimeouts {
                interactive: std::time::Duration::from_secs(config.timeout_secs),
                bulk: std::time::Duration::from_secs(config.bulk_timeout_secs),
            },
            client,
        }
    }

    /// Build the adapter matching `settings`.
    pub fn build(&self, settings: &EmbeddingSettings) -> RagResult<Arc<dyn EmbeddingProvider>> {
        let provider: Arc<dyn EmbeddingProvider> = match settings.kind {
            EmbeddingProviderKind::OpenAi => Arc::new(OpenAiEmbeddingProvider::new(
                OpenAiEmbeddingConfig::from_settings(settings, self.timeouts)?,
                self.client.clone(),
            )),
            EmbeddingProviderKind::Bge => Arc::new(BgeEmbeddingProvider::new(
                BgeEmbeddingConfig::from_settings(settings, self.timeouts),
                self.client.clone(),
            )),
        };
        Ok(provider)
    }
}

#[async_trait]
impl EmbeddingProviderSource for ConfigBackedProviderSource {
    async fn current(&self) -> RagResult<Arc<dyn EmbeddingProvider>> {
        let stored = match &self.stored {
            Some(source) => source.current().await?,
            None => None,
        };

        if let Some(settings) = stored.filter(EmbeddingSettings::has_api_key) {
            tracing::debug!(
                provider = settings.kind.as_str(),
                model = %settings.model_name(),
                api_key = %mask_secret(settings.api_key.as_deref().unwrap_or_default()),
                "Using stored embedding configuration"
            );
            return self.build(&settings);
        }

        let Some(fallback) = &self.fallback else {
            return Ok(Arc::new(UnconfiguredEmbeddingProvider::default()));
        };

        match self.build(fallback) {
            Ok(provider) => Ok(provider),
            Err(e) if e.is_unconfigured() => {
                tracing::warn!(error = %e, "Fallback embedding configuration is incomplete");
                Ok(Arc::new(UnconfiguredEmbeddingProvider::new(e.to_string())))
            }
            Err(e) => Err(e),
        }
    }
}
