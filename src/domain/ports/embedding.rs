//! Embedding provider ports.
//!
//! Defines the "text to vector" contract and the configuration-provider seam
//! that hands out a freshly resolved provider on every logical operation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{EmbeddingSettings, EmbeddingVector};

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., "openai", "bge", "unconfigured").
    fn name(&self) -> &'static str;

    /// Model identifier sent upstream.
    fn model_name(&self) -> &str;

    /// Embedding dimension for this provider/model.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts in a single upstream call.
    ///
    /// Implementations log a warning when the upstream returns a different
    /// number of vectors than texts sent, and return what they received.
    /// Core callers go through [`EmbeddingProvider::embed_exact`].
    async fn embed_texts(&self, texts: &[String]) -> RagResult<Vec<EmbeddingVector>>;

    /// Maximum number of texts per single API call.
    fn max_batch_size(&self) -> usize {
        64
    }

    /// Embed a batch, failing unless exactly one vector per input came back.
    ///
    /// Inputs larger than [`EmbeddingProvider::max_batch_size`] are sent as
    /// several upstream calls.
    ///
    /// # Arguments
    /// * `texts` - Texts to embed, in order
    ///
    /// # Returns
    /// * `Ok(Vec<EmbeddingVector>)` - One vector per input, same order
    /// * `Err(RagError::LengthMismatch)` - Upstream returned a partial result
    async fn embed_exact(&self, texts: &[String]) -> RagResult<Vec<EmbeddingVector>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.max_batch_size().max(1)) {
            let part = self.embed_texts(chunk).await?;
            if part.len() != chunk.len() {
                return Err(RagError::LengthMismatch(format!(
                    "{} returned {} vectors for {} texts",
                    self.name(),
                    part.len(),
                    chunk.len()
                )));
            }
            vectors.extend(part);
        }
        Ok(vectors)
    }

    /// Embed a single text.
    async fn embed(&self, text: &str) -> RagResult<EmbeddingVector> {
        let mut vectors = self.embed_exact(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::LengthMismatch("no vector returned".to_string()))
    }
}

/// Hands out the embedding provider for the current configuration.
///
/// Callers invoke [`EmbeddingProviderSource::current`] once per logical
/// operation and never hold on to the result, so that administrative changes
/// to the URL, key or model apply on the next call.
#[async_trait]
pub trait EmbeddingProviderSource: Send + Sync {
    /// Resolve the provider from the latest stored configuration.
    ///
    /// Never fails for a missing configuration: an unconfigured placeholder is
    /// returned instead and fails at embed time with `ProviderUnconfigured`.
    async fn current(&self) -> RagResult<Arc<dyn EmbeddingProvider>>;
}

/// Read access to the admin-editable embedding settings.
#[async_trait]
pub trait EmbeddingSettingsSource: Send + Sync {
    /// Latest stored settings with the credential already decrypted, if any exist.
    async fn current(&self) -> RagResult<Option<EmbeddingSettings>>;
}

/// A source that always hands out the same provider. Used by tests and by
/// embedders that wire a provider directly.
pub struct FixedProviderSource {
    provider: Arc<dyn EmbeddingProvider>,
}

impl FixedProviderSource {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl EmbeddingProviderSource for FixedProviderSource {
    async fn current(&self) -> RagResult<Arc<dyn EmbeddingProvider>> {
        Ok(Arc::clone(&self.provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ShortProvider;

    #[async_trait]
    impl EmbeddingProvider for ShortProvider {
        fn name(&self) -> &'static str {
            "short"
        }

        fn model_name(&self) -> &str {
            "short-model"
        }

        fn dimension(&self) -> usize {
            2
        }

        async fn embed_texts(&self, texts: &[String]) -> RagResult<Vec<EmbeddingVector>> {
            Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn test_embed_exact_rejects_partial_results() {
        let provider = ShortProvider;
        let err = provider
            .embed_exact(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::LengthMismatch(_)));
    }

    #[tokio::test]
    async fn test_embed_exact_empty_input_skips_call() {
        let provider = ShortProvider;
        assert!(provider.embed_exact(&[]).await.unwrap().is_empty());
    }

    struct SmallBatchProvider {
        calls: std::sync::Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl EmbeddingProvider for SmallBatchProvider {
        fn name(&self) -> &'static str {
            "small-batch"
        }

        fn model_name(&self) -> &str {
            "small-batch-model"
        }

        fn dimension(&self) -> usize {
            1
        }

        fn max_batch_size(&self) -> usize {
            2
        }

        async fn embed_texts(&self, texts: &[String]) -> RagResult<Vec<EmbeddingVector>> {
            self.calls.lock().unwrap().push(texts.len());
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }
    }

    #[tokio::test]
    async fn test_embed_exact_splits_at_max_batch_size() {
        let provider = SmallBatchProvider {
            calls: std::sync::Mutex::new(Vec::new()),
        };
        let texts: Vec<String> = ["a", "bb", "ccc", "dddd", "eeeee"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let vectors = provider.embed_exact(&texts).await.unwrap();

        assert_eq!(*provider.calls.lock().unwrap(), vec![2, 2, 1]);
        assert_eq!(
            vectors,
            vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![5.0]]
        );
    }

    #[tokio::test]
    async fn test_fixed_source_returns_same_provider() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(ShortProvider);
        let source = FixedProviderSource::new(Arc::clone(&provider));
        let current = source.current().await.unwrap();
        assert_eq!(current.model_name(), "short-model");
    }
}
