//! End-to-end health check: one minimal embed and one minimal search.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::vector_store::VectorStoreManager;
use crate::domain::errors::{RagError, RagResult};
use crate::domain::ports::EmbeddingProviderSource;

const CHECK_TEXT: &str = "health check";
const CHECK_COMPONENT: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyHealth {
    pub name: String,
    pub healthy: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub model: String,
    pub dimension: usize,
    pub collection: String,
    pub embedding: DependencyHealth,
    pub vector_store: DependencyHealth,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// First failing dependency as an error.
    pub fn into_result(self) -> RagResult<Self> {
        if self.healthy {
            return Ok(self);
        }
        let failed = if self.embedding.healthy {
            &self.vector_store
        } else {
            &self.embedding
        };
        Err(RagError::Transport(format!(
            "{} unhealthy: {}",
            failed.name,
            failed.error.as_deref().unwrap_or("unknown error")
        )))
    }
}

pub struct HealthChecker {
    providers: Arc<dyn EmbeddingProviderSource>,
    vector_store: Arc<VectorStoreManager>,
}

impl HealthChecker {
    pub fn new(providers: Arc<dyn EmbeddingProviderSource>, vector_store: Arc<VectorStoreManager>) -> Self {
        Self {
            providers,
            vector_store,
        }
    }

    /// Check both dependencies. Never fails; problems are reported per dependency.
    pub async fn check(&self) -> HealthReport {
        let collection = self.vector_store.collection().to_string();
        let provider = match self.providers.current().await {
            Ok(provider) => provider,
            Err(e) => {
                let error = Some(e.to_string());
                return HealthReport {
                    healthy: false,
                    model: String::new(),
                    dimension: 0,
                    collection,
                    embedding: DependencyHealth {
                        name: "embedding".to_string(),
                        healthy: false,
                        latency_ms: 0,
                        error: error.clone(),
                    },
                    vector_store: DependencyHealth {
                        name: self.vector_store.database().name().to_string(),
                        healthy: false,
                        latency_ms: 0,
                        error,
                    },
                    checked_at: Utc::now(),
                };
            }
        };

        let started = Instant::now();
        let embed = provider.embed(CHECK_TEXT).await;
        let embedding = DependencyHealth {
            name: provider.name().to_string(),
            healthy: embed.is_ok(),
            latency_ms: elapsed_ms(started),
            error: embed.err().map(|e| e.to_string()),
        };

        let query = vec![CHECK_COMPONENT; provider.dimension()];
        let started = Instant::now();
        let search = self.vector_store.search(&query, 1, None).await;
        let vector_store = DependencyHealth {
            name: self.vector_store.database().name().to_string(),
            healthy: search.is_ok(),
            latency_ms: elapsed_ms(started),
            error: search.err().map(|e| e.to_string()),
        };

        let healthy = embedding.healthy && vector_store.healthy;
        if !healthy {
            warn!(
                embedding_ok = embedding.healthy,
                vector_store_ok = vector_store.healthy,
                "Health check failed"
            );
        }

        HealthReport {
            healthy,
            model: provider.model_name().to_string(),
            dimension: provider.dimension(),
            collection,
            embedding,
            vector_store,
            checked_at: Utc::now(),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
