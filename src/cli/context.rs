//! Wiring of the services the CLI commands share.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::embeddings::ConfigBackedProviderSource;
use crate::adapters::milvus::{MilvusConfig, MilvusRestClient};
use crate::domain::models::Config;
use crate::domain::ports::{EmbeddingProviderSource, VectorDatabase};
use crate::infrastructure::config::ConfigLoader;
use crate::services::{HealthChecker, RetryPolicy, VectorStoreManager, VectorStoreSettings};

/// Load configuration from `path`, or hierarchically when none is given.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Services built from one configuration.
///
/// The CLI has no settings table, so the embedding provider always comes
/// from the static `embedding` section.
pub struct AppContext {
    pub config: Config,
    pub providers: Arc<dyn EmbeddingProviderSource>,
    pub vector_store: Arc<VectorStoreManager>,
}

impl AppContext {
    pub fn build(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("helpdesk-rag/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let providers: Arc<dyn EmbeddingProviderSource> = Arc::new(
            ConfigBackedProviderSource::new(None, &config.embedding, http.clone()),
        );
        let database: Arc<dyn VectorDatabase> = Arc::new(MilvusRestClient::new(
            MilvusConfig::from_config(&config.vector_store),
            http,
        ));
        let vector_store = Arc::new(VectorStoreManager::new(
            database,
            Arc::clone(&providers),
            VectorStoreSettings::from_config(&config.vector_store),
            RetryPolicy::from_config(&config.retry),
        ));

        Ok(Self {
            config,
            providers,
            vector_store,
        })
    }

    pub fn health_checker(&self) -> HealthChecker {
        HealthChecker::new(Arc::clone(&self.providers), Arc::clone(&self.vector_store))
    }
}
