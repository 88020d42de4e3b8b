use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".helpdesk-rag";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Vector store URL cannot be empty")]
    EmptyVectorStoreUrl,

    #[error("Invalid collection name: '{0}'. Use letters, digits and underscores, not starting with a digit")]
    InvalidCollectionName(String),

    #[error("Invalid top_k: {0}. Must be at least 1")]
    InvalidTopK(usize),

    #[error("Invalid {0}: must be at least 1")]
    ZeroValue(&'static str),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid embedding dimension: {0}. Must be at least 1")]
    InvalidDimension(usize),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .helpdesk-rag/config.yaml
    /// 3. .helpdesk-rag/local.yaml (optional local overrides)
    /// 4. Legacy variables: EMBEDDING_TYPE, EMBEDDING_API_URL, EMBEDDING_API_KEY,
    ///    EMBEDDING_MODEL, EMBEDDING_DIMENSION and ENCRYPTION_KEY
    /// 5. Environment variables (HELPDESK_RAG_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let dir = Path::new(CONFIG_DIR);
        let config: Config = Self::figment(&[&dir.join("config.yaml"), &dir.join("local.yaml")])
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file {} does not exist", path.display());
        }
        let config: Config = Self::figment(&[path])
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(files: &[&Path]) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        for file in files {
            figment = figment.merge(Yaml::file(file));
        }
        figment
            .merge(Env::prefixed("EMBEDDING_").filter_map(|key| {
                let target = match key.as_str().to_ascii_lowercase().as_str() {
                    "type" => "embedding.provider",
                    "api_url" => "embedding.base_url",
                    "api_key" => "embedding.api_key",
                    "model" => "embedding.model",
                    "dimension" => "embedding.dimension",
                    _ => return None,
                };
                Some(target.into())
            }))
            .merge(
                Env::raw()
                    .only(&["ENCRYPTION_KEY"])
                    .map(|_| "credentials.encryption_key".into()),
            )
            .merge(Env::prefixed("HELPDESK_RAG_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.vector_store.url.trim().is_empty() {
            return Err(ConfigError::EmptyVectorStoreUrl);
        }

        if !is_valid_collection_name(&config.vector_store.collection) {
            return Err(ConfigError::InvalidCollectionName(
                config.vector_store.collection.clone(),
            ));
        }

        if config.vector_store.migration_batch_size == 0 {
            return Err(ConfigError::ZeroValue("vector_store.migration_batch_size"));
        }

        if config.embedding.dimension == Some(0) {
            return Err(ConfigError::InvalidDimension(0));
        }

        if config.retrieval.top_k == 0 {
            return Err(ConfigError::InvalidTopK(0));
        }

        if config.background.workers == 0 {
            return Err(ConfigError::ZeroValue("background.workers"));
        }

        if config.background.queue_capacity == 0 {
            return Err(ConfigError::ZeroValue("background.queue_capacity"));
        }

        if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        Ok(())
    }
}

fn is_valid_collection_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
