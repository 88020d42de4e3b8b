use serde::{Deserialize, Serialize};

use super::embedding::{EmbeddingProviderKind, EmbeddingSettings};

/// Main configuration structure for the retrieval core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Vector database connection and collection settings
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Fallback embedding settings, used when no stored configuration exists
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Retrieval cache and sizing
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Language model call settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Background worker pool
    #[serde(default)]
    pub background: BackgroundConfig,

    /// Retry policy for re-embedding during migration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Credential encryption
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VectorStoreConfig {
    /// Base URL of the Milvus REST endpoint
    #[serde(default = "default_vector_store_url")]
    pub url: String,

    /// Bearer token (`user:password` or an API key), optional
    #[serde(default)]
    pub token: Option<String>,

    /// Logical collection name
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Timeout for interactive calls (search, insert, delete)
    #[serde(default = "default_interactive_timeout_secs")]
    pub timeout_secs: u64,

    /// Independent deadline for a whole migration
    #[serde(default = "default_migration_timeout_secs")]
    pub migration_timeout_secs: u64,

    /// Rows drained and re-embedded per migration batch
    #[serde(default = "default_migration_batch_size")]
    pub migration_batch_size: usize,
}

fn default_vector_store_url() -> String {
    "http://localhost:19530".to_string()
}

fn default_collection() -> String {
    "knowledge_base_documents".to_string()
}

const fn default_interactive_timeout_secs() -> u64 {
    30
}

const fn default_migration_timeout_secs() -> u64 {
    1800
}

const fn default_migration_batch_size() -> usize {
    256
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: default_vector_store_url(),
            token: None,
            collection: default_collection(),
            timeout_secs: default_interactive_timeout_secs(),
            migration_timeout_secs: default_migration_timeout_secs(),
            migration_batch_size: default_migration_batch_size(),
        }
    }
}

/// Static embedding fallback and HTTP timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingConfig {
    /// Provider flavour: openai (alias api) or bge (alias local).
    /// Unset means no fallback provider exists.
    #[serde(default)]
    pub provider: Option<EmbeddingProviderKind>,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub dimension: Option<usize>,

    /// Timeout for single-text and small-batch calls
    #[serde(default = "default_interactive_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for bulk import batches
    #[serde(default = "default_bulk_timeout_secs")]
    pub bulk_timeout_secs: u64,
}

const fn default_bulk_timeout_secs() -> u64 {
    600
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: None,
            base_url: None,
            api_key: None,
            model: None,
            dimension: None,
            timeout_secs: default_interactive_timeout_secs(),
            bulk_timeout_secs: default_bulk_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    /// Settings equivalent of this static section, if a provider is named.
    pub fn to_settings(&self) -> Option<EmbeddingSettings> {
        self.provider.map(|kind| EmbeddingSettings {
            kind,
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            dimension: self.dimension,
        })
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// Cache entry lifetime in seconds, 0 disables caching
    #[serde(default)]
    pub cache_ttl_secs: u64,

    /// Passages fed to the language model
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Run the reranker when building reply context
    #[serde(default = "default_true")]
    pub rerank: bool,
}

const fn default_top_k() -> usize {
    5
}

const fn default_true() -> bool {
    true
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 0,
            top_k: default_top_k(),
            rerank: default_true(),
        }
    }
}

/// Language model call configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    #[serde(default = "default_interactive_timeout_secs")]
    pub timeout_secs: u64,

    /// Most recent messages included as history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Text shown to the visitor when a reply cannot be generated
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

const fn default_history_limit() -> usize {
    10
}

/// Reply shown whenever generation fails.
pub const DEFAULT_FALLBACK_REPLY: &str =
    "The AI assistant ran into a problem. Please contact a human agent for help.";

fn default_fallback_reply() -> String {
    DEFAULT_FALLBACK_REPLY.to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_interactive_timeout_secs(),
            history_limit: default_history_limit(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

/// Background executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackgroundConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Deadline applied to each task
    #[serde(default = "default_task_deadline_secs")]
    pub task_deadline_secs: u64,
}

const fn default_workers() -> usize {
    4
}

const fn default_queue_capacity() -> usize {
    256
}

const fn default_task_deadline_secs() -> u64 {
    600
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            task_deadline_secs: default_task_deadline_secs(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    100
}

const fn default_max_backoff_ms() -> u64 {
    5000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files, stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Credential encryption configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CredentialsConfig {
    /// 32-byte AES-256 key. `ENCRYPTION_KEY` is used when unset.
    #[serde(default)]
    pub encryption_key: Option<String>,
}
