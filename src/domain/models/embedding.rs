//! Embedding domain models
//!
//! Vectors, indexed chunks, search results and the per-item embedding status
//! state machine. These types are storage-agnostic.

use serde::{Deserialize, Serialize};

/// Fixed-length float vector produced by an embedding provider.
pub type EmbeddingVector = Vec<f32>;

/// Which content table owns an indexed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Document,
    Faq,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Faq => "faq",
        }
    }
}

/// Stable string form of a numeric primary key, as stored in the vector database.
pub fn item_key(id: u64) -> String {
    id.to_string()
}

/// Embedding lifecycle of a document or FAQ entry.
///
/// `pending -> processing -> completed | failed`. The only way out of a
/// terminal state is a content edit, which resets the item to `pending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl EmbeddingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the pipeline may move an item from `self` to `next`.
    ///
    /// `Pending` is always reachable since a content edit resets the item.
    pub fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (_, Self::Pending) => true,
            (Self::Pending, Self::Processing) => true,
            (Self::Processing, Self::Completed | Self::Failed) => true,
            // pickup failures (e.g. a panic before processing was written)
            (Self::Pending, Self::Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for EmbeddingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row owned by the vector store: one content string per document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub document_id: String,
    pub knowledge_base_id: String,
    pub content: String,
    pub vector: EmbeddingVector,
}

/// A stored row without its vector, as drained during migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredText {
    /// Database primary key, used for keyset pagination.
    pub row_id: i64,
    pub document_id: String,
    pub knowledge_base_id: String,
    pub content: String,
}

/// A single similarity hit. Higher score means more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document_id: String,
    pub knowledge_base_id: String,
    pub content: String,
    pub score: f32,
}

/// Name and vector dimension of a vector database collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    pub name: String,
    pub dimension: usize,
}

/// Embedding API flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    /// OpenAI-compatible `/embeddings` endpoint.
    #[serde(alias = "api")]
    OpenAi,
    /// HuggingFace inference style endpoint serving a BGE model.
    #[serde(alias = "local")]
    Bge,
}

impl EmbeddingProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Bge => "bge",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "api" => Some(Self::OpenAi),
            "bge" | "local" => Some(Self::Bge),
            _ => None,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Bge => "http://localhost:8080",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "text-embedding-3-small",
            Self::Bge => "bge-small-zh-v1.5",
        }
    }
}

/// Known output dimension for a model name, if any.
pub fn known_model_dimension(model: &str) -> Option<usize> {
    let model = model.to_lowercase();
    let model = model.rsplit('/').next().unwrap_or(&model);
    match model {
        "text-embedding-3-large" => Some(3072),
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        m if m.starts_with("bge-small") => Some(512),
        m if m.starts_with("bge-base") => Some(768),
        m if m.starts_with("bge-large") || m.starts_with("bge-m3") => Some(1024),
        _ => None,
    }
}

/// Dimension reported when neither the configuration nor the model name gives one.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

/// Live embedding configuration, as edited by an administrator.
///
/// The API key is stored encrypted; adapters receive the decrypted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub kind: EmbeddingProviderKind,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Explicit output dimension. Overrides the model-name lookup.
    #[serde(default)]
    pub dimension: Option<usize>,
}

impl EmbeddingSettings {
    pub fn model_name(&self) -> String {
        self.model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.kind.default_model())
            .to_string()
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.kind.default_base_url())
            .to_string()
    }

    pub fn resolved_dimension(&self) -> usize {
        self.dimension
            .filter(|d| *d > 0)
            .or_else(|| known_model_dimension(&self.model_name()))
            .unwrap_or(DEFAULT_EMBEDDING_DIMENSION)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}
