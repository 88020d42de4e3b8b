//! Language model port and the retrieval seam used to ground replies.

use async_trait::async_trait;

use crate::domain::errors::RagResult;
use crate::domain::models::{AdapterConfig, ChatTurn, SearchResult};

/// One chat completion call, fully resolved.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Full endpoint URL.
    pub api_url: String,
    /// Decrypted credential.
    pub api_key: String,
    pub model: String,
    pub adapter: AdapterConfig,
    /// Prior turns, oldest first.
    pub history: Vec<ChatTurn>,
    /// Current user message, possibly wrapped with grounding context.
    pub message: String,
}

#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    /// Generate a reply.
    ///
    /// # Returns
    /// * `Ok(String)` - Non-empty reply text
    /// * `Err(RagError::NoContentExtracted)` - The response matched no known shape
    /// * `Err(_)` - Transport, status or API-reported failure
    async fn generate(&self, request: &ChatRequest) -> RagResult<String>;
}

/// Retrieval as seen by reply generation.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve_with_rerank(
        &self,
        query: &str,
        top_k: usize,
        knowledge_base_id: Option<&str>,
    ) -> RagResult<Vec<SearchResult>>;
}
