use async_trait::async_trait;

use crate::domain::errors::RagResult;
use crate::domain::models::SearchResult;

/// Post-retrieval reordering strategy.
#[async_trait]
pub trait Reranker: Send + Sync {
    fn name(&self) -> &'static str;

    /// Reorder (or trim) filtered candidates for `query`.
    async fn rerank(&self, query: &str, results: Vec<SearchResult>) -> RagResult<Vec<SearchResult>>;
}
