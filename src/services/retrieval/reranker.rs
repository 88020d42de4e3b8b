use async_trait::async_trait;

use crate::domain::errors::RagResult;
use crate::domain::models::SearchResult;
use crate::domain::ports::Reranker;

/// Keeps the vector database's order.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReranker;

#[async_trait]
impl Reranker for NoopReranker {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn rerank(&self, _query: &str, results: Vec<SearchResult>) -> RagResult<Vec<SearchResult>> {
        Ok(results)
    }
}
