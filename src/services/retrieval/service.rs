//! Query-time retrieval: embed, over-fetch, filter, rerank, cache.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::cache::{CacheKey, RetrievalCache};
use super::metrics::{MetricsSnapshot, RetrievalMetrics};
use crate::domain::errors::RagResult;
use crate::domain::models::SearchResult;
use crate::domain::ports::{
    DocumentRepository, EmbeddingProviderSource, KnowledgeBaseRepository, Reranker, Retriever,
};
use crate::services::vector_store::VectorStoreManager;

/// Candidates fetched from the vector store for a request of `top_k`.
///
/// Over-fetching absorbs the loss from publication filtering.
pub const fn over_fetch_limit(top_k: usize) -> usize {
    let wanted = top_k.saturating_mul(3);
    if wanted < 10 {
        10
    } else {
        wanted
    }
}

pub struct RetrievalService {
    providers: Arc<dyn EmbeddingProviderSource>,
    vector_store: Arc<VectorStoreManager>,
    documents: Arc<dyn DocumentRepository>,
    knowledge_bases: Arc<dyn KnowledgeBaseRepository>,
    reranker: Arc<dyn Reranker>,
    rerank_enabled: bool,
    cache: RetrievalCache,
    metrics: RetrievalMetrics,
}

impl RetrievalService {
    pub fn new(
        providers: Arc<dyn EmbeddingProviderSource>,
        vector_store: Arc<VectorStoreManager>,
        documents: Arc<dyn DocumentRepository>,
        knowledge_bases: Arc<dyn KnowledgeBaseRepository>,
        reranker: Arc<dyn Reranker>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            providers,
            vector_store,
            documents,
            knowledge_bases,
            reranker,
            rerank_enabled: true,
            cache: RetrievalCache::new(cache_ttl),
            metrics: RetrievalMetrics::new(),
        }
    }

    /// Skip the reranker in [`RetrievalService::retrieve_with_rerank`] when `false`.
    #[must_use]
    pub fn with_rerank_enabled(mut self, enabled: bool) -> Self {
        self.rerank_enabled = enabled;
        self
    }

    /// Retrieve up to `top_k` published, RAG-enabled passages for `query`.
    ///
    /// # Arguments
    /// * `query` - Raw user text, used verbatim as the cache key
    /// * `top_k` - Maximum results
    /// * `knowledge_base_id` - Optional equality filter pushed down to the store
    ///
    /// # Returns
    /// * `Ok(Vec<SearchResult>)` - Filtered results in similarity order
    /// * `Err(_)` - Embedding, search or repository lookup failed
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        knowledge_base_id: Option<&str>,
    ) -> RagResult<Vec<SearchResult>> {
        let started = Instant::now();
        let key = CacheKey::new(query, top_k, knowledge_base_id);

        if let Some(cached) = self.cache.get(&key) {
            self.metrics.record(true, started.elapsed(), true);
            debug!(top_k, hits = cached.len(), "Retrieval served from cache");
            return Ok(cached);
        }

        let result = self.retrieve_uncached(query, top_k, knowledge_base_id).await;
        self.metrics.record(result.is_ok(), started.elapsed(), false);

        let results = result?;
        self.cache.put(key, results.clone());
        debug!(
            top_k,
            kb_id = knowledge_base_id.unwrap_or_default(),
            hits = results.len(),
            latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Retrieval finished"
        );
        Ok(results)
    }

    /// [`RetrievalService::retrieve`] followed by the reranker. A failing
    /// reranker leaves the filtered order in place.
    pub async fn retrieve_with_rerank(
        &self,
        query: &str,
        top_k: usize,
        knowledge_base_id: Option<&str>,
    ) -> RagResult<Vec<SearchResult>> {
        let results = self.retrieve(query, top_k, knowledge_base_id).await?;
        if !self.rerank_enabled {
            return Ok(results);
        }
        match self.reranker.rerank(query, results.clone()).await {
            Ok(reranked) => Ok(reranked),
            Err(e) => {
                warn!(reranker = self.reranker.name(), error = %e, "Rerank failed, keeping original order");
                Ok(results)
            }
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    async fn retrieve_uncached(
        &self,
        query: &str,
        top_k: usize,
        knowledge_base_id: Option<&str>,
    ) -> RagResult<Vec<SearchResult>> {
        let provider = self.providers.current().await?;
        let vector = provider.embed(query).await?;
        let candidates = self
            .vector_store
            .search(&vector, over_fetch_limit(top_k), knowledge_base_id)
            .await?;
        self.filter_visible(candidates, top_k).await
    }

    /// Drop unpublished documents and documents in knowledge bases with RAG
    /// disabled. Results that are not documents (FAQ entries, non-numeric ids)
    /// pass through. Order is preserved and the output is cut at `top_k`.
    async fn filter_visible(
        &self,
        candidates: Vec<SearchResult>,
        top_k: usize,
    ) -> RagResult<Vec<SearchResult>> {
        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        for candidate in &candidates {
            if let Ok(id) = candidate.document_id.parse::<u64>() {
                if seen.insert(id) {
                    ids.push(id);
                }
            }
        }
        if ids.is_empty() {
            return Ok(candidates.into_iter().take(top_k).collect());
        }

        let documents = self.documents.get_by_ids(&ids).await?;
        let owning_kb: HashMap<u64, u64> = documents
            .iter()
            .map(|d| (d.id, d.knowledge_base_id))
            .collect();
        let unpublished: HashSet<u64> = documents
            .iter()
            .filter(|d| !d.is_published())
            .map(|d| d.id)
            .collect();

        let kb_ids: Vec<u64> = owning_kb.values().copied().collect::<HashSet<_>>().into_iter().collect();
        let disabled: HashSet<u64> = if kb_ids.is_empty() {
            HashSet::new()
        } else {
            self.knowledge_bases
                .get_by_ids(&kb_ids)
                .await?
                .into_iter()
                .filter(|kb| !kb.rag_enabled)
                .map(|kb| kb.id)
                .collect()
        };

        let before = candidates.len();
        let visible: Vec<SearchResult> = candidates
            .into_iter()
            .filter(|candidate| {
                let Ok(id) = candidate.document_id.parse::<u64>() else {
                    return true;
                };
                if unpublished.contains(&id) {
                    return false;
                }
                owning_kb.get(&id).is_none_or(|kb| !disabled.contains(kb))
            })
            .take(top_k)
            .collect();
        debug!(before, after = visible.len(), "Filtered retrieval candidates");
        Ok(visible)
    }
}

#[async_trait]
impl Retriever for RetrievalService {
    async fn retrieve_with_rerank(
        &self,
        query: &str,
        top_k: usize,
        knowledge_base_id: Option<&str>,
    ) -> RagResult<Vec<SearchResult>> {
        Self::retrieve_with_rerank(self, query, top_k, knowledge_base_id).await
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_over_fetch_floor() {
        assert_eq!(over_fetch_limit(1), 10);
        assert_eq!(over_fetch_limit(3), 10);
        assert_eq!(over_fetch_limit(4), 12);
        assert_eq!(over_fetch_limit(5), 15);
    }

    proptest! {
        #[test]
        fn prop_over_fetch_covers_request(top_k in 0usize..10_000) {
            let limit = over_fetch_limit(top_k);
            prop_assert!(limit >= 10);
            prop_assert!(limit >= top_k * 3);
            prop_assert_eq!(limit, (top_k * 3).max(10));
        }
    }
}
