//! Retrieval service with result cache, visibility filter, reranking and metrics.

pub mod cache;
pub mod metrics;
pub mod reranker;
pub mod service;

pub use cache::{CacheKey, RetrievalCache};
pub use metrics::{MetricsSnapshot, RetrievalMetrics};
pub use reranker::NoopReranker;
pub use service::{over_fetch_limit, RetrievalService};
