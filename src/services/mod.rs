//! Service layer: the retrieval-augmented reply core.

pub mod ai_orchestrator;
pub mod auto_reply;
pub mod background;
pub mod embedding_pipeline;
pub mod health;
pub mod indexing;
pub mod prompt;
pub mod retrieval;
pub mod retry;
pub mod vector_store;

pub use ai_orchestrator::{AiResponseOrchestrator, OrchestratorSettings};
pub use auto_reply::{needs_reply, reply_user_id, AutoReplyService};
pub use background::{BackgroundExecutor, ExecutorStats, TaskHandle};
pub use embedding_pipeline::{BatchEmbeddingReport, EmbeddingPipeline};
pub use health::{DependencyHealth, HealthChecker, HealthReport};
pub use indexing::IndexingTriggers;
pub use retrieval::{MetricsSnapshot, NoopReranker, RetrievalService};
pub use retry::RetryPolicy;
pub use vector_store::{EnsureAction, EnsureReport, VectorStoreManager, VectorStoreSettings};
