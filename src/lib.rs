//! Helpdesk RAG - retrieval-augmented reply core for customer support chat
//!
//! Knowledge base documents and FAQs are embedded into a vector collection,
//! searched with publication-aware filtering, and used to ground replies from
//! a configurable chat-completion model.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, the `RagError` taxonomy and port traits
//! - **Adapter Layer** (`adapters`): Embedding APIs, Milvus, chat models, in-memory stores
//! - **Service Layer** (`services`): Vector store lifecycle, retrieval, embedding
//!   pipeline, reply orchestration and background execution
//! - **Infrastructure Layer** (`infrastructure`): Configuration, logging, credentials
//! - **CLI Layer** (`cli`): Operator commands
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use helpdesk_rag::adapters::memory::{HashingEmbeddingProvider, InMemoryVectorDatabase};
//! use helpdesk_rag::domain::ports::FixedProviderSource;
//! use helpdesk_rag::services::{RetryPolicy, VectorStoreManager, VectorStoreSettings};
//!
//! let providers = Arc::new(FixedProviderSource::new(Arc::new(HashingEmbeddingProvider::new(64))));
//! let store = VectorStoreManager::new(
//!     Arc::new(InMemoryVectorDatabase::new()),
//!     providers,
//!     VectorStoreSettings::default(),
//!     RetryPolicy::default(),
//! );
//! store.ensure_collection().await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{RagError, RagResult};
pub use domain::models::{
    Config, EmbeddingProviderKind, EmbeddingSettings, EmbeddingStatus, ItemKind, SearchResult,
};
pub use domain::ports::{
    EmbeddingProvider, EmbeddingProviderSource, LanguageModelClient, Retriever, VectorDatabase,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    AiResponseOrchestrator, AutoReplyService, BackgroundExecutor, EmbeddingPipeline, HealthChecker,
    IndexingTriggers, RetrievalService, VectorStoreManager,
};
