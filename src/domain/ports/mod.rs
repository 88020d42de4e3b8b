//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces the adapters implement:
//! - EmbeddingProvider / EmbeddingProviderSource: text to vector, resolved per call
//! - VectorDatabase: collection lifecycle, insert, search, scan, delete
//! - Repositories: documents, FAQs, knowledge bases, conversations, AI configs
//! - LanguageModelClient / Retriever: reply generation and grounding
//! - Reranker, ReplySink, SecretCipher

pub mod embedding;
pub mod language_model;
pub mod repositories;
pub mod reply_sink;
pub mod reranker;
pub mod secret_cipher;
pub mod unconfigured_embedding;
pub mod vector_database;

pub use embedding::{
    EmbeddingProvider, EmbeddingProviderSource, EmbeddingSettingsSource, FixedProviderSource,
};
pub use language_model::{ChatRequest, LanguageModelClient, Retriever};
pub use repositories::{
    AiConfigRepository, ConversationRepository, DocumentRepository, EmbeddingStatusStore,
    FaqRepository, KnowledgeBaseRepository, MessageRepository,
};
pub use reply_sink::ReplySink;
pub use reranker::Reranker;
pub use secret_cipher::SecretCipher;
pub use unconfigured_embedding::UnconfiguredEmbeddingProvider;
pub use vector_database::VectorDatabase;
