//! Embedding provider adapters.

pub mod bge;
pub mod http;
pub mod openai;
pub mod resolver;

pub use bge::{BgeEmbeddingConfig, BgeEmbeddingProvider};
pub use http::EmbeddingTimeouts;
pub use openai::{OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
pub use resolver::ConfigBackedProviderSource;
