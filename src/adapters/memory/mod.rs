//! In-memory adapters for tests and offline runs.

pub mod embedding;
pub mod repositories;
pub mod vector_database;

pub use embedding::HashingEmbeddingProvider;
pub use repositories::{
    InMemoryAiConfigRepository, InMemoryConversationStore, InMemoryDocumentRepository,
    InMemoryEmbeddingSettings, InMemoryFaqRepository, InMemoryKnowledgeBaseRepository,
    RecordingReplySink,
};
pub use vector_database::InMemoryVectorDatabase;
