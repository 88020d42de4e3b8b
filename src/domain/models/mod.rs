pub mod config;
pub mod content;
pub mod conversation;
pub mod embedding;

pub use config::{
    BackgroundConfig, Config, CredentialsConfig, EmbeddingConfig, LlmConfig, LoggingConfig,
    RetrievalConfig, RetryConfig, VectorStoreConfig, DEFAULT_FALLBACK_REPLY,
};
pub use content::{DocumentRecord, FaqRecord, KnowledgeBaseRecord, PublishStatus};
pub use conversation::{
    AdapterConfig, AiModelConfig, AiReply, AuthHeaderStyle, ChatMessage, ChatMode, ChatRole,
    ChatTurn, Conversation, ConversationType, MessageType, ModelType, DEFAULT_RESPONSE_PATH,
};
pub use embedding::{
    item_key, known_model_dimension, CollectionDescriptor, EmbeddingProviderKind,
    EmbeddingSettings, EmbeddingStatus, EmbeddingVector, IndexedChunk, ItemKind, SearchResult,
    StoredText, DEFAULT_EMBEDDING_DIMENSION,
};
