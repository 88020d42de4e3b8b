//! Repository ports for records owned by the external persistence layer.

use async_trait::async_trait;

use crate::domain::errors::RagResult;
use crate::domain::models::{
    AiModelConfig, ChatMessage, Conversation, DocumentRecord, EmbeddingStatus, FaqRecord,
    KnowledgeBaseRecord, ModelType,
};

/// Reads and writes the embedding status column of one content table.
#[async_trait]
pub trait EmbeddingStatusStore: Send + Sync {
    async fn embedding_status(&self, id: u64) -> RagResult<Option<EmbeddingStatus>>;

    async fn update_embedding_status(&self, id: u64, status: EmbeddingStatus) -> RagResult<()>;
}

#[async_trait]
pub trait DocumentRepository: EmbeddingStatusStore {
    async fn get_by_id(&self, id: u64) -> RagResult<Option<DocumentRecord>>;

    /// Documents for the given ids. Missing ids are simply absent from the result.
    async fn get_by_ids(&self, ids: &[u64]) -> RagResult<Vec<DocumentRecord>>;
}

#[async_trait]
pub trait FaqRepository: EmbeddingStatusStore {
    async fn get_by_id(&self, id: u64) -> RagResult<Option<FaqRecord>>;
}

#[async_trait]
pub trait KnowledgeBaseRepository: Send + Sync {
    async fn get_by_ids(&self, ids: &[u64]) -> RagResult<Vec<KnowledgeBaseRecord>>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn get_by_id(&self, id: u64) -> RagResult<Option<Conversation>>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// All messages of a conversation, oldest first.
    async fn list_by_conversation(&self, conversation_id: u64) -> RagResult<Vec<ChatMessage>>;
}

#[async_trait]
pub trait AiConfigRepository: Send + Sync {
    async fn get_by_id(&self, id: u64) -> RagResult<Option<AiModelConfig>>;

    /// The user's active configuration of the given model type.
    async fn get_active_by_user(
        &self,
        user_id: u64,
        model_type: &ModelType,
    ) -> RagResult<Option<AiModelConfig>>;
}
