//! In-memory repositories for the records the core reads and updates.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{
    AiModelConfig, AiReply, ChatMessage, Conversation, DocumentRecord, EmbeddingSettings,
    EmbeddingStatus, FaqRecord, KnowledgeBaseRecord, ModelType,
};
use crate::domain::ports::{
    AiConfigRepository, ConversationRepository, DocumentRepository, EmbeddingSettingsSource,
    EmbeddingStatusStore, FaqRepository, KnowledgeBaseRepository, MessageRepository, ReplySink,
};

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Documents keyed by id, with a log of every status write.
#[derive(Debug, Default)]
pub struct InMemoryDocumentRepository {
    documents: RwLock<HashMap<u64, DocumentRecord>>,
    status_writes: RwLock<Vec<(u64, EmbeddingStatus)>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document: DocumentRecord) {
        write(&self.documents).insert(document.id, document);
    }

    /// Every `(id, status)` written, in order.
    pub fn status_writes(&self) -> Vec<(u64, EmbeddingStatus)> {
        read(&self.status_writes).clone()
    }
}

#[async_trait]
impl EmbeddingStatusStore for InMemoryDocumentRepository {
    async fn embedding_status(&self, id: u64) -> RagResult<Option<EmbeddingStatus>> {
        Ok(read(&self.documents).get(&id).map(|d| d.embedding_status))
    }

    async fn update_embedding_status(&self, id: u64, status: EmbeddingStatus) -> RagResult<()> {
        let mut documents = write(&self.documents);
        let document = documents
            .get_mut(&id)
            .ok_or_else(|| RagError::Repository(format!("document {id} not found")))?;
        document.embedding_status = status;
        write(&self.status_writes).push((id, status));
        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn get_by_id(&self, id: u64) -> RagResult<Option<DocumentRecord>> {
        Ok(read(&self.documents).get(&id).cloned())
    }

    async fn get_by_ids(&self, ids: &[u64]) -> RagResult<Vec<DocumentRecord>> {
        let documents = read(&self.documents);
        Ok(ids.iter().filter_map(|id| documents.get(id).cloned()).collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryFaqRepository {
    faqs: RwLock<HashMap<u64, FaqRecord>>,
}

impl InMemoryFaqRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, faq: FaqRecord) {
        write(&self.faqs).insert(faq.id, faq);
    }
}

#[async_trait]
impl EmbeddingStatusStore for InMemoryFaqRepository {
    async fn embedding_status(&self, id: u64) -> RagResult<Option<EmbeddingStatus>> {
        Ok(read(&self.faqs).get(&id).map(|f| f.embedding_status))
    }

    async fn update_embedding_status(&self, id: u64, status: EmbeddingStatus) -> RagResult<()> {
        write(&self.faqs)
            .get_mut(&id)
            .map(|faq| faq.embedding_status = status)
            .ok_or_else(|| RagError::Repository(format!("faq {id} not found")))
    }
}

#[async_trait]
impl FaqRepository for InMemoryFaqRepository {
    async fn get_by_id(&self, id: u64) -> RagResult<Option<FaqRecord>> {
        Ok(read(&self.faqs).get(&id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryKnowledgeBaseRepository {
    knowledge_bases: RwLock<HashMap<u64, KnowledgeBaseRecord>>,
}

impl InMemoryKnowledgeBaseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, knowledge_base: KnowledgeBaseRecord) {
        write(&self.knowledge_bases).insert(knowledge_base.id, knowledge_base);
    }
}

#[async_trait]
impl KnowledgeBaseRepository for InMemoryKnowledgeBaseRepository {
    async fn get_by_ids(&self, ids: &[u64]) -> RagResult<Vec<KnowledgeBaseRecord>> {
        let knowledge_bases = read(&self.knowledge_bases);
        Ok(ids
            .iter()
            .filter_map(|id| knowledge_bases.get(id).cloned())
            .collect())
    }
}

/// Conversations and their messages.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<u64, Conversation>>,
    messages: RwLock<Vec<ChatMessage>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_conversation(&self, conversation: Conversation) {
        write(&self.conversations).insert(conversation.id, conversation);
    }

    pub fn push_message(&self, message: ChatMessage) {
        write(&self.messages).push(message);
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationStore {
    async fn get_by_id(&self, id: u64) -> RagResult<Option<Conversation>> {
        Ok(read(&self.conversations).get(&id).cloned())
    }
}

#[async_trait]
impl MessageRepository for InMemoryConversationStore {
    async fn list_by_conversation(&self, conversation_id: u64) -> RagResult<Vec<ChatMessage>> {
        Ok(read(&self.messages)
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAiConfigRepository {
    configs: RwLock<Vec<AiModelConfig>>,
}

impl InMemoryAiConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, config: AiModelConfig) {
        write(&self.configs).push(config);
    }
}

#[async_trait]
impl AiConfigRepository for InMemoryAiConfigRepository {
    async fn get_by_id(&self, id: u64) -> RagResult<Option<AiModelConfig>> {
        Ok(read(&self.configs).iter().find(|c| c.id == id).cloned())
    }

    async fn get_active_by_user(
        &self,
        user_id: u64,
        model_type: &ModelType,
    ) -> RagResult<Option<AiModelConfig>> {
        Ok(read(&self.configs)
            .iter()
            .find(|c| c.user_id == user_id && c.is_active && &c.model_type == model_type)
            .cloned())
    }
}

/// Admin-editable embedding settings held in memory.
#[derive(Debug, Default)]
pub struct InMemoryEmbeddingSettings {
    settings: RwLock<Option<EmbeddingSettings>>,
}

impl InMemoryEmbeddingSettings {
    pub fn new(settings: Option<EmbeddingSettings>) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    pub fn set(&self, settings: Option<EmbeddingSettings>) {
        *write(&self.settings) = settings;
    }
}

#[async_trait]
impl EmbeddingSettingsSource for InMemoryEmbeddingSettings {
    async fn current(&self) -> RagResult<Option<EmbeddingSettings>> {
        Ok(read(&self.settings).clone())
    }
}

/// Reply sink that records delivered replies.
#[derive(Debug, Default)]
pub struct RecordingReplySink {
    replies: RwLock<Vec<AiReply>>,
}

impl RecordingReplySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replies(&self) -> Vec<AiReply> {
        read(&self.replies).clone()
    }
}

#[async_trait]
impl ReplySink for RecordingReplySink {
    async fn deliver(&self, reply: AiReply) -> RagResult<()> {
        write(&self.replies).push(reply);
        Ok(())
    }
}
