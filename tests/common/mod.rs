//! Common test utilities for integration tests
//!
//! Provides in-memory wiring of the retrieval core plus scripted stand-ins
//! for the embedding provider and the language model.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use helpdesk_rag::adapters::memory::{
    HashingEmbeddingProvider, InMemoryDocumentRepository, InMemoryFaqRepository,
    InMemoryKnowledgeBaseRepository, InMemoryVectorDatabase,
};
use helpdesk_rag::domain::errors::{RagError, RagResult};
use helpdesk_rag::domain::models::{
    BackgroundConfig, DocumentRecord, EmbeddingStatus, EmbeddingVector, KnowledgeBaseRecord,
    PublishStatus, SearchResult,
};
use helpdesk_rag::domain::ports::{
    ChatRequest, EmbeddingProvider, EmbeddingProviderSource, LanguageModelClient, Reranker,
};
use helpdesk_rag::services::{
    BackgroundExecutor, EmbeddingPipeline, IndexingTriggers, NoopReranker, RetrievalService,
    RetryPolicy, VectorStoreManager, VectorStoreSettings,
};

pub const TEST_COLLECTION: &str = "test_documents";
pub const TEST_ENCRYPTION_KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Provider source whose provider can be replaced mid-test, the way an
/// administrator saving new embedding settings would.
pub struct SwappableProviderSource {
    provider: RwLock<Arc<dyn EmbeddingProvider>>,
}

impl SwappableProviderSource {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider: RwLock::new(provider),
        }
    }

    pub fn swap(&self, provider: Arc<dyn EmbeddingProvider>) {
        *self.provider.write().unwrap() = provider;
    }
}

#[async_trait]
impl EmbeddingProviderSource for SwappableProviderSource {
    async fn current(&self) -> RagResult<Arc<dyn EmbeddingProvider>> {
        Ok(Arc::clone(&self.provider.read().unwrap()))
    }
}

/// Embedding provider that counts calls and delegates to the hashing provider.
pub struct CountingProvider {
    inner: HashingEmbeddingProvider,
    calls: Mutex<usize>,
}

impl CountingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            inner: HashingEmbeddingProvider::new(dimension),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed_texts(&self, texts: &[String]) -> RagResult<Vec<EmbeddingVector>> {
        *self.calls.lock().unwrap() += 1;
        self.inner.embed_texts(texts).await
    }
}

/// Embedding provider that panics on every call.
pub struct PanickingProvider;

#[async_trait]
impl EmbeddingProvider for PanickingProvider {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn model_name(&self) -> &str {
        "panicking"
    }

    fn dimension(&self) -> usize {
        16
    }

    async fn embed_texts(&self, _texts: &[String]) -> RagResult<Vec<EmbeddingVector>> {
        panic!("embedding backend crashed")
    }
}

/// Embedding provider whose upstream rejects every request with a 400.
pub struct RejectingProvider {
    dimension: usize,
}

impl RejectingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for RejectingProvider {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    fn model_name(&self) -> &str {
        "rejecting"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_texts(&self, _texts: &[String]) -> RagResult<Vec<EmbeddingVector>> {
        Err(RagError::provider_call("rejecting", Some(400), "model not found"))
    }
}

/// Reranker whose backend is down.
pub struct UnavailableReranker;

#[async_trait]
impl Reranker for UnavailableReranker {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn rerank(&self, _query: &str, _results: Vec<SearchResult>) -> RagResult<Vec<SearchResult>> {
        Err(RagError::Transport("rerank endpoint unreachable".to_string()))
    }
}

/// Language model stub that records requests and answers after an optional delay.
pub struct ScriptedLanguageModel {
    reply: Option<String>,
    delay: Duration,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLanguageModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with a transport error.
    pub fn failing() -> Self {
        Self {
            reply: None,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModelClient for ScriptedLanguageModel {
    async fn generate(&self, request: &ChatRequest) -> RagResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply
            .clone()
            .ok_or_else(|| RagError::Transport("model endpoint unreachable".to_string()))
    }
}

pub fn document(id: u64, knowledge_base_id: u64, content: &str, status: PublishStatus) -> DocumentRecord {
    DocumentRecord {
        id,
        knowledge_base_id,
        title: format!("Document {id}"),
        content: content.to_string(),
        status,
        embedding_status: EmbeddingStatus::Pending,
    }
}

pub fn knowledge_base(id: u64, rag_enabled: bool) -> KnowledgeBaseRecord {
    KnowledgeBaseRecord {
        id,
        name: format!("KB {id}"),
        rag_enabled,
    }
}

/// Everything needed to index and retrieve against in-memory stores.
pub struct Harness {
    pub database: Arc<InMemoryVectorDatabase>,
    pub providers: Arc<SwappableProviderSource>,
    pub vector_store: Arc<VectorStoreManager>,
    pub documents: Arc<InMemoryDocumentRepository>,
    pub faqs: Arc<InMemoryFaqRepository>,
    pub knowledge_bases: Arc<InMemoryKnowledgeBaseRepository>,
}

impl Harness {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let database = Arc::new(InMemoryVectorDatabase::new());
        let providers = Arc::new(SwappableProviderSource::new(provider));
        let settings = VectorStoreSettings {
            collection: TEST_COLLECTION.to_string(),
            migration_batch_size: 2,
            migration_timeout: Duration::from_secs(10),
        };
        let vector_store = Arc::new(VectorStoreManager::new(
            database.clone(),
            providers.clone(),
            settings,
            RetryPolicy::new(2, 1, 5),
        ));
        Self {
            database,
            providers,
            vector_store,
            documents: Arc::new(InMemoryDocumentRepository::new()),
            faqs: Arc::new(InMemoryFaqRepository::new()),
            knowledge_bases: Arc::new(InMemoryKnowledgeBaseRepository::new()),
        }
    }

    pub fn with_hashing(dimension: usize) -> Self {
        Self::new(Arc::new(HashingEmbeddingProvider::new(dimension)))
    }

    pub fn pipeline(&self) -> EmbeddingPipeline {
        EmbeddingPipeline::new(
            self.providers.clone(),
            self.vector_store.clone(),
            self.documents.clone(),
            self.faqs.clone(),
            Duration::from_secs(10),
        )
    }

    pub fn retrieval(&self, cache_ttl: Duration) -> RetrievalService {
        self.retrieval_with_reranker(cache_ttl, Arc::new(NoopReranker))
    }

    pub fn retrieval_with_reranker(&self, cache_ttl: Duration, reranker: Arc<dyn Reranker>) -> RetrievalService {
        RetrievalService::new(
            self.providers.clone(),
            self.vector_store.clone(),
            self.documents.clone(),
            self.knowledge_bases.clone(),
            reranker,
            cache_ttl,
        )
    }

    /// A single-worker executor, so queued tasks run in submission order.
    pub fn executor(&self) -> Arc<BackgroundExecutor> {
        Arc::new(BackgroundExecutor::new(&BackgroundConfig {
            workers: 1,
            queue_capacity: 8,
            task_deadline_secs: 10,
        }))
    }

    pub fn triggers(&self, executor: Arc<BackgroundExecutor>) -> IndexingTriggers {
        IndexingTriggers::new(Arc::new(self.pipeline()), executor)
    }

    /// Register and embed a document.
    pub async fn index(&self, record: DocumentRecord) {
        self.documents.insert(record.clone());
        self.pipeline()
            .embed_document(&record)
            .await
            .expect("document should embed");
    }
}
