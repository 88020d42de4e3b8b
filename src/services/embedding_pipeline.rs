//! Document and FAQ embedding pipeline.
//!
//! Drives content through the embedding provider and into the vector store,
//! writing the item's embedding status along the way. Runs detached from the
//! request that triggered it, so failures end up as a `failed` status and a
//! log line. Panics inside an attempt are caught and recorded the same way.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::vector_store::VectorStoreManager;
use crate::domain::errors::{panic_message, RagError, RagResult};
use crate::domain::models::{item_key, DocumentRecord, EmbeddingStatus, FaqRecord, ItemKind};
use crate::domain::ports::{DocumentRepository, EmbeddingProviderSource, FaqRepository};

/// Outcome of [`EmbeddingPipeline::embed_documents_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchEmbeddingReport {
    pub embedded: Vec<u64>,
    pub skipped: Vec<u64>,
    pub failed: Vec<u64>,
    pub errors: Vec<String>,
}

impl BatchEmbeddingReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct EmbeddingPipeline {
    providers: Arc<dyn EmbeddingProviderSource>,
    vector_store: Arc<VectorStoreManager>,
    documents: Arc<dyn DocumentRepository>,
    faqs: Arc<dyn FaqRepository>,
    batch_deadline: Duration,
}

impl EmbeddingPipeline {
    pub fn new(
        providers: Arc<dyn EmbeddingProviderSource>,
        vector_store: Arc<VectorStoreManager>,
        documents: Arc<dyn DocumentRepository>,
        faqs: Arc<dyn FaqRepository>,
        batch_deadline: Duration,
    ) -> Self {
        Self {
            providers,
            vector_store,
            documents,
            faqs,
            batch_deadline,
        }
    }

    pub async fn embed_document(&self, document: &DocumentRecord) -> RagResult<()> {
        self.embed_one(
            ItemKind::Document,
            document.id,
            document.knowledge_base_id,
            &document.content,
        )
        .await
    }

    pub async fn embed_faq(&self, faq: &FaqRecord) -> RagResult<()> {
        self.embed_one(
            ItemKind::Faq,
            faq.id,
            faq.indexed_knowledge_base_id(),
            &faq.indexed_text(),
        )
        .await
    }

    /// Embed and index one item: `processing`, then `completed` or `failed`.
    ///
    /// The error is returned for the caller to log; the status has already
    /// been written by then.
    pub async fn embed_one(
        &self,
        kind: ItemKind,
        item_id: u64,
        knowledge_base_id: u64,
        content: &str,
    ) -> RagResult<()> {
        self.set_status(kind, item_id, EmbeddingStatus::Processing).await?;

        let attempt = AssertUnwindSafe(self.index_one(item_id, knowledge_base_id, content))
            .catch_unwind()
            .await;
        let result = attempt.unwrap_or_else(|payload| Err(RagError::Panicked(panic_message(payload.as_ref()))));

        match &result {
            Ok(()) => {
                self.set_status(kind, item_id, EmbeddingStatus::Completed).await?;
                debug!(kind = kind.as_str(), document_id = item_id, kb_id = knowledge_base_id, "Item embedded");
            }
            Err(e) => {
                error!(kind = kind.as_str(), document_id = item_id, error = %e, "Embedding failed");
                if let Err(status_err) = self.set_status(kind, item_id, EmbeddingStatus::Failed).await {
                    warn!(document_id = item_id, error = %status_err, "Could not record failed status");
                }
            }
        }
        result
    }

    /// Embed a batch with one provider call and one vector store write.
    ///
    /// The three sequences must have equal length; otherwise nothing is
    /// written, statuses included. A provider failure marks every item failed.
    /// When one item cannot be moved to `processing`, the items already moved
    /// are marked failed and nothing is embedded.
    pub async fn embed_many(
        &self,
        kind: ItemKind,
        item_ids: &[u64],
        knowledge_base_ids: &[u64],
        contents: &[String],
    ) -> RagResult<()> {
        if item_ids.len() != knowledge_base_ids.len() || item_ids.len() != contents.len() {
            return Err(RagError::LengthMismatch(format!(
                "{} item ids, {} knowledge base ids, {} contents",
                item_ids.len(),
                knowledge_base_ids.len(),
                contents.len()
            )));
        }
        if item_ids.is_empty() {
            return Ok(());
        }

        for (picked, &id) in item_ids.iter().enumerate() {
            if let Err(e) = self.set_status(kind, id, EmbeddingStatus::Processing).await {
                error!(kind = kind.as_str(), document_id = id, error = %e, "Could not start batch");
                self.record_batch_status(kind, &item_ids[..picked], EmbeddingStatus::Failed)
                    .await;
                return Err(e);
            }
        }

        let attempt = AssertUnwindSafe(tokio::time::timeout(
            self.batch_deadline,
            self.index_many(item_ids, knowledge_base_ids, contents),
        ))
        .catch_unwind()
        .await;
        let result = match attempt {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RagError::Timeout("batch embedding")),
            Err(payload) => Err(RagError::Panicked(panic_message(payload.as_ref()))),
        };

        let status = if result.is_ok() {
            EmbeddingStatus::Completed
        } else {
            EmbeddingStatus::Failed
        };
        self.record_batch_status(kind, item_ids, status).await;

        match &result {
            Ok(()) => info!(kind = kind.as_str(), items = item_ids.len(), "Batch embedded"),
            Err(e) => error!(kind = kind.as_str(), items = item_ids.len(), error = %e, "Batch embedding failed"),
        }
        result
    }

    /// Bulk-import path: skip documents already `completed` or in flight,
    /// reset `failed` ones to `pending`, embed the rest as one batch, and
    /// report per-item failures.
    pub async fn embed_documents_batch(&self, document_ids: &[u64]) -> RagResult<BatchEmbeddingReport> {
        let mut report = BatchEmbeddingReport::default();
        if document_ids.is_empty() {
            return Ok(report);
        }

        let documents = self.documents.get_by_ids(document_ids).await?;
        let mut ids = Vec::with_capacity(documents.len());
        let mut kb_ids = Vec::with_capacity(documents.len());
        let mut contents = Vec::with_capacity(documents.len());
        for document in documents {
            match document.embedding_status {
                // already indexed, or an attempt is in flight elsewhere
                EmbeddingStatus::Completed | EmbeddingStatus::Processing => {
                    report.skipped.push(document.id);
                    continue;
                }
                EmbeddingStatus::Failed => {
                    if let Err(e) = self.mark_pending(ItemKind::Document, document.id).await {
                        report.failed.push(document.id);
                        report.errors.push(format!("document {}: {e}", document.id));
                        continue;
                    }
                }
                EmbeddingStatus::Pending => {}
            }
            ids.push(document.id);
            kb_ids.push(document.knowledge_base_id);
            contents.push(document.content);
        }

        match self.embed_many(ItemKind::Document, &ids, &kb_ids, &contents).await {
            Ok(()) => report.embedded = ids,
            Err(e) => {
                report.errors.extend(ids.iter().map(|id| format!("document {id}: {e}")));
                report.failed.extend(ids);
            }
        }
        Ok(report)
    }

    /// Re-read an item from its repository and embed its current content.
    ///
    /// Detached triggers use this so that a task queued before a later edit
    /// still indexes the latest text. An item deleted in the meantime is skipped.
    pub async fn embed_stored(&self, kind: ItemKind, item_id: u64) -> RagResult<()> {
        match kind {
            ItemKind::Document => match self.documents.get_by_id(item_id).await? {
                Some(document) => self.embed_document(&document).await,
                None => {
                    debug!(document_id = item_id, "Document gone before embedding, skipping");
                    Ok(())
                }
            },
            ItemKind::Faq => match self.faqs.get_by_id(item_id).await? {
                Some(faq) => self.embed_faq(&faq).await,
                None => {
                    debug!(document_id = item_id, "FAQ gone before embedding, skipping");
                    Ok(())
                }
            },
        }
    }

    /// Reset an item to `pending` after its content was created or edited.
    pub async fn mark_pending(&self, kind: ItemKind, item_id: u64) -> RagResult<()> {
        self.set_status(kind, item_id, EmbeddingStatus::Pending).await
    }

    /// Record that an item will not be embedded, e.g. when it could not be queued.
    pub async fn mark_failed(&self, kind: ItemKind, item_id: u64) -> RagResult<()> {
        self.set_status(kind, item_id, EmbeddingStatus::Failed).await
    }

    /// Remove an item's vectors. Failures are logged and returned; they must
    /// not block deletion of the item itself.
    pub async fn delete_item(&self, item_id: u64) -> RagResult<()> {
        self.delete_items(&[item_id]).await
    }

    pub async fn delete_items(&self, item_ids: &[u64]) -> RagResult<()> {
        let keys: Vec<String> = item_ids.iter().copied().map(item_key).collect();
        let result = self.vector_store.delete_many(&keys).await;
        if let Err(e) = &result {
            warn!(items = item_ids.len(), error = %e, "Vector deletion failed");
        }
        result
    }

    async fn index_one(&self, item_id: u64, knowledge_base_id: u64, content: &str) -> RagResult<()> {
        let provider = self.providers.current().await?;
        let vector = provider.embed(content).await?;
        self.vector_store
            .upsert_one(&item_key(item_id), &item_key(knowledge_base_id), content, vector)
            .await
    }

    async fn index_many(
        &self,
        item_ids: &[u64],
        knowledge_base_ids: &[u64],
        contents: &[String],
    ) -> RagResult<()> {
        let provider = self.providers.current().await?;
        let vectors = provider.embed_exact(contents).await?;
        let ids: Vec<String> = item_ids.iter().copied().map(item_key).collect();
        let kb_ids: Vec<String> = knowledge_base_ids.iter().copied().map(item_key).collect();
        self.vector_store.upsert_many(&ids, &kb_ids, contents, vectors).await
    }

    async fn record_batch_status(&self, kind: ItemKind, item_ids: &[u64], status: EmbeddingStatus) {
        for &id in item_ids {
            if let Err(e) = self.set_status(kind, id, status).await {
                warn!(document_id = id, status = %status, error = %e, "Could not record batch status");
            }
        }
    }

    /// Write `status` after checking the transition against the stored value.
    async fn set_status(&self, kind: ItemKind, id: u64, status: EmbeddingStatus) -> RagResult<()> {
        let current = match kind {
            ItemKind::Document => self.documents.embedding_status(id).await?,
            ItemKind::Faq => self.faqs.embedding_status(id).await?,
        };
        if let Some(current) = current {
            if !current.can_transition_to(status) {
                warn!(kind = kind.as_str(), document_id = id, from = %current, to = %status, "Rejected status transition");
                return Err(RagError::InvalidStatusTransition {
                    id,
                    from: current,
                    to: status,
                });
            }
        }
        match kind {
            ItemKind::Document => self.documents.update_embedding_status(id, status).await,
            ItemKind::Faq => self.faqs.update_embedding_status(id, status).await,
        }
    }
}
