//! Indexing triggers.
//!
//! Entry points the content layer calls when documents or FAQs are saved or
//! deleted. The status reset to `pending` happens before the call returns;
//! embedding and vector deletion run on the background executor.

use std::sync::Arc;

use tracing::{debug, warn};

use super::background::{BackgroundExecutor, TaskHandle};
use super::embedding_pipeline::EmbeddingPipeline;
use crate::domain::errors::RagResult;
use crate::domain::models::{DocumentRecord, FaqRecord, ItemKind};

pub struct IndexingTriggers {
    pipeline: Arc<EmbeddingPipeline>,
    executor: Arc<BackgroundExecutor>,
}

impl IndexingTriggers {
    pub fn new(pipeline: Arc<EmbeddingPipeline>, executor: Arc<BackgroundExecutor>) -> Self {
        Self { pipeline, executor }
    }

    /// A document was created (`previous` is `None`) or edited.
    pub async fn on_document_saved(
        &self,
        previous: Option<&DocumentRecord>,
        document: &DocumentRecord,
    ) -> RagResult<Option<TaskHandle>> {
        self.on_content_saved(
            ItemKind::Document,
            document.id,
            previous.map(|p| p.content.as_str()),
            &document.content,
        )
        .await
    }

    /// A FAQ was created or edited. Question and answer are indexed together,
    /// so a change to either re-embeds the entry.
    pub async fn on_faq_saved(
        &self,
        previous: Option<&FaqRecord>,
        faq: &FaqRecord,
    ) -> RagResult<Option<TaskHandle>> {
        let previous_text = previous.map(FaqRecord::indexed_text);
        self.on_content_saved(ItemKind::Faq, faq.id, previous_text.as_deref(), &faq.indexed_text())
            .await
    }

    /// Reset the item to `pending` and queue its embedding.
    ///
    /// An edit that leaves the indexed text unchanged does nothing and
    /// returns `None`. The queued task re-reads the item, so a burst of edits
    /// indexes the latest text.
    ///
    /// # Returns
    /// * `Ok(Some(handle))` - Embedding queued
    /// * `Ok(None)` - Text unchanged, nothing to do
    /// * `Err(_)` - Status could not be reset, or the queue is closed (the item is then marked failed)
    pub async fn on_content_saved(
        &self,
        kind: ItemKind,
        item_id: u64,
        previous_content: Option<&str>,
        content: &str,
    ) -> RagResult<Option<TaskHandle>> {
        if previous_content == Some(content) {
            debug!(kind = kind.as_str(), document_id = item_id, "Content unchanged, not re-embedding");
            return Ok(None);
        }

        self.pipeline.mark_pending(kind, item_id).await?;

        let pipeline = Arc::clone(&self.pipeline);
        let submitted = self
            .executor
            .submit(format!("embed-{}-{item_id}", kind.as_str()), async move {
                pipeline.embed_stored(kind, item_id).await
            })
            .await;

        match submitted {
            Ok(handle) => Ok(Some(handle)),
            Err(e) => {
                warn!(kind = kind.as_str(), document_id = item_id, error = %e, "Could not queue embedding");
                if let Err(status_err) = self.pipeline.mark_failed(kind, item_id).await {
                    warn!(document_id = item_id, error = %status_err, "Could not record failed status");
                }
                Err(e)
            }
        }
    }

    /// Items were deleted. Their vectors are removed in the background; a
    /// failure is logged and never blocks the deletion itself.
    pub async fn on_deleted(&self, item_ids: &[u64]) -> Option<TaskHandle> {
        if item_ids.is_empty() {
            return None;
        }
        let pipeline = Arc::clone(&self.pipeline);
        let ids = item_ids.to_vec();
        match self
            .executor
            .submit(format!("delete-vectors-{}", ids.len()), async move {
                pipeline.delete_items(&ids).await
            })
            .await
        {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(items = item_ids.len(), error = %e, "Could not queue vector deletion");
                None
            }
        }
    }
}
