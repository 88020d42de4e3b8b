//! Vector database port.
//!
//! Low-level operations on named collections. The schema is fixed: an
//! auto-generated `i64` primary key, a float vector field, and the
//! `document_id`, `knowledge_base_id` and `content` string fields.
//! Similarity is inner product, so higher scores mean more similar.

use async_trait::async_trait;

use crate::domain::errors::RagResult;
use crate::domain::models::{IndexedChunk, SearchResult, StoredText};

#[async_trait]
pub trait VectorDatabase: Send + Sync {
    /// Backend name used in logs and health reports.
    fn name(&self) -> &'static str;

    /// Cheap reachability check.
    async fn ping(&self) -> RagResult<()>;

    async fn has_collection(&self, collection: &str) -> RagResult<bool>;

    /// Declared dimension of the vector field.
    ///
    /// # Returns
    /// * `Ok(Some(dim))` - Dimension found in the schema
    /// * `Ok(None)` - Collection exists but its dimension cannot be determined
    async fn collection_dimension(&self, collection: &str) -> RagResult<Option<usize>>;

    /// Create the collection at `dimension` together with its vector index.
    async fn create_collection(&self, collection: &str, dimension: usize) -> RagResult<()>;

    async fn has_index(&self, collection: &str) -> RagResult<bool>;

    /// Create the vector index. Fails with a message containing
    /// "already exists" when another caller won the race.
    async fn create_index(&self, collection: &str) -> RagResult<()>;

    async fn drop_collection(&self, collection: &str) -> RagResult<()>;

    async fn rename_collection(&self, from: &str, to: &str) -> RagResult<()>;

    /// Load the collection into queryable memory. Idempotent.
    async fn load_collection(&self, collection: &str) -> RagResult<()>;

    async fn insert(&self, collection: &str, rows: &[IndexedChunk]) -> RagResult<()>;

    /// Nearest neighbours of `vector`, optionally restricted to one knowledge base.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        knowledge_base_id: Option<&str>,
    ) -> RagResult<Vec<SearchResult>>;

    /// Rows with primary key greater than `after_row_id`, ascending, at most `limit`.
    async fn scan_after(
        &self,
        collection: &str,
        after_row_id: i64,
        limit: usize,
    ) -> RagResult<Vec<StoredText>>;

    async fn delete_by_document_ids(&self, collection: &str, document_ids: &[String])
        -> RagResult<()>;
}
