//! In-memory vector database.
//!
//! Brute-force inner-product search over rows held in a map of collections.
//! Mirrors the behaviour the manager relies on: auto-increment primary keys,
//! dimension enforcement on insert and search, index and load state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{IndexedChunk, SearchResult, StoredText};
use crate::domain::ports::VectorDatabase;

#[derive(Debug, Default)]
struct Collection {
    /// `None` simulates a schema whose dimension cannot be read.
    dimension: Option<usize>,
    has_index: bool,
    loaded: bool,
    next_row_id: i64,
    rows: Vec<(i64, IndexedChunk)>,
}

/// Counters for assertions about destructive or expensive calls.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub creates: AtomicUsize,
    pub drops: AtomicUsize,
    pub renames: AtomicUsize,
    pub inserts: AtomicUsize,
    pub deletes: AtomicUsize,
    pub searches: AtomicUsize,
    pub load_calls: AtomicUsize,
}

#[derive(Debug, Default)]
pub struct InMemoryVectorDatabase {
    collections: Mutex<HashMap<String, Collection>>,
    counts: CallCounts,
    failing_loads: AtomicUsize,
    rename_delay_ms: AtomicU64,
}

impl InMemoryVectorDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> &CallCounts {
        &self.counts
    }

    /// Make the next `n` load calls fail with a transient error.
    pub fn fail_next_loads(&self, n: usize) {
        self.failing_loads.store(n, Ordering::SeqCst);
    }

    /// Make every rename wait this long before taking effect.
    pub fn delay_renames(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.rename_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Seed a collection with a given (or unreadable) dimension and no index.
    pub fn seed_collection(&self, name: &str, dimension: Option<usize>) {
        let mut collections = self.lock();
        collections.insert(
            name.to_string(),
            Collection {
                dimension,
                next_row_id: 1,
                ..Collection::default()
            },
        );
    }

    pub fn row_count(&self, name: &str) -> usize {
        self.lock().get(name).map_or(0, |c| c.rows.len())
    }

    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn rows(&self, name: &str) -> Vec<IndexedChunk> {
        self.lock()
            .get(name)
            .map(|c| c.rows.iter().map(|(_, row)| row.clone()).collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Collection>> {
        self.collections
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn missing(operation: &str, name: &str) -> RagError {
        RagError::vector_db(operation, format!("collection {name} not found"))
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[async_trait]
impl VectorDatabase for InMemoryVectorDatabase {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> RagResult<()> {
        Ok(())
    }

    async fn has_collection(&self, collection: &str) -> RagResult<bool> {
        Ok(self.lock().contains_key(collection))
    }

    async fn collection_dimension(&self, collection: &str) -> RagResult<Option<usize>> {
        self.lock()
            .get(collection)
            .map(|c| c.dimension)
            .ok_or_else(|| Self::missing("describe collection", collection))
    }

    async fn create_collection(&self, collection: &str, dimension: usize) -> RagResult<()> {
        let mut collections = self.lock();
        if collections.contains_key(collection) {
            return Err(RagError::vector_db(
                "create collection",
                format!("collection {collection} already exists"),
            ));
        }
        self.counts.creates.fetch_add(1, Ordering::SeqCst);
        collections.insert(
            collection.to_string(),
            Collection {
                dimension: Some(dimension),
                has_index: true,
                loaded: false,
                next_row_id: 1,
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn has_index(&self, collection: &str) -> RagResult<bool> {
        self.lock()
            .get(collection)
            .map(|c| c.has_index)
            .ok_or_else(|| Self::missing("list indexes", collection))
    }

    async fn create_index(&self, collection: &str) -> RagResult<()> {
        let mut collections = self.lock();
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| Self::missing("create index", collection))?;
        if entry.has_index {
            return Err(RagError::vector_db("create index", "index already exists"));
        }
        entry.has_index = true;
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> RagResult<()> {
        self.counts.drops.fetch_add(1, Ordering::SeqCst);
        self.lock()
            .remove(collection)
            .map(|_| ())
            .ok_or_else(|| Self::missing("drop collection", collection))
    }

    async fn rename_collection(&self, from: &str, to: &str) -> RagResult<()> {
        let delay = self.rename_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let mut collections = self.lock();
        if collections.contains_key(to) {
            return Err(RagError::vector_db(
                "rename collection",
                format!("collection {to} already exists"),
            ));
        }
        let entry = collections
            .remove(from)
            .ok_or_else(|| Self::missing("rename collection", from))?;
        self.counts.renames.fetch_add(1, Ordering::SeqCst);
        collections.insert(to.to_string(), entry);
        Ok(())
    }

    async fn load_collection(&self, collection: &str) -> RagResult<()> {
        self.counts.load_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_loads.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_loads.store(failing - 1, Ordering::SeqCst);
            return Err(RagError::Transport("load interrupted".to_string()));
        }
        let mut collections = self.lock();
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| Self::missing("load collection", collection))?;
        entry.loaded = true;
        Ok(())
    }

    async fn insert(&self, collection: &str, rows: &[IndexedChunk]) -> RagResult<()> {
        self.counts.inserts.fetch_add(1, Ordering::SeqCst);
        let mut collections = self.lock();
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| Self::missing("insert", collection))?;
        if let Some(dimension) = entry.dimension {
            if let Some(bad) = rows.iter().find(|r| r.vector.len() != dimension) {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    actual: bad.vector.len(),
                });
            }
        }
        for row in rows {
            let id = entry.next_row_id;
            entry.next_row_id += 1;
            entry.rows.push((id, row.clone()));
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        knowledge_base_id: Option<&str>,
    ) -> RagResult<Vec<SearchResult>> {
        self.counts.searches.fetch_add(1, Ordering::SeqCst);
        let collections = self.lock();
        let entry = collections
            .get(collection)
            .ok_or_else(|| Self::missing("search", collection))?;
        if !entry.loaded {
            return Err(RagError::vector_db("search", "collection not loaded"));
        }

        let mut hits: Vec<SearchResult> = entry
            .rows
            .iter()
            .map(|(_, row)| row)
            .filter(|row| knowledge_base_id.is_none_or(|kb| kb.is_empty() || row.knowledge_base_id == kb))
            .map(|row| SearchResult {
                document_id: row.document_id.clone(),
                knowledge_base_id: row.knowledge_base_id.clone(),
                content: row.content.clone(),
                score: inner_product(vector, &row.vector),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn scan_after(
        &self,
        collection: &str,
        after_row_id: i64,
        limit: usize,
    ) -> RagResult<Vec<StoredText>> {
        let collections = self.lock();
        let entry = collections
            .get(collection)
            .ok_or_else(|| Self::missing("query", collection))?;
        let mut rows: Vec<StoredText> = entry
            .rows
            .iter()
            .filter(|(id, _)| *id > after_row_id)
            .map(|(id, row)| StoredText {
                row_id: *id,
                document_id: row.document_id.clone(),
                knowledge_base_id: row.knowledge_base_id.clone(),
                content: row.content.clone(),
            })
            .collect();
        rows.sort_by_key(|r| r.row_id);
        rows.truncate(limit);
        Ok(rows)
    }

    async fn delete_by_document_ids(
        &self,
        collection: &str,
        document_ids: &[String],
    ) -> RagResult<()> {
        self.counts.deletes.fetch_add(1, Ordering::SeqCst);
        let mut collections = self.lock();
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| Self::missing("delete", collection))?;
        entry
            .rows
            .retain(|(_, row)| !document_ids.contains(&row.document_id));
        Ok(())
    }
}
