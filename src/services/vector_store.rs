//! Vector store manager.
//!
//! Owns one logical collection: creates it at the active embedding dimension,
//! heals a missing index, and migrates the whole collection when the active
//! provider's dimension no longer matches the declared one. Migration is
//! lazy: it runs from [`VectorStoreManager::ensure_collection`], which every
//! operation reaches on first use and again whenever a vector arrives whose
//! length disagrees with the cached collection dimension.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::retry::RetryPolicy;
use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{
    CollectionDescriptor, EmbeddingVector, IndexedChunk, SearchResult, StoredText, VectorStoreConfig,
};
use crate::domain::ports::{EmbeddingProvider, EmbeddingProviderSource, VectorDatabase};

/// Results returned when a search passes `top_k == 0`.
pub const DEFAULT_SEARCH_TOP_K: usize = 5;

const MIGRATING_SUFFIX: &str = "_migrating";

/// Collection-level settings for the manager.
#[derive(Debug, Clone)]
pub struct VectorStoreSettings {
    pub collection: String,
    pub migration_batch_size: usize,
    pub migration_timeout: Duration,
}

impl VectorStoreSettings {
    pub fn from_config(config: &VectorStoreConfig) -> Self {
        Self {
            collection: config.collection.clone(),
            migration_batch_size: config.migration_batch_size.max(1),
            migration_timeout: Duration::from_secs(config.migration_timeout_secs),
        }
    }
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self::from_config(&VectorStoreConfig::default())
    }
}

/// What [`VectorStoreManager::ensure_collection`] had to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EnsureAction {
    Unchanged,
    Created,
    /// The declared dimension could not be read, so the collection was rebuilt empty.
    Recreated,
    Migrated {
        from: usize,
        to: usize,
        rows: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnsureReport {
    pub collection: String,
    pub dimension: usize,
    #[serde(flatten)]
    pub action: EnsureAction,
}

pub struct VectorStoreManager {
    database: Arc<dyn VectorDatabase>,
    providers: Arc<dyn EmbeddingProviderSource>,
    settings: VectorStoreSettings,
    retry: RetryPolicy,
    lifecycle: Arc<Mutex<()>>,
    dimension: RwLock<Option<usize>>,
}

impl VectorStoreManager {
    pub fn new(
        database: Arc<dyn VectorDatabase>,
        providers: Arc<dyn EmbeddingProviderSource>,
        settings: VectorStoreSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            database,
            providers,
            settings,
            retry,
            lifecycle: Arc::new(Mutex::new(())),
            dimension: RwLock::new(None),
        }
    }

    pub fn collection(&self) -> &str {
        &self.settings.collection
    }

    pub fn database(&self) -> &Arc<dyn VectorDatabase> {
        &self.database
    }

    /// Name and dimension of the managed collection, ensuring it first if needed.
    pub async fn descriptor(&self) -> RagResult<CollectionDescriptor> {
        Ok(CollectionDescriptor {
            name: self.settings.collection.clone(),
            dimension: self.ready_dimension().await?,
        })
    }

    /// Bring the collection in line with the active embedding provider.
    ///
    /// Absent collections are created. A collection with an unreadable
    /// dimension is dropped and recreated. A dimension mismatch runs the
    /// migration. Otherwise a missing index is created and the collection is
    /// loaded. Calls are serialized, so concurrent callers never migrate twice.
    ///
    /// # Returns
    /// * `Ok(EnsureReport)` - Collection is ready at the reported dimension
    /// * `Err(RagError::Migration)` - Re-embedding failed or timed out and the old
    ///   collection is intact, or the final rename failed and is finished on the next call
    pub async fn ensure_collection(&self) -> RagResult<EnsureReport> {
        let guard = Arc::clone(&self.lifecycle).lock_owned().await;
        let provider = self.providers.current().await?;
        let target = provider.dimension();
        let name = self.settings.collection.clone();

        self.recover_interrupted_rename(&name).await?;

        if !self.database.has_collection(&name).await? {
            info!(collection = %name, dimension = target, "Creating vector collection");
            self.database.create_collection(&name, target).await?;
            self.load(&name).await?;
            return Ok(self.remember(name, target, EnsureAction::Created));
        }

        match self.database.collection_dimension(&name).await? {
            None => {
                warn!(collection = %name, "Collection dimension unreadable, recreating");
                self.database.drop_collection(&name).await?;
                self.database.create_collection(&name, target).await?;
                self.load(&name).await?;
                Ok(self.remember(name, target, EnsureAction::Recreated))
            }
            Some(current) if current != target => {
                let rows = self.migrate(guard, provider, current, target).await?;
                Ok(self.remember(
                    name,
                    target,
                    EnsureAction::Migrated {
                        from: current,
                        to: target,
                        rows,
                    },
                ))
            }
            Some(current) => {
                self.ensure_index(&name).await?;
                self.load(&name).await?;
                debug!(collection = %name, dimension = current, "Collection ready");
                Ok(self.remember(name, current, EnsureAction::Unchanged))
            }
        }
    }

    /// Index one embedded item, replacing any rows already stored for it.
    pub async fn upsert_one(
        &self,
        document_id: &str,
        knowledge_base_id: &str,
        content: &str,
        vector: EmbeddingVector,
    ) -> RagResult<()> {
        self.write_rows(vec![IndexedChunk {
            document_id: document_id.to_string(),
            knowledge_base_id: knowledge_base_id.to_string(),
            content: content.to_string(),
            vector,
        }])
        .await
    }

    /// Index a batch of embedded items given as parallel sequences, replacing
    /// any rows already stored for those document ids.
    ///
    /// All four sequences must have the same length; nothing is written otherwise.
    pub async fn upsert_many(
        &self,
        document_ids: &[String],
        knowledge_base_ids: &[String],
        contents: &[String],
        vectors: Vec<EmbeddingVector>,
    ) -> RagResult<()> {
        let n = document_ids.len();
        if knowledge_base_ids.len() != n || contents.len() != n || vectors.len() != n {
            return Err(RagError::LengthMismatch(format!(
                "{n} document ids, {} knowledge base ids, {} contents, {} vectors",
                knowledge_base_ids.len(),
                contents.len(),
                vectors.len()
            )));
        }
        if n == 0 {
            return Ok(());
        }

        let rows = document_ids
            .iter()
            .zip(knowledge_base_ids)
            .zip(contents)
            .zip(vectors)
            .map(|(((document_id, knowledge_base_id), content), vector)| IndexedChunk {
                document_id: document_id.clone(),
                knowledge_base_id: knowledge_base_id.clone(),
                content: content.clone(),
                vector,
            })
            .collect();
        self.write_rows(rows).await
    }

    /// Nearest neighbours of `vector`, optionally restricted to one knowledge base.
    ///
    /// `top_k == 0` means [`DEFAULT_SEARCH_TOP_K`]. The vector length must equal
    /// the collection dimension.
    pub async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        knowledge_base_id: Option<&str>,
    ) -> RagResult<Vec<SearchResult>> {
        if vector.is_empty() {
            return Err(RagError::DimensionMismatch {
                expected: self.ready_dimension().await?,
                actual: 0,
            });
        }
        let dimension = self.dimension_for(vector.len()).await?;
        if vector.len() != dimension {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }

        let top_k = if top_k == 0 { DEFAULT_SEARCH_TOP_K } else { top_k };
        let name = &self.settings.collection;
        self.load(name).await?;
        let started = Instant::now();
        let results = self
            .database
            .search(name, vector, top_k, knowledge_base_id.filter(|kb| !kb.is_empty()))
            .await?;
        debug!(
            collection = %name,
            top_k,
            hits = results.len(),
            latency_ms = elapsed_ms(started),
            "Vector search finished"
        );
        Ok(results)
    }

    pub async fn delete_one(&self, document_id: &str) -> RagResult<()> {
        self.delete_many(&[document_id.to_string()]).await
    }

    pub async fn delete_many(&self, document_ids: &[String]) -> RagResult<()> {
        if document_ids.is_empty() {
            return Ok(());
        }
        self.ready_dimension().await?;
        let name = &self.settings.collection;
        self.load(name).await?;
        self.database.delete_by_document_ids(name, document_ids).await
    }

    async fn write_rows(&self, rows: Vec<IndexedChunk>) -> RagResult<()> {
        let Some(first) = rows.first() else {
            return Ok(());
        };
        let dimension = self.dimension_for(first.vector.len()).await?;
        if let Some(bad) = rows.iter().find(|r| r.vector.len() != dimension) {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: bad.vector.len(),
            });
        }
        let name = &self.settings.collection;
        self.load(name).await?;

        // one chunk per document: drop whatever an earlier embedding left behind
        let mut document_ids: Vec<String> = rows.iter().map(|r| r.document_id.clone()).collect();
        document_ids.sort();
        document_ids.dedup();
        self.database.delete_by_document_ids(name, &document_ids).await?;

        self.database.insert(name, &rows).await?;
        debug!(collection = %name, rows = rows.len(), "Upserted vectors");
        Ok(())
    }

    /// Cached collection dimension, ensuring the collection on first use.
    async fn ready_dimension(&self) -> RagResult<usize> {
        match self.cached_dimension() {
            Some(dimension) => Ok(dimension),
            None => Ok(self.ensure_collection().await?.dimension),
        }
    }

    /// Dimension to validate a vector of `len` against. A disagreement with the
    /// cached value re-runs `ensure_collection`, since the provider may have changed.
    async fn dimension_for(&self, len: usize) -> RagResult<usize> {
        let dimension = self.ready_dimension().await?;
        if dimension == len {
            return Ok(dimension);
        }
        Ok(self.ensure_collection().await?.dimension)
    }

    fn cached_dimension(&self) -> Option<usize> {
        *self.dimension.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn remember(&self, collection: String, dimension: usize, action: EnsureAction) -> EnsureReport {
        *self.dimension.write().unwrap_or_else(PoisonError::into_inner) = Some(dimension);
        EnsureReport {
            collection,
            dimension,
            action,
        }
    }

    /// Load with transparent retries.
    async fn load(&self, collection: &str) -> RagResult<()> {
        self.retry
            .execute(|| self.database.load_collection(collection))
            .await
    }

    async fn ensure_index(&self, collection: &str) -> RagResult<()> {
        if self.database.has_index(collection).await? {
            return Ok(());
        }
        info!(collection, "Vector index missing, creating");
        match self.database.create_index(collection).await {
            Err(e) if e.to_string().contains("already exists") => Ok(()),
            other => other,
        }
    }

    /// A crash between dropping the old collection and renaming the new one
    /// leaves only the temporary collection behind. Finish the rename.
    async fn recover_interrupted_rename(&self, name: &str) -> RagResult<()> {
        let temp = migrating_name(name);
        if !self.database.has_collection(name).await? && self.database.has_collection(&temp).await? {
            warn!(collection = %name, temp = %temp, "Completing interrupted migration rename");
            self.database.rename_collection(&temp, name).await?;
        }
        Ok(())
    }

    async fn migrate(
        &self,
        guard: OwnedMutexGuard<()>,
        provider: Arc<dyn EmbeddingProvider>,
        from: usize,
        to: usize,
    ) -> RagResult<usize> {
        let migration = Migration {
            database: Arc::clone(&self.database),
            provider,
            collection: self.settings.collection.clone(),
            batch_size: self.settings.migration_batch_size,
            retry: self.retry.clone(),
            from,
            to,
        };
        let deadline = self.settings.migration_timeout;

        // Detached so a dropped caller cannot abort a half-built collection.
        let handle = tokio::spawn(async move {
            let _guard = guard;
            migration.run(deadline).await
        });

        handle
            .await
            .map_err(|e| RagError::Migration(format!("migration task failed: {e}")))?
    }
}

fn migrating_name(collection: &str) -> String {
    format!("{collection}{MIGRATING_SUFFIX}")
}

fn into_migration_error(e: RagError) -> RagError {
    match e {
        RagError::Migration(_) => e,
        other => RagError::Migration(other.to_string()),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// One re-embedding migration from `from` to `to` dimensions.
struct Migration {
    database: Arc<dyn VectorDatabase>,
    provider: Arc<dyn EmbeddingProvider>,
    collection: String,
    batch_size: usize,
    retry: RetryPolicy,
    from: usize,
    to: usize,
}

/// What the copy phase produced.
enum Copied {
    /// The old collection had no rows; nothing was staged.
    Empty,
    /// Rows re-embedded into the temporary collection.
    Staged(usize),
}

impl Migration {
    /// Copy under `deadline`, then swap the temporary collection in.
    ///
    /// Only the copy phase is bounded. Once the old collection has been
    /// dropped the temporary one is the sole copy, so the swap always runs
    /// to completion and a failed rename is finished by the next
    /// `ensure_collection`.
    async fn run(&self, deadline: Duration) -> RagResult<usize> {
        let started = Instant::now();
        info!(
            collection = %self.collection,
            from = self.from,
            to = self.to,
            model = self.provider.model_name(),
            "Migrating collection to new embedding dimension"
        );

        let copied = match tokio::time::timeout(deadline, self.copy_phase()).await {
            Ok(Ok(copied)) => copied,
            Ok(Err(e)) => {
                self.discard_temp().await;
                return Err(into_migration_error(e));
            }
            Err(_) => {
                self.discard_temp().await;
                return Err(RagError::Migration(format!("timed out after {deadline:?}")));
            }
        };

        let rows = match copied {
            Copied::Empty => {
                info!(collection = %self.collection, "Old collection is empty, recreating");
                self.database.drop_collection(&self.collection).await?;
                self.database.create_collection(&self.collection, self.to).await?;
                self.load(&self.collection).await?;
                0
            }
            Copied::Staged(rows) => {
                self.swap_in_temp().await?;
                rows
            }
        };

        info!(
            collection = %self.collection,
            rows,
            dimension = self.to,
            latency_ms = elapsed_ms(started),
            "Collection migration finished"
        );
        Ok(rows)
    }

    /// Stage every old row, re-embedded, in `<name>_migrating`. The old
    /// collection is only read.
    async fn copy_phase(&self) -> RagResult<Copied> {
        self.load(&self.collection).await?;
        let first = self
            .database
            .scan_after(&self.collection, 0, self.batch_size)
            .await
            .map_err(|e| RagError::Migration(format!("reading old collection: {e}")))?;
        if first.is_empty() {
            return Ok(Copied::Empty);
        }

        let temp = migrating_name(&self.collection);
        if self.database.has_collection(&temp).await? {
            warn!(temp = %temp, "Dropping stale temporary collection");
            self.database.drop_collection(&temp).await?;
        }
        self.database.create_collection(&temp, self.to).await?;
        self.load(&temp).await?;

        Ok(Copied::Staged(self.copy_all(first, &temp).await?))
    }

    async fn swap_in_temp(&self) -> RagResult<()> {
        let temp = migrating_name(&self.collection);
        self.database
            .drop_collection(&self.collection)
            .await
            .map_err(|e| RagError::Migration(format!("dropping old collection: {e}")))?;
        self.database
            .rename_collection(&temp, &self.collection)
            .await
            .map_err(|e| RagError::Migration(format!("renaming {temp}: {e}")))?;
        self.load(&self.collection).await
    }

    /// Drain the old collection into `temp`, re-embedding batch by batch.
    async fn copy_all(&self, first: Vec<StoredText>, temp: &str) -> RagResult<usize> {
        let mut batch = first;
        let mut copied = 0;
        loop {
            let Some(last) = batch.last() else {
                return Ok(copied);
            };
            let after = last.row_id;
            let full = batch.len() >= self.batch_size;

            let texts: Vec<String> = batch.iter().map(|row| row.content.clone()).collect();
            let vectors = self
                .retry
                .execute(|| self.provider.embed_exact(&texts))
                .await?;
            let rows: Vec<IndexedChunk> = batch
                .into_iter()
                .zip(vectors)
                .map(|(row, vector)| IndexedChunk {
                    document_id: row.document_id,
                    knowledge_base_id: row.knowledge_base_id,
                    content: row.content,
                    vector,
                })
                .collect();
            self.retry
                .execute(|| self.database.insert(temp, &rows))
                .await?;
            copied += rows.len();
            debug!(temp, copied, "Migrated batch");

            if !full {
                return Ok(copied);
            }
            batch = self
                .retry
                .execute(|| self.database.scan_after(&self.collection, after, self.batch_size))
                .await?;
        }
    }

    async fn load(&self, collection: &str) -> RagResult<()> {
        self.retry
            .execute(|| self.database.load_collection(collection))
            .await
    }

    async fn discard_temp(&self) {
        let temp = migrating_name(&self.collection);
        if !matches!(self.database.has_collection(&temp).await, Ok(true)) {
            return;
        }
        if let Err(e) = self.database.drop_collection(&temp).await {
            warn!(temp = %temp, error = %e, "Failed to drop temporary collection");
        }
    }
}
