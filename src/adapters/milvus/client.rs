//! Milvus REST v2 client implementing the vector database port.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{
    quote, CollectionRequest, CreateCollectionRequest, CreateIndexRequest, DeleteRequest,
    DescribeCollection, Envelope, HasCollection, IndexParam, InsertRequest, InsertRow, LoadState,
    QueryRequest, QueryRow, RenameRequest, Schema, SearchHit, SearchParams, SearchRequest,
    FIELD_CONTENT, FIELD_DOCUMENT_ID, FIELD_ID, FIELD_KNOWLEDGE_BASE_ID, FIELD_VECTOR,
};
use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{IndexedChunk, SearchResult, StoredText, VectorStoreConfig};
use crate::domain::ports::VectorDatabase;

/// Connection settings for [`MilvusRestClient`].
#[derive(Debug, Clone)]
pub struct MilvusConfig {
    /// e.g. `http://localhost:19530`
    pub base_url: String,
    /// `user:password` or an API key.
    pub token: Option<String>,
    pub timeout: Duration,
}

impl MilvusConfig {
    pub fn from_config(config: &VectorStoreConfig) -> Self {
        Self {
            base_url: config.url.clone(),
            token: config.token.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

pub struct MilvusRestClient {
    config: MilvusConfig,
    client: reqwest::Client,
}

impl MilvusRestClient {
    pub fn new(config: MilvusConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/v2/vectordb/{}",
            self.config.base_url.trim_end_matches('/'),
            path
        )
    }

    /// POST a JSON body and unwrap the `{code, message, data}` envelope.
    async fn call<B, T>(&self, operation: &str, path: &str, body: &B) -> RagResult<Option<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .post(self.endpoint(path))
            .timeout(self.config.timeout)
            .json(body);
        if let Some(token) = self.config.token.as_deref().filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RagError::provider_call(
                format!("milvus {operation}"),
                Some(status.as_u16()),
                &text,
            ));
        }

        let envelope: Envelope<T> = serde_json::from_str(&text)
            .map_err(|e| RagError::vector_db(operation, format!("unparseable response: {e}")))?;
        if !envelope.is_success() {
            return Err(RagError::vector_db(
                operation,
                format!(
                    "code {}: {}",
                    envelope.code,
                    envelope.message.unwrap_or_default()
                ),
            ));
        }
        Ok(envelope.data)
    }

    /// Call an endpoint whose `data` payload is irrelevant.
    async fn call_unit<B>(&self, operation: &str, path: &str, body: &B) -> RagResult<()>
    where
        B: Serialize + Sync,
    {
        self.call::<B, serde_json::Value>(operation, path, body)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl VectorDatabase for MilvusRestClient {
    fn name(&self) -> &'static str {
        "milvus"
    }

    async fn ping(&self) -> RagResult<()> {
        self.call_unit("list collections", "collections/list", &serde_json::json!({}))
            .await
    }

    async fn has_collection(&self, collection: &str) -> RagResult<bool> {
        let data: Option<HasCollection> = self
            .call(
                "has collection",
                "collections/has",
                &CollectionRequest {
                    collection_name: collection,
                },
            )
            .await?;
        Ok(data.is_some_and(|d| d.has))
    }

    async fn collection_dimension(&self, collection: &str) -> RagResult<Option<usize>> {
        let data: Option<DescribeCollection> = self
            .call(
                "describe collection",
                "collections/describe",
                &CollectionRequest {
                    collection_name: collection,
                },
            )
            .await?;
        Ok(data.and_then(|d| d.vector_dimension()))
    }

    async fn create_collection(&self, collection: &str, dimension: usize) -> RagResult<()> {
        self.call_unit(
            "create collection",
            "collections/create",
            &CreateCollectionRequest {
                collection_name: collection,
                schema: Schema::documents(dimension),
                index_params: vec![IndexParam::vector_autoindex()],
            },
        )
        .await
    }

    async fn has_index(&self, collection: &str) -> RagResult<bool> {
        let data: Option<Vec<String>> = self
            .call(
                "list indexes",
                "indexes/list",
                &CollectionRequest {
                    collection_name: collection,
                },
            )
            .await?;
        Ok(data.is_some_and(|names| names.iter().any(|n| n == FIELD_VECTOR)))
    }

    async fn create_index(&self, collection: &str) -> RagResult<()> {
        self.call_unit(
            "create index",
            "indexes/create",
            &CreateIndexRequest {
                collection_name: collection,
                index_params: vec![IndexParam::vector_autoindex()],
            },
        )
        .await
    }

    async fn drop_collection(&self, collection: &str) -> RagResult<()> {
        self.call_unit(
            "drop collection",
            "collections/drop",
            &CollectionRequest {
                collection_name: collection,
            },
        )
        .await
    }

    async fn rename_collection(&self, from: &str, to: &str) -> RagResult<()> {
        self.call_unit(
            "rename collection",
            "collections/rename",
            &RenameRequest {
                collection_name: from,
                new_collection_name: to,
            },
        )
        .await
    }

    async fn load_collection(&self, collection: &str) -> RagResult<()> {
        let request = CollectionRequest {
            collection_name: collection,
        };
        let state: Option<LoadState> = self
            .call("get load state", "collections/get_load_state", &request)
            .await?;
        if state.is_some_and(|s| s.is_loaded()) {
            return Ok(());
        }
        tracing::debug!(collection, "Loading collection into memory");
        self.call_unit("load collection", "collections/load", &request)
            .await
    }

    async fn insert(&self, collection: &str, rows: &[IndexedChunk]) -> RagResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let data = rows
            .iter()
            .map(|row| InsertRow {
                embedding: &row.vector,
                document_id: &row.document_id,
                knowledge_base_id: &row.knowledge_base_id,
                content: &row.content,
            })
            .collect();
        self.call_unit(
            "insert",
            "entities/insert",
            &InsertRequest {
                collection_name: collection,
                data,
            },
        )
        .await
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        knowledge_base_id: Option<&str>,
    ) -> RagResult<Vec<SearchResult>> {
        let filter = knowledge_base_id
            .filter(|kb| !kb.is_empty())
            .map(|kb| format!("{FIELD_KNOWLEDGE_BASE_ID} == {}", quote(kb)));
        let hits: Option<Vec<SearchHit>> = self
            .call(
                "search",
                "entities/search",
                &SearchRequest {
                    collection_name: collection,
                    data: vec![vector],
                    anns_field: FIELD_VECTOR,
                    filter,
                    limit: top_k,
                    output_fields: [FIELD_DOCUMENT_ID, FIELD_KNOWLEDGE_BASE_ID, FIELD_CONTENT],
                    search_params: SearchParams { metric_type: "IP" },
                },
            )
            .await?;

        Ok(hits
            .unwrap_or_default()
            .into_iter()
            .map(|hit| SearchResult {
                document_id: hit.document_id,
                knowledge_base_id: hit.knowledge_base_id,
                content: hit.content,
                score: hit.distance,
            })
            .collect())
    }

    async fn scan_after(
        &self,
        collection: &str,
        after_row_id: i64,
        limit: usize,
    ) -> RagResult<Vec<StoredText>> {
        let rows: Option<Vec<QueryRow>> = self
            .call(
                "query",
                "entities/query",
                &QueryRequest {
                    collection_name: collection,
                    filter: format!("{FIELD_ID} > {after_row_id}"),
                    limit,
                    output_fields: [
                        FIELD_ID,
                        FIELD_DOCUMENT_ID,
                        FIELD_KNOWLEDGE_BASE_ID,
                        FIELD_CONTENT,
                    ],
                },
            )
            .await?;

        let mut stored = Vec::new();
        for row in rows.unwrap_or_default() {
            let Some(row_id) = row.row_id() else {
                return Err(RagError::vector_db("query", "row without a primary key"));
            };
            stored.push(StoredText {
                row_id,
                document_id: row.document_id,
                knowledge_base_id: row.knowledge_base_id,
                content: row.content,
            });
        }
        stored.sort_by_key(|row| row.row_id);
        Ok(stored)
    }

    async fn delete_by_document_ids(
        &self,
        collection: &str,
        document_ids: &[String],
    ) -> RagResult<()> {
        if document_ids.is_empty() {
            return Ok(());
        }
        let list = document_ids
            .iter()
            .map(|id| quote(id))
            .collect::<Vec<_>>()
            .join(", ");
        self.call_unit(
            "delete",
            "entities/delete",
            &DeleteRequest {
                collection_name: collection,
                filter: format!("{FIELD_DOCUMENT_ID} in [{list}]"),
            },
        )
        .await
    }
}
