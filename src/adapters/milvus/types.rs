//! Milvus REST v2 wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field names of the fixed collection schema.
pub const FIELD_ID: &str = "id";
pub const FIELD_VECTOR: &str = "embedding";
pub const FIELD_DOCUMENT_ID: &str = "document_id";
pub const FIELD_KNOWLEDGE_BASE_ID: &str = "knowledge_base_id";
pub const FIELD_CONTENT: &str = "content";

pub const ID_MAX_LENGTH: u32 = 255;
pub const CONTENT_MAX_LENGTH: u32 = 65_535;

/// Every v2 endpoint answers with this envelope. `code` 0 (or 200 on some
/// builds) means success.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == 0 || self.code == 200
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRequest<'a> {
    pub collection_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest<'a> {
    pub collection_name: &'a str,
    pub new_collection_name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct HasCollection {
    #[serde(default)]
    pub has: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadState {
    #[serde(default)]
    pub load_state: String,
}

impl LoadState {
    pub fn is_loaded(&self) -> bool {
        self.load_state == "LoadStateLoaded"
    }
}

#[derive(Debug, Deserialize)]
pub struct DescribeCollection {
    #[serde(default)]
    pub fields: Vec<DescribedField>,
}

#[derive(Debug, Deserialize)]
pub struct DescribedField {
    pub name: String,
    #[serde(default, rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub params: Vec<FieldParam>,
}

#[derive(Debug, Deserialize)]
pub struct FieldParam {
    pub key: String,
    pub value: Value,
}

impl DescribeCollection {
    /// Dimension declared on the vector field, if present and parseable.
    pub fn vector_dimension(&self) -> Option<usize> {
        let field = self
            .fields
            .iter()
            .find(|f| f.name == FIELD_VECTOR && f.data_type == "FloatVector")?;
        let param = field.params.iter().find(|p| p.key == "dim")?;
        match &param.value {
            Value::Number(n) => n.as_u64().and_then(|d| usize::try_from(d).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest<'a> {
    pub collection_name: &'a str,
    pub schema: Schema,
    pub index_params: Vec<IndexParam>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub auto_id: bool,
    pub enable_dynamic_field: bool,
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub field_name: &'static str,
    pub data_type: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_primary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_type_params: Option<Value>,
}

impl Schema {
    /// The fixed document schema at the given vector dimension.
    pub fn documents(dimension: usize) -> Self {
        let varchar = |name: &'static str, max_length: u32| SchemaField {
            field_name: name,
            data_type: "VarChar",
            is_primary: false,
            element_type_params: Some(serde_json::json!({ "max_length": max_length })),
        };
        Self {
            auto_id: true,
            enable_dynamic_field: false,
            fields: vec![
                SchemaField {
                    field_name: FIELD_ID,
                    data_type: "Int64",
                    is_primary: true,
                    element_type_params: None,
                },
                SchemaField {
                    field_name: FIELD_VECTOR,
                    data_type: "FloatVector",
                    is_primary: false,
                    element_type_params: Some(serde_json::json!({ "dim": dimension.to_string() })),
                },
                varchar(FIELD_DOCUMENT_ID, ID_MAX_LENGTH),
                varchar(FIELD_KNOWLEDGE_BASE_ID, ID_MAX_LENGTH),
                varchar(FIELD_CONTENT, CONTENT_MAX_LENGTH),
            ],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexParam {
    pub field_name: &'static str,
    pub index_name: &'static str,
    pub metric_type: &'static str,
    pub index_type: &'static str,
}

impl IndexParam {
    /// Inner-product AUTOINDEX on the vector field.
    pub fn vector_autoindex() -> Self {
        Self {
            field_name: FIELD_VECTOR,
            index_name: FIELD_VECTOR,
            metric_type: "IP",
            index_type: "AUTOINDEX",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIndexRequest<'a> {
    pub collection_name: &'a str,
    pub index_params: Vec<IndexParam>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertRequest<'a> {
    pub collection_name: &'a str,
    pub data: Vec<InsertRow<'a>>,
}

#[derive(Debug, Serialize)]
pub struct InsertRow<'a> {
    pub embedding: &'a [f32],
    pub document_id: &'a str,
    pub knowledge_base_id: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest<'a> {
    pub collection_name: &'a str,
    pub data: Vec<&'a [f32]>,
    pub anns_field: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub limit: usize,
    pub output_fields: [&'static str; 3],
    pub search_params: SearchParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub metric_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub distance: f32,
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub knowledge_base_id: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest<'a> {
    pub collection_name: &'a str,
    pub filter: String,
    pub limit: usize,
    pub output_fields: [&'static str; 4],
}

#[derive(Debug, Deserialize)]
pub struct QueryRow {
    pub id: Value,
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub knowledge_base_id: String,
    #[serde(default)]
    pub content: String,
}

impl QueryRow {
    /// Int64 primary keys may arrive as numbers or strings.
    pub fn row_id(&self) -> Option<i64> {
        match &self.id {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest<'a> {
    pub collection_name: &'a str,
    pub filter: String,
}

/// Quote a string literal for a boolean filter expression.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
