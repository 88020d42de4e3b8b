//! Milvus vector database adapter over the REST v2 API.

pub mod client;
pub mod types;

pub use client::{MilvusConfig, MilvusRestClient};
