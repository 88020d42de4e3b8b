//! Infrastructure adapters for external systems.

pub mod embeddings;
pub mod llm;
pub mod memory;
pub mod milvus;
