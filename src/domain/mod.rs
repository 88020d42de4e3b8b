//! Domain layer for the retrieval-augmented reply core
//!
//! This module contains the storage-agnostic models, the error taxonomy and the
//! port traits every adapter implements.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{RagError, RagResult};
