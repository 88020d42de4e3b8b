//! Infrastructure layer module
//!
//! Process-level concerns shared by the binary and embedders:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//! - Credential encryption

pub mod config;
pub mod credentials;
pub mod logging;
