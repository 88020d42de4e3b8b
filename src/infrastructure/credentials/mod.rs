//! Credentials management infrastructure
//!
//! Encryption of stored model API keys:
//! - AES-256-GCM with a random nonce per secret
//! - Key taken from config or the `ENCRYPTION_KEY` environment variable

pub mod cipher;

pub use cipher::{AesGcmCipher, ENCRYPTION_KEY_ENV};
