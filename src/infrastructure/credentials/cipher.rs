use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::config::CredentialsConfig;
use crate::domain::ports::SecretCipher;

/// Environment variable consulted when the config carries no key.
pub const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// AES-256-GCM cipher for stored API keys.
///
/// Ciphertext layout: base64(nonce ‖ sealed bytes), with a fresh random
/// 12-byte nonce per encryption.
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    /// Build from a raw 32-byte key.
    pub fn new(key: &[u8]) -> RagResult<Self> {
        if key.len() != KEY_LEN {
            return Err(RagError::Credential(format!(
                "encryption key must be {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| RagError::Credential(format!("invalid encryption key: {e}")))?;
        Ok(Self { cipher })
    }

    /// Key from the `credentials` section, or `ENCRYPTION_KEY` when unset.
    pub fn from_config(config: &CredentialsConfig) -> RagResult<Self> {
        let key = match &config.encryption_key {
            Some(key) if !key.is_empty() => key.clone(),
            _ => std::env::var(ENCRYPTION_KEY_ENV).map_err(|_| {
                RagError::Credential(format!(
                    "no encryption key configured; set credentials.encryption_key or {ENCRYPTION_KEY_ENV}"
                ))
            })?,
        };
        Self::new(key.as_bytes())
    }
}

impl SecretCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> RagResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| RagError::Credential(format!("encryption failed: {e}")))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + sealed.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&sealed);
        Ok(STANDARD.encode(payload))
    }

    fn decrypt(&self, ciphertext: &str) -> RagResult<String> {
        let payload = STANDARD
            .decode(ciphertext.trim())
            .map_err(|e| RagError::Credential(format!("ciphertext is not valid base64: {e}")))?;
        if payload.len() < NONCE_LEN {
            return Err(RagError::Credential("ciphertext too short".to_string()));
        }

        let (nonce, sealed) = payload.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| RagError::Credential("decryption failed: wrong key or corrupted data".to_string()))?;
        String::from_utf8(plain)
            .map_err(|e| RagError::Credential(format!("decrypted secret is not UTF-8: {e}")))
    }
}
