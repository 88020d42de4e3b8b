use crate::domain::errors::RagResult;

/// Symmetric encryption for stored credentials.
pub trait SecretCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> RagResult<String>;

    fn decrypt(&self, ciphertext: &str) -> RagResult<String>;
}
