//! Shared HTTP plumbing for the embedding adapters.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::domain::errors::{truncate_body, RagError, RagResult};

/// Request timeouts. Single-text calls are interactive; batches may move a lot of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddingTimeouts {
    pub interactive: Duration,
    pub bulk: Duration,
}

impl Default for EmbeddingTimeouts {
    fn default() -> Self {
        Self {
            interactive: Duration::from_secs(30),
            bulk: Duration::from_secs(600),
        }
    }
}

impl EmbeddingTimeouts {
    pub fn for_batch(&self, batch_len: usize) -> Duration {
        if batch_len <= 1 {
            self.interactive
        } else {
            self.bulk
        }
    }
}

/// Accept either a base URL or one already ending in `/embeddings`.
pub fn embeddings_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.to_lowercase().ends_with("/embeddings") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/embeddings")
    }
}

/// Send a prepared request and decode a JSON body.
///
/// Non-2xx statuses become `ProviderCall` errors carrying the truncated body.
/// An HTML body usually means the URL points at a web page or a login wall.
pub async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> RagResult<T> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(RagError::provider_call(provider, Some(status.as_u16()), &body));
    }

    serde_json::from_str(&body).map_err(|e| {
        if body.trim_start().starts_with('<') {
            tracing::warn!(
                provider,
                snippet = %truncate_body(&body),
                "Embedding API returned HTML instead of JSON"
            );
            RagError::provider_call(
                provider,
                Some(status.as_u16()),
                "received HTML instead of JSON, check the embedding API URL and key",
            )
        } else {
            RagError::provider_call(
                provider,
                Some(status.as_u16()),
                &format!("unparseable response: {e}"),
            )
        }
    })
}

/// Log (without failing) when an upstream returned a different number of vectors.
pub fn warn_on_count_mismatch(provider: &str, sent: usize, received: usize) {
    if sent != received {
        tracing::warn!(
            provider,
            sent,
            received,
            "Embedding API returned a different number of vectors than texts sent"
        );
    }
}
