//! Universal chat completion adapter.
//!
//! Sends an OpenAI-style `{model, messages}` request to any endpoint and pulls
//! the reply out with the configured extraction strategies. Auth is either a
//! bearer token or an `X-API-Key` header.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use super::extraction::{extract_content, strategies_for};
use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{AuthHeaderStyle, ChatTurn};
use crate::domain::ports::{ChatRequest, LanguageModelClient};

const PROVIDER: &str = "chat";

pub struct UniversalChatClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl UniversalChatClient {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn>,
}

#[async_trait]
impl LanguageModelClient for UniversalChatClient {
    async fn generate(&self, request: &ChatRequest) -> RagResult<String> {
        let mut messages = request.history.clone();
        messages.push(ChatTurn::user(request.message.clone()));
        let body = CompletionRequest {
            model: &request.model,
            messages,
        };

        let builder = self
            .client
            .post(&request.api_url)
            .timeout(self.timeout)
            .json(&body);
        let builder = match request.adapter.auth_header {
            AuthHeaderStyle::Bearer => builder.bearer_auth(&request.api_key),
            AuthHeaderStyle::XApiKey => builder.header("X-API-Key", &request.api_key),
        };

        let started = std::time::Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(
            model = %request.model,
            status = status.as_u16(),
            latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Chat completion returned"
        );

        if status != StatusCode::OK {
            return Err(RagError::provider_call(PROVIDER, Some(status.as_u16()), &text));
        }

        let value: Value = serde_json::from_str(&text).map_err(|e| {
            RagError::provider_call(PROVIDER, Some(status.as_u16()), &format!("unparseable response: {e}"))
        })?;

        if let Some(message) = value.pointer("/error/message").and_then(Value::as_str) {
            return Err(RagError::provider_call(PROVIDER, Some(status.as_u16()), message));
        }

        extract_content(&value, &strategies_for(&request.adapter.response_path))
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::domain::models::AdapterConfig;

    fn request(server: &mockito::ServerGuard, adapter: AdapterConfig) -> ChatRequest {
        ChatRequest {
            api_url: format!("{}/v1/chat/completions", server.url()),
            api_key: "secret".to_string(),
            model: "gpt-test".to_string(),
            adapter,
            history: vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")],
            message: "How long do refunds take?".to_string(),
        }
    }

    fn client() -> UniversalChatClient {
        UniversalChatClient::new(reqwest::Client::new(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_bearer_request_shape_and_default_extraction() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-test",
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                    {"role": "user", "content": "How long do refunds take?"}
                ]
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"Five business days."}}]}"#)
            .create_async()
            .await;

        let reply = client()
            .generate(&request(&server, AdapterConfig::default()))
            .await
            .unwrap();
        assert_eq!(reply, "Five business days.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_x_api_key_and_custom_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("x-api-key", "secret")
            .with_status(200)
            .with_body(r#"{"output":{"text":"custom"}}"#)
            .create_async()
            .await;

        let adapter = AdapterConfig {
            auth_header: AuthHeaderStyle::XApiKey,
            response_path: "output.text".to_string(),
        };
        let reply = client().generate(&request(&server, adapter)).await.unwrap();
        assert_eq!(reply, "custom");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_200_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let err = client()
            .generate(&request(&server, AdapterConfig::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::ProviderCall { status: Some(401), .. }));
    }

    #[tokio::test]
    async fn test_error_message_in_ok_body_is_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"error":{"message":"quota exceeded"}}"#)
            .create_async()
            .await;

        let err = client()
            .generate(&request(&server, AdapterConfig::default()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_unknown_shape_is_no_content() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"unexpected":true}"#)
            .create_async()
            .await;

        let err = client()
            .generate(&request(&server, AdapterConfig::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::NoContentExtracted));
    }
}
