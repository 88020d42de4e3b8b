//! Conversation, message and language model configuration records.

use serde::{Deserialize, Serialize};

/// Who answers a visitor conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    #[default]
    Human,
    Ai,
}

/// Visitor conversations face customers; internal ones are agents testing the knowledge base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    #[default]
    Visitor,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: u64,
    #[serde(default)]
    pub conversation_type: ConversationType,
    /// Owning agent, `0` when unassigned.
    #[serde(default)]
    pub agent_id: u64,
    #[serde(default)]
    pub chat_mode: ChatMode,
    /// Model configuration picked for this conversation, if any.
    #[serde(default)]
    pub ai_config_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    UserMessage,
    SystemMessage,
}

/// A stored chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub conversation_id: u64,
    pub sender_id: u64,
    pub sender_is_agent: bool,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
}

/// Role of one turn in a chat completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn sent to the language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    /// Map a stored message to a history turn. System messages have no turn.
    pub fn from_message(message: &ChatMessage) -> Option<Self> {
        if message.message_type == MessageType::SystemMessage {
            return None;
        }
        Some(if message.sender_is_agent {
            Self::assistant(message.content.clone())
        } else {
            Self::user(message.content.clone())
        })
    }
}

/// Kind of output a configured model produces. Only `Text` is served.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    #[default]
    Text,
    Image,
    Audio,
    Video,
    #[serde(untagged)]
    Other(String),
}

impl ModelType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Other(other) => other,
        }
    }
}

/// An administrator-configured language model endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiModelConfig {
    pub id: u64,
    pub user_id: u64,
    /// Display-only provider label.
    pub provider: String,
    /// Full chat completion endpoint URL.
    pub api_url: String,
    /// Encrypted credential, decrypted just before the call.
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub model_type: ModelType,
    pub is_active: bool,
    #[serde(default)]
    pub is_public: bool,
    /// Raw adapter tuning JSON, e.g. `{"auth_header":"X-API-Key","response_path":"data.text"}`.
    #[serde(default)]
    pub adapter_config: Option<String>,
}

/// How the credential is attached to outgoing requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthHeaderStyle {
    /// `Authorization: Bearer <key>`
    #[default]
    #[serde(rename = "Bearer", alias = "bearer", alias = "Authorization")]
    Bearer,
    /// `X-API-Key: <key>`
    #[serde(rename = "X-API-Key", alias = "x-api-key")]
    XApiKey,
}

/// Default response path for OpenAI-compatible chat completions.
pub const DEFAULT_RESPONSE_PATH: &str = "choices[0].message.content";

/// Per-provider tuning for the universal chat adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(default)]
    pub auth_header: AuthHeaderStyle,
    #[serde(default = "default_response_path")]
    pub response_path: String,
}

fn default_response_path() -> String {
    DEFAULT_RESPONSE_PATH.to_string()
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            auth_header: AuthHeaderStyle::default(),
            response_path: default_response_path(),
        }
    }
}

impl AdapterConfig {
    /// Parse stored adapter JSON. Unknown auth styles fall back to `Bearer`
    /// and a blank path falls back to the OpenAI path.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            auth_header: Option<String>,
            #[serde(default)]
            response_path: Option<String>,
        }

        let raw: Raw = serde_json::from_str(raw)?;
        let auth_header = match raw.auth_header.as_deref().map(str::trim) {
            Some(h) if h.eq_ignore_ascii_case("x-api-key") => AuthHeaderStyle::XApiKey,
            _ => AuthHeaderStyle::Bearer,
        };
        let response_path = raw
            .response_path
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(default_response_path);
        Ok(Self {
            auth_header,
            response_path,
        })
    }
}

/// A generated reply handed to the chat layer for persistence and broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiReply {
    pub conversation_id: u64,
    pub content: String,
}
