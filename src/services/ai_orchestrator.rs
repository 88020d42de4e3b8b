//! Reply generation for AI-mode conversations.
//!
//! Resolves the model configuration, builds bounded history, grounds the
//! message with retrieved passages and calls the language model. Only
//! configuration resolution can fail the call; everything after it degrades
//! to the fixed fallback reply.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::prompt::{build_grounded_prompt, format_context};
use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{
    AdapterConfig, AiModelConfig, ChatTurn, LlmConfig, ModelType, RetrievalConfig,
    DEFAULT_FALLBACK_REPLY,
};
use crate::domain::ports::{
    AiConfigRepository, ChatRequest, ConversationRepository, LanguageModelClient,
    MessageRepository, Retriever, SecretCipher,
};
use crate::infrastructure::logging::mask_secret;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub history_limit: usize,
    pub top_k: usize,
    pub fallback_reply: String,
    pub timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            history_limit: 10,
            top_k: 5,
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(llm: &LlmConfig, retrieval: &RetrievalConfig) -> Self {
        Self {
            history_limit: llm.history_limit,
            top_k: retrieval.top_k,
            fallback_reply: llm.fallback_reply.clone(),
            timeout: Duration::from_secs(llm.timeout_secs),
        }
    }
}

pub struct AiResponseOrchestrator {
    conversations: Arc<dyn ConversationRepository>,
    messages: Arc<dyn MessageRepository>,
    configs: Arc<dyn AiConfigRepository>,
    cipher: Arc<dyn SecretCipher>,
    language_model: Arc<dyn LanguageModelClient>,
    retriever: Option<Arc<dyn Retriever>>,
    settings: OrchestratorSettings,
}

impl AiResponseOrchestrator {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        messages: Arc<dyn MessageRepository>,
        configs: Arc<dyn AiConfigRepository>,
        cipher: Arc<dyn SecretCipher>,
        language_model: Arc<dyn LanguageModelClient>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            conversations,
            messages,
            configs,
            cipher,
            language_model,
            retriever: None,
            settings,
        }
    }

    /// Ground replies with passages from `retriever`.
    #[must_use]
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn fallback_reply(&self) -> &str {
        &self.settings.fallback_reply
    }

    /// Generate a reply to `user_message` in `conversation_id`.
    ///
    /// # Arguments
    /// * `fallback_user_id` - Owner of the default text model used when the
    ///   conversation has no bound configuration
    ///
    /// # Returns
    /// * `Ok(String)` - Model reply, or the fallback reply when generation failed
    /// * `Err(_)` - No usable configuration, or its credential could not be decrypted
    pub async fn generate_reply(
        &self,
        conversation_id: u64,
        user_message: &str,
        fallback_user_id: u64,
    ) -> RagResult<String> {
        let config = self.resolve_config(conversation_id, fallback_user_id).await?;
        let api_key = self.cipher.decrypt(&config.api_key)?;
        debug!(
            conversation_id,
            config_id = config.id,
            api_url = %config.api_url,
            api_key = %mask_secret(&api_key),
            "Resolved AI configuration"
        );

        let history = match self.history(conversation_id).await {
            Ok(history) => history,
            Err(e) => {
                warn!(conversation_id, error = %e, "Could not load history, continuing without it");
                Vec::new()
            }
        };

        let message = match self.grounding_context(user_message).await {
            Some(context) => build_grounded_prompt(user_message, &context),
            None => user_message.to_string(),
        };

        let request = ChatRequest {
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
            adapter: adapter_config(&config),
            history,
            message,
        };

        match self.call_model(&config, &request).await {
            Ok(reply) => {
                info!(conversation_id, config_id = config.id, model = %config.model, "AI reply generated");
                Ok(reply)
            }
            Err(e) => {
                error!(conversation_id, config_id = config.id, error = %e, "AI call failed, using fallback reply");
                Ok(self.settings.fallback_reply.clone())
            }
        }
    }

    async fn resolve_config(&self, conversation_id: u64, fallback_user_id: u64) -> RagResult<AiModelConfig> {
        let conversation = self
            .conversations
            .get_by_id(conversation_id)
            .await?
            .ok_or_else(|| RagError::Repository(format!("conversation {conversation_id} not found")))?;

        if let Some(config_id) = conversation.ai_config_id {
            let config = self
                .configs
                .get_by_id(config_id)
                .await?
                .ok_or_else(|| RagError::NoConfigurationFound(format!("configuration {config_id} does not exist")))?;
            if !config.is_active {
                return Err(RagError::ConfigurationDisabled(config_id));
            }
            return Ok(config);
        }

        self.configs
            .get_active_by_user(fallback_user_id, &ModelType::Text)
            .await?
            .ok_or_else(|| {
                RagError::NoConfigurationFound(format!(
                    "user {fallback_user_id} has no active text model, configure one in settings"
                ))
            })
    }

    /// The most recent `history_limit` messages, system messages skipped.
    async fn history(&self, conversation_id: u64) -> RagResult<Vec<ChatTurn>> {
        let messages = self.messages.list_by_conversation(conversation_id).await?;
        let start = messages.len().saturating_sub(self.settings.history_limit);
        Ok(messages[start..].iter().filter_map(ChatTurn::from_message).collect())
    }

    async fn grounding_context(&self, user_message: &str) -> Option<String> {
        let retriever = self.retriever.as_ref()?;
        match retriever
            .retrieve_with_rerank(user_message, self.settings.top_k, None)
            .await
        {
            Ok(results) if results.is_empty() => None,
            Ok(results) => {
                debug!(passages = results.len(), "Grounding reply with retrieved passages");
                Some(format_context(&results))
            }
            Err(e) => {
                warn!(error = %e, "Retrieval failed, replying without knowledge base context");
                None
            }
        }
    }

    async fn call_model(&self, config: &AiModelConfig, request: &ChatRequest) -> RagResult<String> {
        if config.model_type != ModelType::Text {
            return Err(RagError::UnsupportedModelType(config.model_type.as_str().to_string()));
        }
        tokio::time::timeout(self.settings.timeout, self.language_model.generate(request))
            .await
            .map_err(|_| RagError::Timeout("language model call"))?
    }
}

fn adapter_config(config: &AiModelConfig) -> AdapterConfig {
    match config.adapter_config.as_deref().map(str::trim) {
        None | Some("") => AdapterConfig::default(),
        Some(raw) => AdapterConfig::parse(raw).unwrap_or_else(|e| {
            warn!(config_id = config.id, error = %e, "Invalid adapter config, using defaults");
            AdapterConfig::default()
        }),
    }
}
