//! Automatic AI replies to incoming chat messages.

use std::sync::Arc;

use tracing::{info, warn};

use super::ai_orchestrator::AiResponseOrchestrator;
use super::background::{BackgroundExecutor, TaskHandle};
use crate::domain::errors::RagResult;
use crate::domain::models::{AiReply, ChatMessage, ChatMode, Conversation, ConversationType};
use crate::domain::ports::ReplySink;

/// User whose default model answers when a conversation has no agent.
pub const DEFAULT_REPLY_USER_ID: u64 = 1;

/// Whether `trigger` should get an AI reply: a visitor writing in an AI-mode
/// conversation, or an agent writing in an internal conversation.
pub fn needs_reply(conversation: &Conversation, trigger: &ChatMessage) -> bool {
    (conversation.chat_mode == ChatMode::Ai && !trigger.sender_is_agent)
        || (conversation.conversation_type == ConversationType::Internal && trigger.sender_is_agent)
}

/// User whose default text model is used when the conversation has no bound model.
pub fn reply_user_id(conversation: &Conversation, trigger: &ChatMessage) -> u64 {
    if conversation.conversation_type == ConversationType::Internal && trigger.sender_id > 0 {
        return trigger.sender_id;
    }
    if conversation.agent_id == 0 {
        DEFAULT_REPLY_USER_ID
    } else {
        conversation.agent_id
    }
}

pub struct AutoReplyService {
    orchestrator: Arc<AiResponseOrchestrator>,
    sink: Arc<dyn ReplySink>,
    executor: Arc<BackgroundExecutor>,
}

impl AutoReplyService {
    pub fn new(
        orchestrator: Arc<AiResponseOrchestrator>,
        sink: Arc<dyn ReplySink>,
        executor: Arc<BackgroundExecutor>,
    ) -> Self {
        Self {
            orchestrator,
            sink,
            executor,
        }
    }

    /// Queue a reply to `trigger` if one is needed. Returns `None` when not.
    pub async fn schedule(
        &self,
        conversation: &Conversation,
        trigger: &ChatMessage,
    ) -> RagResult<Option<TaskHandle>> {
        if !needs_reply(conversation, trigger) {
            return Ok(None);
        }

        let orchestrator = Arc::clone(&self.orchestrator);
        let sink = Arc::clone(&self.sink);
        let conversation_id = conversation.id;
        let user_id = reply_user_id(conversation, trigger);
        let content = trigger.content.clone();

        let handle = self
            .executor
            .submit(format!("ai-reply-{conversation_id}"), async move {
                reply(&orchestrator, sink.as_ref(), conversation_id, &content, user_id).await
            })
            .await?;
        Ok(Some(handle))
    }

    /// Generate and deliver a reply on the current task.
    pub async fn reply_now(&self, conversation: &Conversation, trigger: &ChatMessage) -> RagResult<()> {
        reply(
            &self.orchestrator,
            self.sink.as_ref(),
            conversation.id,
            &trigger.content,
            reply_user_id(conversation, trigger),
        )
        .await
    }
}

/// Configuration errors still produce a visible reply: the fallback text.
async fn reply(
    orchestrator: &AiResponseOrchestrator,
    sink: &dyn ReplySink,
    conversation_id: u64,
    content: &str,
    user_id: u64,
) -> RagResult<()> {
    let text = match orchestrator.generate_reply(conversation_id, content, user_id).await {
        Ok(text) => text,
        Err(e) => {
            warn!(conversation_id, user_id, error = %e, "AI reply unavailable, sending fallback");
            orchestrator.fallback_reply().to_string()
        }
    };
    sink.deliver(AiReply {
        conversation_id,
        content: text,
    })
    .await?;
    info!(conversation_id, "AI reply delivered");
    Ok(())
}
