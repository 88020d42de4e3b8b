use async_trait::async_trait;

use crate::domain::errors::RagResult;
use crate::domain::models::AiReply;

/// Receives generated replies for persistence and broadcast to connected clients.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn deliver(&self, reply: AiReply) -> RagResult<()>;
}
