use anyhow::Result;
use async_trait::async_trait;

use crate::error::PersonaError;
use crate::types::Persona;

/// Persistence for persona records, owned by the host.
#[async_trait]
pub trait PersonaStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Persona>, PersonaError>;

    /// All personas ordered by id.
    async fn list(&self) -> Result<Vec<Persona>, PersonaError>;

    /// Insert or replace the persona with the same id.
    async fn upsert(&self, persona: Persona) -> Result<(), PersonaError>;

    /// Returns `false` when no persona with that id existed.
    async fn delete(&self, id: &str) -> Result<bool, PersonaError>;

    async fn exists(&self, id: &str) -> Result<bool, PersonaError> {
        Ok(self.get(id).await?.is_some())
    }
}

/// Pushes identity changes to the bot's account on the external platform.
///
/// Calls are best-effort; errors are reported but never undo a local switch.
#[async_trait]
pub trait ProfileAdapter: Send + Sync {
    /// Adapter name for logging.
    fn name(&self) -> &str;

    fn supports_nickname(&self) -> bool {
        true
    }

    fn supports_avatar(&self) -> bool {
        true
    }

    async fn set_nickname(&self, nickname: &str) -> Result<()>;

    async fn upload_avatar(&self, image: &[u8]) -> Result<()>;
}

/// Conversation operations the extension asks of the host.
#[async_trait]
pub trait ConversationHost: Send + Sync {
    /// Drop the stored message history of a conversation.
    async fn clear_history(&self, conversation_id: &str) -> Result<()>;
}
