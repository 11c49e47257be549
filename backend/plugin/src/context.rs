//! State shared by the engine and every command handler.

use std::sync::Arc;

use personaplus_config::Settings;
use personaplus_core::{
    ConversationHost, InboundMessage, Persona, PersonaError, PersonaStore, SyncRequest,
};
use personaplus_logging::{PersonaEvent, PersonaEventLogger};
use personaplus_media::AvatarIngestor;
use personaplus_routing::{ActivePersonaState, ScopeKey};
use personaplus_store::AvatarCache;
use personaplus_sync::ProfileSync;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::pending::PendingTracker;

/// How a switch was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchVia {
    Command,
    Keyword,
}

impl SwitchVia {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Keyword => "keyword",
        }
    }
}

pub struct PluginContext {
    pub settings: Settings,
    pub store: Arc<dyn PersonaStore>,
    pub host: Arc<dyn ConversationHost>,
    pub active: ActivePersonaState,
    pub pending: PendingTracker,
    pub avatars: AvatarCache,
    pub ingestor: AvatarIngestor,
    pub sync_tx: Option<mpsc::Sender<SyncRequest>>,
    pub profile_sync: Option<Arc<ProfileSync>>,
}

impl PluginContext {
    pub fn scope_key(&self, message: &InboundMessage) -> ScopeKey {
        ScopeKey::for_message(self.settings.scope, message)
    }

    pub fn is_admin(&self, message: &InboundMessage) -> bool {
        self.settings.is_admin(&message.sender_id, message.is_admin)
    }

    /// Persona by id with its avatar path filled in.
    pub async fn persona(&self, persona_id: &str) -> Result<Persona, PersonaError> {
        let mut persona = self
            .store
            .get(persona_id)
            .await?
            .ok_or_else(|| PersonaError::NotFound(persona_id.to_string()))?;
        persona.avatar_path = self.avatars.existing_path(persona_id);
        Ok(persona)
    }

    /// Make `persona_id` active in the message's scope.
    ///
    /// Local state is committed before identity sync is queued; sync results
    /// never roll it back. Returns the previously active persona.
    pub async fn switch_persona(
        &self,
        message: &InboundMessage,
        persona_id: &str,
        via: SwitchVia,
    ) -> Result<Option<String>, PersonaError> {
        if !self.store.exists(persona_id).await? {
            return Err(PersonaError::NotFound(persona_id.to_string()));
        }

        let key = self.scope_key(message);
        let previous = self.active.set(key.clone(), persona_id).await;
        info!(
            scope = %key,
            persona = persona_id,
            previous = ?previous,
            via = via.as_str(),
            "[PersonaPlus] Persona switched"
        );

        if self.settings.clear_context_on_switch {
            if let Err(e) = self.host.clear_history(&message.conversation_id).await {
                warn!(conversation = %message.conversation_id, error = %e, "Failed to clear history");
            }
        }

        PersonaEventLogger::log_event(
            &message.conversation_id,
            PersonaEvent::Switched {
                scope: key.to_display_string(),
                persona_id: persona_id.to_string(),
                previous: previous.clone(),
                via: via.as_str().to_string(),
            },
        );

        if self.settings.sync_enabled() {
            self.enqueue_sync(SyncRequest::switch(message.bot_key(), persona_id));
        }
        Ok(previous)
    }

    /// Queue an identity sync without waiting. Returns `false` when dropped.
    pub fn enqueue_sync(&self, request: SyncRequest) -> bool {
        let Some(tx) = &self.sync_tx else {
            debug!(persona = %request.persona_id, "No sync worker attached");
            return false;
        };
        match tx.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Full(request)) => {
                warn!(persona = %request.persona_id, "Sync queue full; dropping request");
                false
            }
            Err(TrySendError::Closed(request)) => {
                warn!(persona = %request.persona_id, "Sync worker stopped; dropping request");
                false
            }
        }
    }
}
