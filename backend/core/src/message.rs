use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message event delivered by the host to the extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Host platform instance the bot runs on (e.g. "aiocqhttp").
    pub platform_id: String,
    /// The bot account's own id on that platform.
    pub self_id: String,
    pub session_id: String,
    pub conversation_id: String,
    pub sender_id: String,
    /// Set by the host when its own permission model marks the sender as admin.
    #[serde(default)]
    pub is_admin: bool,
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl InboundMessage {
    /// Build a plain text message where session and conversation share one id.
    pub fn text(conversation_id: impl Into<String>, text: impl Into<String>) -> Self {
        let conversation_id = conversation_id.into();
        Self {
            platform_id: "default".to_string(),
            self_id: "bot".to_string(),
            session_id: conversation_id.clone(),
            conversation_id,
            sender_id: "user".to_string(),
            is_admin: false,
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = sender_id.into();
        self
    }

    pub fn as_admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Identifies the bot account; one sync cache entry is kept per key.
    pub fn bot_key(&self) -> String {
        format!("{}:{}", self.platform_id, self.self_id)
    }
}

/// Non-text components of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachment {
    Image {
        url: Option<String>,
        path: Option<PathBuf>,
    },
    File {
        name: String,
        path: PathBuf,
    },
    /// A quoted message; its components are searched for images too.
    Reply { chain: Vec<Attachment> },
}

/// What caused a profile sync to be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    /// The active persona changed in some scope.
    Switch,
    /// A new avatar was saved for a persona that is currently active.
    AvatarUpdated,
}

/// Request to mirror a persona onto the bot's platform account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub id: Uuid,
    pub bot_key: String,
    pub persona_id: String,
    pub trigger: SyncTrigger,
    /// Bypass the last-synced cache.
    pub force: bool,
    pub requested_at: DateTime<Utc>,
}

impl SyncRequest {
    pub fn switch(bot_key: impl Into<String>, persona_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            bot_key: bot_key.into(),
            persona_id: persona_id.into(),
            trigger: SyncTrigger::Switch,
            force: false,
            requested_at: Utc::now(),
        }
    }

    pub fn avatar_updated(bot_key: impl Into<String>, persona_id: impl Into<String>) -> Self {
        Self {
            trigger: SyncTrigger::AvatarUpdated,
            force: true,
            ..Self::switch(bot_key, persona_id)
        }
    }
}

/// Result of one part (nickname or avatar) of a sync attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SyncOutcome {
    NotRequested,
    Applied,
    Skipped(String),
    Failed(String),
}

impl SyncOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Published by the sync worker for every processed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub request_id: Uuid,
    pub bot_key: String,
    pub persona_id: String,
    pub nickname: SyncOutcome,
    pub avatar: SyncOutcome,
}

impl SyncReport {
    pub fn has_failure(&self) -> bool {
        self.nickname.is_failed() || self.avatar.is_failed()
    }
}
