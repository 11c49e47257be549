//! Persona Event Logger
//!
//! Lifecycle events (switches, pending actions, deletions, sync results)
//! written through `tracing` under a dedicated target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

pub const EVENT_TARGET: &str = "persona_events";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PersonaEvent {
    Switched {
        scope: String,
        persona_id: String,
        previous: Option<String>,
        /// "command" or "keyword"
        via: String,
    },
    PendingStarted {
        kind: String,
        persona_id: String,
        deadline: DateTime<Utc>,
    },
    PendingConsumed {
        kind: String,
        persona_id: String,
        success: bool,
    },
    PendingExpired {
        kind: String,
        persona_id: String,
    },
    PersonaDeleted {
        persona_id: String,
        avatar_removed: bool,
    },
    SyncResult {
        bot_key: String,
        persona_id: String,
        nickname: String,
        avatar: String,
    },
}

impl PersonaEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Switched { .. } => "switched",
            Self::PendingStarted { .. } => "pending_started",
            Self::PendingConsumed { .. } => "pending_consumed",
            Self::PendingExpired { .. } => "pending_expired",
            Self::PersonaDeleted { .. } => "persona_deleted",
            Self::SyncResult { .. } => "sync_result",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PersonaEventEntry {
    pub conversation_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: PersonaEvent,
}

pub struct PersonaEventLogger;

impl PersonaEventLogger {
    /// Serialize the event and hand it to tracing as one NDJSON field.
    pub fn log_event(conversation_id: &str, event: PersonaEvent) -> PersonaEventEntry {
        let entry = PersonaEventEntry {
            conversation_id: conversation_id.into(),
            timestamp: Utc::now(),
            event,
        };

        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(
            target: EVENT_TARGET,
            kind = entry.event.name(),
            conversation = %entry.conversation_id,
            event = %json,
            "Persona event"
        );
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let entry = PersonaEventLogger::log_event(
            "c1",
            PersonaEvent::Switched {
                scope: "conversation:c1".into(),
                persona_id: "p1".into(),
                previous: None,
                via: "keyword".into(),
            },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["type"], "switched");
        assert_eq!(json["event"]["persona_id"], "p1");
        assert_eq!(json["conversation_id"], "c1");
    }

    #[test]
    fn event_names() {
        let ev = PersonaEvent::PersonaDeleted { persona_id: "p1".into(), avatar_removed: true };
        assert_eq!(ev.name(), "persona_deleted");
    }
}
