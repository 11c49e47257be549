/// Scope key: the unit of state an active-persona switch applies to.
///
/// Derived from the configured `auto_switch_scope` and the identifiers the
/// host attaches to every message.
use personaplus_core::{AutoSwitchScope, InboundMessage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "lowercase")]
pub enum ScopeKey {
    /// One instance for the whole deployment.
    Global,
    Session(String),
    Conversation(String),
}

impl ScopeKey {
    pub fn for_message(scope: AutoSwitchScope, message: &InboundMessage) -> Self {
        match scope {
            AutoSwitchScope::Global => Self::Global,
            AutoSwitchScope::Session => Self::Session(message.session_id.clone()),
            AutoSwitchScope::Conversation => Self::Conversation(message.conversation_id.clone()),
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            Self::Global => "global".to_string(),
            Self::Session(id) => format!("session:{}", id),
            Self::Conversation(id) => format!("conversation:{}", id),
        }
    }
}

impl std::fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}
