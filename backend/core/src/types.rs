use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named system prompt with optional preset dialogue and avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    pub system_prompt: String,
    /// Alternating user/assistant turns prepended to every conversation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub begin_dialogs: Vec<String>,
    /// `None` means every tool is available, an empty list disables all tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    /// Filled in from the avatar cache when a persona is read, never persisted.
    #[serde(skip)]
    pub avatar_path: Option<PathBuf>,
}

impl Persona {
    pub fn new(id: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            system_prompt: system_prompt.into(),
            begin_dialogs: Vec::new(),
            tools: None,
            avatar_path: None,
        }
    }

    pub fn with_begin_dialogs(mut self, dialogs: Vec<String>) -> Self {
        self.begin_dialogs = dialogs;
        self
    }

    pub fn with_tools(mut self, tools: Option<Vec<String>>) -> Self {
        self.tools = tools;
        self
    }

    /// Short tool description used by `list` and `view`.
    pub fn tool_summary(&self) -> String {
        match &self.tools {
            None => "ALL".to_string(),
            Some(tools) => tools.len().to_string(),
        }
    }
}

/// Granularity at which the active persona is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoSwitchScope {
    #[default]
    Conversation,
    Session,
    Global,
}

impl AutoSwitchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::Session => "session",
            Self::Global => "global",
        }
    }
}

impl fmt::Display for AutoSwitchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoSwitchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conversation" => Ok(Self::Conversation),
            "session" => Ok(Self::Session),
            "global" => Ok(Self::Global),
            other => Err(format!("unknown auto switch scope: {other}")),
        }
    }
}
