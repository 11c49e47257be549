//! Persona Plus configuration schema.
//!
//! Field names match the keys operators already use in the plugin's
//! config panel, so a YAML file can be written by hand or exported.

use std::path::PathBuf;

use personaplus_core::AutoSwitchScope;
use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_LOG_LEVEL, DEFAULT_MANAGE_WAIT_TIMEOUT_SECS, DEFAULT_NICKNAME_TEMPLATE};

/// Root configuration for the extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaPlusConfig {
    /// Gates keyword auto-switching.
    #[serde(default = "default_true")]
    pub enable_keyword_switching: bool,

    /// `keyword:persona_id` pairs, one per line.
    #[serde(default)]
    pub keyword_mappings: MappingSource,

    #[serde(default)]
    pub auto_switch_scope: AutoSwitchScope,

    /// Reply with a one-line notice after a keyword switch.
    #[serde(default)]
    pub enable_auto_switch_announce: bool,

    /// Ask the host to drop conversation history on every switch.
    #[serde(default)]
    pub clear_context_on_switch: bool,

    /// Restrict create/update/avatar/delete to admins.
    #[serde(default)]
    pub require_admin_for_manage: bool,

    /// How long create/update/avatar wait for the follow-up message.
    #[serde(default = "default_timeout")]
    pub manage_wait_timeout_seconds: i64,

    #[serde(default)]
    pub sync_nickname_on_switch: bool,

    #[serde(default)]
    pub sync_avatar_on_switch: bool,

    /// `{persona_id}` is replaced with the active persona id.
    #[serde(default = "default_nickname_template")]
    pub nickname_template: String,

    /// Sender ids treated as admins in addition to the host's own flag.
    #[serde(default)]
    pub admin_ids: Vec<String>,

    /// Where personas and avatars are kept. Resolved by the defaults pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Mappings may be written as one block of text or as a YAML list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingSource {
    Text(String),
    Lines(Vec<String>),
}

impl MappingSource {
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Self::Text(text) => text.lines().collect(),
            Self::Lines(lines) => lines.iter().flat_map(|l| l.lines()).collect(),
        }
    }
}

impl Default for MappingSource {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> i64 {
    DEFAULT_MANAGE_WAIT_TIMEOUT_SECS as i64
}

fn default_nickname_template() -> String {
    DEFAULT_NICKNAME_TEMPLATE.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for PersonaPlusConfig {
    fn default() -> Self {
        Self {
            enable_keyword_switching: true,
            keyword_mappings: MappingSource::default(),
            auto_switch_scope: AutoSwitchScope::default(),
            enable_auto_switch_announce: false,
            clear_context_on_switch: false,
            require_admin_for_manage: false,
            manage_wait_timeout_seconds: default_timeout(),
            sync_nickname_on_switch: false,
            sync_avatar_on_switch: false,
            nickname_template: default_nickname_template(),
            admin_ids: Vec::new(),
            data_dir: None,
            log_level: default_log_level(),
        }
    }
}

impl PersonaPlusConfig {
    pub fn sync_enabled(&self) -> bool {
        self.sync_nickname_on_switch || self.sync_avatar_on_switch
    }

    /// One-line summary for startup logs.
    pub fn describe_sync(&self) -> String {
        format!(
            "enabled={}, nickname={}, avatar={}",
            self.sync_enabled(),
            self.sync_nickname_on_switch,
            self.sync_avatar_on_switch
        )
    }
}
