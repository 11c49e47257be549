//! Runtime settings resolved from a prepared config.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use personaplus_core::AutoSwitchScope;

use crate::defaults::{default_data_dir, timeout_in_range, DEFAULT_MANAGE_WAIT_TIMEOUT_SECS};
use crate::keywords::{parse_keyword_mappings, KeywordMapping};
use crate::schema::PersonaPlusConfig;

/// Everything the engine needs, with mappings parsed and defaults applied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub keyword_switching: bool,
    pub keyword_mappings: Vec<KeywordMapping>,
    pub scope: AutoSwitchScope,
    pub announce_switch: bool,
    pub clear_context_on_switch: bool,
    pub require_admin_for_manage: bool,
    pub manage_wait_timeout: Duration,
    pub sync_nickname: bool,
    pub sync_avatar: bool,
    pub nickname_template: String,
    pub admin_ids: HashSet<String>,
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn from_config(config: &PersonaPlusConfig) -> Self {
        let timeout_secs = if timeout_in_range(config.manage_wait_timeout_seconds) {
            config.manage_wait_timeout_seconds as u64
        } else {
            DEFAULT_MANAGE_WAIT_TIMEOUT_SECS
        };

        Self {
            keyword_switching: config.enable_keyword_switching,
            keyword_mappings: parse_keyword_mappings(&config.keyword_mappings).mappings,
            scope: config.auto_switch_scope,
            announce_switch: config.enable_auto_switch_announce,
            clear_context_on_switch: config.clear_context_on_switch,
            require_admin_for_manage: config.require_admin_for_manage,
            manage_wait_timeout: Duration::from_secs(timeout_secs),
            sync_nickname: config.sync_nickname_on_switch,
            sync_avatar: config.sync_avatar_on_switch,
            nickname_template: config.nickname_template.clone(),
            admin_ids: config
                .admin_ids
                .iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            data_dir: config.data_dir.clone().unwrap_or_else(default_data_dir),
        }
    }

    pub fn sync_enabled(&self) -> bool {
        self.sync_nickname || self.sync_avatar
    }

    /// Host admin flag or listed sender id.
    pub fn is_admin(&self, sender_id: &str, host_admin: bool) -> bool {
        host_admin || self.admin_ids.contains(sender_id)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&PersonaPlusConfig::default())
    }
}
