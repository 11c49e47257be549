//! Config defaults: normalizes values the schema accepts but the runtime cannot use.

use std::path::PathBuf;

use tracing::warn;

use crate::schema::PersonaPlusConfig;

/// Default wait for the follow-up message of create/update/avatar.
pub const DEFAULT_MANAGE_WAIT_TIMEOUT_SECS: u64 = 60;

/// Longest accepted wait, one day.
pub const MAX_MANAGE_WAIT_TIMEOUT_SECS: u64 = 86_400;

/// Whether a configured wait is usable as-is.
pub fn timeout_in_range(secs: i64) -> bool {
    secs > 0 && secs as u64 <= MAX_MANAGE_WAIT_TIMEOUT_SECS
}

/// Default nickname pushed to the platform account.
pub const DEFAULT_NICKNAME_TEMPLATE: &str = "{persona_id}";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Data directory name under the user's home.
pub const DATA_DIR_NAME: &str = ".persona-plus";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: PersonaPlusConfig) -> PersonaPlusConfig {
    let config = apply_timeout_defaults(config);
    let config = apply_nickname_defaults(config);
    apply_data_dir_defaults(config)
}

/// Non-positive or over-long timeouts fall back to the default.
fn apply_timeout_defaults(mut config: PersonaPlusConfig) -> PersonaPlusConfig {
    if !timeout_in_range(config.manage_wait_timeout_seconds) {
        warn!(
            value = config.manage_wait_timeout_seconds,
            max = MAX_MANAGE_WAIT_TIMEOUT_SECS,
            "manage_wait_timeout_seconds out of range; resetting to {}",
            DEFAULT_MANAGE_WAIT_TIMEOUT_SECS
        );
        config.manage_wait_timeout_seconds = DEFAULT_MANAGE_WAIT_TIMEOUT_SECS as i64;
    }
    config
}

fn apply_nickname_defaults(mut config: PersonaPlusConfig) -> PersonaPlusConfig {
    if config.nickname_template.trim().is_empty() {
        config.nickname_template = DEFAULT_NICKNAME_TEMPLATE.to_string();
    }
    config
}

fn apply_data_dir_defaults(mut config: PersonaPlusConfig) -> PersonaPlusConfig {
    if config.data_dir.is_none() {
        config.data_dir = Some(default_data_dir());
    }
    config
}

/// `~/.persona-plus`, or a relative directory when no home is known.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DATA_DIR_NAME))
}
