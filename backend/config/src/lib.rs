//! `personaplus-config`: Persona Plus configuration management.
//!
//! Provides:
//! - Typed config schema with per-field defaults
//! - Keyword mapping table parsing
//! - YAML read/write with atomic replacement
//! - Default value normalization
//! - Validation report with field paths
//! - Resolved runtime `Settings`

pub mod defaults;
pub mod io;
pub mod keywords;
pub mod schema;
pub mod settings;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use keywords::{parse_keyword_mappings, parse_mapping_entry, KeywordMapping, MappingError, ParsedMappings};
pub use schema::{MappingSource, PersonaPlusConfig};
pub use settings::Settings;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::Result;
use std::path::Path;

/// Load, apply defaults, and validate a config file.
///
/// This is the main entry point for loading a config at runtime. Validation
/// problems are logged; only unreadable or unparsable files fail.
pub async fn load_and_prepare(path: &Path) -> Result<PersonaPlusConfig> {
    let raw_config = load_config(path).await?;

    let report = validate(&raw_config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    let config = apply_all_defaults(raw_config);

    tracing::info!(
        scope = %config.auto_switch_scope,
        keyword_switching = config.enable_keyword_switching,
        require_admin = config.require_admin_for_manage,
        timeout_secs = config.manage_wait_timeout_seconds,
        announce = config.enable_auto_switch_announce,
        clear_context = config.clear_context_on_switch,
        sync = %config.describe_sync(),
        "Persona Plus config prepared"
    );

    Ok(config)
}
