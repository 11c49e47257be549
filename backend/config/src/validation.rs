//! Config validation: reports problems with field paths instead of failing the load.

use thiserror::Error;

use crate::defaults::MAX_MANAGE_WAIT_TIMEOUT_SECS;
use crate::keywords::parse_keyword_mappings;
use crate::schema::PersonaPlusConfig;

const KNOWN_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
///
/// Persona ids named by mappings are checked against the store at runtime,
/// not here.
pub fn validate(config: &PersonaPlusConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_mappings(config, &mut report);
    validate_timeout(config, &mut report);
    validate_sync(config, &mut report);
    validate_admins(config, &mut report);
    validate_logging(config, &mut report);
    report
}

/// Malformed mapping lines are skipped at runtime, so they only warn.
fn validate_mappings(config: &PersonaPlusConfig, report: &mut ValidationReport) {
    let parsed = parse_keyword_mappings(&config.keyword_mappings);
    for err in &parsed.errors {
        report.warn(
            format!("keyword_mappings[line {}]", err.line),
            format!("{} ({:?}); entry skipped", err.message, err.entry),
        );
    }
    if config.enable_keyword_switching && parsed.mappings.is_empty() {
        report.warn(
            "keyword_mappings",
            "Keyword switching is enabled but no mappings are configured",
        );
    }
}

fn validate_timeout(config: &PersonaPlusConfig, report: &mut ValidationReport) {
    if config.manage_wait_timeout_seconds <= 0 {
        report.warn(
            "manage_wait_timeout_seconds",
            "Must be positive; the default will be used",
        );
    } else if config.manage_wait_timeout_seconds as u64 > MAX_MANAGE_WAIT_TIMEOUT_SECS {
        report.warn(
            "manage_wait_timeout_seconds",
            format!(
                "Must be at most {} seconds; the default will be used",
                MAX_MANAGE_WAIT_TIMEOUT_SECS
            ),
        );
    }
}

fn validate_sync(config: &PersonaPlusConfig, report: &mut ValidationReport) {
    if config.sync_nickname_on_switch && !config.nickname_template.contains("{persona_id}") {
        report.warn(
            "nickname_template",
            "Template has no {persona_id} placeholder; every persona gets the same nickname",
        );
    }
}

fn validate_admins(config: &PersonaPlusConfig, report: &mut ValidationReport) {
    for (idx, id) in config.admin_ids.iter().enumerate() {
        if id.trim().is_empty() {
            report.error(format!("admin_ids[{idx}]"), "Admin id cannot be empty");
        }
    }
    if config.require_admin_for_manage && config.admin_ids.is_empty() {
        report.warn(
            "admin_ids",
            "Management requires admin but no admin ids are listed; only host admins can manage",
        );
    }
}

fn validate_logging(config: &PersonaPlusConfig, report: &mut ValidationReport) {
    let level = config.log_level.to_ascii_lowercase();
    if !KNOWN_LOG_LEVELS.contains(&level.as_str()) {
        report.error("log_level", format!("Unknown log level '{}'", config.log_level));
    }
}
