//! `check-config`: validation report and parsed keyword table.

use std::path::Path;

use personaplus_config::{parse_keyword_mappings, validate, PersonaPlusConfig, Settings};

use crate::terminal_output::{note_error, note_info, note_success, note_warn, render_table};

/// Print the report. Returns `false` when the config has errors.
pub fn run(path: &Path, config: &PersonaPlusConfig) -> bool {
    println!("\nChecking {}\n", path.display());
    if !path.exists() {
        note_info("File does not exist; defaults apply.");
    }

    let report = validate(config);
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }

    let parsed = parse_keyword_mappings(&config.keyword_mappings);
    if parsed.mappings.is_empty() {
        note_info("No keyword mappings configured.");
    } else {
        let rows: Vec<Vec<String>> = parsed
            .mappings
            .iter()
            .enumerate()
            .map(|(i, m)| vec![(i + 1).to_string(), m.keyword.clone(), m.persona_id.clone()])
            .collect();
        println!("\nKeyword mappings (first match wins):");
        print!("{}", render_table(&["#", "Keyword", "Persona"], &rows));
    }

    let settings = Settings::from_config(config);
    println!();
    note_info(&format!("scope: {}", settings.scope));
    note_info(&format!("content wait timeout: {}s", settings.manage_wait_timeout.as_secs()));
    note_info(&format!("profile sync: {}", config.describe_sync()));
    note_info(&format!("data dir: {}", settings.data_dir.display()));

    println!();
    if report.is_valid() {
        note_success(&format!("Config OK ({} warning(s)).", report.warnings.len()));
    } else {
        note_error(&format!("Config has {} error(s).", report.errors.len()));
    }
    report.is_valid()
}
