//! Keyword mapping table: parsing and matching.

use personaplus_core::PersonaError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::schema::MappingSource;

/// A trigger substring associated with a persona id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordMapping {
    pub keyword: String,
    pub persona_id: String,
}

impl KeywordMapping {
    pub fn new(keyword: impl Into<String>, persona_id: impl Into<String>) -> Self {
        Self { keyword: keyword.into(), persona_id: persona_id.into() }
    }

    /// Case-insensitive substring containment.
    pub fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.keyword.to_lowercase())
    }
}

/// A mapping line that could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {message} ({entry:?})")]
pub struct MappingError {
    /// 1-based line number within the mapping text.
    pub line: usize,
    pub entry: String,
    pub message: String,
}

impl From<MappingError> for PersonaError {
    fn from(err: MappingError) -> Self {
        PersonaError::Config(format!("keyword_mappings {}", err))
    }
}

/// Outcome of parsing the whole table; malformed lines never abort parsing.
#[derive(Debug, Clone, Default)]
pub struct ParsedMappings {
    pub mappings: Vec<KeywordMapping>,
    pub errors: Vec<MappingError>,
}

/// Parse one `keyword:persona_id` entry.
///
/// A legacy `mode|keyword` left side is accepted and reduced to the keyword.
pub fn parse_mapping_entry(entry: &str) -> Result<KeywordMapping, String> {
    let Some((left, right)) = entry.split_once(':') else {
        return Err("expected keyword:persona_id".to_string());
    };

    let persona_id = right.trim();
    if persona_id.is_empty() {
        return Err("empty persona id".to_string());
    }

    let mut keyword = left.trim();
    if let Some((_, rest)) = keyword.split_once('|') {
        warn!(entry, "Match modes are no longer supported; using contains matching");
        keyword = rest.trim();
    }
    if keyword.is_empty() {
        return Err("empty keyword".to_string());
    }

    Ok(KeywordMapping::new(keyword, persona_id))
}

/// Parse the configured mapping table in order.
pub fn parse_keyword_mappings(source: &MappingSource) -> ParsedMappings {
    let mut parsed = ParsedMappings::default();

    for (idx, raw) in source.lines().into_iter().enumerate() {
        let entry = raw.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }
        match parse_mapping_entry(entry) {
            Ok(mapping) => parsed.mappings.push(mapping),
            Err(message) => {
                let err = MappingError { line: idx + 1, entry: entry.to_string(), message };
                warn!(error = %PersonaError::from(err.clone()), "Skipping malformed keyword mapping");
                parsed.errors.push(err);
            }
        }
    }

    parsed
}
