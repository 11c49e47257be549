/// Command detection: identify `/pp ...` invocations in inbound messages.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::registry::{CommandRegistry, SWITCH_KEY};
use crate::types::{CommandDef, CommandInvocation};

/// Persona ids become file names for avatars, so separators and whitespace are rejected.
static PERSONA_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s/\\:*?<>|]{1,64}$").expect("valid persona id regex"));

pub fn is_valid_persona_id(id: &str) -> bool {
    PERSONA_ID_RE.is_match(id) && id != "." && id != ".."
}

/// Detect a group command at the start of a message string.
/// Returns `Some(CommandInvocation)` if the message starts with a group alias.
/// Returns `None` if it's a normal message.
pub fn detect_command(text: &str, registry: &CommandRegistry) -> Option<CommandInvocation> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (alias_part, rest) = split_token(trimmed);
    if !registry.is_group_alias(alias_part) {
        return None;
    }

    // A bare group alias shows help.
    if rest.is_empty() {
        return Some(CommandInvocation {
            key: "help".to_string(),
            raw_alias: alias_part.to_string(),
            args: vec![],
            raw_args: String::new(),
        });
    }

    let (word, after) = split_token(rest);
    let Some(def) = registry.find_by_name(word) else {
        // Anything else is a quick switch to that persona id.
        return Some(CommandInvocation {
            key: SWITCH_KEY.to_string(),
            raw_alias: alias_part.to_string(),
            args: vec![word.to_string()],
            raw_args: rest.to_string(),
        });
    };

    Some(CommandInvocation {
        key: def.key.clone(),
        raw_alias: alias_part.to_string(),
        args: parse_args(after, def),
        raw_args: after.to_string(),
    })
}

/// Split off the first whitespace-delimited token.
fn split_token(text: &str) -> (&str, &str) {
    text.split_once(|c: char| c.is_whitespace())
        .map(|(a, r)| (a, r.trim()))
        .unwrap_or((text, ""))
}

fn parse_args(text: &str, def: &CommandDef) -> Vec<String> {
    let mut result = Vec::new();
    let mut remaining = text.trim();

    for _ in &def.args {
        if remaining.is_empty() {
            break;
        }
        let (token, rest) = split_token(remaining);
        result.push(token.to_string());
        remaining = rest;
    }
    result
}
