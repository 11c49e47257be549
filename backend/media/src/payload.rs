//! Persona content carried by the follow-up message of create/update.

use personaplus_core::{Attachment, InboundMessage, PersonaError};
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::mime_detect::is_prompt_document;

/// Prompt and preset dialogue parsed from a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaPayload {
    pub system_prompt: String,
    pub begin_dialogs: Vec<String>,
}

/// Text of the payload: the message text, or the first attached text file.
pub async fn extract_payload_text(message: &InboundMessage) -> Result<String, PersonaError> {
    if !message.text.trim().is_empty() {
        return Ok(message.text.clone());
    }

    for attachment in &message.attachments {
        let Attachment::File { name, path } = attachment else {
            continue;
        };
        if !is_prompt_document(Path::new(name)) && !is_prompt_document(path) {
            return Err(PersonaError::invalid("Only txt / md / json files can be imported."));
        }
        debug!(path = %path.display(), "Reading persona content from file");
        let content = fs::read_to_string(path).await.map_err(|e| {
            PersonaError::invalid(format!("Could not read file {}: {}", name, e))
        })?;
        if !content.trim().is_empty() {
            return Ok(content);
        }
    }

    Err(PersonaError::invalid("No text or file content found."))
}

/// Parse payload text into a prompt.
///
/// Plain text is the system prompt verbatim. Text that starts like JSON must
/// be an object `{"system_prompt": str, "begin_dialogs": [user, assistant, ...]}`.
pub fn parse_persona_payload(raw: &str) -> Result<PersonaPayload, PersonaError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PersonaError::invalid("Content is empty; nothing to import."));
    }

    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Ok(PersonaPayload { system_prompt: raw.to_string(), begin_dialogs: Vec::new() });
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        // Prompts may legitimately start with a brace.
        Err(_) => {
            return Ok(PersonaPayload { system_prompt: raw.to_string(), begin_dialogs: Vec::new() });
        }
    };

    let Value::Object(map) = value else {
        return Err(PersonaError::invalid(
            "JSON content must be an object with a system_prompt field.",
        ));
    };

    let system_prompt = match map.get("system_prompt") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => return Err(PersonaError::invalid("JSON is missing the system_prompt field.")),
    };

    let begin_dialogs: Vec<String> = match map.get("begin_dialogs") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(_) => return Err(PersonaError::invalid("begin_dialogs must be a list.")),
    };
    if begin_dialogs.len() % 2 != 0 {
        return Err(PersonaError::invalid(
            "begin_dialogs must have an even number of entries (user/assistant pairs).",
        ));
    }

    Ok(PersonaPayload { system_prompt, begin_dialogs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn plain_text_is_kept_verbatim() {
        let payload = parse_persona_payload("You are p1.").unwrap();
        assert_eq!(payload.system_prompt, "You are p1.");
        assert!(payload.begin_dialogs.is_empty());
    }

    #[test]
    fn json_object_with_dialogs() {
        let raw = r#"{"system_prompt": "You are a cat.", "begin_dialogs": ["hi", "meow"]}"#;
        let payload = parse_persona_payload(raw).unwrap();
        assert_eq!(payload.system_prompt, "You are a cat.");
        assert_eq!(payload.begin_dialogs, vec!["hi", "meow"]);
    }

    #[test]
    fn odd_dialogs_are_rejected() {
        let raw = r#"{"system_prompt": "x", "begin_dialogs": ["hi"]}"#;
        assert!(matches!(parse_persona_payload(raw), Err(PersonaError::InvalidPayload(_))));
    }

    #[test]
    fn json_without_prompt_or_not_object_is_rejected() {
        assert!(parse_persona_payload(r#"{"begin_dialogs": []}"#).is_err());
        assert!(parse_persona_payload(r#"["a", "b"]"#).is_err());
    }

    #[test]
    fn brace_prefixed_prose_is_plain_text() {
        let payload = parse_persona_payload("{Narrator} speaks in riddles.").unwrap();
        assert_eq!(payload.system_prompt, "{Narrator} speaks in riddles.");
    }

    #[test]
    fn blank_content_is_rejected() {
        assert!(parse_persona_payload("   \n").is_err());
    }

    #[tokio::test]
    async fn reads_text_file_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.md");
        tokio::fs::write(&path, "You are a pirate.").await.unwrap();

        let msg = InboundMessage::text("c1", "").with_attachment(Attachment::File {
            name: "persona.md".into(),
            path,
        });
        assert_eq!(extract_payload_text(&msg).await.unwrap(), "You are a pirate.");
    }

    #[tokio::test]
    async fn rejects_unsupported_file_type() {
        let msg = InboundMessage::text("c1", " ").with_attachment(Attachment::File {
            name: "persona.pdf".into(),
            path: PathBuf::from("/tmp/persona.pdf"),
        });
        assert!(extract_payload_text(&msg).await.is_err());
    }

    #[tokio::test]
    async fn message_text_wins_over_files() {
        let msg = InboundMessage::text("c1", "inline").with_attachment(Attachment::File {
            name: "persona.pdf".into(),
            path: PathBuf::from("/tmp/persona.pdf"),
        });
        assert_eq!(extract_payload_text(&msg).await.unwrap(), "inline");
    }
}
