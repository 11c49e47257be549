//! Keyword-driven persona resolution.

use personaplus_config::KeywordMapping;
use personaplus_core::{PersonaError, PersonaStore};
use tracing::{debug, warn};

pub struct SwitchResolver;

impl SwitchResolver {
    /// First mapping, in configured order, whose keyword occurs in `text`
    /// and whose persona exists. Mappings naming unknown personas are skipped.
    pub async fn resolve(
        text: &str,
        mappings: &[KeywordMapping],
        enabled: bool,
        store: &dyn PersonaStore,
    ) -> Result<Option<String>, PersonaError> {
        if !enabled || mappings.is_empty() || text.trim().is_empty() {
            return Ok(None);
        }

        for mapping in mappings.iter().filter(|m| m.matches(text)) {
            if store.exists(&mapping.persona_id).await? {
                debug!(keyword = %mapping.keyword, persona = %mapping.persona_id, "Keyword matched");
                return Ok(Some(mapping.persona_id.clone()));
            }
            warn!(error = %unknown_persona(mapping), "Skipping keyword mapping");
        }
        Ok(None)
    }
}

fn unknown_persona(mapping: &KeywordMapping) -> PersonaError {
    PersonaError::Config(format!(
        "keyword {:?} maps to unknown persona {}",
        mapping.keyword, mapping.persona_id
    ))
}
