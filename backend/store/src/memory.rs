use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use personaplus_core::{Persona, PersonaError, PersonaStore};

/// In-memory persona store for tests and ephemeral hosts.
#[derive(Default, Clone)]
pub struct InMemoryPersonaStore {
    personas: Arc<RwLock<BTreeMap<String, Persona>>>,
}

impl InMemoryPersonaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_personas(personas: impl IntoIterator<Item = Persona>) -> Self {
        let map = personas.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self { personas: Arc::new(RwLock::new(map)) }
    }

    fn poisoned() -> PersonaError {
        PersonaError::Storage("persona store lock poisoned".to_string())
    }
}

#[async_trait]
impl PersonaStore for InMemoryPersonaStore {
    async fn get(&self, id: &str) -> Result<Option<Persona>, PersonaError> {
        let personas = self.personas.read().map_err(|_| Self::poisoned())?;
        Ok(personas.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Persona>, PersonaError> {
        let personas = self.personas.read().map_err(|_| Self::poisoned())?;
        Ok(personas.values().cloned().collect())
    }

    async fn upsert(&self, persona: Persona) -> Result<(), PersonaError> {
        let mut personas = self.personas.write().map_err(|_| Self::poisoned())?;
        personas.insert(persona.id.clone(), persona);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, PersonaError> {
        let mut personas = self.personas.write().map_err(|_| Self::poisoned())?;
        Ok(personas.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_get_delete() {
        let store = InMemoryPersonaStore::new();
        store.upsert(Persona::new("p1", "one")).await.unwrap();
        assert_eq!(store.get("p1").await.unwrap().unwrap().system_prompt, "one");

        store.upsert(Persona::new("p1", "uno")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(store.get("p1").await.unwrap().unwrap().system_prompt, "uno");

        assert!(store.delete("p1").await.unwrap());
        assert!(!store.delete("p1").await.unwrap());
        assert!(!store.exists("p1").await.unwrap());
    }

    #[tokio::test]
    async fn list_is_ordered_by_id() {
        let store = InMemoryPersonaStore::with_personas([
            Persona::new("b", "b"),
            Persona::new("a", "a"),
        ]);
        let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
