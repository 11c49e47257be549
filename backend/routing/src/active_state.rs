/// Active persona state: which persona is selected in each scope.
///
/// Entries are only ever overwritten, never removed; a later switch in the
/// same scope supersedes the earlier one.
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::scope_key::ScopeKey;

/// Thread-safe map from scope to active persona id.
#[derive(Debug, Default, Clone)]
pub struct ActivePersonaState {
    active: Arc<RwLock<HashMap<ScopeKey, String>>>,
}

impl ActivePersonaState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a switch. Returns the persona that was active before, if any.
    pub async fn set(&self, key: ScopeKey, persona_id: impl Into<String>) -> Option<String> {
        let persona_id = persona_id.into();
        debug!("[ActiveState] {} -> {}", key, persona_id);
        self.active.write().await.insert(key, persona_id)
    }

    pub async fn get(&self, key: &ScopeKey) -> Option<String> {
        self.active.read().await.get(key).cloned()
    }

    /// Whether the persona is active in at least one scope.
    pub async fn is_active_anywhere(&self, persona_id: &str) -> bool {
        self.active.read().await.values().any(|id| id == persona_id)
    }

    /// All scopes currently using the persona.
    pub async fn scopes_for(&self, persona_id: &str) -> Vec<ScopeKey> {
        self.active
            .read()
            .await
            .iter()
            .filter(|(_, id)| id.as_str() == persona_id)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub async fn snapshot(&self) -> HashMap<ScopeKey, String> {
        self.active.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_returns_previous() {
        let state = ActivePersonaState::new();
        let key = ScopeKey::Conversation("c1".into());
        assert_eq!(state.set(key.clone(), "a").await, None);
        assert_eq!(state.set(key.clone(), "b").await.as_deref(), Some("a"));
        assert_eq!(state.get(&key).await.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn repeated_identical_switch_is_fine() {
        let state = ActivePersonaState::new();
        let key = ScopeKey::Global;
        state.set(key.clone(), "a").await;
        assert_eq!(state.set(key.clone(), "a").await.as_deref(), Some("a"));
        assert_eq!(state.get(&key).await.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn scopes_are_isolated() {
        let state = ActivePersonaState::new();
        let a = ScopeKey::Session("a".into());
        let b = ScopeKey::Session("b".into());
        state.set(a.clone(), "p1").await;
        state.set(b.clone(), "p2").await;
        state.set(a.clone(), "p3").await;
        assert_eq!(state.get(&b).await.as_deref(), Some("p2"));
        assert!(state.is_active_anywhere("p2").await);
        assert!(!state.is_active_anywhere("p1").await);
        assert_eq!(state.scopes_for("p3").await, vec![a]);
    }
}
