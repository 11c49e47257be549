//! Pending management actions awaiting a follow-up message.
//!
//! `create`/`update` wait for text or a document, `avatar` waits for an
//! image. Deadlines are checked lazily when the next message arrives, or in
//! bulk through [`PendingTracker::sweep_expired`].

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingKind {
    Create,
    Update,
    Avatar,
}

impl PendingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Avatar => "avatar",
        }
    }
}

impl std::fmt::Display for PendingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub kind: PendingKind,
    pub persona_id: String,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

impl PendingAction {
    /// The deadline itself counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }
}

/// Result of looking up the pending action for an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingCheck {
    Idle,
    Ready(PendingAction),
    Expired(PendingAction),
}

const FALLBACK_TIMEOUT_SECS: i64 = 60;

/// At most one pending action per conversation.
pub struct PendingTracker {
    timeout: chrono::Duration,
    actions: Mutex<HashMap<String, PendingAction>>,
}

impl PendingTracker {
    pub fn new(timeout: Duration) -> Self {
        let timeout = chrono::Duration::from_std(timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(FALLBACK_TIMEOUT_SECS));
        Self { timeout, actions: Mutex::new(HashMap::new()) }
    }

    pub fn timeout(&self) -> chrono::Duration {
        self.timeout
    }

    /// Start waiting in `conversation_id`. A previous action there is replaced
    /// and returned.
    pub async fn begin(
        &self,
        conversation_id: &str,
        kind: PendingKind,
        persona_id: &str,
        now: DateTime<Utc>,
    ) -> (PendingAction, Option<PendingAction>) {
        let deadline = now.checked_add_signed(self.timeout).unwrap_or_else(|| {
            warn!(
                timeout_secs = self.timeout.num_seconds(),
                "Pending deadline out of range; using {}s",
                FALLBACK_TIMEOUT_SECS
            );
            now + chrono::Duration::seconds(FALLBACK_TIMEOUT_SECS)
        });
        let action = PendingAction {
            kind,
            persona_id: persona_id.to_string(),
            started_at: now,
            deadline,
        };
        let replaced = self
            .actions
            .lock()
            .await
            .insert(conversation_id.to_string(), action.clone());
        debug!(
            conversation = conversation_id,
            kind = %kind,
            persona = persona_id,
            replaced = replaced.is_some(),
            "Pending action started"
        );
        (action, replaced)
    }

    /// Remove and classify the pending action of a conversation.
    pub async fn take(&self, conversation_id: &str, now: DateTime<Utc>) -> PendingCheck {
        match self.actions.lock().await.remove(conversation_id) {
            None => PendingCheck::Idle,
            Some(action) if action.is_expired(now) => PendingCheck::Expired(action),
            Some(action) => PendingCheck::Ready(action),
        }
    }

    pub async fn peek(&self, conversation_id: &str) -> Option<PendingAction> {
        self.actions.lock().await.get(conversation_id).cloned()
    }

    pub async fn cancel(&self, conversation_id: &str) -> Option<PendingAction> {
        self.actions.lock().await.remove(conversation_id)
    }

    /// Drop every expired action, returning them with their conversation ids.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<(String, PendingAction)> {
        let mut actions = self.actions.lock().await;
        let expired: Vec<String> = actions
            .iter()
            .filter(|(_, action)| action.is_expired(now))
            .map(|(conv, _)| conv.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|conv| actions.remove(&conv).map(|action| (conv, action)))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.actions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.actions.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> PendingTracker {
        PendingTracker::new(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn ready_before_deadline_and_removed_after_take() {
        let t = tracker();
        let now = Utc::now();
        t.begin("c1", PendingKind::Create, "p1", now).await;

        let check = t.take("c1", now + chrono::Duration::seconds(59)).await;
        assert!(matches!(check, PendingCheck::Ready(ref a) if a.persona_id == "p1"));
        assert_eq!(t.take("c1", now).await, PendingCheck::Idle);
    }

    #[tokio::test]
    async fn expired_at_deadline() {
        let t = tracker();
        let now = Utc::now();
        t.begin("c1", PendingKind::Update, "p1", now).await;
        assert!(matches!(
            t.take("c1", now + chrono::Duration::seconds(60)).await,
            PendingCheck::Expired(_)
        ));
    }

    #[tokio::test]
    async fn new_action_replaces_old_one() {
        let t = tracker();
        let now = Utc::now();
        t.begin("c1", PendingKind::Create, "p1", now).await;
        let (_, replaced) = t.begin("c1", PendingKind::Avatar, "p2", now).await;

        assert_eq!(replaced.unwrap().persona_id, "p1");
        let current = t.peek("c1").await.unwrap();
        assert_eq!(current.kind, PendingKind::Avatar);
        assert_eq!(t.len().await, 1);
    }

    #[tokio::test]
    async fn conversations_are_independent() {
        let t = tracker();
        let now = Utc::now();
        t.begin("c1", PendingKind::Create, "p1", now).await;
        assert_eq!(t.take("c2", now).await, PendingCheck::Idle);
        assert!(t.peek("c1").await.is_some());
    }

    #[tokio::test]
    async fn sweep_removes_only_expired() {
        let t = tracker();
        let now = Utc::now();
        t.begin("old", PendingKind::Create, "p1", now - chrono::Duration::seconds(120)).await;
        t.begin("new", PendingKind::Create, "p2", now).await;

        let swept = t.sweep_expired(now).await;
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].0, "old");
        assert!(t.peek("new").await.is_some());
    }

    #[tokio::test]
    async fn out_of_range_timeout_falls_back_to_a_minute() {
        let t = PendingTracker::new(Duration::from_secs(10_000_000_000_000));
        let now = Utc::now();
        let (action, _) = t.begin("c1", PendingKind::Create, "p1", now).await;
        assert_eq!(action.deadline, now + chrono::Duration::seconds(60));
    }

    #[tokio::test]
    async fn cancel_clears_action() {
        let t = tracker();
        t.begin("c1", PendingKind::Avatar, "p1", Utc::now()).await;
        assert!(t.cancel("c1").await.is_some());
        assert!(t.cancel("c1").await.is_none());
        assert!(t.is_empty().await);
    }
}
