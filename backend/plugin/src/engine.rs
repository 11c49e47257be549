//! Message entry point: commands, pending actions, keyword switching.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use personaplus_commands::{
    detect_command, CommandContext, CommandDispatcher, CommandInvocation, CommandRegistry,
    SWITCH_KEY,
};
use personaplus_config::Settings;
use personaplus_core::{
    ConversationHost, InboundMessage, Persona, PersonaError, PersonaStore, SyncRequest,
};
use personaplus_logging::{PersonaEvent, PersonaEventLogger};
use personaplus_media::{
    extract_payload_text, parse_persona_payload, AvatarIngestor, HttpImageFetcher, ImageFetcher,
};
use personaplus_routing::ActivePersonaState;
use personaplus_store::AvatarCache;
use personaplus_sync::ProfileSync;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::context::{PluginContext, SwitchVia};
use crate::handlers::{
    BeginPendingHandler, CancelHandler, DeleteHandler, HelpHandler, ListHandler, SwitchHandler,
    ViewHandler,
};
use crate::pending::{PendingAction, PendingCheck, PendingKind, PendingTracker};
use crate::resolver::SwitchResolver;

/// What the host should do after a message was handled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleOutcome {
    /// Replies to send back to the conversation, in order.
    pub replies: Vec<String>,
    /// Whether the message should continue to the host's normal pipeline.
    pub forward: bool,
    /// Persona made active by this message, if any.
    pub switched_to: Option<String>,
}

impl HandleOutcome {
    fn consumed(reply: impl Into<String>) -> Self {
        Self { replies: vec![reply.into()], forward: false, switched_to: None }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct PersonaPlusBuilder {
    settings: Settings,
    store: Arc<dyn PersonaStore>,
    host: Arc<dyn ConversationHost>,
    fetcher: Option<Arc<dyn ImageFetcher>>,
    sync: Option<(Arc<ProfileSync>, mpsc::Sender<SyncRequest>)>,
}

impl PersonaPlusBuilder {
    pub fn image_fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Attach a sync worker's request queue and its `ProfileSync`.
    pub fn sync(mut self, profile_sync: Arc<ProfileSync>, tx: mpsc::Sender<SyncRequest>) -> Self {
        self.sync = Some((profile_sync, tx));
        self
    }

    pub fn build(self) -> Result<PersonaPlus> {
        let fetcher: Arc<dyn ImageFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpImageFetcher::new()?),
        };
        let avatars = AvatarCache::in_data_dir(&self.settings.data_dir);
        let (profile_sync, sync_tx) = match self.sync {
            Some((sync, tx)) => (Some(sync), Some(tx)),
            None => (None, None),
        };

        let ctx = Arc::new(PluginContext {
            pending: PendingTracker::new(self.settings.manage_wait_timeout),
            ingestor: AvatarIngestor::new(fetcher, avatars.clone()),
            avatars,
            settings: self.settings,
            store: self.store,
            host: self.host,
            active: ActivePersonaState::new(),
            sync_tx,
            profile_sync,
        });

        let registry = Arc::new(CommandRegistry::new());
        let mut dispatcher = CommandDispatcher::new(registry.clone());
        dispatcher.register("help", Arc::new(HelpHandler { ctx: ctx.clone(), registry }));
        dispatcher.register("list", Arc::new(ListHandler { ctx: ctx.clone() }));
        dispatcher.register("view", Arc::new(ViewHandler { ctx: ctx.clone() }));
        for (key, kind) in [
            ("create", PendingKind::Create),
            ("update", PendingKind::Update),
            ("avatar", PendingKind::Avatar),
        ] {
            dispatcher.register(key, Arc::new(BeginPendingHandler { ctx: ctx.clone(), kind }));
        }
        dispatcher.register("delete", Arc::new(DeleteHandler { ctx: ctx.clone() }));
        dispatcher.register("cancel", Arc::new(CancelHandler { ctx: ctx.clone() }));
        dispatcher.register(SWITCH_KEY, Arc::new(SwitchHandler { ctx: ctx.clone() }));

        info!(
            scope = %ctx.settings.scope,
            mappings = ctx.settings.keyword_mappings.len(),
            data_dir = %ctx.settings.data_dir.display(),
            sync = ctx.sync_tx.is_some(),
            "[PersonaPlus] Engine ready"
        );
        Ok(PersonaPlus { ctx, dispatcher })
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct PersonaPlus {
    ctx: Arc<PluginContext>,
    dispatcher: CommandDispatcher,
}

impl PersonaPlus {
    pub fn builder(
        settings: Settings,
        store: Arc<dyn PersonaStore>,
        host: Arc<dyn ConversationHost>,
    ) -> PersonaPlusBuilder {
        PersonaPlusBuilder { settings, store, host, fetcher: None, sync: None }
    }

    pub fn context(&self) -> &Arc<PluginContext> {
        &self.ctx
    }

    /// Persona active in the scope this message belongs to.
    pub async fn active_persona(&self, message: &InboundMessage) -> Option<String> {
        self.ctx.active.get(&self.ctx.scope_key(message)).await
    }

    pub async fn handle_message(&self, message: &InboundMessage) -> HandleOutcome {
        self.handle_message_at(message, Utc::now()).await
    }

    pub async fn handle_message_at(&self, message: &InboundMessage, now: DateTime<Utc>) -> HandleOutcome {
        if let Some(inv) = detect_command(&message.text, self.dispatcher.registry()) {
            return self.run_command(message, inv, now).await;
        }

        let mut replies = Vec::new();
        match self.ctx.pending.take(&message.conversation_id, now).await {
            PendingCheck::Ready(action) => {
                let reply = self.consume_pending(message, &action).await;
                return HandleOutcome::consumed(reply);
            }
            PendingCheck::Expired(action) => {
                self.log_expired(&message.conversation_id, &action);
                replies.push(PersonaError::Timeout.to_string());
            }
            PendingCheck::Idle => {}
        }

        let mut outcome = self.keyword_switch(message).await;
        replies.append(&mut outcome.replies);
        outcome.replies = replies;
        outcome
    }

    /// Drop expired pending actions; the host may report them.
    pub async fn sweep_expired_at(&self, now: DateTime<Utc>) -> Vec<(String, PendingAction)> {
        let expired = self.ctx.pending.sweep_expired(now).await;
        for (conversation_id, action) in &expired {
            self.log_expired(conversation_id, action);
        }
        expired
    }

    async fn run_command(
        &self,
        message: &InboundMessage,
        inv: CommandInvocation,
        now: DateTime<Utc>,
    ) -> HandleOutcome {
        let is_admin = self.ctx.is_admin(message);
        let management = self
            .dispatcher
            .registry()
            .find_by_key(&inv.key)
            .map(|def| def.is_management())
            .unwrap_or(false);
        if management && self.ctx.settings.require_admin_for_manage && !is_admin {
            info!(sender = %message.sender_id, command = %inv.key, "Management command denied");
            return HandleOutcome::consumed(PersonaError::PermissionDenied.to_string());
        }

        let cmd = CommandContext { message: message.clone(), is_admin, now };
        match self.dispatcher.dispatch(&cmd, &inv).await {
            Ok(resp) => {
                let mut outcome = HandleOutcome::consumed(resp.text);
                if inv.key == SWITCH_KEY {
                    outcome.switched_to = inv.arg(0).map(str::to_string);
                }
                outcome
            }
            Err(e) => HandleOutcome::consumed(error_reply(&e)),
        }
    }

    async fn consume_pending(&self, message: &InboundMessage, action: &PendingAction) -> String {
        let result = match action.kind {
            PendingKind::Create | PendingKind::Update => self.apply_content(message, action).await,
            PendingKind::Avatar => self.apply_avatar(message, &action.persona_id).await,
        };

        PersonaEventLogger::log_event(
            &message.conversation_id,
            PersonaEvent::PendingConsumed {
                kind: action.kind.as_str().to_string(),
                persona_id: action.persona_id.clone(),
                success: result.is_ok(),
            },
        );

        match result {
            Ok(reply) => reply,
            Err(e) => {
                if !e.is_user_facing() {
                    error!(persona = %action.persona_id, kind = %action.kind, error = %e, "Pending action failed");
                }
                let label = match action.kind {
                    PendingKind::Create => "Create",
                    PendingKind::Update => "Update",
                    PendingKind::Avatar => "Avatar update",
                };
                format!("{} failed: {}", label, e)
            }
        }
    }

    async fn apply_content(&self, message: &InboundMessage, action: &PendingAction) -> Result<String, PersonaError> {
        let text = extract_payload_text(message).await?;
        let payload = parse_persona_payload(&text)?;
        let id = action.persona_id.as_str();

        let persona = match action.kind {
            PendingKind::Create => {
                if self.ctx.store.exists(id).await? {
                    return Err(PersonaError::AlreadyExists(id.to_string()));
                }
                Persona::new(id, payload.system_prompt).with_begin_dialogs(payload.begin_dialogs)
            }
            _ => {
                let mut persona = self
                    .ctx
                    .store
                    .get(id)
                    .await?
                    .ok_or_else(|| PersonaError::NotFound(id.to_string()))?;
                persona.system_prompt = payload.system_prompt;
                persona.begin_dialogs = payload.begin_dialogs;
                persona
            }
        };

        let dialogs = persona.begin_dialogs.len();
        self.ctx.store.upsert(persona).await?;
        info!(persona = id, kind = %action.kind, dialogs, "[PersonaPlus] Persona content saved");
        Ok(match action.kind {
            PendingKind::Create => format!("Persona {} created.", id),
            _ => format!("Persona {} updated.", id),
        })
    }

    async fn apply_avatar(&self, message: &InboundMessage, persona_id: &str) -> Result<String, PersonaError> {
        if !self.ctx.store.exists(persona_id).await? {
            return Err(PersonaError::NotFound(persona_id.to_string()));
        }
        self.ctx.ingestor.save_from_message(message, persona_id).await?;

        if self.ctx.settings.sync_avatar && self.ctx.active.is_active_anywhere(persona_id).await {
            debug!(persona = persona_id, "Active persona got a new avatar; pushing");
            self.ctx.enqueue_sync(SyncRequest::avatar_updated(message.bot_key(), persona_id));
        }
        Ok(format!("Avatar for persona {} saved.", persona_id))
    }

    async fn keyword_switch(&self, message: &InboundMessage) -> HandleOutcome {
        let mut outcome = HandleOutcome { forward: true, ..Default::default() };
        let resolved = SwitchResolver::resolve(
            &message.text,
            &self.ctx.settings.keyword_mappings,
            self.ctx.settings.keyword_switching,
            self.ctx.store.as_ref(),
        )
        .await;

        let persona_id = match resolved {
            Ok(Some(id)) => id,
            Ok(None) => return outcome,
            Err(e) => {
                warn!(error = %e, "Keyword resolution failed");
                return outcome;
            }
        };

        match self.ctx.switch_persona(message, &persona_id, SwitchVia::Keyword).await {
            Ok(_) => {
                if self.ctx.settings.announce_switch {
                    outcome.replies.push(format!("Switched persona to {}", persona_id));
                }
                outcome.switched_to = Some(persona_id);
            }
            Err(e) => warn!(persona = %persona_id, error = %e, "Keyword switch failed"),
        }
        outcome
    }

    fn log_expired(&self, conversation_id: &str, action: &PendingAction) {
        info!(
            conversation = conversation_id,
            kind = %action.kind,
            persona = %action.persona_id,
            "[PersonaPlus] Pending action timed out"
        );
        PersonaEventLogger::log_event(
            conversation_id,
            PersonaEvent::PendingExpired {
                kind: action.kind.as_str().to_string(),
                persona_id: action.persona_id.clone(),
            },
        );
    }
}

/// Reply text for a failed command.
fn error_reply(e: &anyhow::Error) -> String {
    match e.downcast_ref::<PersonaError>() {
        Some(pe) if pe.is_user_facing() => pe.to_string(),
        _ => {
            error!(error = %e, "Command failed");
            format!("Command failed: {}", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use personaplus_config::KeywordMapping;
    use personaplus_core::{Attachment, AutoSwitchScope, ProfileAdapter, SyncBus, SyncTrigger};
    use personaplus_media::MediaPayload;
    use personaplus_store::InMemoryPersonaStore;
    use personaplus_sync::SyncWorker;
    use std::path::Path;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingHost {
        cleared: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl ConversationHost for RecordingHost {
        async fn clear_history(&self, conversation_id: &str) -> Result<()> {
            self.cleared.lock().unwrap().push(conversation_id.to_string());
            Ok(())
        }
    }

    struct StaticFetcher;

    #[async_trait]
    impl ImageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<MediaPayload> {
            Ok(MediaPayload {
                source: url.to_string(),
                mime_type: "image/png".into(),
                data: Bytes::from_static(b"\x89PNG"),
            })
        }
    }

    struct FailingAdapter;

    #[async_trait]
    impl ProfileAdapter for FailingAdapter {
        fn name(&self) -> &str {
            "failing"
        }

        async fn set_nickname(&self, _nickname: &str) -> Result<()> {
            anyhow::bail!("platform unavailable")
        }

        async fn upload_avatar(&self, _image: &[u8]) -> Result<()> {
            anyhow::bail!("platform unavailable")
        }
    }

    fn settings(dir: &Path) -> Settings {
        Settings {
            keyword_mappings: vec![
                KeywordMapping::new("Hello", "assistant_v2"),
                KeywordMapping::new("kitty", "cat"),
            ],
            manage_wait_timeout: Duration::from_secs(60),
            data_dir: dir.to_path_buf(),
            ..Settings::default()
        }
    }

    fn store() -> Arc<InMemoryPersonaStore> {
        Arc::new(InMemoryPersonaStore::with_personas(vec![
            Persona::new("assistant_v2", "Helpful.").with_tools(Some(vec!["search".into()])),
            Persona::new("cat", "Meow."),
        ]))
    }

    fn engine_with(settings: Settings, store: Arc<InMemoryPersonaStore>, host: Arc<RecordingHost>) -> PersonaPlus {
        PersonaPlus::builder(settings, store, host)
            .image_fetcher(Arc::new(StaticFetcher))
            .build()
            .unwrap()
    }

    fn engine(dir: &Path) -> PersonaPlus {
        engine_with(settings(dir), store(), Arc::new(RecordingHost::default()))
    }

    fn msg(conv: &str, text: &str) -> InboundMessage {
        InboundMessage::text(conv, text)
    }

    fn image_msg(conv: &str) -> InboundMessage {
        msg(conv, "").with_attachment(Attachment::Image {
            url: Some("http://example.com/a.png".into()),
            path: None,
        })
    }

    #[tokio::test]
    async fn keyword_switch_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        let out = engine.handle_message(&msg("c1", "HELLO THERE")).await;
        assert_eq!(out.switched_to.as_deref(), Some("assistant_v2"));
        assert!(out.forward);
        assert!(out.replies.is_empty());
        assert_eq!(engine.active_persona(&msg("c1", "")).await.as_deref(), Some("assistant_v2"));

        let out = engine.handle_message(&msg("c1", "hello there")).await;
        assert_eq!(out.switched_to.as_deref(), Some("assistant_v2"));
    }

    #[tokio::test]
    async fn announce_and_clear_context_on_keyword_switch() {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(RecordingHost::default());
        let settings = Settings {
            announce_switch: true,
            clear_context_on_switch: true,
            ..settings(dir.path())
        };
        let engine = engine_with(settings, store(), host.clone());

        let out = engine.handle_message(&msg("c1", "here kitty")).await;
        assert_eq!(out.replies, vec!["Switched persona to cat"]);
        assert_eq!(*host.cleared.lock().unwrap(), vec!["c1".to_string()]);
    }

    #[tokio::test]
    async fn conversation_scope_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        engine.handle_message(&msg("c1", "hello")).await;
        assert!(engine.active_persona(&msg("c2", "")).await.is_none());
    }

    #[tokio::test]
    async fn session_scope_is_shared_within_session_only() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings { scope: AutoSwitchScope::Session, ..settings(dir.path()) };
        let engine = engine_with(settings, store(), Arc::new(RecordingHost::default()));

        engine.handle_message(&msg("c1", "hello").with_session("s1")).await;
        assert_eq!(
            engine.active_persona(&msg("c2", "").with_session("s1")).await.as_deref(),
            Some("assistant_v2")
        );
        assert!(engine.active_persona(&msg("c3", "").with_session("s2")).await.is_none());
    }

    #[tokio::test]
    async fn global_scope_is_shared_across_conversations() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings { scope: AutoSwitchScope::Global, ..settings(dir.path()) };
        let engine = engine_with(settings, store(), Arc::new(RecordingHost::default()));

        engine.handle_message(&msg("c1", "hello")).await;
        assert_eq!(engine.active_persona(&msg("c2", "")).await.as_deref(), Some("assistant_v2"));

        engine.handle_message(&msg("c2", "kitty")).await;
        assert_eq!(engine.active_persona(&msg("c1", "")).await.as_deref(), Some("cat"));
    }

    #[tokio::test]
    async fn disabled_keyword_switching_never_switches() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings { keyword_switching: false, ..settings(dir.path()) };
        let engine = engine_with(settings, store(), Arc::new(RecordingHost::default()));

        let out = engine.handle_message(&msg("c1", "hello kitty")).await;
        assert!(out.switched_to.is_none());
        assert!(engine.context().active.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn create_consumes_next_message_as_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let engine = engine_with(settings(dir.path()), store.clone(), Arc::new(RecordingHost::default()));
        let now = Utc::now();

        let out = engine.handle_message_at(&msg("c1", "/persona_plus create p1"), now).await;
        assert!(out.replies[0].contains("persona p1"));
        assert!(!out.forward);

        let out = engine
            .handle_message_at(&msg("c1", "You are p1."), now + chrono::Duration::seconds(5))
            .await;
        assert_eq!(out.replies, vec!["Persona p1 created."]);
        assert!(!out.forward);
        assert_eq!(store.get("p1").await.unwrap().unwrap().system_prompt, "You are p1.");
        assert!(engine.context().pending.is_empty().await);
    }

    #[tokio::test]
    async fn expired_pending_is_dropped_and_message_handled_normally() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let engine = engine_with(settings(dir.path()), store.clone(), Arc::new(RecordingHost::default()));
        let now = Utc::now();

        engine.handle_message_at(&msg("c1", "/pp create p1"), now).await;
        let out = engine
            .handle_message_at(&msg("c1", "hello"), now + chrono::Duration::seconds(61))
            .await;

        assert_eq!(out.replies[0], "Timed out waiting for persona content; operation cancelled.");
        assert_eq!(out.switched_to.as_deref(), Some("assistant_v2"));
        assert!(out.forward);
        assert!(store.get("p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn huge_wait_timeout_does_not_break_create() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            manage_wait_timeout: Duration::from_secs(10_000_000_000_000),
            ..settings(dir.path())
        };
        let store = store();
        let engine = engine_with(settings, store.clone(), Arc::new(RecordingHost::default()));

        let out = engine.handle_message(&msg("c1", "/pp create p1")).await;
        assert!(out.replies[0].contains("persona p1"));
        engine.handle_message(&msg("c1", "You are p1.")).await;
        assert_eq!(store.get("p1").await.unwrap().unwrap().system_prompt, "You are p1.");
    }

    #[tokio::test]
    async fn create_rejects_existing_and_update_rejects_missing() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        let out = engine.handle_message(&msg("c1", "/pp create cat")).await;
        assert!(out.replies[0].contains("already exists"));
        let out = engine.handle_message(&msg("c1", "/pp update ghost")).await;
        assert_eq!(out.replies, vec!["Persona ghost not found."]);
        assert!(engine.context().pending.is_empty().await);
    }

    #[tokio::test]
    async fn update_replaces_prompt_and_dialogs_and_keeps_tools() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let engine = engine_with(settings(dir.path()), store.clone(), Arc::new(RecordingHost::default()));

        engine.handle_message(&msg("c1", "/pp update assistant_v2")).await;
        let out = engine
            .handle_message(&msg(
                "c1",
                r#"{"system_prompt": "Terse.", "begin_dialogs": ["hi", "hello"]}"#,
            ))
            .await;
        assert_eq!(out.replies, vec!["Persona assistant_v2 updated."]);

        let persona = store.get("assistant_v2").await.unwrap().unwrap();
        assert_eq!(persona.system_prompt, "Terse.");
        assert_eq!(persona.begin_dialogs, vec!["hi", "hello"]);
        assert_eq!(persona.tools, Some(vec!["search".to_string()]));
    }

    #[tokio::test]
    async fn odd_dialogs_fail_and_clear_pending() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let engine = engine_with(settings(dir.path()), store.clone(), Arc::new(RecordingHost::default()));

        engine.handle_message(&msg("c1", "/pp create p1")).await;
        let out = engine
            .handle_message(&msg("c1", r#"{"system_prompt": "x", "begin_dialogs": ["hi"]}"#))
            .await;
        assert!(out.replies[0].starts_with("Create failed: "));
        assert!(store.get("p1").await.unwrap().is_none());
        assert!(engine.context().pending.is_empty().await);
    }

    #[tokio::test]
    async fn commands_are_never_consumed_as_payload() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        engine.handle_message(&msg("c1", "/pp create p1")).await;
        let out = engine.handle_message(&msg("c1", "/pp list")).await;
        assert!(out.replies[0].starts_with("Personas:"));
        assert!(engine.context().pending.peek("c1").await.is_some());
    }

    #[tokio::test]
    async fn new_management_command_replaces_pending_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let engine = engine_with(settings(dir.path()), store.clone(), Arc::new(RecordingHost::default()));

        engine.handle_message(&msg("c1", "/pp create p1")).await;
        let out = engine.handle_message(&msg("c1", "/pp create p2")).await;
        assert!(out.replies[0].starts_with("Cancelled pending create of p1."));

        engine.handle_message(&msg("c1", "You are p2.")).await;
        assert!(store.get("p1").await.unwrap().is_none());
        assert!(store.get("p2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn management_requires_admin_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings { require_admin_for_manage: true, ..settings(dir.path()) };
        settings.admin_ids.insert("42".into());
        let engine = engine_with(settings, store(), Arc::new(RecordingHost::default()));

        let out = engine.handle_message(&msg("c1", "/pp delete cat")).await;
        assert_eq!(out.replies, vec!["This operation requires administrator permission."]);
        assert!(engine.context().store.exists("cat").await.unwrap());

        // read-only commands stay open
        let out = engine.handle_message(&msg("c1", "/pp view cat")).await;
        assert!(out.replies[0].starts_with("Persona cat"));

        let out = engine.handle_message(&msg("c1", "/pp delete cat").with_sender("42")).await;
        assert_eq!(out.replies, vec!["Persona cat deleted."]);

        let out = engine.handle_message(&msg("c1", "/pp create p1").as_admin()).await;
        assert!(out.replies[0].contains("persona p1"));
    }

    #[tokio::test]
    async fn delete_cascades_avatar_and_view_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        engine.handle_message(&msg("c1", "/pp avatar cat")).await;
        let out = engine.handle_message(&image_msg("c1")).await;
        assert_eq!(out.replies, vec!["Avatar for persona cat saved."]);
        assert!(engine.context().avatars.exists("cat"));

        let view = engine.handle_message(&msg("c1", "/pp view cat")).await;
        assert!(!view.replies[0].contains("Avatar: none"));

        let out = engine.handle_message(&msg("c1", "/pp delete cat")).await;
        assert_eq!(out.replies, vec!["Persona cat deleted."]);
        assert!(!engine.context().avatars.exists("cat"));

        let out = engine.handle_message(&msg("c1", "/pp view cat")).await;
        assert_eq!(out.replies, vec!["Persona cat not found."]);
    }

    #[tokio::test]
    async fn avatar_without_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        engine.handle_message(&msg("c1", "/pp avatar cat")).await;
        let out = engine.handle_message(&msg("c1", "no picture")).await;
        assert!(out.replies[0].starts_with("Avatar update failed: "));
        assert!(!engine.context().avatars.exists("cat"));
    }

    #[tokio::test]
    async fn quick_switch_and_missing_persona() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        let out = engine.handle_message(&msg("c1", "/pp cat")).await;
        assert_eq!(out.replies, vec!["Switched persona to cat"]);
        assert_eq!(out.switched_to.as_deref(), Some("cat"));

        let out = engine.handle_message(&msg("c1", "/pp ghost")).await;
        assert_eq!(out.replies, vec!["Persona ghost not found."]);
        assert_eq!(engine.active_persona(&msg("c1", "")).await.as_deref(), Some("cat"));
    }

    #[tokio::test]
    async fn bare_alias_shows_help_and_usage_on_missing_arg() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        let out = engine.handle_message(&msg("c1", "/PP")).await;
        assert!(out.replies[0].contains("/persona_plus list"));
        assert!(out.replies[0].contains("switch scope: conversation"));

        let out = engine.handle_message(&msg("c1", "/pp view")).await;
        assert_eq!(out.replies, vec!["Usage: /pp view <persona_id>"]);
    }

    #[tokio::test]
    async fn cancel_and_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let now = Utc::now();

        engine.handle_message_at(&msg("c1", "/pp create p1"), now).await;
        let out = engine.handle_message_at(&msg("c1", "/pp cancel"), now).await;
        assert_eq!(out.replies, vec!["Cancelled pending create of p1."]);
        let out = engine.handle_message_at(&msg("c1", "/pp cancel"), now).await;
        assert_eq!(out.replies, vec!["Nothing to cancel."]);

        engine.handle_message_at(&msg("c2", "/pp update cat"), now).await;
        let swept = engine.sweep_expired_at(now + chrono::Duration::seconds(120)).await;
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].0, "c2");
    }

    #[tokio::test]
    async fn sync_failure_leaves_switch_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings { sync_nickname: true, ..settings(dir.path()) };
        let profile_sync = Arc::new(ProfileSync::new(
            true,
            false,
            "{persona_id}",
            Arc::new(FailingAdapter),
            AvatarCache::in_data_dir(dir.path()),
        ));
        let mut bus = SyncBus::new();
        let request_rx = bus.take_request_rx().unwrap();
        let mut report_rx = bus.take_report_rx().unwrap();
        SyncWorker::new(profile_sync.clone(), bus.report_tx.clone()).spawn(request_rx);

        let engine = PersonaPlus::builder(settings, store(), Arc::new(RecordingHost::default()))
            .image_fetcher(Arc::new(StaticFetcher))
            .sync(profile_sync, bus.request_tx.clone())
            .build()
            .unwrap();

        let out = engine.handle_message(&msg("c1", "/pp cat")).await;
        assert_eq!(out.replies, vec!["Switched persona to cat"]);

        let report = report_rx.recv().await.unwrap();
        assert!(report.has_failure());
        assert_eq!(engine.active_persona(&msg("c1", "")).await.as_deref(), Some("cat"));
    }

    #[tokio::test]
    async fn new_avatar_for_active_persona_queues_forced_push() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings { sync_avatar: true, ..settings(dir.path()) };
        let profile_sync = Arc::new(ProfileSync::new(
            false,
            true,
            "{persona_id}",
            Arc::new(FailingAdapter),
            AvatarCache::in_data_dir(dir.path()),
        ));
        let (tx, mut rx) = mpsc::channel(8);
        let engine = PersonaPlus::builder(settings, store(), Arc::new(RecordingHost::default()))
            .image_fetcher(Arc::new(StaticFetcher))
            .sync(profile_sync, tx)
            .build()
            .unwrap();

        engine.handle_message(&msg("c1", "/pp cat")).await;
        assert_eq!(rx.try_recv().unwrap().trigger, SyncTrigger::Switch);

        engine.handle_message(&msg("c1", "/pp avatar cat")).await;
        engine.handle_message(&image_msg("c1")).await;
        let request = rx.try_recv().unwrap();
        assert_eq!(request.trigger, SyncTrigger::AvatarUpdated);
        assert!(request.force);

        // an inactive persona's avatar is only saved
        engine.handle_message(&msg("c1", "/pp avatar assistant_v2")).await;
        engine.handle_message(&image_msg("c1")).await;
        assert!(rx.try_recv().is_err());
    }
}
