//! Nickname/avatar pushes with a per-bot last-synced cache.

use std::collections::HashMap;
use std::sync::Arc;

use personaplus_core::{PersonaError, ProfileAdapter, SyncOutcome, SyncReport, SyncRequest, SyncTrigger};
use personaplus_store::AvatarCache;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const PERSONA_ID_PLACEHOLDER: &str = "{persona_id}";

/// Platforms commonly cap nicknames; longer names are cut.
pub const MAX_NICKNAME_CHARS: usize = 60;

/// Render the nickname for a persona. An empty result falls back to the id.
pub fn format_nickname(template: &str, persona_id: &str) -> String {
    let rendered = template.replace(PERSONA_ID_PLACEHOLDER, persona_id);
    let rendered = rendered.trim();
    let name = if rendered.is_empty() { persona_id } else { rendered };
    name.chars().take(MAX_NICKNAME_CHARS).collect()
}

pub struct ProfileSync {
    sync_nickname: bool,
    sync_avatar: bool,
    nickname_template: String,
    adapter: Arc<dyn ProfileAdapter>,
    avatars: AvatarCache,
    /// bot key (`platform_id:self_id`) -> last persona pushed
    last_synced: Mutex<HashMap<String, String>>,
}

impl ProfileSync {
    pub fn new(
        sync_nickname: bool,
        sync_avatar: bool,
        nickname_template: impl Into<String>,
        adapter: Arc<dyn ProfileAdapter>,
        avatars: AvatarCache,
    ) -> Self {
        Self {
            sync_nickname,
            sync_avatar,
            nickname_template: nickname_template.into(),
            adapter,
            avatars,
            last_synced: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sync_nickname || self.sync_avatar
    }

    pub async fn last_synced(&self, bot_key: &str) -> Option<String> {
        self.last_synced.lock().await.get(bot_key).cloned()
    }

    /// Forget a persona so the next switch to a same-named persona pushes again.
    pub async fn reset_persona(&self, persona_id: &str) {
        let mut cache = self.last_synced.lock().await;
        let before = cache.len();
        cache.retain(|_, synced| synced != persona_id);
        if cache.len() != before {
            debug!(persona = persona_id, "Dropped sync cache entries");
        }
    }

    /// Push the requested persona. Never fails; outcomes go in the report.
    pub async fn sync(&self, request: &SyncRequest) -> SyncReport {
        let mut report = SyncReport {
            request_id: request.id,
            bot_key: request.bot_key.clone(),
            persona_id: request.persona_id.clone(),
            nickname: SyncOutcome::NotRequested,
            avatar: SyncOutcome::NotRequested,
        };

        if !self.is_enabled() {
            return report;
        }

        if !request.force
            && self.last_synced(&request.bot_key).await.as_deref() == Some(request.persona_id.as_str())
        {
            debug!(bot = %request.bot_key, persona = %request.persona_id, "Profile already synced");
            let skipped = SyncOutcome::Skipped("already synced".to_string());
            if self.sync_nickname && request.trigger == SyncTrigger::Switch {
                report.nickname = skipped.clone();
            }
            if self.sync_avatar {
                report.avatar = skipped;
            }
            return report;
        }

        if self.sync_nickname && request.trigger == SyncTrigger::Switch {
            report.nickname = self.push_nickname(&request.persona_id).await;
        }
        if self.sync_avatar {
            report.avatar = self.push_avatar(&request.persona_id).await;
        }

        if report.nickname.is_applied() || report.avatar.is_applied() {
            self.last_synced
                .lock()
                .await
                .insert(request.bot_key.clone(), request.persona_id.clone());
        }

        if report.has_failure() {
            warn!(
                bot = %request.bot_key,
                persona = %request.persona_id,
                nickname = ?report.nickname,
                avatar = ?report.avatar,
                "[ProfileSync] Sync finished with failures"
            );
        } else {
            info!(
                bot = %request.bot_key,
                persona = %request.persona_id,
                nickname = ?report.nickname,
                avatar = ?report.avatar,
                "[ProfileSync] Sync finished"
            );
        }
        report
    }

    async fn push_nickname(&self, persona_id: &str) -> SyncOutcome {
        if !self.adapter.supports_nickname() {
            warn!(adapter = self.adapter.name(), "Adapter cannot set nicknames; skipping");
            return SyncOutcome::Skipped("nickname not supported".to_string());
        }
        let nickname = format_nickname(&self.nickname_template, persona_id);
        match self.adapter.set_nickname(&nickname).await {
            Ok(()) => SyncOutcome::Applied,
            Err(e) => self.failed(e),
        }
    }

    fn failed(&self, e: anyhow::Error) -> SyncOutcome {
        let err = PersonaError::Sync {
            adapter: self.adapter.name().to_string(),
            message: format!("{e:#}"),
        };
        SyncOutcome::Failed(err.to_string())
    }

    async fn push_avatar(&self, persona_id: &str) -> SyncOutcome {
        if !self.adapter.supports_avatar() {
            warn!(adapter = self.adapter.name(), "Adapter cannot upload avatars; skipping");
            return SyncOutcome::Skipped("avatar not supported".to_string());
        }
        if !self.avatars.exists(persona_id) {
            debug!(persona = persona_id, "No avatar saved; skipping avatar push");
            return SyncOutcome::Skipped("no avatar saved".to_string());
        }
        let image = match self.avatars.read(persona_id).await {
            Ok(image) => image,
            Err(e) => return self.failed(e),
        };
        match self.adapter.upload_avatar(&image).await {
            Ok(()) => SyncOutcome::Applied,
            Err(e) => self.failed(e),
        }
    }
}
