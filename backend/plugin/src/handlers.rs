//! Handlers for the `/persona_plus` sub-commands.
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use personaplus_commands::{
    is_valid_persona_id, CommandContext, CommandHandler, CommandInvocation, CommandRegistry,
    CommandResponse, PRIMARY_ALIAS,
};
use personaplus_core::{Persona, PersonaError};
use personaplus_logging::{PersonaEvent, PersonaEventLogger};
use tracing::{info, warn};

use crate::context::{PluginContext, SwitchVia};
use crate::pending::PendingKind;

/// First argument as a persona id; the dispatcher already checked presence.
fn persona_arg(inv: &CommandInvocation) -> Result<&str, PersonaError> {
    let id = inv.arg(0).unwrap_or_default();
    if is_valid_persona_id(id) {
        Ok(id)
    } else {
        Err(PersonaError::invalid(format!("Invalid persona id: {:?}", id)))
    }
}

// ---------------------------------------------------------------------------
// Read-only commands
// ---------------------------------------------------------------------------

pub struct HelpHandler {
    pub ctx: Arc<PluginContext>,
    pub registry: Arc<CommandRegistry>,
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn handle(&self, _cmd: &CommandContext, _inv: &CommandInvocation) -> Result<CommandResponse> {
        let s = &self.ctx.settings;
        let sync = match (s.sync_nickname, s.sync_avatar) {
            (true, true) => "nickname + avatar",
            (true, false) => "nickname",
            (false, true) => "avatar",
            (false, false) => "off",
        };
        let keyword = if s.keyword_switching {
            format!("on, {} mapping(s)", s.keyword_mappings.len())
        } else {
            "off".to_string()
        };

        let mut lines = vec![self.registry.help_text(), String::new(), "Settings:".to_string()];
        lines.push(format!("- keyword switching: {}", keyword));
        lines.push(format!("- switch scope: {}", s.scope));
        lines.push(format!(
            "- management requires admin: {}",
            if s.require_admin_for_manage { "yes" } else { "no" }
        ));
        lines.push(format!("- content wait timeout: {}s", s.manage_wait_timeout.as_secs()));
        lines.push(format!("- profile sync: {}", sync));
        Ok(CommandResponse::ok(lines.join("\n")))
    }
}

pub struct ListHandler {
    pub ctx: Arc<PluginContext>,
}

#[async_trait]
impl CommandHandler for ListHandler {
    async fn handle(&self, cmd: &CommandContext, _inv: &CommandInvocation) -> Result<CommandResponse> {
        let personas = self.ctx.store.list().await?;
        if personas.is_empty() {
            return Ok(CommandResponse::ok(format!(
                "No personas yet. Create one with {} create <persona_id>.",
                PRIMARY_ALIAS
            )));
        }

        let active = self.ctx.active.get(&self.ctx.scope_key(&cmd.message)).await;
        let mut lines = vec!["Personas:".to_string()];
        for persona in &personas {
            let mut line = format!(
                "- {} | dialogs: {} | tools: {}",
                persona.id,
                persona.begin_dialogs.len(),
                persona.tool_summary()
            );
            if self.ctx.avatars.exists(&persona.id) {
                line.push_str(" | avatar");
            }
            if active.as_deref() == Some(persona.id.as_str()) {
                line.push_str(" (active)");
            }
            lines.push(line);
        }
        Ok(CommandResponse::ok(lines.join("\n")))
    }
}

pub struct ViewHandler {
    pub ctx: Arc<PluginContext>,
}

/// Multi-line description shown by `view`.
pub fn render_persona(persona: &Persona) -> String {
    let mut lines = vec![
        format!("Persona {}", persona.id),
        "----------------".to_string(),
        "System Prompt:".to_string(),
        persona.system_prompt.clone(),
    ];

    if !persona.begin_dialogs.is_empty() {
        lines.push("\nPreset dialogs:".to_string());
        for (idx, dialog) in persona.begin_dialogs.iter().enumerate() {
            let role = if idx % 2 == 0 { "User" } else { "Assistant" };
            lines.push(format!("[{}] {}", role, dialog));
        }
    }

    match &persona.tools {
        None => lines.push("\nTools: all available tools".to_string()),
        Some(tools) if tools.is_empty() => lines.push("\nTools: all tools disabled".to_string()),
        Some(tools) => lines.push(format!("\nTools: {}", tools.join(", "))),
    }

    match &persona.avatar_path {
        Some(path) => lines.push(format!("Avatar: {}", path.display())),
        None => lines.push("Avatar: none".to_string()),
    }
    lines.join("\n")
}

#[async_trait]
impl CommandHandler for ViewHandler {
    async fn handle(&self, _cmd: &CommandContext, inv: &CommandInvocation) -> Result<CommandResponse> {
        let id = persona_arg(inv)?;
        let persona = self.ctx.persona(id).await?;
        Ok(CommandResponse::ok(render_persona(&persona)))
    }
}

// ---------------------------------------------------------------------------
// Management commands
// ---------------------------------------------------------------------------

/// Starts a create/update/avatar wait in the caller's conversation.
pub struct BeginPendingHandler {
    pub ctx: Arc<PluginContext>,
    pub kind: PendingKind,
}

#[async_trait]
impl CommandHandler for BeginPendingHandler {
    async fn handle(&self, cmd: &CommandContext, inv: &CommandInvocation) -> Result<CommandResponse> {
        let id = persona_arg(inv)?;
        let exists = self.ctx.store.exists(id).await?;
        match self.kind {
            PendingKind::Create if exists => return Err(PersonaError::AlreadyExists(id.to_string()).into()),
            PendingKind::Update | PendingKind::Avatar if !exists => {
                return Err(PersonaError::NotFound(id.to_string()).into());
            }
            _ => {}
        }

        let (action, replaced) = self
            .ctx
            .pending
            .begin(cmd.conversation_id(), self.kind, id, cmd.now)
            .await;
        PersonaEventLogger::log_event(
            cmd.conversation_id(),
            PersonaEvent::PendingStarted {
                kind: self.kind.as_str().to_string(),
                persona_id: id.to_string(),
                deadline: action.deadline,
            },
        );

        let secs = self.ctx.pending.timeout().num_seconds();
        let prompt = match self.kind {
            PendingKind::Create => format!(
                "Send the content for persona {} (text or a txt/md/json file) within {}s.",
                id, secs
            ),
            PendingKind::Update => format!(
                "Send the new content for persona {} (text or a txt/md/json file) within {}s.",
                id, secs
            ),
            PendingKind::Avatar => format!(
                "Send or quote an image (jpg/jpeg/png/gif/webp) for persona {} within {}s.",
                id, secs
            ),
        };

        let text = match replaced {
            Some(old) => format!("Cancelled pending {} of {}.\n{}", old.kind, old.persona_id, prompt),
            None => prompt,
        };
        Ok(CommandResponse::ok(text))
    }
}

pub struct DeleteHandler {
    pub ctx: Arc<PluginContext>,
}

#[async_trait]
impl CommandHandler for DeleteHandler {
    async fn handle(&self, cmd: &CommandContext, inv: &CommandInvocation) -> Result<CommandResponse> {
        let id = persona_arg(inv)?;
        if !self.ctx.store.delete(id).await? {
            return Err(PersonaError::NotFound(id.to_string()).into());
        }

        let avatar_removed = match self.ctx.avatars.remove(id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(persona = id, error = %e, "Failed to remove avatar of deleted persona");
                false
            }
        };
        if let Some(sync) = &self.ctx.profile_sync {
            sync.reset_persona(id).await;
        }

        info!(persona = id, avatar_removed, "[PersonaPlus] Persona deleted");
        PersonaEventLogger::log_event(
            cmd.conversation_id(),
            PersonaEvent::PersonaDeleted { persona_id: id.to_string(), avatar_removed },
        );
        Ok(CommandResponse::ok(format!("Persona {} deleted.", id)))
    }
}

// ---------------------------------------------------------------------------
// Conversation commands
// ---------------------------------------------------------------------------

pub struct CancelHandler {
    pub ctx: Arc<PluginContext>,
}

#[async_trait]
impl CommandHandler for CancelHandler {
    async fn handle(&self, cmd: &CommandContext, _inv: &CommandInvocation) -> Result<CommandResponse> {
        let text = match self.ctx.pending.cancel(cmd.conversation_id()).await {
            Some(action) => format!("Cancelled pending {} of {}.", action.kind, action.persona_id),
            None => "Nothing to cancel.".to_string(),
        };
        Ok(CommandResponse::ok(text))
    }
}

pub struct SwitchHandler {
    pub ctx: Arc<PluginContext>,
}

#[async_trait]
impl CommandHandler for SwitchHandler {
    async fn handle(&self, cmd: &CommandContext, inv: &CommandInvocation) -> Result<CommandResponse> {
        let id = inv.arg(0).unwrap_or_default();
        if !is_valid_persona_id(id) {
            return Err(PersonaError::NotFound(id.to_string()).into());
        }
        self.ctx.switch_persona(&cmd.message, id, SwitchVia::Command).await?;
        Ok(CommandResponse::ok(format!("Switched persona to {}", id)))
    }
}
