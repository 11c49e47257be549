/// Command dispatch: route detected commands to handler functions.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use personaplus_core::InboundMessage;
use tracing::info;

use crate::registry::CommandRegistry;
use crate::types::CommandInvocation;

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// Context passed to every command handler.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub message: InboundMessage,
    /// Resolved against the host flag and configured admin ids.
    pub is_admin: bool,
    pub now: DateTime<Utc>,
}

impl CommandContext {
    pub fn conversation_id(&self) -> &str {
        &self.message.conversation_id
    }
}

/// The text reply a handler sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub text: String,
}

impl CommandResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &CommandContext, inv: &CommandInvocation) -> Result<CommandResponse>;
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry, handlers: HashMap::new() }
    }

    pub fn register(&mut self, key: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(key.into(), handler);
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Missing required arguments are answered with usage text before any handler runs.
    pub async fn dispatch(
        &self,
        ctx: &CommandContext,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse> {
        if let Some(def) = self.registry.find_by_key(&inv.key) {
            if inv.args.len() < def.required_args() {
                return Ok(CommandResponse::ok(format!("Usage: {}", def.usage(&inv.raw_alias))));
            }
        }

        if let Some(handler) = self.handlers.get(&inv.key) {
            info!(
                "[Commands] Dispatching {} in conversation {}",
                inv.key,
                ctx.conversation_id()
            );
            handler.handle(ctx, inv).await
        } else {
            Ok(CommandResponse::ok(format!("No handler registered for command {}", inv.key)))
        }
    }
}
