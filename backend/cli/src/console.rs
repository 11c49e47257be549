//! Interactive console host.
//!
//! Every input line becomes an inbound message for the engine; lines starting
//! with `:` change who is speaking and where.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use personaplus_config::{PersonaPlusConfig, Settings};
use personaplus_core::{Attachment, ConversationHost, InboundMessage, PersonaError, SyncBus};
use personaplus_logging::{PersonaEvent, PersonaEventLogger};
use personaplus_plugin::PersonaPlus;
use personaplus_store::{AvatarCache, YamlPersonaStore};
use personaplus_sync::{LoggingProfileAdapter, ProfileSync, SyncWorker};

use crate::terminal_output::{bot_line, dim, note_error, note_info};

const SWEEP_INTERVAL_SECS: u64 = 5;

const CONSOLE_HELP: &str = "\
Console commands:
  :conv <id>        switch conversation
  :session <id>     set the session id
  :as <sender>      speak as another sender
  :admin on|off     toggle the host admin flag
  :image <url|path> send an image
  :quote <url|path> send a message quoting an image
  :file <path>      send a file
  :active           show the active persona
  :help             this text
  :quit             exit
Anything else is sent as a chat message, e.g. /pp help";

// ---------------------------------------------------------------------------
// Input parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Text(String),
    Image { source: String, quoted: bool },
    File(PathBuf),
    SetConversation(String),
    SetSession(String),
    SetSender(String),
    SetAdmin(bool),
    ShowActive,
    Help,
    Quit,
    Invalid(String),
}

pub fn parse_console_line(line: &str) -> ConsoleInput {
    let trimmed = line.trim();
    let Some(meta) = trimmed.strip_prefix(':') else {
        return ConsoleInput::Text(line.trim_end_matches(['\r', '\n']).to_string());
    };

    let (cmd, arg) = meta
        .split_once(char::is_whitespace)
        .map(|(c, a)| (c, a.trim()))
        .unwrap_or((meta, ""));
    let needs_arg = |make: fn(String) -> ConsoleInput| {
        if arg.is_empty() {
            ConsoleInput::Invalid(format!(":{} needs an argument", cmd))
        } else {
            make(arg.to_string())
        }
    };

    match cmd {
        "conv" => needs_arg(ConsoleInput::SetConversation),
        "session" => needs_arg(ConsoleInput::SetSession),
        "as" => needs_arg(ConsoleInput::SetSender),
        "admin" => match arg {
            "on" | "true" | "yes" => ConsoleInput::SetAdmin(true),
            "off" | "false" | "no" => ConsoleInput::SetAdmin(false),
            _ => ConsoleInput::Invalid("usage: :admin on|off".to_string()),
        },
        "image" => needs_arg(|source| ConsoleInput::Image { source, quoted: false }),
        "quote" => needs_arg(|source| ConsoleInput::Image { source, quoted: true }),
        "file" => needs_arg(|path| ConsoleInput::File(PathBuf::from(path))),
        "active" => ConsoleInput::ShowActive,
        "help" => ConsoleInput::Help,
        "quit" | "exit" | "q" => ConsoleInput::Quit,
        other => ConsoleInput::Invalid(format!("unknown console command :{}", other)),
    }
}

fn image_attachment(source: &str) -> Attachment {
    if source.starts_with("http://") || source.starts_with("https://") {
        Attachment::Image { url: Some(source.to_string()), path: None }
    } else {
        Attachment::Image { url: None, path: Some(PathBuf::from(source)) }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Who is speaking in the console, and where.
#[derive(Debug, Clone)]
pub struct ConsoleIdentity {
    pub conversation: String,
    pub session: Option<String>,
    pub sender: String,
    pub admin: bool,
}

impl ConsoleIdentity {
    pub fn new(conversation: String, sender: String, admin: bool) -> Self {
        Self { conversation, session: None, sender, admin }
    }

    pub fn message(&self, text: impl Into<String>) -> InboundMessage {
        let mut msg = InboundMessage::text(self.conversation.clone(), text).with_sender(self.sender.clone());
        msg.platform_id = "console".to_string();
        msg.self_id = "persona-plus".to_string();
        if let Some(session) = &self.session {
            msg = msg.with_session(session.clone());
        }
        if self.admin {
            msg = msg.as_admin();
        }
        msg
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

struct ConsoleHost;

#[async_trait]
impl ConversationHost for ConsoleHost {
    async fn clear_history(&self, conversation_id: &str) -> Result<()> {
        println!("{}", dim(&format!("[history of {} cleared]", conversation_id)));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

pub async fn run(config: PersonaPlusConfig, mut identity: ConsoleIdentity) -> Result<()> {
    let settings = Settings::from_config(&config);
    let store = Arc::new(YamlPersonaStore::open_in(&settings.data_dir).await?);
    let profile_sync = Arc::new(ProfileSync::new(
        settings.sync_nickname,
        settings.sync_avatar,
        settings.nickname_template.clone(),
        Arc::new(LoggingProfileAdapter),
        AvatarCache::in_data_dir(&settings.data_dir),
    ));

    let mut bus = SyncBus::new();
    let request_rx = bus.take_request_rx().context("sync request receiver already taken")?;
    let mut report_rx = bus.take_report_rx().context("sync report receiver already taken")?;
    SyncWorker::new(profile_sync.clone(), bus.report_tx.clone()).spawn(request_rx);
    tokio::spawn(async move {
        while let Some(report) = report_rx.recv().await {
            PersonaEventLogger::log_event(
                &report.bot_key,
                PersonaEvent::SyncResult {
                    bot_key: report.bot_key.clone(),
                    persona_id: report.persona_id.clone(),
                    nickname: format!("{:?}", report.nickname),
                    avatar: format!("{:?}", report.avatar),
                },
            );
        }
    });

    let engine = Arc::new(
        PersonaPlus::builder(settings, store, Arc::new(ConsoleHost))
            .sync(profile_sync, bus.request_tx.clone())
            .build()?,
    );

    let sweeper = engine.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            for (conversation, _) in sweeper.sweep_expired_at(Utc::now()).await {
                println!("{}", bot_line(&format!("[{}] {}", conversation, PersonaError::Timeout)));
            }
        }
    });

    note_info("Persona Plus console. Type :help for console commands, /pp help for bot commands.");
    info!(conversation = %identity.conversation, sender = %identity.sender, "Console started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}@{}> ", identity.sender, identity.conversation);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let message = match parse_console_line(&line) {
            ConsoleInput::Text(text) if text.trim().is_empty() => continue,
            ConsoleInput::Text(text) => identity.message(text),
            ConsoleInput::Image { source, quoted } => {
                let image = image_attachment(&source);
                let attachment = if quoted { Attachment::Reply { chain: vec![image] } } else { image };
                identity.message("").with_attachment(attachment)
            }
            ConsoleInput::File(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                identity.message("").with_attachment(Attachment::File { name, path })
            }
            ConsoleInput::SetConversation(id) => {
                identity.conversation = id;
                continue;
            }
            ConsoleInput::SetSession(id) => {
                identity.session = Some(id);
                continue;
            }
            ConsoleInput::SetSender(id) => {
                identity.sender = id;
                continue;
            }
            ConsoleInput::SetAdmin(admin) => {
                identity.admin = admin;
                continue;
            }
            ConsoleInput::ShowActive => {
                let active = engine.active_persona(&identity.message("")).await;
                println!("{}", dim(&format!("active persona: {}", active.as_deref().unwrap_or("(host default)"))));
                continue;
            }
            ConsoleInput::Help => {
                println!("{}", CONSOLE_HELP);
                continue;
            }
            ConsoleInput::Quit => break,
            ConsoleInput::Invalid(reason) => {
                note_error(&reason);
                continue;
            }
        };

        let outcome = engine.handle_message(&message).await;
        for reply in &outcome.replies {
            println!("{}", bot_line(reply));
        }
        if outcome.forward {
            let active = engine.active_persona(&message).await;
            debug!(persona = ?active, "Message forwarded to host pipeline");
            println!(
                "{}",
                dim(&format!("[forwarded to the model as {}]", active.as_deref().unwrap_or("default persona")))
            );
        }
    }

    info!("Console closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_command_lines_are_text() {
        assert_eq!(parse_console_line("hello there"), ConsoleInput::Text("hello there".into()));
        assert_eq!(parse_console_line("/pp list\n"), ConsoleInput::Text("/pp list".into()));
    }

    #[test]
    fn meta_commands() {
        assert_eq!(parse_console_line(":conv group-1"), ConsoleInput::SetConversation("group-1".into()));
        assert_eq!(parse_console_line(":admin on"), ConsoleInput::SetAdmin(true));
        assert_eq!(
            parse_console_line(":quote https://x/a.png"),
            ConsoleInput::Image { source: "https://x/a.png".into(), quoted: true }
        );
        assert_eq!(parse_console_line(":file ./p.md"), ConsoleInput::File(PathBuf::from("./p.md")));
        assert_eq!(parse_console_line(":q"), ConsoleInput::Quit);
    }

    #[test]
    fn invalid_meta_commands() {
        assert!(matches!(parse_console_line(":conv"), ConsoleInput::Invalid(_)));
        assert!(matches!(parse_console_line(":admin maybe"), ConsoleInput::Invalid(_)));
        assert!(matches!(parse_console_line(":nope"), ConsoleInput::Invalid(_)));
    }

    #[test]
    fn identity_builds_messages() {
        let mut identity = ConsoleIdentity::new("c1".into(), "42".into(), true);
        identity.session = Some("s1".into());
        let msg = identity.message("hi");
        assert_eq!(msg.conversation_id, "c1");
        assert_eq!(msg.session_id, "s1");
        assert_eq!(msg.sender_id, "42");
        assert!(msg.is_admin);
        assert_eq!(msg.bot_key(), "console:persona-plus");
    }

    #[test]
    fn image_sources() {
        assert!(matches!(image_attachment("http://x/a.png"), Attachment::Image { url: Some(_), .. }));
        assert!(matches!(image_attachment("/tmp/a.png"), Attachment::Image { path: Some(_), .. }));
    }
}
