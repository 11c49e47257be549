mod check_cmd;
mod console;
mod personas_cmd;
mod terminal_output;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use personaplus_config::{config_dir, config_file_path, defaults::default_data_dir, load_config};

#[derive(Parser)]
#[command(name = "persona-plus")]
#[command(about = "Persona Plus: keyword persona switching and persona management for chat bots")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/personaplus.yaml, see PERSONAPLUS_CONFIG_DIR)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the engine from the terminal
    Console {
        /// Conversation id for the first message
        #[arg(long, default_value = "console")]
        conversation: String,
        /// Sender id for the first message
        #[arg(long, default_value = "user")]
        sender: String,
        /// Mark the sender as admin
        #[arg(long)]
        admin: bool,
    },
    /// Validate the config file and show the keyword mappings
    CheckConfig,
    /// Write a config file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// List stored personas
    Personas,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));

    // Logging settings come from the file itself.
    let raw = load_config(&config_path).await?;
    let data_dir = raw.data_dir.clone().unwrap_or_else(default_data_dir);
    let log_dir = data_dir.join("logs");
    if personaplus_logging::init_logger(&log_dir, &raw.log_level).is_err() {
        // check-config reports the bad level; keep running with the default.
        personaplus_logging::init_logger(&log_dir, "info")?;
    }
    info!(config = %config_path.display(), "Persona Plus starting");

    match cli.command {
        Commands::Console { conversation, sender, admin } => {
            let config = personaplus_config::load_and_prepare(&config_path).await?;
            console::run(config, console::ConsoleIdentity::new(conversation, sender, admin)).await?;
        }
        Commands::CheckConfig => {
            let ok = check_cmd::run(&config_path, &raw);
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::InitConfig { force } => init_config(&config_path, force).await?,
        Commands::Personas => {
            let config = personaplus_config::load_and_prepare(&config_path).await?;
            personas_cmd::run(&config).await?;
        }
    }

    Ok(())
}

async fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        terminal_output::note_warn(&format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        ));
        return Ok(());
    }
    let config = personaplus_config::apply_all_defaults(Default::default());
    personaplus_config::write_config(&config, path).await?;
    terminal_output::note_success(&format!("Wrote {}", path.display()));
    Ok(())
}
