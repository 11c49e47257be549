//! Structured Logger
//!
//! Wraps `tracing` to provide JSON-formatted output, file rotation (NDJSON),
//! and environment-based level control.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global structured logger.
/// Creates a console logger and a rolling file logger.
///
/// `RUST_LOG` overrides `level`. Calling it twice keeps the first subscriber.
pub fn init_logger<P: AsRef<Path>>(log_dir: P, level: &str) -> Result<()> {
    let log_dir = log_dir.as_ref();
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level: {}", level))?;

    // Rolling file appender: writes NDJSON to `<log_dir>/personaplus.log.YYYY-MM-DD`
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "personaplus.log");

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_ansi(false);

    // Console goes to stderr; stdout carries bot replies in the console host.
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}
