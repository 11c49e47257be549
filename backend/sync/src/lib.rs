//! Identity sync: mirrors the active persona onto the bot's platform profile.

pub mod adapters;
pub mod profile_sync;
pub mod worker;

pub use adapters::LoggingProfileAdapter;
pub use profile_sync::{format_nickname, ProfileSync, MAX_NICKNAME_CHARS, PERSONA_ID_PLACEHOLDER};
pub use worker::SyncWorker;
