//! Telemetry and structured logging for Persona Plus.
//!
//! Console output, daily-rolled NDJSON files, and persona lifecycle events.

pub mod event_logger;
pub mod logger;

pub use event_logger::{PersonaEvent, PersonaEventEntry, PersonaEventLogger, EVENT_TARGET};
pub use logger::init_logger;
