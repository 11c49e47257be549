//! Persona Plus engine.
//!
//! Entry point for hosts: build a [`PersonaPlus`] and feed it every inbound
//! message through [`PersonaPlus::handle_message`].

pub mod context;
pub mod engine;
pub mod handlers;
pub mod pending;
pub mod resolver;

pub use context::{PluginContext, SwitchVia};
pub use engine::{HandleOutcome, PersonaPlus, PersonaPlusBuilder};
pub use pending::{PendingAction, PendingCheck, PendingKind, PendingTracker};
pub use resolver::SwitchResolver;
