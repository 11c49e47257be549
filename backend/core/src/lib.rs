pub mod channel;
pub mod error;
pub mod message;
pub mod traits;
pub mod types;

pub use channel::SyncBus;
pub use error::PersonaError;
pub use message::{Attachment, InboundMessage, SyncOutcome, SyncReport, SyncRequest, SyncTrigger};
pub use traits::{ConversationHost, PersonaStore, ProfileAdapter};
pub use types::{AutoSwitchScope, Persona};
