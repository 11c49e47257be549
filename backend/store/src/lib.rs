//! Persona persistence: store implementations and the avatar cache.

pub mod avatar;
pub mod memory;
pub mod yaml_store;

pub use avatar::AvatarCache;
pub use memory::InMemoryPersonaStore;
pub use yaml_store::{YamlPersonaStore, PERSONAS_FILE_NAME};
