pub mod active_state;
pub mod scope_key;

pub use active_state::ActivePersonaState;
pub use scope_key::ScopeKey;
