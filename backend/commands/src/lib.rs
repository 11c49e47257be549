pub mod detection;
pub mod dispatch;
pub mod registry;
pub mod types;

pub use detection::{detect_command, is_valid_persona_id};
pub use dispatch::{CommandContext, CommandDispatcher, CommandHandler, CommandResponse};
pub use registry::{builtin_commands, CommandRegistry, GROUP_ALIASES, PRIMARY_ALIAS, SWITCH_KEY};
pub use types::{CommandArg, CommandCategory, CommandDef, CommandInvocation};
