/// Command types for the persona command group.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    /// Read-only or switching commands, open to everyone.
    General,
    /// Commands that change persona records; may require admin.
    Management,
}

// ---------------------------------------------------------------------------
// Arg
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandArg {
    pub name: String,
    pub description: String,
    pub required: bool,
}

// ---------------------------------------------------------------------------
// Command definition
// ---------------------------------------------------------------------------

/// A sub-command of the `/persona_plus` group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDef {
    /// Unique key (e.g. "view", "create").
    pub key: String,
    pub description: String,
    pub category: CommandCategory,
    /// Words that select this sub-command after the group alias. Empty for
    /// the quick-switch fallback, which is selected by any unknown word.
    pub names: Vec<String>,
    pub args: Vec<CommandArg>,
}

impl CommandDef {
    /// Usage line under the given group alias, e.g. `/pp view <persona_id>`.
    pub fn usage(&self, group_alias: &str) -> String {
        let mut parts = vec![group_alias.to_string()];
        if let Some(name) = self.names.first() {
            parts.push(name.clone());
        }
        for arg in &self.args {
            if arg.required {
                parts.push(format!("<{}>", arg.name));
            } else {
                parts.push(format!("[{}]", arg.name));
            }
        }
        parts.join(" ")
    }

    pub fn is_management(&self) -> bool {
        self.category == CommandCategory::Management
    }

    pub fn required_args(&self) -> usize {
        self.args.iter().filter(|a| a.required).count()
    }
}

// ---------------------------------------------------------------------------
// Parsed invocation
// ---------------------------------------------------------------------------

/// A detected and parsed command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub key: String,
    /// The group alias the user typed (e.g. "/pp").
    pub raw_alias: String,
    /// Positional arguments parsed from remaining text.
    pub args: Vec<String>,
    /// Full remaining text after the sub-command name.
    pub raw_args: String,
}

impl CommandInvocation {
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(|s| s.as_str())
    }
}
