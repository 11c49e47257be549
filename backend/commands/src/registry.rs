/// Command registry: the `/persona_plus` group and its sub-commands.
use crate::types::{CommandArg, CommandCategory, CommandDef};

/// Aliases that open the command group; matched case-insensitively.
pub const GROUP_ALIASES: &[&str] = &["/persona_plus", "/pp", "/persona+"];

/// Alias shown in help and usage text.
pub const PRIMARY_ALIAS: &str = "/persona_plus";

/// Key of the fallback that treats an unknown word as a persona id.
pub const SWITCH_KEY: &str = "switch";

fn persona_arg() -> CommandArg {
    CommandArg {
        name: "persona_id".to_string(),
        description: "Persona id".to_string(),
        required: true,
    }
}

fn def(key: &str, description: &str, category: CommandCategory, args: Vec<CommandArg>) -> CommandDef {
    CommandDef {
        key: key.to_string(),
        description: description.to_string(),
        category,
        names: vec![key.to_string()],
        args,
    }
}

/// Build the full built-in command registry.
pub fn builtin_commands() -> Vec<CommandDef> {
    use CommandCategory::{General, Management};

    vec![
        def("help", "Show commands and configuration notes.", General, vec![]),
        def("list", "List all personas.", General, vec![]),
        def("view", "Show a persona's prompt, dialogs and tools.", General, vec![persona_arg()]),
        def(
            "create",
            "Create a persona; send the content or a txt/md/json file next.",
            Management,
            vec![persona_arg()],
        ),
        def(
            "update",
            "Update a persona; send the new content or a txt/md/json file next.",
            Management,
            vec![persona_arg()],
        ),
        def(
            "avatar",
            "Set a persona's avatar; send or quote an image next.",
            Management,
            vec![persona_arg()],
        ),
        def("delete", "Delete a persona and its avatar.", Management, vec![persona_arg()]),
        def("cancel", "Cancel a pending create/update/avatar.", General, vec![]),
        CommandDef {
            key: SWITCH_KEY.to_string(),
            description: "Switch to a persona.".to_string(),
            category: General,
            names: vec![],
            args: vec![persona_arg()],
        },
    ]
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct CommandRegistry {
    commands: Vec<CommandDef>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self { commands: builtin_commands() }
    }

    pub fn all(&self) -> &[CommandDef] {
        &self.commands
    }

    pub fn is_group_alias(&self, alias: &str) -> bool {
        GROUP_ALIASES.iter().any(|a| a.eq_ignore_ascii_case(alias))
    }

    /// Find a sub-command by the word typed after the group alias.
    pub fn find_by_name(&self, name: &str) -> Option<&CommandDef> {
        let lower = name.to_lowercase();
        self.commands.iter().find(|c| c.names.iter().any(|n| *n == lower))
    }

    /// Find a command by its key.
    pub fn find_by_key(&self, key: &str) -> Option<&CommandDef> {
        self.commands.iter().find(|c| c.key == key)
    }

    /// Help text listing every sub-command under the primary alias.
    pub fn help_text(&self) -> String {
        let mut lines = vec![format!(
            "Persona Plus commands (aliases {} also work):",
            GROUP_ALIASES[1..].join(" ")
        )];
        for cmd in &self.commands {
            let mut line = format!("- {}: {}", cmd.usage(PRIMARY_ALIAS), cmd.description);
            if cmd.is_management() {
                line.push_str(" (management)");
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_aliases_are_case_insensitive() {
        let reg = CommandRegistry::new();
        assert!(reg.is_group_alias("/PP"));
        assert!(reg.is_group_alias("/persona+"));
        assert!(!reg.is_group_alias("/persona"));
    }

    #[test]
    fn switch_fallback_has_no_names() {
        let reg = CommandRegistry::new();
        assert!(reg.find_by_name("switch").is_none());
        assert!(reg.find_by_key(SWITCH_KEY).is_some());
    }

    #[test]
    fn management_commands_are_flagged() {
        let reg = CommandRegistry::new();
        for key in ["create", "update", "avatar", "delete"] {
            assert!(reg.find_by_key(key).unwrap().is_management(), "{key}");
        }
        assert!(!reg.find_by_key("view").unwrap().is_management());
    }

    #[test]
    fn help_mentions_every_command() {
        let help = CommandRegistry::new().help_text();
        assert!(help.contains("/persona_plus view <persona_id>"));
        assert!(help.contains("/persona_plus <persona_id>"));
    }
}
