//! `personas`: list the persona store.

use anyhow::Result;
use personaplus_config::{PersonaPlusConfig, Settings};
use personaplus_core::PersonaStore;
use personaplus_store::{AvatarCache, YamlPersonaStore};

use crate::terminal_output::{note_info, render_table};

pub async fn run(config: &PersonaPlusConfig) -> Result<()> {
    let settings = Settings::from_config(config);
    let store = YamlPersonaStore::open_in(&settings.data_dir).await?;
    let avatars = AvatarCache::in_data_dir(&settings.data_dir);

    let personas = store.list().await?;
    if personas.is_empty() {
        note_info(&format!("No personas in {}", store.path().display()));
        return Ok(());
    }

    let rows: Vec<Vec<String>> = personas
        .iter()
        .map(|p| {
            vec![
                p.id.clone(),
                p.begin_dialogs.len().to_string(),
                p.tool_summary(),
                if avatars.exists(&p.id) { "yes" } else { "-" }.to_string(),
                p.system_prompt.lines().next().unwrap_or("").chars().take(40).collect(),
            ]
        })
        .collect();
    print!("{}", render_table(&["ID", "Dialogs", "Tools", "Avatar", "Prompt"], &rows));
    Ok(())
}
