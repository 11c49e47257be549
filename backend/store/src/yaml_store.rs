//! File-backed persona store: one YAML document holding every persona.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use personaplus_core::{Persona, PersonaError, PersonaStore};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Default file name within the data directory.
pub const PERSONAS_FILE_NAME: &str = "personas.yaml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersonaFile {
    #[serde(default)]
    personas: Vec<Persona>,
}

/// Persona store persisted as YAML, rewritten atomically on every change.
///
/// The file is loaded once; this process is assumed to be its only writer.
pub struct YamlPersonaStore {
    path: PathBuf,
    personas: Mutex<BTreeMap<String, Persona>>,
}

impl YamlPersonaStore {
    /// Open the store at `path`, starting empty when the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let personas = load_personas(&path).await?;
        info!(path = %path.display(), count = personas.len(), "Opened persona store");
        Ok(Self { path, personas: Mutex::new(personas) })
    }

    /// Open `<data_dir>/personas.yaml`.
    pub async fn open_in(data_dir: &Path) -> Result<Self> {
        Self::open(data_dir.join(PERSONAS_FILE_NAME)).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, personas: &BTreeMap<String, Persona>) -> Result<(), PersonaError> {
        write_personas(&self.path, personas)
            .await
            .map_err(|e| PersonaError::Storage(format!("{e:#}")))
    }
}

async fn load_personas(path: &Path) -> Result<BTreeMap<String, Persona>> {
    if !path.exists() {
        debug!(path = %path.display(), "Persona file does not exist; starting empty");
        return Ok(BTreeMap::new());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read persona file: {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let file: PersonaFile = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse persona YAML at: {}", path.display()))?;
    Ok(file.personas.into_iter().map(|p| (p.id.clone(), p)).collect())
}

/// Write to a temp file, then rename for atomicity.
async fn write_personas(path: &Path, personas: &BTreeMap<String, Persona>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
    }

    let file = PersonaFile { personas: personas.values().cloned().collect() };
    let yaml = serde_yaml::to_string(&file).context("Failed to serialize personas to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp persona file: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp persona file to: {}", path.display()))?;

    debug!(path = %path.display(), count = personas.len(), "Wrote persona file");
    Ok(())
}

#[async_trait]
impl PersonaStore for YamlPersonaStore {
    async fn get(&self, id: &str) -> Result<Option<Persona>, PersonaError> {
        Ok(self.personas.lock().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Persona>, PersonaError> {
        Ok(self.personas.lock().await.values().cloned().collect())
    }

    async fn upsert(&self, persona: Persona) -> Result<(), PersonaError> {
        let mut personas = self.personas.lock().await;
        let previous = personas.insert(persona.id.clone(), persona.clone());
        if let Err(e) = self.persist(&personas).await {
            // Keep memory and disk in agreement.
            match previous {
                Some(old) => personas.insert(old.id.clone(), old),
                None => personas.remove(&persona.id),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, PersonaError> {
        let mut personas = self.personas.lock().await;
        let Some(removed) = personas.remove(id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&personas).await {
            personas.insert(removed.id.clone(), removed);
            return Err(e);
        }
        Ok(true)
    }
}
