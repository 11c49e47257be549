//! Per-persona avatar cache on disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info};

/// Subdirectory of the data dir holding avatars.
pub const AVATAR_DIR_NAME: &str = "avatars";

/// Avatars live at `<data_dir>/avatars/<persona_id>.jpg`.
#[derive(Debug, Clone)]
pub struct AvatarCache {
    dir: PathBuf,
}

impl AvatarCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(AVATAR_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic path for a persona's avatar.
    pub fn path_for(&self, persona_id: &str) -> PathBuf {
        self.dir.join(format!("{}.jpg", sanitize_file_stem(persona_id)))
    }

    pub fn exists(&self, persona_id: &str) -> bool {
        self.path_for(persona_id).is_file()
    }

    /// Path of the cached avatar, if one has been saved.
    pub fn existing_path(&self, persona_id: &str) -> Option<PathBuf> {
        let path = self.path_for(persona_id);
        path.is_file().then_some(path)
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create avatar directory: {}", self.dir.display()))
    }

    pub async fn read(&self, persona_id: &str) -> Result<Vec<u8>> {
        let path = self.path_for(persona_id);
        fs::read(&path)
            .await
            .with_context(|| format!("Failed to read avatar: {}", path.display()))
    }

    pub async fn write(&self, persona_id: &str, data: &[u8]) -> Result<PathBuf> {
        self.ensure_dir().await?;
        let path = self.path_for(persona_id);
        fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write avatar: {}", path.display()))?;
        info!(persona = persona_id, path = %path.display(), bytes = data.len(), "Saved avatar");
        Ok(path)
    }

    /// Remove a persona's avatar. Returns `false` when there was none.
    pub async fn remove(&self, persona_id: &str) -> Result<bool> {
        let path = self.path_for(persona_id);
        if !path.exists() {
            debug!(persona = persona_id, "No avatar to remove");
            return Ok(false);
        }
        fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to remove avatar: {}", path.display()))?;
        info!(persona = persona_id, path = %path.display(), "Removed avatar");
        Ok(true)
    }
}

/// Replace characters that would escape the avatar directory.
fn sanitize_file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match stem.as_str() {
        "" | "." | ".." => format!("_{stem}"),
        _ => stem,
    }
}
