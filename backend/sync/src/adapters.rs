use anyhow::Result;
use async_trait::async_trait;
use personaplus_core::ProfileAdapter;
use tracing::info;

/// Adapter for hosts without a profile API; records what would be pushed.
#[derive(Debug, Default, Clone)]
pub struct LoggingProfileAdapter;

#[async_trait]
impl ProfileAdapter for LoggingProfileAdapter {
    fn name(&self) -> &str {
        "logging"
    }

    async fn set_nickname(&self, nickname: &str) -> Result<()> {
        info!(nickname = %nickname, "[ProfileSync] Nickname push");
        Ok(())
    }

    async fn upload_avatar(&self, image: &[u8]) -> Result<()> {
        info!(bytes = image.len(), "[ProfileSync] Avatar push");
        Ok(())
    }
}
