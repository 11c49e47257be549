//! Turning an image in a chat message into a cached avatar file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use personaplus_core::{Attachment, InboundMessage, PersonaError};
use personaplus_store::AvatarCache;
use tracing::{debug, info};

use crate::MediaPayload;
use crate::mime_detect::{detect_mime_type, is_avatar_format};

/// First image-like component of a message, searching quoted messages too.
pub fn find_image_attachment(attachments: &[Attachment]) -> Option<&Attachment> {
    for attachment in attachments {
        match attachment {
            Attachment::Image { .. } | Attachment::File { .. } => return Some(attachment),
            Attachment::Reply { chain } => {
                if let Some(found) = find_image_attachment(chain) {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// Downloads remote images.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<MediaPayload>;
}

/// [`ImageFetcher`] backed by reqwest.
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<MediaPayload> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            anyhow::bail!("download failed with HTTP {}", status.as_u16());
        }
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = response.bytes().await?;
        Ok(MediaPayload { source: url.to_string(), mime_type, data })
    }
}

/// Saves avatars from messages into the [`AvatarCache`].
pub struct AvatarIngestor {
    fetcher: Arc<dyn ImageFetcher>,
    cache: AvatarCache,
}

impl AvatarIngestor {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, cache: AvatarCache) -> Self {
        Self { fetcher, cache }
    }

    pub fn cache(&self) -> &AvatarCache {
        &self.cache
    }

    /// Store the image carried by `message` as the avatar of `persona_id`.
    pub async fn save_from_message(
        &self,
        message: &InboundMessage,
        persona_id: &str,
    ) -> Result<PathBuf, PersonaError> {
        let attachment = find_image_attachment(&message.attachments).ok_or_else(|| {
            PersonaError::invalid("No image found; send or quote an image.")
        })?;

        let payload = match attachment {
            Attachment::Image { url: Some(url), .. } => {
                debug!(url = %url, "Downloading avatar");
                self.fetcher
                    .fetch(url)
                    .await
                    .map_err(|e| PersonaError::invalid(format!("Could not download image: {}", e)))?
            }
            Attachment::Image { url: None, path: Some(path) } => self.load_local(path, None).await?,
            Attachment::File { name, path } => self.load_local(path, Some(name.as_str())).await?,
            _ => return Err(PersonaError::invalid("Unsupported message; send an image.")),
        };

        if payload.data.is_empty() {
            return Err(PersonaError::invalid("The image is empty."));
        }

        let saved = self
            .cache
            .write(persona_id, &payload.data)
            .await
            .map_err(|e| PersonaError::Storage(e.to_string()))?;
        info!(
            persona_id = %persona_id,
            source = %payload.source,
            mime = %payload.mime_type,
            "[Avatar] Saved {} bytes",
            payload.data.len()
        );
        Ok(saved)
    }

    async fn load_local(&self, path: &Path, name: Option<&str>) -> Result<MediaPayload, PersonaError> {
        let named_ok = name.map(|n| is_avatar_format(Path::new(n))).unwrap_or(false);
        let has_ext = path.extension().is_some() || name.is_some();
        if has_ext && !named_ok && !is_avatar_format(path) {
            return Err(PersonaError::invalid(
                "Unsupported image format; use jpg / jpeg / png / gif / webp.",
            ));
        }
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| PersonaError::invalid(format!("Could not read image: {}", e)))?;
        Ok(MediaPayload {
            source: path.display().to_string(),
            mime_type: detect_mime_type(path).to_string(),
            data: Bytes::from(data),
        })
    }
}
