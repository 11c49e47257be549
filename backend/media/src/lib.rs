//! Media handling for persona management: avatar images and prompt files.

use bytes::Bytes;

pub mod avatar_ingest;
pub mod mime_detect;
pub mod payload;

pub use avatar_ingest::{find_image_attachment, AvatarIngestor, HttpImageFetcher, ImageFetcher};
pub use mime_detect::{detect_mime_type, is_avatar_format, is_image, is_prompt_document};
pub use payload::{extract_payload_text, parse_persona_payload, PersonaPayload};

/// Raw media fetched or read for processing.
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub source: String,
    pub mime_type: String,
    pub data: Bytes,
}
