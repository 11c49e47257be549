//! MIME type detection for imported files.
//!
//! Used to decide which attachments can become avatars or persona content.

use std::path::Path;

/// Extensions accepted for avatar files.
pub const AVATAR_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Extensions accepted for persona content files.
pub const PROMPT_EXTENSIONS: &[&str] = &["txt", "md", "json"];

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Detect MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    match extension(path).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png"          => "image/png",
        "gif"          => "image/gif",
        "webp"         => "image/webp",
        "bmp"          => "image/bmp",
        "txt"          => "text/plain",
        "md"           => "text/markdown",
        "json"         => "application/json",
        _              => "application/octet-stream",
    }
}

/// Whether a MIME type is for an image.
pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}

pub fn is_avatar_format(path: &Path) -> bool {
    AVATAR_EXTENSIONS.contains(&extension(path).as_str())
}

pub fn is_prompt_document(path: &Path) -> bool {
    PROMPT_EXTENSIONS.contains(&extension(path).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_jpeg() {
        assert_eq!(detect_mime_type(&PathBuf::from("photo.JPG")), "image/jpeg");
        assert!(is_image(detect_mime_type(&PathBuf::from("a.webp"))));
    }

    #[test]
    fn bmp_is_an_image_but_not_an_avatar_format() {
        let path = PathBuf::from("a.bmp");
        assert!(is_image(detect_mime_type(&path)));
        assert!(!is_avatar_format(&path));
    }

    #[test]
    fn prompt_documents() {
        assert!(is_prompt_document(&PathBuf::from("persona.md")));
        assert!(!is_prompt_document(&PathBuf::from("persona.pdf")));
    }

    #[test]
    fn unknown_extension_fallback() {
        assert_eq!(detect_mime_type(&PathBuf::from("file.xyz")), "application/octet-stream");
    }
}
