//! Photo proof checks
//!
//! Uploading and resizing happen outside this server; players hand in the
//! URL of an already-stored photo. These checks gate what we accept.

use crate::error::{GameError, GameResult};

pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Check upload metadata before a photo is stored
pub fn validate_photo(content_type: &str, size: u64) -> GameResult<()> {
    if size == 0 {
        return Err(GameError::InvalidInput("No file provided".to_string()));
    }
    if size > MAX_FILE_SIZE {
        return Err(GameError::InvalidInput(
            "File size must be less than 10MB".to_string(),
        ));
    }

    let content_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if !ALLOWED_TYPES.contains(&content_type.as_str()) {
        return Err(GameError::InvalidInput(
            "Only JPEG, PNG, and WebP images are allowed".to_string(),
        ));
    }

    Ok(())
}

/// Photo proof URLs must be absolute http(s) URLs
pub fn validate_photo_url(url: &str) -> GameResult<()> {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| GameError::InvalidInput("Photo URL must be http(s)".to_string()))?;

    if rest.is_empty() || rest.starts_with('/') || url.contains(char::is_whitespace) {
        return Err(GameError::InvalidInput("Malformed photo URL".to_string()));
    }
    Ok(())
}

/// URL to show a photo at reduced size.
///
/// There is no image transform backend, so this is the original URL.
pub fn thumbnail_url(url: &str, _width: u32, _height: u32) -> String {
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_photo() {
        assert!(validate_photo("image/jpeg", 1024).is_ok());
        assert!(validate_photo("image/PNG", 1024).is_ok());
        assert!(validate_photo("image/webp; charset=binary", 1024).is_ok());

        let err = validate_photo("image/gif", 1024).unwrap_err();
        assert!(err.to_string().contains("Only JPEG, PNG, and WebP"));

        let err = validate_photo("image/jpeg", MAX_FILE_SIZE + 1).unwrap_err();
        assert!(err.to_string().contains("less than 10MB"));

        assert!(validate_photo("image/jpeg", 0).is_err());
        assert!(validate_photo("image/jpeg", MAX_FILE_SIZE).is_ok());
    }

    #[test]
    fn test_validate_photo_url() {
        assert!(validate_photo_url("https://cdn.example.com/p/1.jpg").is_ok());
        assert!(validate_photo_url("http://localhost:9000/a.png").is_ok());
        assert!(validate_photo_url("ftp://example.com/a.png").is_err());
        assert!(validate_photo_url("https://").is_err());
        assert!(validate_photo_url("https:///path").is_err());
        assert!(validate_photo_url("https://a b.com/x.jpg").is_err());
    }

    #[test]
    fn test_thumbnail_url_passthrough() {
        let url = "https://cdn.example.com/p/1.jpg";
        assert_eq!(thumbnail_url(url, 300, 200), url);
    }
}
