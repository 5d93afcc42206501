//! Media naming shared by the viewer and the backend.
//!
//! Features reference imagery by file name (`IMG_001.jpg`); the backend
//! serves it by base name (`/media/IMG_001`) and picks the content type from
//! whatever extension the stored file has.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
    Svg,
    Other,
}

impl MediaFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            "webp" => Self::Webp,
            "bmp" => Self::Bmp,
            "svg" => Self::Svg,
            _ => Self::Other,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Svg => "image/svg+xml",
            Self::Other => "application/octet-stream",
        }
    }
}

/// `IMG_001.jpg` -> `IMG_001`. Names without an extension are returned as-is.
pub fn media_base_name(file_name: &str) -> &str {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// A media name is a bare base name: no separators, and not `.` or `..`.
pub fn is_valid_media_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && !is_dot_segment(name)
}

fn is_dot_segment(segment: &str) -> bool {
    segment == "." || segment == ".."
}

/// Resolves a feature's `image_url` against the backend.
///
/// Absolute `http(s)` URLs pass through untouched; anything else is treated
/// as a stored file name and mapped to `{backend}/media/{base name}`.
pub fn resolve_media_url(backend_url: &str, image_url: &str) -> Option<String> {
    let trimmed = image_url.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Some(trimmed.to_string());
    }
    let base = media_base_name(trimmed);
    if trimmed.split(['/', '\\']).any(|s| s == "..") || !is_valid_media_name(base) {
        return None;
    }
    Some(format!(
        "{}/media/{}",
        backend_url.trim_end_matches('/'),
        urlencoding::encode(base)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(MediaFormat::from_extension("PNG").content_type(), "image/png");
        assert_eq!(MediaFormat::from_extension("jpeg"), MediaFormat::Jpeg);
        assert_eq!(
            MediaFormat::from_extension("tiff").content_type(),
            "application/octet-stream"
        );
    }

    #[test]
    fn bare_file_names_map_to_media_route() {
        assert_eq!(
            resolve_media_url("http://localhost:3000/", "IMG_001.jpg").as_deref(),
            Some("http://localhost:3000/media/IMG_001")
        );
        assert_eq!(
            resolve_media_url("http://localhost:3000", "IMG 002.png").as_deref(),
            Some("http://localhost:3000/media/IMG%20002")
        );
    }

    #[test]
    fn absolute_urls_pass_through() {
        let url = "https://cdn.example.org/pano/a.jpg";
        assert_eq!(resolve_media_url("http://x", url).as_deref(), Some(url));
    }

    #[test]
    fn blank_and_hostile_names_resolve_to_nothing() {
        assert!(resolve_media_url("http://x", "   ").is_none());
        assert!(resolve_media_url("http://x", "..").is_none());
        assert!(resolve_media_url("http://x", "../private/IMG_001.jpg").is_none());
        assert!(!is_valid_media_name("a/b"));
        assert!(!is_valid_media_name(".."));
        assert!(!is_valid_media_name("."));
        assert!(is_valid_media_name("IMG_001"));
    }

    #[test]
    fn double_dots_inside_a_name_are_allowed() {
        assert!(is_valid_media_name("IMG..v2"));
        assert_eq!(
            resolve_media_url("http://x", "IMG..v2.jpg").as_deref(),
            Some("http://x/media/IMG..v2")
        );
    }

    #[test]
    fn base_name_strips_directories_and_extension() {
        assert_eq!(media_base_name("uploads/IMG_001.jpg"), "IMG_001");
        assert_eq!(media_base_name("IMG_001"), "IMG_001");
        assert_eq!(media_base_name(".hidden"), ".hidden");
    }
}
