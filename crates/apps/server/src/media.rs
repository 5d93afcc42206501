//! `/media/:name`: base-name lookup in the media directory.

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::extract::{Path as AxumPath, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use streaming::{is_valid_media_name, MediaFormat};
use tracing::{debug, warn};

use crate::AppState;

#[derive(Debug)]
pub enum MediaError {
    NotFound(String),
    InvalidName(String),
    Io(std::io::Error),
}

impl std::fmt::Display for MediaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaError::NotFound(name) => write!(f, "no media named {name}"),
            MediaError::InvalidName(name) => write!(f, "invalid media name: {name:?}"),
            MediaError::Io(e) => write!(f, "media I/O error: {e}"),
        }
    }
}

impl std::error::Error for MediaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MediaError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MediaError {
    fn from(e: std::io::Error) -> Self {
        MediaError::Io(e)
    }
}

impl MediaError {
    pub fn status(&self) -> StatusCode {
        match self {
            MediaError::NotFound(_) => StatusCode::NOT_FOUND,
            MediaError::InvalidName(_) => StatusCode::BAD_REQUEST,
            MediaError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The file in `root` whose stem is `name`.
///
/// When several files share the stem (`a.jpg`, `a.png`) the first in
/// file-name order wins, so the answer does not depend on directory order.
pub async fn find_media(root: &Path, name: &str) -> Result<PathBuf, MediaError> {
    if !is_valid_media_name(name) {
        return Err(MediaError::InvalidName(name.to_string()));
    }

    let mut entries = tokio::fs::read_dir(root).await?;
    let mut matches = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.file_stem().and_then(|s| s.to_str()) != Some(name) {
            continue;
        }
        if entry.file_type().await?.is_file() {
            matches.push(path);
        }
    }
    matches.sort();
    matches
        .into_iter()
        .next()
        .ok_or_else(|| MediaError::NotFound(name.to_string()))
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    MediaFormat::from_extension(ext).content_type()
}

pub async fn get_media(State(state): State<AppState>, AxumPath(name): AxumPath<String>) -> Response {
    let path = match find_media(&state.media_root, &name).await {
        Ok(path) => path,
        Err(err) => {
            match &err {
                MediaError::Io(_) => warn!("media lookup failed: {err}"),
                _ => debug!("media lookup: {err}"),
            }
            return (err.status(), err.to_string()).into_response();
        }
    };

    match tokio::fs::read(&path).await {
        Ok(data) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static(content_type_for(&path)),
            );
            (StatusCode::OK, headers, Body::from(data)).into_response()
        }
        Err(err) => {
            warn!("media read failed: {path:?} -> {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "media read failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn finds_file_by_stem() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("IMG_001.png"), b"png").expect("write");
        std::fs::write(dir.path().join("IMG_0011.jpg"), b"jpg").expect("write");

        let path = find_media(dir.path(), "IMG_001").await.expect("found");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("IMG_001.png"));
        assert_eq!(content_type_for(&path), "image/png");
    }

    #[tokio::test]
    async fn first_match_in_name_order_wins() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("a.png"), b"png").expect("write");
        std::fs::write(dir.path().join("a.jpg"), b"jpg").expect("write");
        let path = find_media(dir.path(), "a").await.expect("found");
        assert_eq!(content_type_for(&path), "image/jpeg");
    }

    #[tokio::test]
    async fn missing_and_invalid_names() {
        let dir = TempDir::new().expect("tempdir");
        let err = find_media(dir.path(), "nope").await.expect_err("missing");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let err = find_media(dir.path(), "../etc").await.expect_err("invalid");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err = find_media(dir.path(), "..").await.expect_err("invalid");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stems_with_double_dots_are_served() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("IMG..v2.jpg"), b"jpg").expect("write");
        let path = find_media(dir.path(), "IMG..v2").await.expect("found");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("IMG..v2.jpg"));
    }

    #[tokio::test]
    async fn directories_are_not_media() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir(dir.path().join("IMG_002.d")).expect("mkdir");
        assert!(matches!(
            find_media(dir.path(), "IMG_002").await,
            Err(MediaError::NotFound(_))
        ));
    }
}
