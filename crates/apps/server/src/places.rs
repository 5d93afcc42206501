//! `/places`: the points-of-interest feed.

use std::path::Path;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::error;

use crate::AppState;

/// Reads and sanity-checks the places file.
pub async fn load_places(path: &Path) -> Result<Vec<u8>, String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("read {path:?}: {e}"))?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|e| format!("parse {path:?}: {e}"))?;
    match value.get("type").and_then(|t| t.as_str()) {
        Some("FeatureCollection") if value.get("features").is_some_and(Value::is_array) => {
            Ok(bytes)
        }
        _ => Err(format!("{path:?} is not a GeoJSON FeatureCollection")),
    }
}

pub async fn get_places(State(state): State<AppState>) -> Response {
    match load_places(&state.places_path).await {
        Ok(body) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            (StatusCode::OK, headers, Body::from(body)).into_response()
        }
        Err(err) => {
            error!("places feed unavailable: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "places unavailable").into_response()
        }
    }
}
