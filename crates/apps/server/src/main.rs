use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod media;
mod places;

#[derive(Clone, Debug)]
pub struct AppState {
    pub media_root: Arc<PathBuf>,
    pub places_path: Arc<PathBuf>,
}

#[derive(Debug)]
struct ServerConfig {
    addr: SocketAddr,
    media_root: PathBuf,
    places_path: PathBuf,
}

impl ServerConfig {
    fn from_env() -> Result<Self, String> {
        let raw_addr = env::var("CAMPUS_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
        let addr = raw_addr
            .parse()
            .map_err(|e| format!("invalid CAMPUS_ADDR {raw_addr:?}: {e}"))?;
        let media_root = env::var("CAMPUS_MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("media"));
        let places_path = env::var("CAMPUS_PLACES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| media_root.join("places.geojson"));
        Ok(Self {
            addr,
            media_root,
            places_path,
        })
    }
}

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/places", get(places::get_places))
        .route("/media/:name", get(media::get_media))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        error!("{err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config = ServerConfig::from_env()?;
    if tokio::fs::metadata(&config.media_root).await.is_err() {
        warn!("media root {:?} does not exist", config.media_root);
    }

    let state = AppState {
        media_root: Arc::new(config.media_root),
        places_path: Arc::new(config.places_path),
    };

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|e| format!("bind {}: {e}", config.addr))?;
    info!("campus backend listening on http://{}", config.addr);
    axum::serve(listener, app(state))
        .await
        .map_err(|e| format!("server error: {e}"))
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}
