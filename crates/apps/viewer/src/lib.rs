//! Campus map viewer: viewport controller, selection handoff to the
//! panorama viewer, and the session that drives both from network
//! completions.

pub mod config;
pub mod controller;
pub mod fetch;
pub mod handoff;
pub mod session;

pub use config::{ConfigError, ViewerConfig};
pub use controller::{ControllerError, ControllerState, MapEvent, MapViewportController};
pub use fetch::{GeoFetcher, HttpFetcher};
pub use handoff::SelectionHandoff;
pub use session::{Completion, Session};
