//! GeoSource: one layer's view of a remote geodata service.
//!
//! A source owns the current data snapshot of its layer and the load
//! lifecycle around it. The network round-trip itself happens elsewhere:
//! `begin_load` hands out a [`LoadRequest`], whoever performs the fetch
//! returns the raw response through [`GeoSource::complete`].
//!
//! Ordering contract:
//! - Every `begin_load`/`refresh` issues a new generation. Only the response
//!   for the latest generation may change the snapshot; anything older is
//!   reported as [`ApplyOutcome::Stale`] and dropped without side effects.
//! - A failed load keeps the previous snapshot in place.
//! - The snapshot is replaced wholesale (`Arc` swap); readers never see a
//!   partially decoded set.

use std::sync::Arc;

use foundation::bounds::Aabb2;
use runtime::event_bus::EventBus;
use scene::geojson::decode_feature_collection;
use scene::{FeatureSnapshot, LayerId};
use tracing::{debug, info, warn};

use crate::query::SourceQuery;
use crate::request::{ApplyOutcome, LoadTicket};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLoadError {
    Network(String),
    Status(u16),
    Decode(String),
    Timeout,
}

impl std::fmt::Display for SourceLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLoadError::Network(e) => write!(f, "network error: {e}"),
            SourceLoadError::Status(code) => write!(f, "unexpected HTTP status {code}"),
            SourceLoadError::Decode(e) => write!(f, "failed to decode payload: {e}"),
            SourceLoadError::Timeout => write!(f, "request timed out"),
        }
    }
}

impl std::error::Error for SourceLoadError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Error(SourceLoadError),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// A rendered WMS overlay, kept encoded until a renderer wants it.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub bytes: Vec<u8>,
    pub extent: Aabb2,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SourceData {
    #[default]
    Empty,
    Features(Arc<FeatureSnapshot>),
    Raster(Arc<RasterImage>),
}

impl SourceData {
    pub fn features(&self) -> Option<&Arc<FeatureSnapshot>> {
        match self {
            SourceData::Features(s) => Some(s),
            _ => None,
        }
    }

    pub fn raster(&self) -> Option<&Arc<RasterImage>> {
        match self {
            SourceData::Raster(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    LoadStart { generation: u64 },
    LoadEnd { generation: u64, features: usize },
    LoadError { generation: u64, error: SourceLoadError },
}

/// A fetch the owner should perform on behalf of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub layer: LayerId,
    pub ticket: LoadTicket,
    pub url: String,
}

#[derive(Debug)]
pub struct GeoSource {
    name: String,
    layer: LayerId,
    state: LoadState,
    generation: u64,
    query: Option<SourceQuery>,
    data: SourceData,
    fallback_keys: u64,
    events: EventBus<SourceEvent>,
}

impl GeoSource {
    pub fn new(name: impl Into<String>, layer: LayerId) -> Self {
        Self {
            name: name.into(),
            layer,
            state: LoadState::Idle,
            generation: 0,
            query: None,
            data: SourceData::Empty,
            fallback_keys: 0,
            events: EventBus::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn data(&self) -> &SourceData {
        &self.data
    }

    pub fn features(&self) -> Option<&Arc<FeatureSnapshot>> {
        self.data.features()
    }

    pub fn query(&self) -> Option<&SourceQuery> {
        self.query.as_ref()
    }

    /// Latest issued generation (0 before the first load).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn begin_load(&mut self, query: SourceQuery) -> LoadRequest {
        self.generation += 1;
        let ticket = LoadTicket::new(self.generation);
        let url = query.url();
        self.query = Some(query);
        self.state = LoadState::Loading;
        self.events.emit(SourceEvent::LoadStart {
            generation: ticket.generation,
        });
        debug!(source = %self.name, generation = ticket.generation, %url, "load started");
        LoadRequest {
            layer: self.layer,
            ticket,
            url,
        }
    }

    /// Re-issues the last query. `None` if nothing was ever loaded.
    pub fn refresh(&mut self) -> Option<LoadRequest> {
        let query = self.query.clone()?;
        Some(self.begin_load(query))
    }

    /// Applies the response for `ticket`.
    pub fn complete(
        &mut self,
        ticket: LoadTicket,
        response: Result<Vec<u8>, SourceLoadError>,
    ) -> ApplyOutcome {
        if ticket.generation != self.generation || !self.state.is_loading() {
            debug!(
                source = %self.name,
                generation = ticket.generation,
                latest = self.generation,
                "discarding stale load result"
            );
            return ApplyOutcome::Stale;
        }

        match response.and_then(|bytes| self.decode(bytes)) {
            Ok(data) => {
                let features = match &data {
                    SourceData::Features(s) => s.len(),
                    _ => 0,
                };
                self.data = data;
                self.state = LoadState::Loaded;
                self.events.emit(SourceEvent::LoadEnd {
                    generation: ticket.generation,
                    features,
                });
                info!(source = %self.name, generation = ticket.generation, features, "load finished");
                ApplyOutcome::Applied
            }
            Err(error) => {
                warn!(source = %self.name, generation = ticket.generation, %error, "load failed");
                self.state = LoadState::Error(error.clone());
                self.events.emit(SourceEvent::LoadError {
                    generation: ticket.generation,
                    error,
                });
                ApplyOutcome::Failed
            }
        }
    }

    /// Gives up on any in-flight load without touching the snapshot.
    ///
    /// The pending generation is retired, so its response will be `Stale`.
    pub fn abandon(&mut self) {
        if !self.state.is_loading() {
            return;
        }
        self.generation += 1;
        self.state = match self.data {
            SourceData::Empty => LoadState::Idle,
            _ => LoadState::Loaded,
        };
        debug!(source = %self.name, "in-flight load abandoned");
    }

    pub fn drain_events(&mut self) -> Vec<SourceEvent> {
        self.events.drain()
    }

    fn decode(&mut self, bytes: Vec<u8>) -> Result<SourceData, SourceLoadError> {
        match &self.query {
            Some(SourceQuery::Wms(q)) => {
                if bytes.is_empty() {
                    return Err(SourceLoadError::Decode("empty image response".into()));
                }
                Ok(SourceData::Raster(Arc::new(RasterImage {
                    bytes,
                    extent: q.extent,
                    width: q.width,
                    height: q.height,
                })))
            }
            _ => {
                let decoded = decode_feature_collection(&bytes, self.layer, &mut self.fallback_keys)
                    .map_err(|e| SourceLoadError::Decode(e.to_string()))?;
                if decoded.skipped > 0 {
                    debug!(source = %self.name, skipped = decoded.skipped, "features without geometry skipped");
                }
                Ok(SourceData::Features(Arc::new(decoded.snapshot)))
            }
        }
    }
}
