//! The map viewport controller.
//!
//! Lifecycle:
//!
//! ```text
//! Initializing --initialize()--> Ready --dispose()--> Disposed
//! ```
//!
//! Every operation except `initialize` and `dispose` fails with
//! [`ControllerError::NotReady`] before initialisation and with
//! [`ControllerError::Disposed`] afterwards. Events produced by an operation
//! are queued on the controller and collected with `drain_events`.

use std::collections::BTreeSet;
use std::sync::Arc;

use foundation::math::LonLat;
use layers::base::BaseTileLayer;
use layers::labels::LabelPolicy;
use layers::raster::overlay_query;
use layers::symbology::FeatureStyle;
use layers::{
    DrawItem, HitMode, LayerId, LayerSpec, LayerStack, LayerStyleResolver, Pixel, Viewport,
};
use runtime::event_bus::EventBus;
use scene::Feature;
use streaming::{
    ApplyOutcome, LoadRequest, LoadTicket, SourceEvent, SourceLoadError, SourceQuery, WfsQuery,
};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, ViewerConfig};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Initializing,
    Ready,
    Disposed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControllerError {
    NotReady,
    Disposed,
}

impl std::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerError::NotReady => write!(f, "map controller is not initialised"),
            ControllerError::Disposed => write!(f, "map controller has been disposed"),
        }
    }
}

impl std::error::Error for ControllerError {}

#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    FeatureSelected {
        layer: LayerId,
        feature: Arc<Feature>,
        coordinate: LonLat,
    },
    EmptyClick {
        coordinate: LonLat,
    },
    /// The aggregate "any layer loading" flag flipped.
    LoadingChanged {
        loading: bool,
    },
}

/// Layer names used by the controller.
pub mod layer_names {
    pub const BASEMAP: &str = "basemap";
    pub const OVERLAY: &str = "overlay";
    pub const BOUNDARIES: &str = "boundaries";
    pub const BUILDINGS: &str = "buildings";
    pub const ROADS: &str = "roads";
    pub const PLACES: &str = "places";
}

#[derive(Debug)]
pub struct MapViewportController {
    config: ViewerConfig,
    /// Points of interest, buildings, roads.
    labels: [LabelPolicy; 3],
    state: ControllerState,
    stack: LayerStack,
    viewport: Option<Viewport>,
    overlay: Option<LayerId>,
    last_pointer: Option<LonLat>,
    /// Layers whose latest `LoadStart` has no matching end yet.
    pending: BTreeSet<LayerId>,
    loading: bool,
    events: EventBus<MapEvent>,
}

impl MapViewportController {
    pub fn new(config: ViewerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let labels = config.label_policies()?;
        Ok(Self {
            config,
            labels,
            state: ControllerState::Initializing,
            stack: LayerStack::new(),
            viewport: None,
            overlay: None,
            last_pointer: None,
            pending: BTreeSet::new(),
            loading: false,
            events: EventBus::new(),
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    /// Last coordinate reported by `on_pointer_move` or an empty click.
    pub fn last_pointer(&self) -> Option<LonLat> {
        self.last_pointer
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Builds the layer stack and returns the initial loads to perform.
    ///
    /// Calling it again on a ready controller does nothing.
    pub fn initialize(
        &mut self,
        container_size: [u32; 2],
        center: LonLat,
        zoom: f64,
    ) -> Result<Vec<LoadRequest>, ControllerError> {
        match self.state {
            ControllerState::Disposed => return Err(ControllerError::Disposed),
            ControllerState::Ready => {
                debug!("map controller already initialised");
                return Ok(Vec::new());
            }
            ControllerState::Initializing => {}
        }

        let viewport = Viewport::from_lonlat_zoom(center, zoom, container_size);
        let [poi_labels, building_labels, road_labels] = self.labels.clone();

        self.stack.add_layer(LayerSpec::base_tiles(
            layer_names::BASEMAP,
            BaseTileLayer::new(self.config.tile_template.clone()),
        ));
        if self.config.overlay_layers.is_some() {
            self.overlay = Some(self.stack.add_layer(LayerSpec::raster(layer_names::OVERLAY)));
        }

        let vector = |style: FeatureStyle, labels| -> Arc<LayerStyleResolver> {
            Arc::new(LayerStyleResolver::new(style, labels))
        };
        let boundaries = self.stack.add_layer(
            LayerSpec::vector(
                layer_names::BOUNDARIES,
                vector(FeatureStyle::boundaries(), LabelPolicy::none()),
            )
            .pickable(false),
        );
        let buildings = self.stack.add_layer(LayerSpec::vector(
            layer_names::BUILDINGS,
            vector(FeatureStyle::buildings(), building_labels),
        ));
        let roads = self.stack.add_layer(LayerSpec::vector(
            layer_names::ROADS,
            vector(FeatureStyle::roads(), road_labels),
        ));
        let places = self.stack.add_layer(LayerSpec::vector(
            layer_names::PLACES,
            vector(FeatureStyle::points_of_interest(), poi_labels),
        ));

        let geodata = self.config.geodata_url.clone();
        let mut queries = vec![
            (
                boundaries,
                SourceQuery::Wfs(WfsQuery::new(&geodata, &self.config.boundaries_type)),
            ),
            (
                buildings,
                SourceQuery::Wfs(WfsQuery::new(&geodata, &self.config.buildings_type)),
            ),
            (
                roads,
                SourceQuery::Wfs(WfsQuery::new(&geodata, &self.config.roads_type)),
            ),
            (
                places,
                SourceQuery::GeoJson {
                    url: self.config.places_url(),
                },
            ),
        ];
        if let (Some(id), Some(wms_layers)) = (self.overlay, &self.config.overlay_layers) {
            queries.insert(
                0,
                (id, SourceQuery::Wms(overlay_query(&geodata, wms_layers, &viewport))),
            );
        }

        let requests = queries
            .into_iter()
            .filter_map(|(id, query)| {
                self.stack
                    .layer_mut(id)
                    .map(|layer| layer.source_mut().begin_load(query))
            })
            .collect();

        self.viewport = Some(viewport);
        self.state = ControllerState::Ready;
        info!(
            layers = self.stack.len(),
            zoom,
            center = %center,
            "map controller ready"
        );
        self.sync_loading();
        Ok(requests)
    }

    /// Projects a pointer position to lon/lat and remembers it.
    pub fn on_pointer_move(&mut self, pixel: Pixel) -> Result<LonLat, ControllerError> {
        let coordinate = self.ready_viewport()?.pixel_to_lonlat(pixel);
        self.last_pointer = Some(coordinate);
        Ok(coordinate)
    }

    /// Selects the topmost feature under `pixel`, or reports an empty click.
    pub fn on_click(&mut self, pixel: Pixel) -> Result<(), ControllerError> {
        let viewport = *self.ready_viewport()?;
        let coordinate = viewport.pixel_to_lonlat(pixel);
        let event = match self
            .stack
            .hit_test(pixel, &viewport, HitMode::First)
            .into_iter()
            .next()
        {
            Some(hit) => {
                debug!(layer = hit.layer.0, feature = %hit.feature.key, "feature clicked");
                MapEvent::FeatureSelected {
                    layer: hit.layer,
                    feature: hit.feature,
                    coordinate,
                }
            }
            None => {
                self.last_pointer = Some(coordinate);
                MapEvent::EmptyClick { coordinate }
            }
        };
        self.events.emit(event);
        Ok(())
    }

    pub fn pan_by(&mut self, delta: Pixel) -> Result<Vec<LoadRequest>, ControllerError> {
        self.ready_viewport_mut()?.pan_by(delta);
        Ok(self.reload_overlay())
    }

    pub fn zoom_to(&mut self, zoom: f64) -> Result<Vec<LoadRequest>, ControllerError> {
        self.ready_viewport_mut()?.zoom_to(zoom);
        Ok(self.reload_overlay())
    }

    pub fn resize(&mut self, size_px: [u32; 2]) -> Result<Vec<LoadRequest>, ControllerError> {
        self.ready_viewport_mut()?.resize(size_px);
        Ok(self.reload_overlay())
    }

    /// Routes a finished fetch to the layer that asked for it.
    pub fn apply_load(
        &mut self,
        layer: LayerId,
        ticket: LoadTicket,
        response: Result<Vec<u8>, SourceLoadError>,
    ) -> Result<ApplyOutcome, ControllerError> {
        self.ensure_ready()?;
        let outcome = match self.stack.layer_mut(layer) {
            Some(l) => l.source_mut().complete(ticket, response),
            None => ApplyOutcome::Stale,
        };
        self.sync_loading();
        Ok(outcome)
    }

    /// Re-issues every layer's last query.
    pub fn refresh_all(&mut self) -> Result<Vec<LoadRequest>, ControllerError> {
        self.ensure_ready()?;
        let requests = self
            .stack
            .layers_mut()
            .filter_map(|l| l.source_mut().refresh())
            .collect();
        self.sync_loading();
        Ok(requests)
    }

    pub fn set_layer_visible(&mut self, name: &str, visible: bool) -> Result<bool, ControllerError> {
        self.ensure_ready()?;
        let Some(id) = self.stack.find_by_name(name).map(|l| l.id()) else {
            return Ok(false);
        };
        Ok(self.stack.set_visible(id, visible))
    }

    pub fn draw_list(&self) -> Result<Vec<DrawItem>, ControllerError> {
        let viewport = match self.state {
            ControllerState::Ready => self.viewport.as_ref().ok_or(ControllerError::NotReady)?,
            ControllerState::Initializing => return Err(ControllerError::NotReady),
            ControllerState::Disposed => return Err(ControllerError::Disposed),
        };
        Ok(self.stack.draw_list(viewport))
    }

    pub fn drain_events(&mut self) -> Vec<MapEvent> {
        self.events.drain()
    }

    /// Drops every layer and retires in-flight loads. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.state == ControllerState::Disposed {
            return;
        }
        self.stack.clear();
        self.viewport = None;
        self.overlay = None;
        self.pending.clear();
        self.loading = false;
        self.events.drain();
        self.state = ControllerState::Disposed;
        info!("map controller disposed");
    }

    fn ensure_ready(&self) -> Result<(), ControllerError> {
        match self.state {
            ControllerState::Ready => Ok(()),
            ControllerState::Initializing => Err(ControllerError::NotReady),
            ControllerState::Disposed => Err(ControllerError::Disposed),
        }
    }

    fn ready_viewport(&self) -> Result<&Viewport, ControllerError> {
        self.ensure_ready()?;
        self.viewport.as_ref().ok_or(ControllerError::NotReady)
    }

    fn ready_viewport_mut(&mut self) -> Result<&mut Viewport, ControllerError> {
        self.ensure_ready()?;
        self.viewport.as_mut().ok_or(ControllerError::NotReady)
    }

    /// A WMS overlay renders exactly the current view, so it follows every
    /// viewport change.
    fn reload_overlay(&mut self) -> Vec<LoadRequest> {
        let (Some(id), Some(wms_layers), Some(viewport)) =
            (self.overlay, &self.config.overlay_layers, &self.viewport)
        else {
            return Vec::new();
        };
        let query = SourceQuery::Wms(overlay_query(&self.config.geodata_url, wms_layers, viewport));
        let requests = self
            .stack
            .layer_mut(id)
            .map(|l| vec![l.source_mut().begin_load(query)])
            .unwrap_or_default();
        self.sync_loading();
        requests
    }

    /// Consumes the sources' lifecycle events and derives the aggregate
    /// loading flag from them.
    fn sync_loading(&mut self) {
        for layer in self.stack.layers_mut() {
            let id = layer.id();
            for event in layer.source_mut().drain_events() {
                match event {
                    SourceEvent::LoadStart { generation } => {
                        debug!(layer = id.0, generation, "layer loading");
                        self.pending.insert(id);
                    }
                    SourceEvent::LoadEnd { generation, features } => {
                        debug!(layer = id.0, generation, features, "layer loaded");
                        self.pending.remove(&id);
                    }
                    SourceEvent::LoadError { generation, error } => {
                        warn!(layer = id.0, generation, %error, "layer failed to load");
                        self.pending.remove(&id);
                    }
                }
            }
        }

        let loading = !self.pending.is_empty();
        if loading != self.loading {
            self.loading = loading;
            debug!(loading, "aggregate loading flag changed");
            self.events.emit(MapEvent::LoadingChanged { loading });
        }
    }
}
