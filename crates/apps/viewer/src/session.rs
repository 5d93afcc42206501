//! The viewer session: one task owning the controller and the handoff.
//!
//! Fetches run on spawned tokio tasks. Their results come back over an
//! unbounded channel as [`Completion`]s and are applied on the session task,
//! so no state is ever shared across threads.

use std::sync::Arc;
use std::time::Duration;

use foundation::time::Time;
use gpu::{PanoramaImage, PanoramaViewer, RenderBackend, TextureLoadError, TextureRequest, TextureTicket};
use layers::{LayerId, Pixel};
use streaming::{LoadRequest, LoadTicket, SourceLoadError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, ViewerConfig};
use crate::controller::{ControllerError, MapEvent, MapViewportController};
use crate::fetch::GeoFetcher;
use crate::handoff::SelectionHandoff;

/// A finished fetch on its way back to the session.
#[derive(Debug)]
pub enum Completion {
    Layer {
        layer: LayerId,
        ticket: LoadTicket,
        result: Result<Vec<u8>, SourceLoadError>,
    },
    Texture {
        ticket: TextureTicket,
        result: Result<PanoramaImage, TextureLoadError>,
    },
}

pub struct Session<B: RenderBackend> {
    controller: MapViewportController,
    handoff: SelectionHandoff<B>,
    fetcher: Arc<dyn GeoFetcher>,
    timeout: Duration,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl<B: RenderBackend> Session<B> {
    pub fn new(
        config: ViewerConfig,
        fetcher: Arc<dyn GeoFetcher>,
        backend: B,
        viewer_size: [u32; 2],
    ) -> Result<Self, ConfigError> {
        let timeout = config.load_timeout;
        let handoff = SelectionHandoff::new(
            config.backend_url.clone(),
            PanoramaViewer::new(backend, viewer_size),
        );
        let controller = MapViewportController::new(config)?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            controller,
            handoff,
            fetcher,
            timeout,
            tx,
            rx,
            in_flight: 0,
        })
    }

    pub fn controller(&self) -> &MapViewportController {
        &self.controller
    }

    pub fn handoff(&self) -> &SelectionHandoff<B> {
        &self.handoff
    }

    pub fn handoff_mut(&mut self) -> &mut SelectionHandoff<B> {
        &mut self.handoff
    }

    /// Fetches issued and not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Initialises the map at the configured center and zoom and starts the
    /// initial layer loads.
    pub fn start(&mut self, map_size: [u32; 2]) -> Result<(), ControllerError> {
        let config = self.controller.config();
        let (center, zoom) = (config.center, config.zoom);
        let requests = self.controller.initialize(map_size, center, zoom)?;
        self.spawn_loads(requests);
        self.dispatch_events();
        Ok(())
    }

    pub fn click(&mut self, pixel: Pixel) -> Result<(), ControllerError> {
        self.controller.on_click(pixel)?;
        self.dispatch_events();
        Ok(())
    }

    pub fn pan_by(&mut self, delta: Pixel) -> Result<(), ControllerError> {
        let requests = self.controller.pan_by(delta)?;
        self.spawn_loads(requests);
        self.dispatch_events();
        Ok(())
    }

    pub fn zoom_to(&mut self, zoom: f64) -> Result<(), ControllerError> {
        let requests = self.controller.zoom_to(zoom)?;
        self.spawn_loads(requests);
        self.dispatch_events();
        Ok(())
    }

    pub fn resize_map(&mut self, size_px: [u32; 2]) -> Result<(), ControllerError> {
        let requests = self.controller.resize(size_px)?;
        self.spawn_loads(requests);
        self.dispatch_events();
        Ok(())
    }

    pub fn refresh(&mut self) -> Result<(), ControllerError> {
        let requests = self.controller.refresh_all()?;
        self.spawn_loads(requests);
        self.dispatch_events();
        Ok(())
    }

    /// Waits for the next completion and applies it. Returns `false` when
    /// nothing is in flight.
    pub async fn step(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.rx.recv().await {
            Some(completion) => {
                self.in_flight -= 1;
                self.apply(completion);
                true
            }
            None => false,
        }
    }

    /// Applies completions until every issued fetch has come back.
    pub async fn settle(&mut self) {
        while self.step().await {}
    }

    pub fn tick(&mut self, time: Time) {
        self.handoff.tick(time);
    }

    /// Tears the map and the viewer down. In-flight results are dropped.
    pub fn dispose(&mut self) {
        self.handoff.close_viewer();
        self.controller.dispose();
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Layer {
                layer,
                ticket,
                result,
            } => match self.controller.apply_load(layer, ticket, result) {
                Ok(outcome) => debug!(layer = layer.0, ?outcome, "layer load applied"),
                Err(error) => debug!(%error, "layer load arrived after dispose"),
            },
            Completion::Texture { ticket, result } => {
                self.handoff.texture_loaded(ticket, result);
            }
        }
        self.dispatch_events();
    }

    fn dispatch_events(&mut self) {
        for event in self.controller.drain_events() {
            match event {
                MapEvent::FeatureSelected { feature, .. } => {
                    match self.handoff.feature_selected(feature) {
                        Ok(Some(request)) => self.spawn_texture(request),
                        Ok(None) => {}
                        Err(error) => warn!(%error, "panorama unavailable"),
                    }
                }
                MapEvent::EmptyClick { coordinate } => {
                    info!(%coordinate, "empty map click");
                    self.handoff.empty_click(coordinate);
                }
                MapEvent::LoadingChanged { loading } => info!(loading, "map loading"),
            }
        }
    }

    fn spawn_loads(&mut self, requests: Vec<LoadRequest>) {
        for request in requests {
            let fetcher = self.fetcher.clone();
            let tx = self.tx.clone();
            let timeout = self.timeout;
            self.in_flight += 1;
            tokio::spawn(async move {
                let result = fetch_with_timeout(fetcher.as_ref(), request.url, timeout).await;
                let _ = tx.send(Completion::Layer {
                    layer: request.layer,
                    ticket: request.ticket,
                    result,
                });
            });
        }
    }

    fn spawn_texture(&mut self, request: TextureRequest) {
        let fetcher = self.fetcher.clone();
        let tx = self.tx.clone();
        let timeout = self.timeout;
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = fetch_with_timeout(fetcher.as_ref(), request.url, timeout)
                .await
                .map_err(|e| TextureLoadError::Fetch(e.to_string()))
                .and_then(|bytes| PanoramaImage::decode(&bytes));
            let _ = tx.send(Completion::Texture {
                ticket: request.ticket,
                result,
            });
        });
    }
}

async fn fetch_with_timeout(
    fetcher: &dyn GeoFetcher,
    url: String,
    timeout: Duration,
) -> Result<Vec<u8>, SourceLoadError> {
    match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
        Ok(result) => result,
        Err(_) => Err(SourceLoadError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BoxFuture;
    use gpu::{HeadlessBackend, ViewerState};
    use image::{ImageFormat, Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Cursor;
    use streaming::LoadState;

    const MAP: [u32; 2] = [800, 600];

    /// Serves canned bodies by URL substring. URLs matching `hang` never answer.
    struct FakeFetcher {
        bodies: HashMap<&'static str, Vec<u8>>,
        hang: Option<&'static str>,
    }

    impl GeoFetcher for FakeFetcher {
        fn fetch(&self, url: String) -> BoxFuture<'_, Result<Vec<u8>, SourceLoadError>> {
            Box::pin(async move {
                if self.hang.is_some_and(|h| url.contains(h)) {
                    std::future::pending::<()>().await;
                }
                self.bodies
                    .iter()
                    .find(|(k, _)| url.contains(**k))
                    .map(|(_, v)| v.clone())
                    .ok_or(SourceLoadError::Status(404))
            })
        }
    }

    fn config() -> ViewerConfig {
        ViewerConfig {
            backend_url: "http://backend".into(),
            load_timeout: Duration::from_millis(200),
            ..ViewerConfig::default()
        }
    }

    fn empty() -> Vec<u8> {
        br#"{"type":"FeatureCollection","features":[]}"#.to_vec()
    }

    fn places(config: &ViewerConfig) -> Vec<u8> {
        format!(
            r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","id":1,
                "geometry":{{"type":"Point","coordinates":[{},{}]}},
                "properties":{{"name":"Khu A","image_url":"IMG_001.jpg"}}}}]}}"#,
            config.center.lon, config.center.lat
        )
        .into_bytes()
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([90, 120, 200, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).expect("encode png");
        out.into_inner()
    }

    fn session(fetcher: FakeFetcher) -> Session<HeadlessBackend> {
        Session::new(config(), Arc::new(fetcher), HeadlessBackend::new(), [640, 480])
            .expect("session")
    }

    fn layer_state(s: &Session<HeadlessBackend>, name: &str) -> LoadState {
        s.controller()
            .stack()
            .find_by_name(name)
            .expect("layer")
            .load_state()
            .clone()
    }

    #[tokio::test]
    async fn clicking_a_place_opens_its_panorama() {
        let c = config();
        let fetcher = FakeFetcher {
            bodies: HashMap::from([
                ("/places", places(&c)),
                ("/media/IMG_001", png(8, 4)),
                ("typeName", empty()),
            ]),
            hang: None,
        };
        let mut s = session(fetcher);
        s.start(MAP).expect("start");
        s.settle().await;
        assert!(!s.controller().is_loading());
        assert_eq!(layer_state(&s, "places"), LoadState::Loaded);

        s.click([400.0, 300.0]).expect("click");
        assert_eq!(
            s.handoff().selection().panorama_url(),
            Some("http://backend/media/IMG_001")
        );
        assert_eq!(s.handoff().viewer().url(), Some("http://backend/media/IMG_001"));

        s.settle().await;
        assert_eq!(s.handoff().viewer().state(), &ViewerState::Rendering);
        s.tick(Time(0.0));
        s.tick(Time(1.0 / 60.0));
        assert_eq!(s.handoff().viewer().backend().frames().len(), 2);

        s.click([0.0, 0.0]).expect("empty click");
        assert_eq!(s.handoff().viewer().state(), &ViewerState::Closed);
        assert_eq!(s.handoff().viewer().backend().live_textures(), 0);
    }

    #[tokio::test]
    async fn a_hanging_layer_times_out_without_blocking_the_rest() {
        let c = config();
        let fetcher = FakeFetcher {
            bodies: HashMap::from([("/places", places(&c)), ("typeName", empty())]),
            hang: Some("buildings"),
        };
        let mut s = session(fetcher);
        s.start(MAP).expect("start");
        assert!(s.controller().is_loading());
        s.settle().await;

        assert!(!s.controller().is_loading());
        assert_eq!(
            layer_state(&s, "buildings"),
            LoadState::Error(SourceLoadError::Timeout)
        );
        for name in ["boundaries", "roads", "places"] {
            assert_eq!(layer_state(&s, name), LoadState::Loaded, "{name}");
        }
    }

    #[tokio::test]
    async fn missing_imagery_fails_the_viewer_but_keeps_the_selection() {
        let c = config();
        let fetcher = FakeFetcher {
            bodies: HashMap::from([("/places", places(&c)), ("typeName", empty())]),
            hang: None,
        };
        let mut s = session(fetcher);
        s.start(MAP).expect("start");
        s.settle().await;
        s.click([400.0, 300.0]).expect("click");
        s.settle().await;

        assert!(matches!(
            s.handoff().viewer().state(),
            ViewerState::Failed(TextureLoadError::Fetch(_))
        ));
        assert!(s.handoff().selection().feature().is_some());
        assert_eq!(s.handoff().viewer().backend().live_targets(), 0);
    }

    #[tokio::test]
    async fn results_after_dispose_are_dropped() {
        let c = config();
        let fetcher = FakeFetcher {
            bodies: HashMap::from([("/places", places(&c)), ("typeName", empty())]),
            hang: None,
        };
        let mut s = session(fetcher);
        s.start(MAP).expect("start");
        s.dispose();
        s.settle().await;
        assert_eq!(s.in_flight(), 0);
        assert!(s.controller().stack().is_empty());
        assert_eq!(s.click([1.0, 1.0]), Err(ControllerError::Disposed));
    }
}
