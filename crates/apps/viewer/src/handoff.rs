//! Hands map selections over to the panorama viewer.
//!
//! The selection and the viewer move together: selecting a feature with
//! imagery opens its panorama, selecting anything else (or clicking empty
//! map) closes it. Closing the viewer by hand keeps the feature selected.

use std::sync::Arc;

use foundation::math::LonLat;
use foundation::time::Time;
use gpu::{
    BackendError, PanoramaImage, PanoramaViewer, RenderBackend, TextureLoadError, TextureRequest,
    TextureTicket, ViewerState,
};
use runtime::animation::AnimationFrames;
use scene::{Feature, Selection};
use streaming::resolve_media_url;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct SelectionHandoff<B: RenderBackend> {
    backend_url: String,
    selection: Selection,
    viewer: PanoramaViewer<B>,
    frames: AnimationFrames,
}

impl<B: RenderBackend> SelectionHandoff<B> {
    pub fn new(backend_url: impl Into<String>, viewer: PanoramaViewer<B>) -> Self {
        Self {
            backend_url: backend_url.into(),
            selection: Selection::default(),
            viewer,
            frames: AnimationFrames::new(),
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn viewer(&self) -> &PanoramaViewer<B> {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut PanoramaViewer<B> {
        &mut self.viewer
    }

    pub fn frames(&self) -> &AnimationFrames {
        &self.frames
    }

    /// Makes `feature` the selection and opens its panorama, if it has one.
    ///
    /// Returns the texture fetch to perform when a new session was opened.
    pub fn feature_selected(
        &mut self,
        feature: Arc<Feature>,
    ) -> Result<Option<TextureRequest>, BackendError> {
        let url = feature
            .image_url()
            .and_then(|image| resolve_media_url(&self.backend_url, &image));
        debug!(feature = %feature.key, panorama = ?url, "feature selected");
        self.selection.select(feature, url.clone());

        let opened = self
            .viewer
            .set_view(url.is_some(), url.as_deref(), &mut self.frames);
        if let Err(error) = &opened {
            warn!(%error, "could not open panorama viewer");
            self.selection.unlink_panorama();
        }
        opened
    }

    pub fn empty_click(&mut self, coordinate: LonLat) {
        self.selection.clear_at(coordinate);
        self.viewer.close(&mut self.frames);
    }

    /// Closes the panorama; the feature's attributes stay selected.
    pub fn close_viewer(&mut self) {
        self.viewer.close(&mut self.frames);
        self.selection.unlink_panorama();
    }

    pub fn texture_loaded(
        &mut self,
        ticket: TextureTicket,
        result: Result<PanoramaImage, TextureLoadError>,
    ) -> bool {
        let applied = self.viewer.texture_loaded(ticket, result, &mut self.frames);
        if applied && matches!(self.viewer.state(), ViewerState::Failed(_)) {
            self.selection.unlink_panorama();
        }
        applied
    }

    /// Advances the display clock and renders whatever frames are due.
    pub fn tick(&mut self, time: Time) {
        let (_, due) = self.frames.tick(time);
        self.viewer.on_frames(&due, &mut self.frames);
    }

    pub fn resize_viewer(&mut self, size_px: [u32; 2]) {
        self.viewer.resize(size_px);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation::math::Vec2;
    use gpu::HeadlessBackend;
    use pretty_assertions::assert_eq;
    use scene::{FeatureId, FeatureKey, Geometry, LayerId, Properties};

    fn feature(id: i64, image_url: Option<&str>) -> Arc<Feature> {
        let mut props = serde_json::Map::new();
        props.insert("name".into(), format!("Place {id}").into());
        if let Some(url) = image_url {
            props.insert("image_url".into(), url.into());
        }
        Arc::new(Feature {
            key: FeatureKey::Stable(FeatureId::Int(id)),
            layer: LayerId(5),
            geometry: Geometry::Point(Vec2::ZERO),
            properties: Properties::new(props),
        })
    }

    fn handoff() -> SelectionHandoff<HeadlessBackend> {
        SelectionHandoff::new(
            "http://backend",
            PanoramaViewer::new(HeadlessBackend::new(), [640, 480]),
        )
    }

    #[test]
    fn feature_with_imagery_opens_the_panorama() {
        let mut h = handoff();
        let request = h
            .feature_selected(feature(1, Some("IMG_001.jpg")))
            .expect("open")
            .expect("new session");
        assert_eq!(request.url, "http://backend/media/IMG_001");
        assert_eq!(h.selection().panorama_url(), Some("http://backend/media/IMG_001"));
        assert_eq!(h.viewer().state(), &ViewerState::LoadingTexture);

        assert!(h.texture_loaded(request.ticket, Ok(PanoramaImage::solid(8, 4, [1, 2, 3, 255]))));
        h.tick(Time(0.0));
        assert_eq!(h.viewer().state(), &ViewerState::Rendering);
        assert_eq!(h.viewer().backend().frames().len(), 1);
    }

    #[test]
    fn feature_without_imagery_closes_the_viewer() {
        let mut h = handoff();
        h.feature_selected(feature(1, Some("IMG_001.jpg"))).expect("open");
        let none = h.feature_selected(feature(2, None)).expect("close");
        assert!(none.is_none());
        assert!(!h.viewer().is_open());
        assert_eq!(h.viewer().backend().live_targets(), 0);
        assert_eq!(
            h.selection().feature().map(|f| f.key.to_string()),
            Some("2".into())
        );
    }

    #[test]
    fn reselecting_same_imagery_keeps_the_session() {
        let mut h = handoff();
        h.feature_selected(feature(1, Some("IMG_001.jpg"))).expect("open");
        let again = h
            .feature_selected(feature(1, Some("IMG_001.png")))
            .expect("same url");
        assert!(again.is_none());
        assert!(h.viewer().is_open());
    }

    #[test]
    fn empty_click_clears_everything() {
        let mut h = handoff();
        h.feature_selected(feature(1, Some("IMG_001.jpg"))).expect("open");
        h.empty_click(LonLat::new(106.8, 10.87));
        assert!(h.selection().feature().is_none());
        assert_eq!(h.selection().coordinate(), Some(LonLat::new(106.8, 10.87)));
        assert_eq!(h.viewer().state(), &ViewerState::Closed);
        assert_eq!(h.frames().pending_len(), 0);
    }

    #[test]
    fn closing_the_viewer_keeps_the_attributes() {
        let mut h = handoff();
        let request = h
            .feature_selected(feature(1, Some("IMG_001.jpg")))
            .expect("open")
            .expect("session");
        h.texture_loaded(request.ticket, Ok(PanoramaImage::solid(8, 4, [0; 4])));
        h.close_viewer();
        h.close_viewer();
        assert!(h.selection().feature().is_some());
        assert!(h.selection().panorama_url().is_none());
        assert_eq!(h.frames().pending_len(), 0);
        assert_eq!(h.viewer().backend().live_textures(), 0);
    }

    #[test]
    fn failed_texture_unlinks_the_panorama() {
        let mut h = handoff();
        let request = h
            .feature_selected(feature(1, Some("IMG_001.jpg")))
            .expect("open")
            .expect("session");
        assert!(h.texture_loaded(request.ticket, Err(TextureLoadError::Fetch("404".into()))));
        assert!(matches!(h.viewer().state(), ViewerState::Failed(_)));
        assert!(h.selection().feature().is_some());
        assert!(h.selection().panorama_url().is_none());
    }
}
