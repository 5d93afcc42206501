//! The ordered layer collection.
//!
//! Ordering contract:
//! - Layers keep the order they were added in. The first layer is drawn
//!   first (bottom); the last is drawn last (top).
//! - `hit_test` visits layers top-down and, within a layer, features in
//!   collection order. The first candidate is what a single click selects.

use std::sync::Arc;

use scene::Feature;
use scene::picking::{PickOptions, pick_in_snapshot};

use crate::layer::{Layer, LayerId, LayerSpec};
use crate::style::VisualPrimitive;
use crate::viewport::{Pixel, Viewport};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HitMode {
    /// Stop at the first candidate.
    First,
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitCandidate {
    pub layer: LayerId,
    /// Index of the feature in its layer's snapshot.
    pub index: usize,
    pub feature: Arc<Feature>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub layer: LayerId,
    pub primitive: VisualPrimitive,
}

/// Pixel tolerances used when picking.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HitTolerance {
    pub point_radius_px: f64,
    pub line_tolerance_px: f64,
}

impl Default for HitTolerance {
    fn default() -> Self {
        Self {
            point_radius_px: 12.0,
            line_tolerance_px: 4.0,
        }
    }
}

#[derive(Debug, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
    next_id: u64,
    pub tolerance: HitTolerance,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer on top of the stack.
    pub fn add_layer(&mut self, spec: LayerSpec) -> LayerId {
        self.next_id += 1;
        let id = LayerId(self.next_id);
        let z_rank = self.layers.len();
        self.layers.push(Layer::new(id, z_rank, spec));
        id
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Bottom to top.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn layers_mut(&mut self) -> impl Iterator<Item = &mut Layer> {
        self.layers.iter_mut()
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name() == name)
    }

    /// Returns `false` if no layer has this id.
    pub fn set_visible(&mut self, id: LayerId, visible: bool) -> bool {
        match self.layer_mut(id) {
            Some(layer) => {
                layer.visible = visible;
                true
            }
            None => false,
        }
    }

    /// True while any layer's source has a load in flight.
    pub fn is_loading(&self) -> bool {
        self.layers.iter().any(|l| l.source().is_loading())
    }

    pub fn hit_test(&self, pixel: Pixel, viewport: &Viewport, mode: HitMode) -> Vec<HitCandidate> {
        let at = viewport.pixel_to_map(pixel);
        let opts = PickOptions::from_pixels(
            self.tolerance.point_radius_px,
            self.tolerance.line_tolerance_px,
            viewport.resolution(),
        );

        let mut out = Vec::new();
        for layer in self.layers.iter().rev().filter(|l| l.is_pickable()) {
            let Some(snapshot) = layer.source().features() else {
                continue;
            };
            for (index, feature) in pick_in_snapshot(snapshot, at, opts) {
                out.push(HitCandidate {
                    layer: layer.id(),
                    index,
                    feature: feature.clone(),
                });
                if mode == HitMode::First {
                    return out;
                }
            }
        }
        out
    }

    /// Primitives of every visible layer, bottom to top.
    pub fn draw_list(&self, viewport: &Viewport) -> Vec<DrawItem> {
        self.layers
            .iter()
            .filter(|l| l.is_visible())
            .flat_map(|l| {
                let layer = l.id();
                l.primitives(viewport)
                    .into_iter()
                    .map(move |primitive| DrawItem { layer, primitive })
            })
            .collect()
    }

    /// Retires every in-flight load; late responses will be stale.
    pub fn abandon_loads(&mut self) {
        for layer in &mut self.layers {
            layer.source_mut().abandon();
        }
    }

    pub fn clear(&mut self) {
        self.abandon_loads();
        self.layers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::BaseTileLayer;
    use crate::labels::LabelPolicy;
    use crate::style::LayerStyleResolver;
    use crate::symbology::FeatureStyle;
    use foundation::math::{Vec2, mercator_to_lonlat};
    use pretty_assertions::assert_eq;
    use streaming::{ApplyOutcome, SourceQuery, TileTemplate};

    fn resolver() -> Arc<LayerStyleResolver> {
        Arc::new(LayerStyleResolver::new(
            FeatureStyle::buildings(),
            LabelPolicy::buildings(),
        ))
    }

    /// GeoJSON for squares of `size` meters centred at the mercator origin.
    fn squares(ids: &[(i64, f64)]) -> Vec<u8> {
        let features: Vec<String> = ids
            .iter()
            .map(|(id, size)| {
                let c = mercator_to_lonlat(Vec2::new(*size, *size));
                let (x, y) = (c.lon, c.lat);
                format!(
                    r#"{{"type":"Feature","id":{id},"geometry":{{"type":"Polygon","coordinates":[[[-{x},-{y}],[{x},-{y}],[{x},{y}],[-{x},{y}],[-{x},-{y}]]]}},"properties":{{"name":"f{id}"}}}}"#
                )
            })
            .collect();
        format!(
            r#"{{"type":"FeatureCollection","features":[{}]}}"#,
            features.join(",")
        )
        .into_bytes()
    }

    fn load(stack: &mut LayerStack, id: LayerId, payload: Vec<u8>) {
        let source = stack.layer_mut(id).expect("layer").source_mut();
        let req = source.begin_load(SourceQuery::GeoJson {
            url: "http://test/data".into(),
        });
        assert_eq!(source.complete(req.ticket, Ok(payload)), ApplyOutcome::Applied);
    }

    fn view() -> Viewport {
        Viewport::new(Vec2::ZERO, 1.0, [200, 200])
    }

    #[test]
    fn topmost_layer_wins_hit_test() {
        let mut stack = LayerStack::new();
        let bottom = stack.add_layer(LayerSpec::vector("bottom", resolver()));
        let top = stack.add_layer(LayerSpec::vector("top", resolver()));
        load(&mut stack, bottom, squares(&[(1, 50.0)]));
        load(&mut stack, top, squares(&[(2, 30.0), (3, 40.0)]));

        let center = [100.0, 100.0];
        let first = stack.hit_test(center, &view(), HitMode::First);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].layer, top);
        assert_eq!(first[0].index, 0);

        let all: Vec<(LayerId, usize)> = stack
            .hit_test(center, &view(), HitMode::All)
            .iter()
            .map(|h| (h.layer, h.index))
            .collect();
        assert_eq!(all, vec![(top, 0), (top, 1), (bottom, 0)]);
    }

    #[test]
    fn hidden_and_unpickable_layers_are_skipped() {
        let mut stack = LayerStack::new();
        let a = stack.add_layer(LayerSpec::vector("a", resolver()));
        let b = stack.add_layer(LayerSpec::vector("b", resolver()).pickable(false));
        load(&mut stack, a, squares(&[(1, 50.0)]));
        load(&mut stack, b, squares(&[(2, 50.0)]));

        assert!(stack.set_visible(a, false));
        assert!(stack.hit_test([100.0, 100.0], &view(), HitMode::All).is_empty());
        assert!(!stack.set_visible(LayerId(99), true));
    }

    #[test]
    fn empty_pixel_has_no_candidates() {
        let mut stack = LayerStack::new();
        let a = stack.add_layer(LayerSpec::vector("a", resolver()));
        load(&mut stack, a, squares(&[(1, 10.0)]));
        assert!(stack.hit_test([5.0, 5.0], &view(), HitMode::First).is_empty());
    }

    #[test]
    fn draw_list_is_bottom_to_top_and_skips_hidden() {
        let mut stack = LayerStack::new();
        let base = stack.add_layer(LayerSpec::base_tiles(
            "base",
            BaseTileLayer::new(TileTemplate::default()),
        ));
        let a = stack.add_layer(LayerSpec::vector("a", resolver()));
        let b = stack.add_layer(LayerSpec::vector("b", resolver()).hidden());
        load(&mut stack, a, squares(&[(1, 20.0)]));
        load(&mut stack, b, squares(&[(2, 20.0)]));

        let items = stack.draw_list(&view());
        assert_eq!(items.first().map(|i| i.layer), Some(base));
        assert_eq!(items.last().map(|i| i.layer), Some(a));
        assert!(items.iter().all(|i| i.layer != b));
    }

    #[test]
    fn loading_flag_tracks_any_layer() {
        let mut stack = LayerStack::new();
        let a = stack.add_layer(LayerSpec::vector("a", resolver()));
        let b = stack.add_layer(LayerSpec::vector("b", resolver()));
        assert!(!stack.is_loading());

        let ra = stack
            .layer_mut(a)
            .expect("a")
            .source_mut()
            .begin_load(SourceQuery::GeoJson { url: "u".into() });
        stack
            .layer_mut(b)
            .expect("b")
            .source_mut()
            .begin_load(SourceQuery::GeoJson { url: "u".into() });
        assert!(stack.is_loading());

        stack
            .layer_mut(a)
            .expect("a")
            .source_mut()
            .complete(ra.ticket, Ok(squares(&[(1, 1.0)])));
        assert!(stack.is_loading());

        stack.abandon_loads();
        assert!(!stack.is_loading());
    }

    #[test]
    fn z_rank_follows_insertion() {
        let mut stack = LayerStack::new();
        let a = stack.add_layer(LayerSpec::raster("overlay"));
        let b = stack.add_layer(LayerSpec::vector("poi", resolver()));
        assert_eq!(stack.layer(a).map(|l| l.z_rank()), Some(0));
        assert_eq!(stack.layer(b).map(|l| l.z_rank()), Some(1));
        assert_eq!(stack.find_by_name("poi").map(|l| l.id()), Some(b));
    }
}
