use streaming::{SourceData, WmsQuery};

use crate::style::VisualPrimitive;
use crate::viewport::Viewport;

/// A single GetMap image covering the current view (WMS `ratio` of 1).
pub fn overlay_query(base_url: &str, layers: &str, viewport: &Viewport) -> WmsQuery {
    let [w, h] = viewport.size_px();
    WmsQuery {
        base_url: base_url.to_string(),
        layers: layers.to_string(),
        extent: viewport.extent(),
        width: w.max(1),
        height: h.max(1),
    }
}

pub fn raster_primitives(data: &SourceData) -> Vec<VisualPrimitive> {
    match data.raster() {
        Some(image) => vec![VisualPrimitive::Raster {
            image: image.clone(),
            extent: image.extent,
        }],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation::math::Vec2;
    use std::sync::Arc;
    use streaming::RasterImage;

    #[test]
    fn overlay_matches_view() {
        let view = Viewport::new(Vec2::new(0.0, 0.0), 2.0, [100, 50]);
        let q = overlay_query("http://geo/wms", "campus:overlay", &view);
        assert_eq!((q.width, q.height), (100, 50));
        assert_eq!(q.extent, view.extent());
    }

    #[test]
    fn only_loaded_rasters_draw() {
        assert!(raster_primitives(&SourceData::Empty).is_empty());
        let image = Arc::new(RasterImage {
            bytes: vec![1],
            extent: foundation::bounds::Aabb2::new([0.0, 0.0], [1.0, 1.0]),
            width: 1,
            height: 1,
        });
        assert_eq!(raster_primitives(&SourceData::Raster(image)).len(), 1);
    }
}
