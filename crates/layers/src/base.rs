use streaming::{TileCoord, TileTemplate, tile_zoom_for_resolution, tiles_covering};

use crate::style::VisualPrimitive;
use crate::viewport::Viewport;

/// The XYZ base map under every other layer.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseTileLayer {
    pub template: TileTemplate,
}

impl BaseTileLayer {
    pub fn new(template: TileTemplate) -> Self {
        Self { template }
    }

    pub fn visible_tiles(&self, viewport: &Viewport) -> Vec<TileCoord> {
        let z = tile_zoom_for_resolution(viewport.resolution());
        tiles_covering(&viewport.extent(), z)
    }

    pub fn primitives(&self, viewport: &Viewport) -> Vec<VisualPrimitive> {
        self.visible_tiles(viewport)
            .into_iter()
            .map(|coord| VisualPrimitive::Tile {
                coord,
                url: self.template.url(coord),
                extent: coord.bounds(),
            })
            .collect()
    }
}
