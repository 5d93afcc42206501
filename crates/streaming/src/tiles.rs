//! XYZ base tile addressing.

use foundation::bounds::Aabb2;
use foundation::math::{MERCATOR_HALF_EXTENT, zoom_for_resolution};
use serde::{Deserialize, Serialize};

/// Deepest zoom the base layer requests.
pub const MAX_TILE_ZOOM: u8 = 19;

/// Tile coordinate in ZXY scheme (y grows southwards).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles along one axis at zoom `z`.
    pub fn tiles_per_axis(z: u8) -> u32 {
        1u32 << z
    }

    /// Edge length of a tile at zoom `z` in map meters.
    pub fn span_m(z: u8) -> f64 {
        2.0 * MERCATOR_HALF_EXTENT / Self::tiles_per_axis(z) as f64
    }

    /// Bounds of this tile in Web Mercator meters.
    pub fn bounds(&self) -> Aabb2 {
        let span = Self::span_m(self.z);
        let min_x = -MERCATOR_HALF_EXTENT + self.x as f64 * span;
        let max_y = MERCATOR_HALF_EXTENT - self.y as f64 * span;
        Aabb2::new([min_x, max_y - span], [min_x + span, max_y])
    }
}

/// Integer zoom level whose native resolution best serves `resolution`.
pub fn tile_zoom_for_resolution(resolution: f64) -> u8 {
    if !resolution.is_finite() || resolution <= 0.0 {
        return MAX_TILE_ZOOM;
    }
    let z = zoom_for_resolution(resolution).round();
    z.clamp(0.0, MAX_TILE_ZOOM as f64) as u8
}

/// Tiles intersecting `extent` at zoom `z`, row-major from the north-west.
///
/// The extent is clamped to the square Mercator world; an extent entirely
/// outside it yields no tiles.
pub fn tiles_covering(extent: &Aabb2, z: u8) -> Vec<TileCoord> {
    let world = Aabb2::new(
        [-MERCATOR_HALF_EXTENT, -MERCATOR_HALF_EXTENT],
        [MERCATOR_HALF_EXTENT, MERCATOR_HALF_EXTENT],
    );
    if !world.intersects(extent) {
        return Vec::new();
    }

    let n = TileCoord::tiles_per_axis(z);
    let span = TileCoord::span_m(z);
    let to_index = |offset: f64| ((offset / span).floor().max(0.0) as u32).min(n - 1);

    let x0 = to_index(extent.min[0] + MERCATOR_HALF_EXTENT);
    let x1 = to_index(extent.max[0] + MERCATOR_HALF_EXTENT);
    let y0 = to_index(MERCATOR_HALF_EXTENT - extent.max[1]);
    let y1 = to_index(MERCATOR_HALF_EXTENT - extent.min[1]);

    let mut out = Vec::with_capacity(((x1 - x0 + 1) * (y1 - y0 + 1)) as usize);
    for y in y0..=y1 {
        for x in x0..=x1 {
            out.push(TileCoord::new(z, x, y));
        }
    }
    out
}

/// URL template with `{z}`, `{x}` and `{y}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileTemplate(pub String);

impl TileTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn url(&self, coord: TileCoord) -> String {
        self.0
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
    }
}

impl Default for TileTemplate {
    fn default() -> Self {
        Self::new("https://tile.openstreetmap.org/{z}/{x}/{y}.png")
    }
}
