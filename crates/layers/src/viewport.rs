//! The live 2D map view: center, resolution and container size.
//!
//! Pixel coordinates have their origin at the container's top-left corner
//! with y growing downwards; map coordinates are Web Mercator meters with y
//! growing northwards.

use foundation::bounds::Aabb2;
use foundation::math::{
    LonLat, Vec2, lonlat_to_mercator, mercator_to_lonlat, resolution_for_zoom, zoom_for_resolution,
};

/// Screen position in pixels.
pub type Pixel = [f64; 2];

/// Finest resolution the view zooms to (map meters per pixel).
pub const MIN_RESOLUTION: f64 = 0.05;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    center: Vec2,
    resolution: f64,
    size_px: [u32; 2],
}

impl Viewport {
    pub fn new(center: Vec2, resolution: f64, size_px: [u32; 2]) -> Self {
        Self {
            center,
            resolution: clamp_resolution(resolution),
            size_px,
        }
    }

    pub fn from_lonlat_zoom(center: LonLat, zoom: f64, size_px: [u32; 2]) -> Self {
        Self::new(lonlat_to_mercator(center), resolution_for_zoom(zoom), size_px)
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn center_lonlat(&self) -> LonLat {
        mercator_to_lonlat(self.center)
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn zoom(&self) -> f64 {
        zoom_for_resolution(self.resolution)
    }

    pub fn size_px(&self) -> [u32; 2] {
        self.size_px
    }

    pub fn pixel_to_map(&self, px: Pixel) -> Vec2 {
        let half_w = self.size_px[0] as f64 * 0.5;
        let half_h = self.size_px[1] as f64 * 0.5;
        Vec2::new(
            self.center.x + (px[0] - half_w) * self.resolution,
            self.center.y - (px[1] - half_h) * self.resolution,
        )
    }

    pub fn pixel_to_lonlat(&self, px: Pixel) -> LonLat {
        mercator_to_lonlat(self.pixel_to_map(px))
    }

    pub fn map_to_pixel(&self, p: Vec2) -> Pixel {
        let half_w = self.size_px[0] as f64 * 0.5;
        let half_h = self.size_px[1] as f64 * 0.5;
        [
            (p.x - self.center.x) / self.resolution + half_w,
            half_h - (p.y - self.center.y) / self.resolution,
        ]
    }

    /// Map area covered by the container.
    pub fn extent(&self) -> Aabb2 {
        let half_w = self.size_px[0] as f64 * 0.5 * self.resolution;
        let half_h = self.size_px[1] as f64 * 0.5 * self.resolution;
        Aabb2::new(
            [self.center.x - half_w, self.center.y - half_h],
            [self.center.x + half_w, self.center.y + half_h],
        )
    }

    /// Moves the map with a drag of `delta` pixels.
    pub fn pan_by(&mut self, delta: Pixel) {
        self.center = Vec2::new(
            self.center.x - delta[0] * self.resolution,
            self.center.y + delta[1] * self.resolution,
        );
    }

    pub fn set_center(&mut self, center: Vec2) {
        self.center = center;
    }

    pub fn zoom_to(&mut self, zoom: f64) {
        self.resolution = clamp_resolution(resolution_for_zoom(zoom));
    }

    /// Zooms by `factor` (> 1 zooms in) keeping the map point under `anchor` fixed.
    pub fn zoom_around(&mut self, anchor: Pixel, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let fixed = self.pixel_to_map(anchor);
        self.resolution = clamp_resolution(self.resolution / factor);
        let drifted = self.pixel_to_map(anchor);
        self.center = self.center + (fixed - drifted);
    }

    pub fn resize(&mut self, size_px: [u32; 2]) {
        self.size_px = size_px;
    }
}

fn clamp_resolution(r: f64) -> f64 {
    if r.is_finite() {
        r.max(MIN_RESOLUTION)
    } else {
        MIN_RESOLUTION
    }
}
