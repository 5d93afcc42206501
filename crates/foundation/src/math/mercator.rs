//! Spherical Web Mercator (EPSG:3857).
//!
//! Feature geometry arrives in EPSG:4326 and is projected once at load time.
//! The map view works exclusively in projected meters.

use super::{LonLat, Vec2, WGS84_A};

/// Latitude limit of the square Web Mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Half the width of the projected world (meters).
pub const MERCATOR_HALF_EXTENT: f64 = std::f64::consts::PI * WGS84_A;

/// Tile edge in pixels used for zoom <-> resolution conversion.
pub const TILE_SIZE_PX: f64 = 256.0;

pub fn lonlat_to_mercator(p: LonLat) -> Vec2 {
    let lat = p.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = WGS84_A * p.lon.to_radians();
    let y = WGS84_A * (std::f64::consts::FRAC_PI_4 + lat.to_radians() * 0.5).tan().ln();
    Vec2::new(x, y)
}

pub fn mercator_to_lonlat(p: Vec2) -> LonLat {
    let lon = (p.x / WGS84_A).to_degrees();
    let lat = (2.0 * (p.y / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    LonLat::new(lon, lat)
}

/// Map units per pixel at a fractional zoom level.
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    (2.0 * MERCATOR_HALF_EXTENT) / (TILE_SIZE_PX * 2f64.powf(zoom))
}

pub fn zoom_for_resolution(resolution: f64) -> f64 {
    ((2.0 * MERCATOR_HALF_EXTENT) / (TILE_SIZE_PX * resolution)).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn origin_maps_to_origin() {
        let m = lonlat_to_mercator(LonLat::new(0.0, 0.0));
        assert_close(m.x, 0.0, 1e-9);
        assert_close(m.y, 0.0, 1e-9);
    }

    #[test]
    fn antimeridian_is_half_extent() {
        let m = lonlat_to_mercator(LonLat::new(180.0, 0.0));
        assert_close(m.x, MERCATOR_HALF_EXTENT, 1e-6);
    }

    #[test]
    fn projection_round_trips_campus_coordinate() {
        let p = LonLat::new(106.8031, 10.8700);
        let back = mercator_to_lonlat(lonlat_to_mercator(p));
        assert_close(back.lon, p.lon, 1e-9);
        assert_close(back.lat, p.lat, 1e-9);
    }

    #[test]
    fn zoom_zero_fits_world_in_one_tile() {
        assert_close(resolution_for_zoom(0.0), 156_543.033_928_041, 1e-6);
        assert_close(zoom_for_resolution(resolution_for_zoom(17.5)), 17.5, 1e-9);
    }
}
