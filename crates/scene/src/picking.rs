use std::sync::Arc;

use foundation::math::Vec2;

use crate::feature::{Feature, FeatureSnapshot, Geometry};

/// Hit tolerances in map units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    /// Radius around point geometries (the rendered icon footprint).
    pub point_radius: f64,
    /// Half-width of the hit corridor around line geometries and area outlines.
    pub line_tolerance: f64,
}

impl PickOptions {
    /// Converts pixel tolerances at the given resolution (map units per pixel).
    pub fn from_pixels(point_radius_px: f64, line_tolerance_px: f64, resolution: f64) -> Self {
        Self {
            point_radius: point_radius_px * resolution,
            line_tolerance: line_tolerance_px * resolution,
        }
    }
}

/// Does `geometry` cover the map position `at`?
pub fn hits_geometry(geometry: &Geometry, at: Vec2, opts: PickOptions) -> bool {
    if let Some(b) = geometry.bounds() {
        let margin = opts.point_radius.max(opts.line_tolerance);
        if !b.expanded(margin).contains(at) {
            return false;
        }
    }

    match geometry {
        Geometry::Point(p) => (*p - at).length() <= opts.point_radius,
        Geometry::MultiPoint(ps) => ps.iter().any(|p| (*p - at).length() <= opts.point_radius),
        Geometry::LineString(ps) => near_polyline(ps, at, opts.line_tolerance),
        Geometry::MultiLineString(lines) => lines
            .iter()
            .any(|l| near_polyline(l, at, opts.line_tolerance)),
        Geometry::Polygon(rings) => hits_polygon(rings, at, opts.line_tolerance),
        Geometry::MultiPolygon(polys) => polys
            .iter()
            .any(|rings| hits_polygon(rings, at, opts.line_tolerance)),
    }
}

/// Features of `snapshot` under `at`, in draw order (collection order).
pub fn pick_in_snapshot<'a>(
    snapshot: &'a FeatureSnapshot,
    at: Vec2,
    opts: PickOptions,
) -> impl Iterator<Item = (usize, &'a Arc<Feature>)> + 'a {
    let outside = snapshot
        .bounds
        .is_some_and(|b| !b.expanded(opts.point_radius.max(opts.line_tolerance)).contains(at));
    snapshot
        .features
        .iter()
        .enumerate()
        .filter(move |(_, f)| !outside && hits_geometry(&f.geometry, at, opts))
}

fn hits_polygon(rings: &[Vec<Vec2>], at: Vec2, edge_tolerance: f64) -> bool {
    let Some(outer) = rings.first() else {
        return false;
    };
    // Inside a hole counts as outside the polygon.
    let inside =
        point_in_ring(outer, at) && !rings[1..].iter().any(|hole| point_in_ring(hole, at));
    // Clicking right on an outline still selects it.
    inside || rings.iter().any(|r| near_ring(r, at, edge_tolerance))
}

/// Even-odd ray casting. Works for closed and open rings.
fn point_in_ring(ring: &[Vec2], at: Vec2) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[j];
        if (a.y > at.y) != (b.y > at.y) {
            let x_cross = (b.x - a.x) * (at.y - a.y) / (b.y - a.y) + a.x;
            if at.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn near_polyline(vertices: &[Vec2], at: Vec2, tolerance: f64) -> bool {
    match vertices {
        [] => false,
        [only] => (*only - at).length() <= tolerance,
        _ => vertices
            .windows(2)
            .any(|w| distance_to_segment(at, w[0], w[1]) <= tolerance),
    }
}

fn near_ring(ring: &[Vec2], at: Vec2, tolerance: f64) -> bool {
    if near_polyline(ring, at, tolerance) {
        return true;
    }
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 2 => {
            distance_to_segment(at, *last, *first) <= tolerance
        }
        _ => false,
    }
}

fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    let ab = b - a;
    let len2 = ab.dot(ab);
    if len2 <= 0.0 {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab.scale(t))).length()
}
