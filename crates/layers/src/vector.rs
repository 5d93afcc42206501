//! Polygon tessellation for filled areas.

use earcutr::earcut;
use foundation::math::Vec2;

/// Triangulates a polygon (outer ring first, then holes) into a flat
/// triangle list. Degenerate input yields an empty list.
pub fn triangulate_polygon(rings: &[Vec<Vec2>]) -> Vec<Vec2> {
    let Some(outer) = rings.first() else {
        return Vec::new();
    };
    // Work relative to the outer ring's first vertex; map meters are large.
    let Some(origin) = outer.first().copied() else {
        return Vec::new();
    };

    let mut vertices: Vec<Vec2> = Vec::new();
    let mut coords: Vec<f64> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();

    for (ring_i, ring) in rings.iter().enumerate() {
        let ring = without_closing_duplicate(ring);
        if ring.len() < 3 {
            if ring_i == 0 {
                return Vec::new();
            }
            continue;
        }
        if ring_i > 0 {
            hole_indices.push(vertices.len());
        }
        for p in ring {
            let local = *p - origin;
            coords.push(local.x);
            coords.push(local.y);
            vertices.push(*p);
        }
    }

    let indices = match earcut(&coords, &hole_indices, 2) {
        Ok(ix) => ix,
        Err(_) => return Vec::new(),
    };
    indices
        .into_iter()
        .filter_map(|i| vertices.get(i).copied())
        .collect()
}

fn without_closing_duplicate(ring: &[Vec2]) -> &[Vec2] {
    match ring {
        [first, .., last] if (*first - *last).length() < 1e-9 => &ring[..ring.len() - 1],
        _ => ring,
    }
}
