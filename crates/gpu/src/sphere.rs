//! UV sphere geometry for equirectangular panoramas.

use std::f64::consts::PI;

pub const PANORAMA_RADIUS: f64 = 500.0;
pub const PANORAMA_WIDTH_SEGMENTS: u32 = 60;
pub const PANORAMA_HEIGHT_SEGMENTS: u32 = 40;

#[derive(Debug, Clone, PartialEq)]
pub struct SphereMesh {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl SphereMesh {
    /// Latitude/longitude sphere. `u` runs with longitude, `v` from the
    /// north pole (`v = 1`) to the south pole (`v = 0`). Triangles face out.
    pub fn uv_sphere(radius: f64, width_segments: u32, height_segments: u32) -> Self {
        let w = width_segments.max(3);
        let h = height_segments.max(2);

        let mut positions = Vec::with_capacity(((w + 1) * (h + 1)) as usize);
        let mut uvs = Vec::with_capacity(positions.capacity());
        for iy in 0..=h {
            let v = iy as f64 / h as f64;
            for ix in 0..=w {
                let u = ix as f64 / w as f64;
                let x = -radius * (u * 2.0 * PI).cos() * (v * PI).sin();
                let y = radius * (v * PI).cos();
                let z = radius * (u * 2.0 * PI).sin() * (v * PI).sin();
                positions.push([x as f32, y as f32, z as f32]);
                uvs.push([u as f32, (1.0 - v) as f32]);
            }
        }

        let row = w + 1;
        let mut indices = Vec::new();
        for iy in 0..h {
            for ix in 0..w {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                // Pole rows collapse to a single triangle per quad.
                if iy != 0 {
                    indices.extend([a, b, d]);
                }
                if iy != h - 1 {
                    indices.extend([b, c, d]);
                }
            }
        }

        Self {
            positions,
            uvs,
            indices,
        }
    }

    /// The panorama sphere, mirrored along x so the texture reads correctly
    /// from inside.
    pub fn panorama() -> Self {
        Self::uv_sphere(
            PANORAMA_RADIUS,
            PANORAMA_WIDTH_SEGMENTS,
            PANORAMA_HEIGHT_SEGMENTS,
        )
        .mirrored_x()
    }

    /// Negates x. Mirroring also flips the facing of every triangle.
    pub fn mirrored_x(mut self) -> Self {
        for p in &mut self.positions {
            p[0] = -p[0];
        }
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panorama_sphere_dimensions() {
        let mesh = SphereMesh::panorama();
        assert_eq!(mesh.vertex_count(), 61 * 41);
        assert_eq!(mesh.triangle_count(), 60 * (2 * 40 - 2));
        assert!(
            mesh.indices
                .iter()
                .all(|&i| (i as usize) < mesh.vertex_count())
        );
    }

    #[test]
    fn vertices_lie_on_the_sphere() {
        let mesh = SphereMesh::panorama();
        for p in &mesh.positions {
            let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert!((r - 500.0).abs() < 1e-2, "radius {r}");
        }
    }

    #[test]
    fn mirroring_negates_x_only() {
        let plain = SphereMesh::uv_sphere(1.0, 8, 4);
        let mirrored = plain.clone().mirrored_x();
        for (a, b) in plain.positions.iter().zip(&mirrored.positions) {
            assert_eq!([-a[0], a[1], a[2]], *b);
        }
        assert_eq!(plain.uvs, mirrored.uvs);
    }
}
