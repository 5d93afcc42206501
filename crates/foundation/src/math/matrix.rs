use super::Vec3;

/// Column-major 4x4 matrix (`cols[c][r]`), GL clip-space conventions.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub cols: [[f64; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Right-handed perspective projection mapping depth to `[-1, 1]`.
    pub fn perspective(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Self {
        let f = 1.0 / (fov_y_rad * 0.5).tan();
        let range_inv = 1.0 / (near - far);
        Self {
            cols: [
                [f / aspect, 0.0, 0.0, 0.0],
                [0.0, f, 0.0, 0.0],
                [0.0, 0.0, (near + far) * range_inv, -1.0],
                [0.0, 0.0, 2.0 * near * far * range_inv, 0.0],
            ],
        }
    }

    /// View matrix for an eye looking at `target`.
    ///
    /// Returns `None` when `eye == target` or `up` is parallel to the view direction.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Option<Self> {
        let f = (target - eye).normalized()?;
        let s = f.cross(up).normalized()?;
        let u = s.cross(f);
        Some(Self {
            cols: [
                [s.x, u.x, -f.x, 0.0],
                [s.y, u.y, -f.y, 0.0],
                [s.z, u.z, -f.z, 0.0],
                [-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0],
            ],
        })
    }

    pub fn mul(&self, rhs: &Mat4) -> Mat4 {
        let mut out = [[0.0; 4]; 4];
        for (c, col) in out.iter_mut().enumerate() {
            for (r, cell) in col.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.cols[k][r] * rhs.cols[c][k]).sum();
            }
        }
        Mat4 { cols: out }
    }

    /// Transforms a point and performs the perspective divide.
    pub fn transform_point(&self, p: Vec3) -> Option<Vec3> {
        let v = [p.x, p.y, p.z, 1.0];
        let mut out = [0.0; 4];
        for (r, cell) in out.iter_mut().enumerate() {
            *cell = (0..4).map(|c| self.cols[c][r] * v[c]).sum();
        }
        if out[3].abs() < 1e-12 {
            return None;
        }
        Some(Vec3::new(out[0] / out[3], out[1] / out[3], out[2] / out[3]))
    }

    /// Flattened column-major `f32` values, the layout GPU uniforms expect.
    pub fn to_cols_f32(&self) -> [f32; 16] {
        let mut out = [0.0f32; 16];
        for c in 0..4 {
            for r in 0..4 {
                out[c * 4 + r] = self.cols[c][r] as f32;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Mat4;
    use crate::math::Vec3;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {a} ~= {b}");
    }

    #[test]
    fn identity_is_neutral() {
        let p = Mat4::perspective(1.0, 1.5, 1.0, 100.0);
        assert_eq!(p.mul(&Mat4::IDENTITY), p);
        assert_eq!(Mat4::IDENTITY.mul(&p), p);
    }

    #[test]
    fn look_at_moves_eye_to_origin() {
        let eye = Vec3::new(0.0, 0.0, 0.1);
        let view = Mat4::look_at(eye, Vec3::ZERO, Vec3::Y).expect("view");
        let p = view.transform_point(eye).expect("finite");
        assert_close(p.x, 0.0);
        assert_close(p.y, 0.0);
        assert_close(p.z, 0.0);

        // The target sits straight ahead on -Z.
        let t = view.transform_point(Vec3::ZERO).expect("finite");
        assert_close(t.z, -0.1);
    }

    #[test]
    fn perspective_maps_near_and_far_planes() {
        let p = Mat4::perspective(75f64.to_radians(), 2.0, 1.0, 2000.0);
        let near = p.transform_point(Vec3::new(0.0, 0.0, -1.0)).expect("near");
        let far = p.transform_point(Vec3::new(0.0, 0.0, -2000.0)).expect("far");
        assert_close(near.z, -1.0);
        assert!((far.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn aspect_scales_horizontal_axis_only() {
        let square = Mat4::perspective(1.0, 1.0, 1.0, 10.0);
        let wide = Mat4::perspective(1.0, 2.0, 1.0, 10.0);
        assert_close(wide.cols[0][0] * 2.0, square.cols[0][0]);
        assert_close(wide.cols[1][1], square.cols[1][1]);
    }

    #[test]
    fn degenerate_look_at_is_rejected() {
        assert!(Mat4::look_at(Vec3::ZERO, Vec3::ZERO, Vec3::Y).is_none());
        assert!(Mat4::look_at(Vec3::ZERO, Vec3::new(0.0, 5.0, 0.0), Vec3::Y).is_none());
    }
}
