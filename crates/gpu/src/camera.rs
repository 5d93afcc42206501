use foundation::math::{Mat4, Vec3};

/// Vertical field of view of the panorama camera.
pub const PANORAMA_FOV_Y_DEG: f64 = 75.0;
pub const PANORAMA_NEAR: f64 = 1.0;
pub const PANORAMA_FAR: f64 = 2000.0;
/// The eye sits just off the sphere centre so orbiting has a radius to work with.
pub const PANORAMA_EYE_OFFSET: f64 = 0.1;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    fov_y_deg: f64,
    aspect: f64,
    near: f64,
    far: f64,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_y_deg: f64, aspect: f64, near: f64, far: f64) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            fov_y_deg,
            aspect: sanitize_aspect(aspect),
            near,
            far,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection();
        camera
    }

    /// Camera placed inside the panorama sphere, looking at its centre.
    pub fn panorama(size_px: [u32; 2]) -> Self {
        let mut camera = Self::new(
            PANORAMA_FOV_Y_DEG,
            aspect_for(size_px),
            PANORAMA_NEAR,
            PANORAMA_FAR,
        );
        camera.position = Vec3::new(0.0, 0.0, PANORAMA_EYE_OFFSET);
        camera
    }

    pub fn aspect(&self) -> f64 {
        self.aspect
    }

    pub fn fov_y_deg(&self) -> f64 {
        self.fov_y_deg
    }

    /// Updates the aspect ratio and the projection with it.
    pub fn set_aspect(&mut self, aspect: f64) {
        self.aspect = sanitize_aspect(aspect);
        self.update_projection();
    }

    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    pub fn view(&self) -> Option<Mat4> {
        Mat4::look_at(self.position, self.target, Vec3::Y)
    }

    pub fn view_projection(&self) -> Option<Mat4> {
        Some(self.projection.mul(&self.view()?))
    }

    fn update_projection(&mut self) {
        self.projection = Mat4::perspective(
            self.fov_y_deg.to_radians(),
            self.aspect,
            self.near,
            self.far,
        );
    }
}

pub fn aspect_for(size_px: [u32; 2]) -> f64 {
    size_px[0].max(1) as f64 / size_px[1].max(1) as f64
}

fn sanitize_aspect(aspect: f64) -> f64 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panorama_camera_defaults() {
        let cam = PerspectiveCamera::panorama([1600, 900]);
        assert_eq!(cam.fov_y_deg(), 75.0);
        assert!((cam.aspect() - 16.0 / 9.0).abs() < 1e-12);
        assert_eq!(cam.position, Vec3::new(0.0, 0.0, 0.1));
        assert!(cam.view_projection().is_some());
    }

    #[test]
    fn set_aspect_recomputes_projection() {
        let mut cam = PerspectiveCamera::panorama([800, 800]);
        let before = *cam.projection();
        cam.set_aspect(2.0);
        assert_ne!(before, *cam.projection());
        assert_eq!(*cam.projection(), Mat4::perspective(75f64.to_radians(), 2.0, 1.0, 2000.0));
    }

    #[test]
    fn degenerate_sizes_fall_back_to_square() {
        assert_eq!(aspect_for([0, 0]), 1.0);
        let mut cam = PerspectiveCamera::panorama([10, 10]);
        cam.set_aspect(f64::NAN);
        assert_eq!(cam.aspect(), 1.0);
    }
}
