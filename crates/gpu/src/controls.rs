//! Rotation-only orbit controls for looking around inside a panorama.
//!
//! Dragging turns the camera around its target; wheel and pan input are
//! ignored. A full-height vertical drag turns the view by
//! `2π · rotate_speed`.

use std::f64::consts::PI;

use foundation::math::Vec3;

use crate::camera::PerspectiveCamera;

const POLAR_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub rotate_speed: f64,
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub min_polar: f64,
    pub max_polar: f64,
    /// Azimuth around +y, measured from +z.
    theta: f64,
    /// Angle from +y.
    phi: f64,
    radius: f64,
    target: Vec3,
    viewport_height_px: f64,
    dragging: bool,
    last_pos_px: [f64; 2],
}

impl OrbitControls {
    /// Controls seeded from the camera's current placement.
    pub fn new(camera: &PerspectiveCamera, viewport_height_px: u32) -> Self {
        let offset = camera.position - camera.target;
        let radius = offset.length();
        let (theta, phi) = if radius > 0.0 {
            (
                offset.x.atan2(offset.z),
                (offset.y / radius).clamp(-1.0, 1.0).acos(),
            )
        } else {
            (0.0, PI * 0.5)
        };
        Self {
            rotate_speed: 0.5,
            enable_zoom: false,
            enable_pan: false,
            min_polar: 0.0,
            max_polar: PI,
            theta,
            phi,
            radius,
            target: camera.target,
            viewport_height_px: viewport_height_px.max(1) as f64,
            dragging: false,
            last_pos_px: [0.0, 0.0],
        }
    }

    pub fn azimuth(&self) -> f64 {
        self.theta
    }

    pub fn polar(&self) -> f64 {
        self.phi
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn set_viewport_height(&mut self, height_px: u32) {
        self.viewport_height_px = height_px.max(1) as f64;
    }

    pub fn on_pointer_down(&mut self, pos_px: [f64; 2], button: PointerButton) {
        // Non-primary buttons only rotate when `enable_pan` is set.
        if button != PointerButton::Primary && !self.enable_pan {
            return;
        }
        self.dragging = true;
        self.last_pos_px = pos_px;
    }

    pub fn on_pointer_move(&mut self, pos_px: [f64; 2]) {
        if !self.dragging {
            return;
        }
        let dx = pos_px[0] - self.last_pos_px[0];
        let dy = pos_px[1] - self.last_pos_px[1];
        self.last_pos_px = pos_px;

        let per_px = 2.0 * PI * self.rotate_speed / self.viewport_height_px;
        self.theta -= dx * per_px;
        self.phi -= dy * per_px;
        self.clamp_polar();
    }

    pub fn on_pointer_up(&mut self) {
        self.dragging = false;
    }

    /// Returns `true` if the wheel changed anything.
    pub fn on_wheel(&mut self, _delta: f64) -> bool {
        self.enable_zoom
    }

    /// Writes the orbit position into `camera`.
    pub fn update(&self, camera: &mut PerspectiveCamera) {
        let sin_phi = self.phi.sin();
        let offset = Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        );
        camera.target = self.target;
        camera.position = self.target + offset;
    }

    fn clamp_polar(&mut self) {
        let lo = self.min_polar.max(POLAR_EPSILON);
        let hi = self.max_polar.min(PI - POLAR_EPSILON);
        self.phi = self.phi.clamp(lo, hi);
    }
}
