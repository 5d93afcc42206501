/// WGS84 semi-major axis (meters). Also the sphere radius used by Web Mercator.
pub const WGS84_A: f64 = 6_378_137.0;

/// Geographic coordinates in degrees (EPSG:4326 axis order: lon, lat).
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    /// Longitude wrapped into `[-180, 180)`.
    pub fn wrapped(self) -> Self {
        let lon = (self.lon + 180.0).rem_euclid(360.0) - 180.0;
        Self::new(lon, self.lat)
    }
}

impl std::fmt::Display for LonLat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lon, self.lat)
    }
}
