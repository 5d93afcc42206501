//! Viewer configuration, read from `CAMPUS_*` environment variables.

use std::env;
use std::time::Duration;

use foundation::math::LonLat;
use layers::labels::{LabelPolicy, LabelPolicyError};
use streaming::TileTemplate;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A variable is set but does not parse as the expected type.
    Invalid { key: String, value: String },
    Labels { layer: &'static str, source: LabelPolicyError },
    OutOfRange { key: &'static str, reason: &'static str },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => write!(f, "invalid value for {key}: {value:?}"),
            ConfigError::Labels { layer, source } => {
                write!(f, "invalid label policy for {layer}: {source}")
            }
            ConfigError::OutOfRange { key, reason } => write!(f, "{key} {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Labels { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Decimation settings for one labelled layer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LabelSettings {
    pub stride: u32,
    /// Map units per pixel below which every stride-th label shows.
    pub medium_threshold: f64,
    /// Map units per pixel below which every label shows.
    pub fine_threshold: f64,
}

impl LabelSettings {
    pub fn policy(&self, allow_list: &[String]) -> Result<LabelPolicy, LabelPolicyError> {
        Ok(
            LabelPolicy::new(self.stride, self.medium_threshold, self.fine_threshold)?
                .with_allow_list(allow_list.iter().cloned()),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Base URL of the places/media backend.
    pub backend_url: String,
    /// OWS endpoint answering WFS GetFeature and WMS GetMap.
    pub geodata_url: String,
    pub boundaries_type: String,
    pub buildings_type: String,
    pub roads_type: String,
    /// WMS layer list for the optional raster overlay.
    pub overlay_layers: Option<String>,
    pub tile_template: TileTemplate,
    pub center: LonLat,
    pub zoom: f64,
    pub load_timeout: Duration,
    pub poi_labels: LabelSettings,
    pub building_labels: LabelSettings,
    pub road_labels: LabelSettings,
    /// Label texts shown at every resolution.
    pub label_allow_list: Vec<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3000".to_string(),
            geodata_url: "http://localhost:8080/geoserver/cuoiky/ows".to_string(),
            boundaries_type: "cuoiky:boundaries".to_string(),
            buildings_type: "cuoiky:buildings".to_string(),
            roads_type: "cuoiky:roads".to_string(),
            overlay_layers: None,
            tile_template: TileTemplate::default(),
            center: LonLat::new(106.8031, 10.8700),
            zoom: 17.0,
            load_timeout: Duration::from_millis(15_000),
            poi_labels: LabelSettings {
                stride: 5,
                medium_threshold: 3.0,
                fine_threshold: 1.0,
            },
            building_labels: LabelSettings {
                stride: 10,
                medium_threshold: 2.0,
                fine_threshold: 0.6,
            },
            road_labels: LabelSettings {
                stride: 10,
                medium_threshold: 2.0,
                fine_threshold: 0.6,
            },
            label_allow_list: Vec::new(),
        }
    }
}

impl ViewerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from any key lookup; unset keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = Self::default();
        let lookup = &lookup;

        let config = Self {
            backend_url: env_var_string(lookup, "CAMPUS_BACKEND_URL", &d.backend_url),
            geodata_url: env_var_string(lookup, "CAMPUS_GEODATA_URL", &d.geodata_url),
            boundaries_type: env_var_string(lookup, "CAMPUS_BOUNDARIES_TYPE", &d.boundaries_type),
            buildings_type: env_var_string(lookup, "CAMPUS_BUILDINGS_TYPE", &d.buildings_type),
            roads_type: env_var_string(lookup, "CAMPUS_ROADS_TYPE", &d.roads_type),
            overlay_layers: lookup("CAMPUS_WMS_LAYERS")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            tile_template: TileTemplate::new(env_var_string(
                lookup,
                "CAMPUS_TILE_TEMPLATE",
                &d.tile_template.0,
            )),
            center: LonLat::new(
                env_var_f64(lookup, "CAMPUS_CENTER_LON", d.center.lon)?,
                env_var_f64(lookup, "CAMPUS_CENTER_LAT", d.center.lat)?,
            ),
            zoom: env_var_f64(lookup, "CAMPUS_ZOOM", d.zoom)?,
            load_timeout: Duration::from_millis(env_var_u64(
                lookup,
                "CAMPUS_LOAD_TIMEOUT_MS",
                d.load_timeout.as_millis() as u64,
            )?),
            poi_labels: label_settings(lookup, "POI", d.poi_labels)?,
            building_labels: label_settings(lookup, "BUILDINGS", d.building_labels)?,
            road_labels: label_settings(lookup, "ROADS", d.road_labels)?,
            label_allow_list: lookup("CAMPUS_LABEL_ALLOW")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.center.is_finite() || self.center.lat.abs() > 85.0 {
            return Err(ConfigError::OutOfRange {
                key: "CAMPUS_CENTER_LON/LAT",
                reason: "must be a finite coordinate within the Web Mercator range",
            });
        }
        if !self.zoom.is_finite() || !(0.0..=22.0).contains(&self.zoom) {
            return Err(ConfigError::OutOfRange {
                key: "CAMPUS_ZOOM",
                reason: "must be between 0 and 22",
            });
        }
        if self.load_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                key: "CAMPUS_LOAD_TIMEOUT_MS",
                reason: "must be positive",
            });
        }
        self.label_policies().map(|_| ())
    }

    /// Policies for points of interest, buildings and roads, in that order.
    pub fn label_policies(&self) -> Result<[LabelPolicy; 3], ConfigError> {
        let build = |layer: &'static str, settings: &LabelSettings| {
            settings
                .policy(&self.label_allow_list)
                .map_err(|source| ConfigError::Labels { layer, source })
        };
        Ok([
            build("points of interest", &self.poi_labels)?,
            build("buildings", &self.building_labels)?,
            build("roads", &self.road_labels)?,
        ])
    }

    pub fn places_url(&self) -> String {
        format!("{}/places", self.backend_url.trim_end_matches('/'))
    }
}

fn label_settings(
    lookup: &impl Fn(&str) -> Option<String>,
    layer: &str,
    default: LabelSettings,
) -> Result<LabelSettings, ConfigError> {
    Ok(LabelSettings {
        stride: env_var_u32(
            lookup,
            &format!("CAMPUS_{layer}_LABEL_STRIDE"),
            default.stride,
        )?,
        medium_threshold: env_var_f64(
            lookup,
            &format!("CAMPUS_{layer}_LABEL_MEDIUM"),
            default.medium_threshold,
        )?,
        fine_threshold: env_var_f64(
            lookup,
            &format!("CAMPUS_{layer}_LABEL_FINE"),
            default.fine_threshold,
        )?,
    })
}

fn env_var_string(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_var_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: v,
        }),
    }
}

fn env_var_u32(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u32,
) -> Result<u32, ConfigError> {
    env_var_parsed(lookup, key, default)
}

fn env_var_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    env_var_parsed(lookup, key, default)
}

fn env_var_f64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: f64,
) -> Result<f64, ConfigError> {
    env_var_parsed(lookup, key, default)
}
