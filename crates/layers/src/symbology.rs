use scene::GeometryKind;

use crate::labels::LabelStyle;

/// How one class of features is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStyle {
    pub fill: [f32; 4],
    pub stroke: [f32; 4],
    pub stroke_width_px: f32,
    /// Symbol drawn for point geometries.
    pub icon: &'static str,
    pub icon_size_px: f32,
    pub label: LabelStyle,
}

impl FeatureStyle {
    pub fn boundaries() -> Self {
        Self {
            fill: [0.0, 0.0, 0.0, 0.0],
            stroke: [0.85, 0.2, 0.2, 1.0],
            stroke_width_px: 2.5,
            ..Self::default()
        }
    }

    pub fn buildings() -> Self {
        Self {
            fill: [0.93, 0.78, 0.55, 0.7],
            stroke: [0.55, 0.4, 0.25, 1.0],
            stroke_width_px: 1.0,
            ..Self::default()
        }
    }

    pub fn roads() -> Self {
        Self {
            stroke: [0.45, 0.45, 0.45, 1.0],
            stroke_width_px: 3.0,
            ..Self::default()
        }
    }

    pub fn points_of_interest() -> Self {
        Self {
            icon: "poi",
            icon_size_px: 24.0,
            label: LabelStyle {
                offset_px: [0.0, -18.0],
                ..LabelStyle::default()
            },
            ..Self::default()
        }
    }

    /// Fully transparent fills are skipped; the outline still draws.
    pub fn draws_fill(&self, kind: GeometryKind) -> bool {
        kind == GeometryKind::Area && self.fill[3] > 0.0
    }
}

impl Default for FeatureStyle {
    fn default() -> Self {
        Self {
            fill: [0.2, 0.5, 0.9, 0.35],
            stroke: [0.2, 0.4, 0.8, 1.0],
            stroke_width_px: 1.5,
            icon: "marker",
            icon_size_px: 16.0,
            label: LabelStyle::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_fill_is_skipped() {
        assert!(!FeatureStyle::boundaries().draws_fill(GeometryKind::Area));
        assert!(FeatureStyle::buildings().draws_fill(GeometryKind::Area));
        assert!(!FeatureStyle::buildings().draws_fill(GeometryKind::Line));
    }
}
