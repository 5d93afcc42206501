use std::sync::Arc;

use foundation::math::LonLat;

use crate::feature::Feature;

/// The single active selection.
///
/// Either nothing is selected (and the readout shows the last clicked
/// coordinate) or exactly one feature is, optionally linked to a panorama.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    None {
        coordinate: Option<LonLat>,
    },
    Feature {
        feature: Arc<Feature>,
        /// Media URL currently shown in the panorama viewer, if any.
        panorama_url: Option<String>,
    },
}

impl Default for Selection {
    fn default() -> Self {
        Selection::None { coordinate: None }
    }
}

impl Selection {
    pub fn feature(&self) -> Option<&Arc<Feature>> {
        match self {
            Selection::Feature { feature, .. } => Some(feature),
            Selection::None { .. } => None,
        }
    }

    pub fn panorama_url(&self) -> Option<&str> {
        match self {
            Selection::Feature { panorama_url, .. } => panorama_url.as_deref(),
            Selection::None { .. } => None,
        }
    }

    pub fn coordinate(&self) -> Option<LonLat> {
        match self {
            Selection::None { coordinate } => *coordinate,
            Selection::Feature { .. } => None,
        }
    }

    /// Replaces whatever was selected. Returns the previous selection.
    pub fn select(&mut self, feature: Arc<Feature>, panorama_url: Option<String>) -> Selection {
        std::mem::replace(
            self,
            Selection::Feature {
                feature,
                panorama_url,
            },
        )
    }

    pub fn clear_at(&mut self, coordinate: LonLat) -> Selection {
        std::mem::replace(
            self,
            Selection::None {
                coordinate: Some(coordinate),
            },
        )
    }

    /// Drops the panorama link but keeps the feature's attributes selected.
    pub fn unlink_panorama(&mut self) {
        if let Selection::Feature { panorama_url, .. } = self {
            *panorama_url = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FeatureId, FeatureKey, Geometry, LayerId, Properties};
    use foundation::math::Vec2;

    fn feature(id: i64) -> Arc<Feature> {
        Arc::new(Feature {
            key: FeatureKey::Stable(FeatureId::Int(id)),
            layer: LayerId(1),
            geometry: Geometry::Point(Vec2::ZERO),
            properties: Properties::default(),
        })
    }

    #[test]
    fn selecting_replaces_previous_selection() {
        let mut s = Selection::default();
        s.select(feature(1), Some("a".into()));
        let prev = s.select(feature(2), None);
        assert_eq!(prev.feature().map(|f| f.key.to_string()), Some("1".into()));
        assert_eq!(s.feature().map(|f| f.key.to_string()), Some("2".into()));
        assert!(s.panorama_url().is_none());
    }

    #[test]
    fn empty_click_clears_and_records_coordinate() {
        let mut s = Selection::default();
        s.select(feature(1), Some("a".into()));
        s.clear_at(LonLat::new(1.0, 2.0));
        assert!(s.feature().is_none());
        assert_eq!(s.coordinate(), Some(LonLat::new(1.0, 2.0)));
    }

    #[test]
    fn unlink_keeps_attributes() {
        let mut s = Selection::default();
        s.select(feature(1), Some("a".into()));
        s.unlink_panorama();
        assert!(s.feature().is_some());
        assert!(s.panorama_url().is_none());
    }
}
