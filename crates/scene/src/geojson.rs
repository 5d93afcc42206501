//! GeoJSON FeatureCollection decoding.
//!
//! Coordinates are read as EPSG:4326 `[lon, lat]` and projected to Web
//! Mercator on the way in, so everything downstream works in map meters.

use std::sync::Arc;

use foundation::math::{LonLat, Vec2, lonlat_to_mercator};
use serde_json::{Map, Value};

use crate::feature::{
    Feature, FeatureId, FeatureKey, FeatureSnapshot, Geometry, LayerId, Properties,
};

#[derive(Debug, Clone, PartialEq)]
pub enum GeoJsonError {
    Json(String),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoJsonError::Json(e) => write!(f, "JSON parse error: {e}"),
            GeoJsonError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            GeoJsonError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for GeoJsonError {}

/// Issues session-local identifiers for features that arrive without one.
pub trait FallbackKeys {
    fn next_fallback(&mut self) -> u64;
}

impl FallbackKeys for u64 {
    fn next_fallback(&mut self) -> u64 {
        *self += 1;
        *self
    }
}

#[derive(Debug)]
pub struct DecodedCollection {
    pub snapshot: FeatureSnapshot,
    /// Features dropped because their geometry was `null`.
    pub skipped: usize,
}

pub fn decode_feature_collection(
    payload: &[u8],
    layer: LayerId,
    fallback: &mut dyn FallbackKeys,
) -> Result<DecodedCollection, GeoJsonError> {
    let value: Value =
        serde_json::from_slice(payload).map_err(|e| GeoJsonError::Json(e.to_string()))?;
    decode_feature_collection_value(&value, layer, fallback)
}

pub fn decode_feature_collection_value(
    value: &Value,
    layer: LayerId,
    fallback: &mut dyn FallbackKeys,
) -> Result<DecodedCollection, GeoJsonError> {
    let obj = value
        .as_object()
        .ok_or(GeoJsonError::NotAFeatureCollection)?;
    if obj.get("type").and_then(|v| v.as_str()) != Some("FeatureCollection") {
        return Err(GeoJsonError::NotAFeatureCollection);
    }
    let features_val = obj
        .get("features")
        .and_then(|v| v.as_array())
        .ok_or(GeoJsonError::NotAFeatureCollection)?;

    let mut features = Vec::with_capacity(features_val.len());
    let mut skipped = 0;
    for (index, feat_val) in features_val.iter().enumerate() {
        let invalid = |reason: &str| GeoJsonError::InvalidFeature {
            index,
            reason: reason.to_string(),
        };
        let feat_obj = feat_val
            .as_object()
            .ok_or_else(|| invalid("feature must be an object"))?;
        if feat_obj.get("type").and_then(|v| v.as_str()) != Some("Feature") {
            return Err(invalid("feature type must be \"Feature\""));
        }

        let properties = feat_obj
            .get("properties")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let geometry = match feat_obj.get("geometry") {
            None | Some(Value::Null) => {
                skipped += 1;
                continue;
            }
            Some(g) => {
                parse_geometry(g).map_err(|reason| GeoJsonError::InvalidFeature { index, reason })?
            }
        };

        let key = match feature_id(feat_obj.get("id")).or_else(|| feature_id(properties.get("id")))
        {
            Some(id) => FeatureKey::Stable(id),
            None => FeatureKey::Fallback(fallback.next_fallback()),
        };

        features.push(Arc::new(Feature {
            key,
            layer,
            geometry,
            properties: Properties::new(properties),
        }));
    }

    Ok(DecodedCollection {
        snapshot: FeatureSnapshot::new(features),
        skipped,
    })
}

fn feature_id(value: Option<&Value>) -> Option<FeatureId> {
    match value? {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(FeatureId::Int(i)),
            None => Some(FeatureId::Text(n.to_string())),
        },
        Value::String(s) if !s.trim().is_empty() => Some(FeatureId::Text(s.trim().to_string())),
        _ => None,
    }
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj: &Map<String, Value> = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;
    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_point(coords)?)),
        "MultiPoint" => Ok(Geometry::MultiPoint(parse_points(coords)?)),
        "LineString" => Ok(Geometry::LineString(parse_points(coords)?)),
        "MultiLineString" => Ok(Geometry::MultiLineString(parse_rings(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_rings(coords)?)),
        "MultiPolygon" => {
            let polys = coords
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
            let mut out = Vec::with_capacity(polys.len());
            for poly in polys {
                out.push(parse_rings(poly)?);
            }
            Ok(Geometry::MultiPolygon(out))
        }
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_point(coords: &Value) -> Result<Vec2, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    let p = LonLat::new(lon, lat);
    if !p.is_finite() {
        return Err("position must be finite".to_string());
    }
    Ok(lonlat_to_mercator(p))
}

fn parse_points(coords: &Value) -> Result<Vec<Vec2>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_rings(coords: &Value) -> Result<Vec<Vec<Vec2>>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array of rings".to_string())?;
    arr.iter().map(parse_points).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::GeometryKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const PLACES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature",
             "geometry": {"type": "Point", "coordinates": [106.8031, 10.8700]},
             "properties": {"id": 1, "name": "Khu A", "image_url": "IMG_001.jpg"}},
            {"type": "Feature",
             "geometry": null,
             "properties": {"id": 2, "name": "Nowhere"}},
            {"type": "Feature",
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]},
             "properties": {"name": "Anonymous"}}
        ]
    }"#;

    #[test]
    fn decodes_places_feed() {
        let mut counter = 0u64;
        let decoded =
            decode_feature_collection(PLACES.as_bytes(), LayerId(4), &mut counter).expect("decode");
        assert_eq!(decoded.skipped, 1);
        let features = &decoded.snapshot.features;
        assert_eq!(features.len(), 2);

        assert_eq!(features[0].key, FeatureKey::Stable(FeatureId::Int(1)));
        assert_eq!(features[0].layer, LayerId(4));
        assert_eq!(features[0].image_url().as_deref(), Some("IMG_001.jpg"));
        assert_eq!(features[0].geometry.kind(), GeometryKind::Point);

        assert_eq!(features[1].key, FeatureKey::Fallback(1));
        assert_eq!(features[1].geometry.kind(), GeometryKind::Area);
    }

    #[test]
    fn top_level_id_wins_over_property_id() {
        let v = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "id": "buildings.12",
                          "geometry": {"type": "Point", "coordinates": [0, 0]},
                          "properties": {"id": 99}}]
        });
        let mut counter = 0u64;
        let decoded = decode_feature_collection_value(&v, LayerId(1), &mut counter).expect("ok");
        assert_eq!(
            decoded.snapshot.features[0].key,
            FeatureKey::Stable(FeatureId::Text("buildings.12".into()))
        );
        assert_eq!(counter, 0);
    }

    #[test]
    fn rejects_non_collections_and_bad_geometry() {
        let mut counter = 0u64;
        let err = decode_feature_collection(b"{\"type\":\"Feature\"}", LayerId(1), &mut counter)
            .expect_err("not a collection");
        assert_eq!(err, GeoJsonError::NotAFeatureCollection);

        let v = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature",
                          "geometry": {"type": "Circle", "coordinates": [0, 0]}}]
        });
        let err = decode_feature_collection_value(&v, LayerId(1), &mut counter).expect_err("bad");
        assert!(matches!(err, GeoJsonError::InvalidFeature { index: 0, .. }));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let mut counter = 0u64;
        let err = decode_feature_collection(b"{", LayerId(1), &mut counter).expect_err("json");
        assert!(matches!(err, GeoJsonError::Json(_)));
    }
}
