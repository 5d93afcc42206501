use std::sync::Arc;

use foundation::bounds::Aabb2;
use foundation::math::Vec2;
use serde_json::{Map, Value};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u64);

/// Identifier supplied by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureId::Int(n) => write!(f, "{n}"),
            FeatureId::Text(s) => f.write_str(s),
        }
    }
}

/// Identity of a feature within a session.
///
/// `Fallback` keys are handed out by the loading source when the payload
/// carries no identifier. They are unique for the session but are *not*
/// stable across refreshes, so anything derived from them (label decimation
/// in particular) may change after a reload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureKey {
    Stable(FeatureId),
    Fallback(u64),
}

impl FeatureKey {
    pub fn is_stable(&self) -> bool {
        matches!(self, FeatureKey::Stable(_))
    }
}

impl std::fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKey::Stable(id) => write!(f, "{id}"),
            FeatureKey::Fallback(n) => write!(f, "~{n}"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    Line,
    Area,
}

/// Feature geometry in projected map units (EPSG:3857 meters).
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Vec2),
    MultiPoint(Vec<Vec2>),
    LineString(Vec<Vec2>),
    MultiLineString(Vec<Vec<Vec2>>),
    /// Outer ring first, then holes.
    Polygon(Vec<Vec<Vec2>>),
    MultiPolygon(Vec<Vec<Vec<Vec2>>>),
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) | Geometry::MultiPoint(_) => GeometryKind::Point,
            Geometry::LineString(_) | Geometry::MultiLineString(_) => GeometryKind::Line,
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => GeometryKind::Area,
        }
    }

    pub fn bounds(&self) -> Option<Aabb2> {
        match self {
            Geometry::Point(p) => Aabb2::from_points([p]),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => Aabb2::from_points(ps),
            Geometry::MultiLineString(lines) => Aabb2::from_points(lines.iter().flatten()),
            Geometry::Polygon(rings) => Aabb2::from_points(rings.first()?),
            Geometry::MultiPolygon(polys) => {
                Aabb2::from_points(polys.iter().filter_map(|rings| rings.first()).flatten())
            }
        }
    }

    /// Where a label or icon for this geometry is placed.
    pub fn anchor(&self) -> Option<Vec2> {
        match self {
            Geometry::Point(p) => Some(*p),
            Geometry::MultiPoint(ps) => ps.first().copied(),
            Geometry::LineString(ps) => line_midpoint(ps),
            Geometry::MultiLineString(lines) => lines
                .iter()
                .max_by_key(|l| l.len())
                .and_then(|l| line_midpoint(l)),
            Geometry::Polygon(rings) => ring_centroid(rings.first()?),
            Geometry::MultiPolygon(polys) => polys
                .iter()
                .filter_map(|rings| rings.first())
                .max_by_key(|r| r.len())
                .and_then(|r| ring_centroid(r)),
        }
    }
}

fn line_midpoint(vertices: &[Vec2]) -> Option<Vec2> {
    if vertices.len() < 2 {
        return vertices.first().copied();
    }

    let total: f64 = vertices.windows(2).map(|w| (w[1] - w[0]).length()).sum();
    if !total.is_finite() || total <= 0.0 {
        return vertices.first().copied();
    }

    let target = total * 0.5;
    let mut acc = 0.0;
    for w in vertices.windows(2) {
        let len = (w[1] - w[0]).length();
        if len > 0.0 && acc + len >= target {
            let t = (target - acc) / len;
            return Some(w[0] + (w[1] - w[0]).scale(t));
        }
        acc += len;
    }
    vertices.last().copied()
}

fn ring_centroid(ring: &[Vec2]) -> Option<Vec2> {
    let pts: Vec<Vec2> = ring.iter().copied().filter(|p| p.is_finite()).collect();
    if pts.is_empty() {
        return None;
    }
    let sum = pts.iter().fold(Vec2::ZERO, |acc, p| acc + *p);
    Some(sum.scale(1.0 / pts.len() as f64))
}

/// Attribute mapping of a feature, in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Properties(pub Map<String, Value>);

impl Properties {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String view of an attribute; numbers are rendered, blank strings are `None`.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<String> {
        self.text("name")
    }

    pub fn category(&self) -> Option<String> {
        self.text("category")
    }

    pub fn building(&self) -> Option<String> {
        self.text("building")
    }

    pub fn image_url(&self) -> Option<String> {
        self.text("image_url")
    }

    pub fn description(&self) -> Option<String> {
        self.text("description")
    }

    pub fn location(&self) -> Option<String> {
        self.text("location")
    }
}

/// One discrete geographic entity. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub key: FeatureKey,
    pub layer: LayerId,
    pub geometry: Geometry,
    pub properties: Properties,
}

impl Feature {
    pub fn name(&self) -> Option<String> {
        self.properties.name()
    }

    pub fn image_url(&self) -> Option<String> {
        self.properties.image_url()
    }
}

/// An immutable, fully-decoded feature set.
///
/// Sources swap whole snapshots behind an `Arc`, so readers either see the
/// previous set or the new one, never a mix.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureSnapshot {
    pub features: Vec<Arc<Feature>>,
    pub bounds: Option<Aabb2>,
}

impl FeatureSnapshot {
    pub fn new(features: Vec<Arc<Feature>>) -> Self {
        let bounds = features
            .iter()
            .filter_map(|f| f.geometry.bounds())
            .reduce(|a, b| a.union(&b));
        Self { features, bounds }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
