//! Feature styling.
//!
//! A [`StyleResolver`] turns a feature and the current resolution into the
//! primitives that draw it. Resolvers are pure: no I/O, no logging, no
//! interior mutability, so the same inputs always give the same output.

use std::sync::Arc;

use foundation::bounds::Aabb2;
use foundation::math::Vec2;
use scene::{Feature, Geometry};
use streaming::{RasterImage, TileCoord};

use crate::labels::{LabelPolicy, LabelStyle};
use crate::symbology::FeatureStyle;
use crate::vector::triangulate_polygon;

#[derive(Debug, Clone, PartialEq)]
pub enum VisualPrimitive {
    Icon {
        at: Vec2,
        symbol: &'static str,
        size_px: f32,
        color: [f32; 4],
    },
    /// Flat triangle list.
    Fill {
        triangles: Vec<Vec2>,
        color: [f32; 4],
    },
    Stroke {
        path: Vec<Vec2>,
        closed: bool,
        color: [f32; 4],
        width_px: f32,
    },
    Text {
        at: Vec2,
        text: String,
        style: LabelStyle,
    },
    Raster {
        image: Arc<RasterImage>,
        extent: Aabb2,
    },
    Tile {
        coord: TileCoord,
        url: String,
        extent: Aabb2,
    },
}

impl VisualPrimitive {
    pub fn is_label(&self) -> bool {
        matches!(self, VisualPrimitive::Text { .. })
    }
}

pub trait StyleResolver: std::fmt::Debug + Send + Sync {
    /// Primitives for `feature` at `resolution` (map meters per pixel).
    ///
    /// Never empty: every feature has at least its base icon, fill or stroke.
    fn resolve(&self, feature: &Feature, resolution: f64) -> Vec<VisualPrimitive>;
}

/// Symbology plus label policy for one vector layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStyleResolver {
    pub style: FeatureStyle,
    pub labels: LabelPolicy,
}

impl LayerStyleResolver {
    pub fn new(style: FeatureStyle, labels: LabelPolicy) -> Self {
        Self { style, labels }
    }

    fn label(&self, feature: &Feature, resolution: f64) -> Option<VisualPrimitive> {
        let text = feature.properties.text(&self.labels.text_key)?;
        if text.chars().count() > self.labels.max_text_len {
            return None;
        }
        if !self.labels.shows_label(&feature.key, &text, resolution) {
            return None;
        }
        Some(VisualPrimitive::Text {
            at: feature.geometry.anchor()?,
            text,
            style: self.style.label.clone(),
        })
    }

    fn icon(&self, at: Vec2) -> VisualPrimitive {
        VisualPrimitive::Icon {
            at,
            symbol: self.style.icon,
            size_px: self.style.icon_size_px,
            color: self.style.stroke,
        }
    }

    fn stroke(&self, path: &[Vec2], closed: bool) -> VisualPrimitive {
        VisualPrimitive::Stroke {
            path: path.to_vec(),
            closed,
            color: self.style.stroke,
            width_px: self.style.stroke_width_px,
        }
    }

    fn area(&self, rings: &[Vec<Vec2>], out: &mut Vec<VisualPrimitive>) {
        if self.style.draws_fill(scene::GeometryKind::Area) {
            let triangles = triangulate_polygon(rings);
            if !triangles.is_empty() {
                out.push(VisualPrimitive::Fill {
                    triangles,
                    color: self.style.fill,
                });
            }
        }
        for ring in rings {
            out.push(self.stroke(ring, true));
        }
    }
}

impl StyleResolver for LayerStyleResolver {
    fn resolve(&self, feature: &Feature, resolution: f64) -> Vec<VisualPrimitive> {
        let mut out = Vec::new();
        match &feature.geometry {
            Geometry::Point(p) => out.push(self.icon(*p)),
            Geometry::MultiPoint(ps) => out.extend(ps.iter().map(|p| self.icon(*p))),
            Geometry::LineString(ps) => out.push(self.stroke(ps, false)),
            Geometry::MultiLineString(lines) => {
                out.extend(lines.iter().map(|l| self.stroke(l, false)))
            }
            Geometry::Polygon(rings) => self.area(rings, &mut out),
            Geometry::MultiPolygon(polys) => {
                for rings in polys {
                    self.area(rings, &mut out);
                }
            }
        }
        if out.is_empty() {
            // Empty multi-geometries still get a marker at their anchor.
            out.push(self.icon(feature.geometry.anchor().unwrap_or(Vec2::ZERO)));
        }
        out.extend(self.label(feature, resolution));
        out
    }
}
