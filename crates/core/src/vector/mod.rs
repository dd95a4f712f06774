//! Vector feature layers
//!
//! A layer is a [`FeatureCollection`] of [`Feature`]s, each pairing a
//! `geo-types` geometry with a small attribute table. The elimination
//! algorithms work on bare polygons and lines, so this module also knows how
//! to classify a layer by geometry type and flatten it into the shape the
//! algorithms expect.

use geo_types::{Geometry, LineString, MultiLineString, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: HashMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Geometry kind shared by every feature with a geometry
    pub fn geometry_kind(&self) -> GeometryKind {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .map(GeometryKind::of)
            .fold(GeometryKind::Empty, GeometryKind::combine)
    }

    /// All polygons in the layer, with multi-polygons split into parts.
    ///
    /// Fails with [`Error::InputType`] unless the layer is a polygon layer
    /// (an empty layer yields no polygons).
    pub fn polygons(&self, layer: &'static str) -> Result<Vec<Polygon<f64>>> {
        self.expect_kind(layer, GeometryKind::Polygon)?;
        let mut out = Vec::new();
        for geom in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            match geom {
                Geometry::Polygon(p) => out.push(p.clone()),
                Geometry::MultiPolygon(mp) => out.extend(mp.0.iter().cloned()),
                Geometry::Rect(r) => out.push(r.to_polygon()),
                Geometry::Triangle(t) => out.push(t.to_polygon()),
                _ => {}
            }
        }
        Ok(out)
    }

    /// All line work in the layer as one multi-line string.
    ///
    /// Fails with [`Error::InputType`] unless the layer is a line layer.
    pub fn lines(&self, layer: &'static str) -> Result<MultiLineString<f64>> {
        self.expect_kind(layer, GeometryKind::Line)?;
        let mut out: Vec<LineString<f64>> = Vec::new();
        for geom in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            match geom {
                Geometry::LineString(ls) => out.push(ls.clone()),
                Geometry::MultiLineString(mls) => out.extend(mls.0.iter().cloned()),
                Geometry::Line(l) => out.push(LineString::from(vec![l.start, l.end])),
                _ => {}
            }
        }
        Ok(MultiLineString::new(out))
    }

    fn expect_kind(&self, layer: &'static str, expected: GeometryKind) -> Result<()> {
        match self.geometry_kind() {
            GeometryKind::Empty => Ok(()),
            kind if kind == expected => Ok(()),
            kind => Err(Error::InputType {
                layer,
                expected: expected.name(),
                found: kind.to_string(),
            }),
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

/// Dimension of the geometries in a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    /// No feature carries a geometry
    Empty,
    Point,
    Line,
    Polygon,
    /// Features of different dimensions, or geometry collections
    Mixed,
}

impl GeometryKind {
    pub fn of(geom: &Geometry<f64>) -> Self {
        match geom {
            Geometry::Point(_) | Geometry::MultiPoint(_) => GeometryKind::Point,
            Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                GeometryKind::Line
            }
            Geometry::Polygon(_)
            | Geometry::MultiPolygon(_)
            | Geometry::Rect(_)
            | Geometry::Triangle(_) => GeometryKind::Polygon,
            Geometry::GeometryCollection(_) => GeometryKind::Mixed,
        }
    }

    fn combine(self, other: GeometryKind) -> GeometryKind {
        match (self, other) {
            (GeometryKind::Empty, k) | (k, GeometryKind::Empty) => k,
            (a, b) if a == b => a,
            _ => GeometryKind::Mixed,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GeometryKind::Empty => "empty",
            GeometryKind::Point => "point",
            GeometryKind::Line => "line",
            GeometryKind::Polygon => "polygon",
            GeometryKind::Mixed => "mixed",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
