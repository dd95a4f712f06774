//! Barrier layers and the merge veto
//!
//! Quarters are always line work. Rivers come either as center lines or as
//! water-area polygons; for edge testing both are reduced to lines (an area
//! river contributes its outline).

use geo::{MultiLineString, Polygon};
use parcelgis_core::{Error, FeatureCollection, GeometryKind, Result};
use std::fmt;

use crate::provider::GeometryProvider;
use crate::vector::boundary;

/// River barrier, tagged by geometry type
#[derive(Debug, Clone)]
pub enum Rivers {
    /// Center lines: they take part in the initial split directly
    Lines(MultiLineString<f64>),
    /// Water areas: erased from the split parcels afterwards
    Areas(Vec<Polygon<f64>>),
}

impl Rivers {
    /// No rivers at all
    pub fn none() -> Self {
        Rivers::Lines(MultiLineString::new(vec![]))
    }

    /// Classify a river layer by its geometry type
    pub fn from_layer(layer: &FeatureCollection) -> Result<Self> {
        match layer.geometry_kind() {
            GeometryKind::Empty => Ok(Rivers::none()),
            GeometryKind::Line => Ok(Rivers::Lines(layer.lines("rivers")?)),
            GeometryKind::Polygon => Ok(Rivers::Areas(layer.polygons("rivers")?)),
            other => Err(Error::InputType {
                layer: "rivers",
                expected: "line or polygon",
                found: other.to_string(),
            }),
        }
    }

    /// River geometry as line work
    pub fn as_lines(&self) -> MultiLineString<f64> {
        match self {
            Rivers::Lines(lines) => lines.clone(),
            Rivers::Areas(areas) => {
                MultiLineString::new(areas.iter().flat_map(|a| boundary(a).0).collect())
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Rivers::Lines(lines) => lines.0.is_empty(),
            Rivers::Areas(areas) => areas.is_empty(),
        }
    }
}

/// The immutable reference layers a run must not merge across
#[derive(Debug, Clone)]
pub struct BarrierSet {
    pub quarters: MultiLineString<f64>,
    pub rivers: Rivers,
}

impl BarrierSet {
    pub fn new(quarters: MultiLineString<f64>, rivers: Rivers) -> Self {
        Self { quarters, rivers }
    }

    /// Build from feature layers, validating their geometry types
    pub fn from_layers(quarters: &FeatureCollection, rivers: &FeatureCollection) -> Result<Self> {
        Ok(Self {
            quarters: quarters.lines("quarters")?,
            rivers: Rivers::from_layer(rivers)?,
        })
    }
}

/// Which barrier layer vetoed a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierKind {
    Quarter,
    River,
}

impl fmt::Display for BarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarrierKind::Quarter => f.write_str("quarter"),
            BarrierKind::River => f.write_str("river"),
        }
    }
}

/// Answers whether a shared boundary lies on a barrier
pub struct BarrierIndex<'a, P: GeometryProvider> {
    provider: &'a P,
    quarters: MultiLineString<f64>,
    rivers: MultiLineString<f64>,
}

impl<'a, P: GeometryProvider> BarrierIndex<'a, P> {
    pub fn new(provider: &'a P, barriers: &BarrierSet) -> Self {
        Self {
            provider,
            quarters: barriers.quarters.clone(),
            rivers: barriers.rivers.as_lines(),
        }
    }

    /// The first barrier layer (quarters, then rivers) that overlaps `shared`
    /// with nonzero length
    pub fn blocking_barrier(&self, shared: &MultiLineString<f64>) -> Result<Option<BarrierKind>> {
        let on_quarter = self.provider.intersect_lines(shared, &self.quarters)?;
        if self.provider.count(&on_quarter) > 0 {
            return Ok(Some(BarrierKind::Quarter));
        }
        let on_river = self.provider.intersect_lines(shared, &self.rivers)?;
        if self.provider.count(&on_river) > 0 {
            return Ok(Some(BarrierKind::River));
        }
        Ok(None)
    }

    /// True iff `shared` coincides with a quarter or river line anywhere
    pub fn crosses_barrier(&self, shared: &MultiLineString<f64>) -> Result<bool> {
        Ok(self.blocking_barrier(shared)?.is_some())
    }
}
