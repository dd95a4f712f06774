//! Planar geometry provider
//!
//! Implements [`GeometryProvider`] on `geo` polygons in a projected CRS using
//! the exact planar overlay from [`crate::vector`].

use geo::{BoundingRect, Intersects, MultiLineString, MultiPolygon, Polygon};
use parcelgis_core::{Error, Result};
use std::collections::BTreeMap;

use super::{GeometryProvider, GroupKey};
use crate::maybe_rayon::*;
use crate::vector::{
    area_hectares, boundary, dissolve_parts, erase, grow, intersect, overlap_lines, split_by_lines,
};

/// Configuration for the planar provider
#[derive(Debug, Clone, Copy)]
pub struct PlanarConfig {
    /// Distance (CRS units) under which vertices are snapped together and
    /// line overlaps are ignored
    pub snap_tolerance: f64,
    /// Square metres per squared CRS unit (1.0 for metre-based CRSs)
    pub square_metres_per_unit: f64,
}

impl Default for PlanarConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: 1e-6,
            square_metres_per_unit: 1.0,
        }
    }
}

impl PlanarConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.snap_tolerance.is_finite() && self.snap_tolerance > 0.0) {
            return Err(Error::InvalidParameter {
                name: "snap_tolerance",
                value: self.snap_tolerance.to_string(),
                reason: "must be a positive finite distance".into(),
            });
        }
        if !(self.square_metres_per_unit.is_finite() && self.square_metres_per_unit > 0.0) {
            return Err(Error::InvalidParameter {
                name: "square_metres_per_unit",
                value: self.square_metres_per_unit.to_string(),
                reason: "must be a positive finite factor".into(),
            });
        }
        Ok(())
    }
}

/// Geometry provider for planar (projected) coordinates
#[derive(Debug, Clone)]
pub struct PlanarProvider {
    config: PlanarConfig,
}

impl PlanarProvider {
    pub fn new(config: PlanarConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlanarConfig {
        &self.config
    }

    fn tolerance(&self) -> f64 {
        self.config.snap_tolerance
    }
}

impl Default for PlanarProvider {
    fn default() -> Self {
        Self {
            config: PlanarConfig::default(),
        }
    }
}

impl GeometryProvider for PlanarProvider {
    fn split_by_lines(
        &self,
        polygons: &[Polygon<f64>],
        lines: &MultiLineString<f64>,
    ) -> Result<Vec<Polygon<f64>>> {
        let faces = split_by_lines(polygons, lines, self.tolerance());
        if faces.is_empty() && !polygons.is_empty() {
            return Err(Error::geometry(
                "split_by_lines",
                format!("{} input polygons produced no faces", polygons.len()),
            ));
        }
        Ok(faces)
    }

    fn erase(
        &self,
        polygons: &[Polygon<f64>],
        subtract: &[Polygon<f64>],
    ) -> Result<Vec<MultiPolygon<f64>>> {
        Ok(erase(polygons, subtract, self.tolerance()))
    }

    fn intersect(
        &self,
        polygons: &[Polygon<f64>],
        clip: &[Polygon<f64>],
    ) -> Result<Vec<MultiPolygon<f64>>> {
        Ok(intersect(polygons, clip, self.tolerance()))
    }

    fn intersect_lines(
        &self,
        a: &MultiLineString<f64>,
        b: &MultiLineString<f64>,
    ) -> Result<MultiLineString<f64>> {
        Ok(overlap_lines(a, b, self.tolerance()))
    }

    fn union(&self, target: &Polygon<f64>, source: &Polygon<f64>) -> Result<MultiPolygon<f64>> {
        let parts = dissolve_parts(&[target.clone(), source.clone()], self.tolerance());
        if parts.is_empty() {
            return Err(Error::geometry("union", "union of two polygons is empty"));
        }
        Ok(MultiPolygon::new(parts))
    }

    fn dissolve(
        &self,
        features: &[(GroupKey, Polygon<f64>)],
        single_part: bool,
    ) -> Result<Vec<(GroupKey, MultiPolygon<f64>)>> {
        let mut groups: BTreeMap<GroupKey, Vec<Polygon<f64>>> = BTreeMap::new();
        for (key, polygon) in features {
            groups.entry(*key).or_default().push(polygon.clone());
        }

        let mut out = Vec::new();
        for (key, polygons) in groups {
            let parts = dissolve_parts(&polygons, self.tolerance());
            if parts.is_empty() {
                return Err(Error::geometry(
                    "dissolve",
                    format!("group {} dissolved to nothing", key),
                ));
            }
            if single_part {
                out.extend(parts.into_iter().map(|p| (key, MultiPolygon::new(vec![p]))));
            } else {
                out.push((key, MultiPolygon::new(parts)));
            }
        }
        Ok(out)
    }

    fn adjacent(&self, polygon: &Polygon<f64>, pool: &[&Polygon<f64>]) -> Result<Vec<usize>> {
        let tolerance = self.tolerance();
        let Some(rect) = polygon.bounding_rect() else {
            return Ok(Vec::new());
        };
        let reach = grow(rect, tolerance);
        let outline = boundary(polygon);

        let hits: Vec<usize> = (0..pool.len())
            .into_par_iter()
            .filter(|&i| {
                let candidate = pool[i];
                let Some(other) = candidate.bounding_rect() else {
                    return false;
                };
                reach.intersects(&other) && !overlap_lines(&outline, &boundary(candidate), tolerance).0.is_empty()
            })
            .collect();
        Ok(hits)
    }

    fn area_hectares(&self, polygon: &Polygon<f64>) -> f64 {
        area_hectares(polygon, self.config.square_metres_per_unit)
    }
}
