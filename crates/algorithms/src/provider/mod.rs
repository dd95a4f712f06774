//! Geometry provider seam
//!
//! The elimination algorithm never touches coordinates directly. Every
//! boolean operation, measurement and spatial predicate it needs goes through
//! [`GeometryProvider`], so the selection and merge-ordering logic stays
//! independent of the geometry engine underneath.

mod planar;

pub use planar::{PlanarConfig, PlanarProvider};

use geo::{MultiLineString, MultiPolygon, Polygon};
use parcelgis_core::Result;

/// Key used to group features in [`GeometryProvider::dissolve`]
pub type GroupKey = i64;

/// Polygon operations the elimination algorithm relies on.
///
/// Implementations must be deterministic: the same inputs always produce the
/// same outputs in the same order.
pub trait GeometryProvider: Send + Sync {
    /// Planar subdivision of `polygons` by every line in `lines`.
    ///
    /// Only faces lying inside an input polygon are returned.
    fn split_by_lines(
        &self,
        polygons: &[Polygon<f64>],
        lines: &MultiLineString<f64>,
    ) -> Result<Vec<Polygon<f64>>>;

    /// Boolean difference, one result per input polygon
    fn erase(
        &self,
        polygons: &[Polygon<f64>],
        subtract: &[Polygon<f64>],
    ) -> Result<Vec<MultiPolygon<f64>>>;

    /// Boolean intersection with the union of `clip`, one result per input polygon
    fn intersect(
        &self,
        polygons: &[Polygon<f64>],
        clip: &[Polygon<f64>],
    ) -> Result<Vec<MultiPolygon<f64>>>;

    /// Nonzero-length overlap of two sets of line work (may be empty)
    fn intersect_lines(
        &self,
        a: &MultiLineString<f64>,
        b: &MultiLineString<f64>,
    ) -> Result<MultiLineString<f64>>;

    /// Number of line features, used as an existence test
    fn count(&self, lines: &MultiLineString<f64>) -> usize {
        lines.0.len()
    }

    /// Geometric union of `source` into `target`
    fn union(&self, target: &Polygon<f64>, source: &Polygon<f64>) -> Result<MultiPolygon<f64>>;

    /// Merge features sharing a key.
    ///
    /// With `single_part` every output entry holds exactly one polygon and a
    /// key may appear several times; otherwise each key appears once.
    fn dissolve(
        &self,
        features: &[(GroupKey, Polygon<f64>)],
        single_part: bool,
    ) -> Result<Vec<(GroupKey, MultiPolygon<f64>)>>;

    /// Indices of the `pool` polygons sharing at least one line segment with `polygon`
    fn adjacent(&self, polygon: &Polygon<f64>, pool: &[&Polygon<f64>]) -> Result<Vec<usize>>;

    /// Area of a polygon in hectares
    fn area_hectares(&self, polygon: &Polygon<f64>) -> f64;

    /// Multipart to singlepart
    fn explode(&self, multi: MultiPolygon<f64>) -> Vec<Polygon<f64>> {
        multi.0
    }
}
