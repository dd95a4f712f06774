//! Small-parcel elimination under barrier constraints
//!
//! Ground polygons are cut by the quarter and river layers, then every parcel
//! at or below the area threshold is merged into its largest neighbor whose
//! shared boundary does not lie on a barrier. Passes repeat until nothing
//! merges (or the pass bound is hit), and the result is clipped back to the
//! original grounds.
//!
//! ```text
//! grounds ──split──► store ──┬─ measure ─ partition ─ scan ─┐
//!                            └────────── merges > 0 ◄───────┘
//!                                        │ idle
//!                                        ▼
//!                               sanitize ─► parcels + report
//! ```

mod barrier;
mod convergence;
mod merge;
mod neighbor;
mod store;

pub use barrier::{BarrierIndex, BarrierKind, BarrierSet, Rivers};
pub use convergence::{ConvergenceLoop, Phase};
pub use merge::{MergeEngine, MergeResult};
pub use neighbor::{Candidate, NeighborSelector};
pub use store::{Parcel, PolygonId, PolygonStore};

use geo::{Geometry, Polygon};
use parcelgis_core::{Algorithm, AttributeValue, Error, Feature, FeatureCollection, Result};
use std::fmt;

use crate::provider::GeometryProvider;

/// Parameters for small-parcel elimination
#[derive(Debug, Clone)]
pub struct EliminationParams {
    /// Parcels with an area at or below this value (hectares) are merged away
    pub threshold_hectares: f64,
    /// Upper bound on convergence passes
    pub max_passes: usize,
}

impl Default for EliminationParams {
    fn default() -> Self {
        Self {
            threshold_hectares: 1.0,
            max_passes: 100,
        }
    }
}

impl EliminationParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold_hectares.is_finite() && self.threshold_hectares > 0.0) {
            return Err(Error::InvalidParameter {
                name: "threshold_hectares",
                value: self.threshold_hectares.to_string(),
                reason: "must be a positive number of hectares".into(),
            });
        }
        if self.max_passes == 0 {
            return Err(Error::InvalidParameter {
                name: "max_passes",
                value: "0".into(),
                reason: "at least one pass is required".into(),
            });
        }
        Ok(())
    }
}

/// Non-fatal conditions recorded during a run
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// The pass bound stopped the loop while merges were still happening
    NonConvergence { passes: usize, remaining_small: usize },
    /// An output parcel is still at or below the threshold
    Unresolved { id: PolygonId, area_hectares: f64 },
    /// A merge produced a disjoint union; every part was kept
    MultipartMerge {
        target: PolygonId,
        source: PolygonId,
        parts: usize,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NonConvergence {
                passes,
                remaining_small,
            } => write!(
                f,
                "no convergence after {} passes ({} small polygons left)",
                passes, remaining_small
            ),
            Warning::Unresolved { id, area_hectares } => write!(
                f,
                "polygon {} ({:.4} ha) has no legal neighbor and stays undersized",
                id, area_hectares
            ),
            Warning::MultipartMerge {
                target,
                source,
                parts,
            } => write!(
                f,
                "merging {} into {} produced {} separate parts",
                source, target, parts
            ),
        }
    }
}

/// Counters of one convergence pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    /// 1-based pass number
    pub pass: usize,
    /// Polygons in the store when the pass started
    pub polygons: usize,
    /// Polygons at or below the threshold when the pass started
    pub small: usize,
    /// Merges committed during the pass
    pub merges: usize,
}

/// What happened during a run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub passes: Vec<PassSummary>,
    /// Total merges over all passes
    pub merges: usize,
    /// A pass finished without merging anything
    pub converged: bool,
    pub warnings: Vec<Warning>,
    /// Parcels produced by the initial split
    pub split_polygons: usize,
    /// Parcels dropped by the final clip to the grounds
    pub ghosts_removed: usize,
}

/// Final parcels (ids from 1, in output order) plus the run report
#[derive(Debug, Clone)]
pub struct EliminationOutput {
    pub parcels: Vec<Parcel>,
    pub report: RunReport,
}

impl EliminationOutput {
    /// Polygon layer with `id` and `area_ha` attributes
    pub fn to_features(&self) -> FeatureCollection {
        self.parcels
            .iter()
            .map(|parcel| {
                let mut feature = Feature::new(Geometry::Polygon(parcel.geometry.clone()));
                feature.id = Some(parcel.id.to_string());
                feature.set_property("id", AttributeValue::Int(parcel.id as i64));
                feature.set_property("area_ha", AttributeValue::Float(parcel.area_hectares));
                feature
            })
            .collect()
    }

    pub fn total_area(&self) -> f64 {
        self.parcels.iter().map(|p| p.area_hectares).sum()
    }
}

/// Input of [`SmallPolygonElimination`]
#[derive(Debug, Clone)]
pub struct EliminationInput {
    pub grounds: Vec<Polygon<f64>>,
    pub barriers: BarrierSet,
}

/// Small-parcel elimination as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct SmallPolygonElimination<P> {
    provider: P,
}

impl<P: GeometryProvider> SmallPolygonElimination<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: GeometryProvider> Algorithm for SmallPolygonElimination<P> {
    type Input = EliminationInput;
    type Output = EliminationOutput;
    type Params = EliminationParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Small Polygon Elimination"
    }

    fn description(&self) -> &'static str {
        "Merge undersized parcels into their largest neighbor without crossing quarter or river lines"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        eliminate_small_polygons(&self.provider, &input.grounds, &input.barriers, &params)
    }
}

/// Eliminate parcels at or below `params.threshold_hectares`.
///
/// # Arguments
/// * `provider` - Geometry engine for every boolean operation and measurement
/// * `grounds` - Unsplit ground polygons
/// * `barriers` - Quarter and river layers no merge may cross
/// * `params` - Area threshold and pass bound
///
/// # Returns
/// The sanitized parcels and a report of passes, merges and warnings. Any
/// provider failure aborts the run.
pub fn eliminate_small_polygons<P: GeometryProvider>(
    provider: &P,
    grounds: &[Polygon<f64>],
    barriers: &BarrierSet,
    params: &EliminationParams,
) -> Result<EliminationOutput> {
    params.validate()?;
    ConvergenceLoop::new(provider, params).run(grounds, barriers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PlanarProvider;
    use approx::assert_relative_eq;
    use geo::{LineString, MultiLineString};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )
    }

    #[test]
    fn test_params_validation() {
        assert!(EliminationParams::default().validate().is_ok());
        for threshold in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let params = EliminationParams {
                threshold_hectares: threshold,
                ..Default::default()
            };
            assert!(matches!(
                params.validate(),
                Err(Error::InvalidParameter { name: "threshold_hectares", .. })
            ));
        }
        let params = EliminationParams {
            max_passes: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_invalid_threshold_aborts_before_work() {
        let provider = PlanarProvider::default();
        let barriers = BarrierSet::new(MultiLineString::new(vec![]), Rivers::none());
        let params = EliminationParams {
            threshold_hectares: -0.5,
            ..Default::default()
        };
        let result = eliminate_small_polygons(&provider, &[rect(0.0, 0.0, 10.0, 10.0)], &barriers, &params);
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_algorithm_trait() {
        let algo = SmallPolygonElimination::new(PlanarProvider::default());
        assert_eq!(algo.name(), "Small Polygon Elimination");

        let input = EliminationInput {
            grounds: vec![rect(0.0, 0.0, 200.0, 100.0), rect(200.0, 0.0, 210.0, 100.0)],
            barriers: BarrierSet::new(MultiLineString::new(vec![]), Rivers::none()),
        };
        let output = algo.execute_default(input).unwrap();
        assert_eq!(output.parcels.len(), 1);
        assert_relative_eq!(output.total_area(), 2.1, epsilon = 1e-9);
    }

    #[test]
    fn test_to_features_attributes() {
        let output = EliminationOutput {
            parcels: vec![Parcel {
                id: 1,
                area_hectares: 2.5,
                geometry: rect(0.0, 0.0, 1.0, 1.0),
            }],
            report: RunReport::default(),
        };
        let layer = output.to_features();
        assert_eq!(layer.len(), 1);
        let feature = &layer.features[0];
        assert_eq!(feature.get_property("id"), Some(&AttributeValue::Int(1)));
        assert_eq!(feature.get_property("area_ha"), Some(&AttributeValue::Float(2.5)));
        assert_eq!(feature.id.as_deref(), Some("1"));
    }

    #[test]
    fn test_warning_display() {
        let w = Warning::NonConvergence {
            passes: 3,
            remaining_small: 2,
        };
        assert_eq!(w.to_string(), "no convergence after 3 passes (2 small polygons left)");
        let w = Warning::MultipartMerge {
            target: 4,
            source: 9,
            parts: 2,
        };
        assert!(w.to_string().contains("merging 9 into 4"));
    }
}
