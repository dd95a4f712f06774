//! # parcelgis Algorithms
//!
//! Parcel generalization for parcelgis.
//!
//! ## Modules
//!
//! - **elimination**: split grounds along quarter and river lines, merge
//!   undersized parcels into their largest legal neighbor, clip to grounds
//! - **provider**: the geometry-engine seam and its planar implementation
//! - **vector**: planar overlay (split, dissolve, erase, intersect), line
//!   overlap and measurements

pub mod elimination;
pub mod provider;
pub mod vector;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::elimination::{
        eliminate_small_polygons, BarrierSet, EliminationInput, EliminationOutput,
        EliminationParams, Parcel, PolygonId, PolygonStore, Rivers, RunReport,
        SmallPolygonElimination, Warning,
    };
    pub use crate::provider::{GeometryProvider, PlanarConfig, PlanarProvider};
    pub use parcelgis_core::prelude::*;
}
