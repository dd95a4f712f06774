//! Committing a merge into the working set

use geo::Polygon;
use parcelgis_core::{Error, Result};
use tracing::{debug, warn};

use super::store::{PolygonId, PolygonStore};
use crate::provider::{GeometryProvider, GroupKey};

/// What a merge did to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Consumed target id
    pub target: PolygonId,
    /// Consumed source id
    pub source: PolygonId,
    /// Ids of the inserted polygons, normally exactly one
    pub parts: Vec<PolygonId>,
}

impl MergeResult {
    /// The union came back in several pieces
    pub fn is_multipart(&self) -> bool {
        self.parts.len() > 1
    }
}

/// Unions a source parcel into its target and re-inserts the result
pub struct MergeEngine<'a, P: GeometryProvider> {
    provider: &'a P,
}

impl<'a, P: GeometryProvider> MergeEngine<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Merge `source` into `target`.
    ///
    /// Both parcels leave the store; the dissolved union enters it under
    /// fresh ids with measured areas. A disjoint union is not fatal: each
    /// part becomes its own parcel and the result reports it.
    pub fn merge(
        &self,
        store: &mut PolygonStore,
        target: PolygonId,
        source: PolygonId,
    ) -> Result<MergeResult> {
        if target == source {
            return Err(Error::geometry("union", "a polygon cannot merge with itself").on_polygon(source));
        }

        let united = {
            let target_parcel = store.require(target)?;
            let source_parcel = store.require(source)?;
            self.provider
                .union(&target_parcel.geometry, &source_parcel.geometry)
                .map_err(|e| e.on_polygon(source))?
        };

        let key = target as GroupKey;
        let features: Vec<(GroupKey, Polygon<f64>)> = united.0.into_iter().map(|p| (key, p)).collect();
        let parts: Vec<Polygon<f64>> = self
            .provider
            .dissolve(&features, true)
            .map_err(|e| e.on_polygon(source))?
            .into_iter()
            .flat_map(|(_, multi)| self.provider.explode(multi))
            .collect();

        if parts.is_empty() {
            return Err(Error::GeometryOperation {
                operation: "dissolve",
                polygon: Some(source),
                reason: format!("merging into {} produced no polygon", target),
            });
        }

        store.remove(target)?;
        store.remove(source)?;
        let ids: Vec<PolygonId> = parts
            .into_iter()
            .map(|geometry| store.insert(self.provider, geometry))
            .collect();

        if ids.len() > 1 {
            warn!(
                target,
                source,
                parts = ids.len(),
                "merge produced a multi-part result; keeping parts as separate parcels"
            );
        } else {
            debug!(target, source, merged = ids[0], "merged");
        }

        Ok(MergeResult {
            target,
            source,
            parts: ids,
        })
    }
}
