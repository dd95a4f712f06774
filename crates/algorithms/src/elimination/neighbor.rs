//! Merge target selection for undersized parcels

use parcelgis_core::Result;
use tracing::debug;

use super::barrier::BarrierIndex;
use super::store::{Parcel, PolygonId, PolygonStore};
use crate::provider::GeometryProvider;
use crate::vector::boundary;

/// A neighbor a parcel may legally merge into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: PolygonId,
    pub area_hectares: f64,
}

/// Picks the merge target of an undersized parcel.
///
/// A neighbor is legal when it shares at least one line segment with the
/// parcel and that shared boundary does not lie on a barrier. Among legal
/// neighbors the largest wins; equal areas keep the earliest in store order.
pub struct NeighborSelector<'a, P: GeometryProvider> {
    provider: &'a P,
    barriers: &'a BarrierIndex<'a, P>,
}

impl<'a, P: GeometryProvider> NeighborSelector<'a, P> {
    pub fn new(provider: &'a P, barriers: &'a BarrierIndex<'a, P>) -> Self {
        Self { provider, barriers }
    }

    /// Every legal neighbor of `parcel` in `pool`, in pool order
    pub fn legal_neighbors(&self, parcel: &Parcel, pool: &PolygonStore) -> Result<Vec<Candidate>> {
        let candidates: Vec<&Parcel> = pool.iter().filter(|p| p.id != parcel.id).collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let geometries: Vec<_> = candidates.iter().map(|p| &p.geometry).collect();
        let adjacent = self
            .provider
            .adjacent(&parcel.geometry, &geometries)
            .map_err(|e| e.on_polygon(parcel.id))?;

        let outline = boundary(&parcel.geometry);
        let mut legal = Vec::new();
        for i in adjacent {
            let neighbor = candidates[i];
            let shared = self
                .provider
                .intersect_lines(&outline, &boundary(&neighbor.geometry))
                .map_err(|e| e.on_polygon(parcel.id))?;
            if self.provider.count(&shared) == 0 {
                continue;
            }

            match self.barriers.blocking_barrier(&shared).map_err(|e| e.on_polygon(parcel.id))? {
                Some(barrier) => {
                    debug!(
                        polygon = parcel.id,
                        neighbor = neighbor.id,
                        %barrier,
                        "merge blocked by barrier"
                    );
                }
                None => legal.push(Candidate {
                    id: neighbor.id,
                    area_hectares: neighbor.area_hectares,
                }),
            }
        }
        Ok(legal)
    }

    /// Largest legal neighbor of `parcel`, if any
    pub fn select_merge_target(&self, parcel: &Parcel, pool: &PolygonStore) -> Result<Option<PolygonId>> {
        let mut best: Option<Candidate> = None;
        for candidate in self.legal_neighbors(parcel, pool)? {
            if best.map_or(true, |b| candidate.area_hectares > b.area_hectares) {
                best = Some(candidate);
            }
        }
        Ok(best.map(|c| c.id))
    }
}
