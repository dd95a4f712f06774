//! Pass loop driving the elimination to a fixed point

use geo::Polygon;
use parcelgis_core::{Error, Result};
use std::collections::BTreeMap;
use std::mem;
use tracing::{debug, info, warn};

use super::barrier::{BarrierIndex, BarrierSet, Rivers};
use super::merge::MergeEngine;
use super::neighbor::NeighborSelector;
use super::store::{PolygonId, PolygonStore};
use super::{EliminationOutput, EliminationParams, PassSummary, RunReport, Warning};
use crate::provider::GeometryProvider;

/// States of a run. Measuring, Partitioning and Scanning repeat once per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Splitting,
    Measuring,
    Partitioning,
    Scanning,
    Sanitizing,
    Done,
}

/// Clipped parcels and where each came from
struct Sanitized {
    store: PolygonStore,
    /// Output id to the id it had before clipping
    sources: BTreeMap<PolygonId, PolygonId>,
    ghosts: usize,
}

/// Runs split, merge passes and sanitation over one set of grounds
pub struct ConvergenceLoop<'a, P: GeometryProvider> {
    provider: &'a P,
    params: &'a EliminationParams,
}

impl<'a, P: GeometryProvider> ConvergenceLoop<'a, P> {
    pub fn new(provider: &'a P, params: &'a EliminationParams) -> Self {
        Self { provider, params }
    }

    /// Run to completion.
    ///
    /// The store lives only inside this call; an error on any provider
    /// operation drops it and nothing is returned.
    pub fn run(&self, grounds: &[Polygon<f64>], barriers: &BarrierSet) -> Result<EliminationOutput> {
        let threshold = self.params.threshold_hectares;
        let index = BarrierIndex::new(self.provider, barriers);
        let selector = NeighborSelector::new(self.provider, &index);
        let engine = MergeEngine::new(self.provider);

        let mut report = RunReport::default();
        let mut store = PolygonStore::new();
        let mut small: Vec<PolygonId> = Vec::new();
        let mut stranded: Vec<PolygonId> = Vec::new();
        let mut pass = 0;
        let mut output = PolygonStore::new();
        let mut phase = Phase::Splitting;

        loop {
            debug!(?phase, pass, "phase");
            phase = match phase {
                Phase::Splitting => {
                    let pieces = self.split(grounds, barriers)?;
                    report.split_polygons = pieces.len();
                    info!(grounds = grounds.len(), parcels = pieces.len(), "split grounds along barriers");
                    store = PolygonStore::from_polygons(self.provider, pieces);
                    Phase::Measuring
                }
                Phase::Measuring => {
                    pass += 1;
                    store.measure(self.provider);
                    Phase::Partitioning
                }
                Phase::Partitioning => {
                    small = store.partition(threshold);
                    Phase::Scanning
                }
                Phase::Scanning => {
                    let polygons = store.len();
                    let merges = self.scan(&mut store, &small, &selector, &engine, &mut report.warnings)?;
                    info!(pass, polygons, small = small.len(), merges, "pass complete");
                    report.passes.push(PassSummary {
                        pass,
                        polygons,
                        small: small.len(),
                        merges,
                    });
                    report.merges += merges;

                    if merges == 0 {
                        report.converged = true;
                        // a pass without merges proves none of these has a legal neighbor
                        stranded = store.partition(threshold);
                        Phase::Sanitizing
                    } else if pass >= self.params.max_passes {
                        let remaining_small = store.partition(threshold).len();
                        warn!(
                            passes = pass,
                            remaining_small,
                            "pass limit reached before convergence"
                        );
                        report.warnings.push(Warning::NonConvergence {
                            passes: pass,
                            remaining_small,
                        });
                        Phase::Sanitizing
                    } else {
                        Phase::Measuring
                    }
                }
                Phase::Sanitizing => {
                    let sanitized = self.sanitize(mem::take(&mut store), grounds)?;
                    report.ghosts_removed = sanitized.ghosts;
                    report.warnings.extend(unresolved(&sanitized, &stranded));
                    output = sanitized.store;
                    Phase::Done
                }
                Phase::Done => break,
            };
        }

        info!(
            parcels = output.len(),
            passes = report.passes.len(),
            merges = report.merges,
            warnings = report.warnings.len(),
            "elimination finished"
        );

        Ok(EliminationOutput {
            parcels: output.into_parcels(),
            report,
        })
    }

    /// Cut the grounds along quarters and rivers into single-part parcels
    fn split(&self, grounds: &[Polygon<f64>], barriers: &BarrierSet) -> Result<Vec<Polygon<f64>>> {
        match &barriers.rivers {
            Rivers::Lines(rivers) => {
                let mut lines = barriers.quarters.clone();
                lines.0.extend(rivers.0.iter().cloned());
                self.provider.split_by_lines(grounds, &lines)
            }
            Rivers::Areas(areas) => {
                let pieces = self.provider.split_by_lines(grounds, &barriers.quarters)?;
                let erased = self.provider.erase(&pieces, areas)?;
                Ok(erased
                    .into_iter()
                    .flat_map(|multi| self.provider.explode(multi))
                    .collect())
            }
        }
    }

    /// One pass over the small parcels. Returns the number of merges.
    fn scan(
        &self,
        store: &mut PolygonStore,
        small: &[PolygonId],
        selector: &NeighborSelector<'_, P>,
        engine: &MergeEngine<'_, P>,
        warnings: &mut Vec<Warning>,
    ) -> Result<usize> {
        let mut merges = 0;
        for &id in small {
            // consumed by an earlier merge of this pass
            let Some(parcel) = store.get(id) else {
                continue;
            };
            let Some(target) = selector.select_merge_target(parcel, store)? else {
                debug!(polygon = id, "no legal neighbor");
                continue;
            };

            let result = engine.merge(store, target, id)?;
            if result.is_multipart() {
                warnings.push(Warning::MultipartMerge {
                    target,
                    source: id,
                    parts: result.parts.len(),
                });
            }
            merges += 1;
        }
        Ok(merges)
    }

    /// Clip every parcel to the original grounds and renumber from 1.
    ///
    /// Every output parcel remembers the id it was clipped from; parcels that
    /// vanish are counted as ghosts.
    fn sanitize(&self, store: PolygonStore, grounds: &[Polygon<f64>]) -> Result<Sanitized> {
        let parcels = store.into_parcels();
        if parcels.is_empty() {
            return Ok(Sanitized {
                store: PolygonStore::new(),
                sources: BTreeMap::new(),
                ghosts: 0,
            });
        }

        let (ids, geometries): (Vec<PolygonId>, Vec<Polygon<f64>>) =
            parcels.into_iter().map(|p| (p.id, p.geometry)).unzip();
        let clipped = self.provider.intersect(&geometries, grounds)?;
        if clipped.len() != geometries.len() {
            return Err(Error::geometry(
                "intersect",
                format!("{} results for {} polygons", clipped.len(), geometries.len()),
            ));
        }

        let mut ghosts = 0;
        let mut output = PolygonStore::new();
        let mut sources = BTreeMap::new();
        for (source, multi) in ids.into_iter().zip(clipped) {
            let parts = self.provider.explode(multi);
            if parts.is_empty() {
                ghosts += 1;
            }
            for part in parts {
                sources.insert(output.insert(self.provider, part), source);
            }
        }

        if output.is_empty() {
            return Err(Error::geometry(
                "intersect",
                "no parcel overlaps the grounds after elimination",
            ));
        }
        if ghosts > 0 {
            debug!(ghosts, "removed parcels outside the grounds");
        }
        Ok(Sanitized {
            store: output,
            sources,
            ghosts,
        })
    }
}

/// `Unresolved` warnings for the output parcels clipped from `stranded` ids.
///
/// Parcels that only became undersized through clipping are not reported.
fn unresolved(sanitized: &Sanitized, stranded: &[PolygonId]) -> Vec<Warning> {
    sanitized
        .store
        .iter()
        .filter(|p| {
            sanitized
                .sources
                .get(&p.id)
                .is_some_and(|source| stranded.contains(source))
        })
        .map(|p| {
            warn!(polygon = p.id, area_ha = p.area_hectares, "undersized polygon left in output");
            Warning::Unresolved {
                id: p.id,
                area_hectares: p.area_hectares,
            }
        })
        .collect()
}
