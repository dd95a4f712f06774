//! Working set of parcels
//!
//! The store owns every polygon of the current convergence pass, keyed by a
//! stable id. Ids are handed out in increasing order and never reused within
//! a store, so a polygon consumed by a merge can be recognised by its id no
//! longer resolving.

use geo::Polygon;
use parcelgis_core::{Error, Result};
use std::collections::BTreeMap;

use crate::maybe_rayon::*;
use crate::provider::GeometryProvider;

/// Identifier of a parcel within one store
pub type PolygonId = u64;

/// A single-part polygon with its measured area
#[derive(Debug, Clone, PartialEq)]
pub struct Parcel {
    pub id: PolygonId,
    pub area_hectares: f64,
    pub geometry: Polygon<f64>,
}

/// In-memory polygon set with CRUD-by-predicate semantics
#[derive(Debug, Clone)]
pub struct PolygonStore {
    parcels: BTreeMap<PolygonId, Parcel>,
    next_id: PolygonId,
}

impl Default for PolygonStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PolygonStore {
    pub fn new() -> Self {
        Self {
            parcels: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Build a store from polygons, measuring each one
    pub fn from_polygons<P, I>(provider: &P, polygons: I) -> Self
    where
        P: GeometryProvider,
        I: IntoIterator<Item = Polygon<f64>>,
    {
        let mut store = Self::new();
        for polygon in polygons {
            store.insert(provider, polygon);
        }
        store
    }

    /// Insert a polygon under a fresh id; its area is measured immediately
    pub fn insert<P: GeometryProvider>(&mut self, provider: &P, geometry: Polygon<f64>) -> PolygonId {
        let id = self.next_id;
        self.next_id += 1;
        let area_hectares = provider.area_hectares(&geometry);
        self.parcels.insert(
            id,
            Parcel {
                id,
                area_hectares,
                geometry,
            },
        );
        id
    }

    pub fn get(&self, id: PolygonId) -> Option<&Parcel> {
        self.parcels.get(&id)
    }

    /// Like [`get`](Self::get), but an absent id is an error
    pub fn require(&self, id: PolygonId) -> Result<&Parcel> {
        self.parcels.get(&id).ok_or(Error::UnknownPolygon(id))
    }

    pub fn contains(&self, id: PolygonId) -> bool {
        self.parcels.contains_key(&id)
    }

    pub fn remove(&mut self, id: PolygonId) -> Result<Parcel> {
        self.parcels.remove(&id).ok_or(Error::UnknownPolygon(id))
    }

    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    /// Parcels in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &Parcel> {
        self.parcels.values()
    }

    /// Ids of the parcels matching `predicate`, in store order
    pub fn select_where(&self, predicate: impl Fn(&Parcel) -> bool) -> Vec<PolygonId> {
        self.parcels
            .values()
            .filter(|p| predicate(p))
            .map(|p| p.id)
            .collect()
    }

    /// Recompute every parcel's area from its current geometry
    pub fn measure<P: GeometryProvider>(&mut self, provider: &P) {
        let geometries: Vec<&Polygon<f64>> = self.parcels.values().map(|p| &p.geometry).collect();
        let areas: Vec<f64> = geometries
            .into_par_iter()
            .map(|g| provider.area_hectares(g))
            .collect();
        for (parcel, area) in self.parcels.values_mut().zip(areas) {
            parcel.area_hectares = area;
        }
    }

    /// Small side of the split at `threshold_hectares`: ids of the parcels
    /// at or below it, in store order. The rest of the store is the large side.
    pub fn partition(&self, threshold_hectares: f64) -> Vec<PolygonId> {
        self.select_where(|p| p.area_hectares <= threshold_hectares)
    }

    /// Sum of the stored areas
    pub fn total_area(&self) -> f64 {
        self.parcels.values().map(|p| p.area_hectares).sum()
    }

    pub fn into_parcels(self) -> Vec<Parcel> {
        self.parcels.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PlanarProvider;
    use approx::assert_relative_eq;
    use geo::LineString;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )
    }

    fn sample() -> PolygonStore {
        let provider = PlanarProvider::default();
        PolygonStore::from_polygons(
            &provider,
            vec![
                rect(0.0, 0.0, 100.0, 100.0),  // 1 ha
                rect(100.0, 0.0, 150.0, 100.0), // 0.5 ha
                rect(150.0, 0.0, 170.0, 100.0), // 0.2 ha
            ],
        )
    }

    #[test]
    fn test_ids_are_sequential_and_never_reused() {
        let provider = PlanarProvider::default();
        let mut store = sample();
        assert_eq!(store.select_where(|_| true), vec![1, 2, 3]);

        store.remove(2).unwrap();
        let id = store.insert(&provider, rect(0.0, 0.0, 1.0, 1.0));
        assert_eq!(id, 4);
        assert!(!store.contains(2));
    }

    #[test]
    fn test_insert_measures_area() {
        let store = sample();
        assert_relative_eq!(store.get(1).unwrap().area_hectares, 1.0);
        assert_relative_eq!(store.get(3).unwrap().area_hectares, 0.2);
        assert_relative_eq!(store.total_area(), 1.7, epsilon = 1e-12);
    }

    #[test]
    fn test_partition_is_inclusive() {
        let store = sample();
        assert_eq!(store.partition(0.5), vec![2, 3]);
        assert_eq!(store.partition(0.2), vec![3]);
        assert!(store.partition(0.1).is_empty());
    }

    #[test]
    fn test_select_where_filters_in_store_order() {
        let store = sample();
        assert_eq!(store.select_where(|p| p.area_hectares > 0.3), vec![1, 2]);
    }

    #[test]
    fn test_measure_recomputes_stale_areas() {
        let provider = PlanarProvider::default();
        let mut store = sample();
        store.parcels.get_mut(&1).unwrap().area_hectares = 99.0;
        store.measure(&provider);
        assert_relative_eq!(store.get(1).unwrap().area_hectares, 1.0);
    }

    #[test]
    fn test_missing_ids_are_errors() {
        let mut store = sample();
        assert!(matches!(store.require(9), Err(Error::UnknownPolygon(9))));
        assert!(matches!(store.remove(9), Err(Error::UnknownPolygon(9))));
    }

    #[test]
    fn test_into_parcels_keeps_order() {
        let store = sample();
        let ids: Vec<PolygonId> = store.into_parcels().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
