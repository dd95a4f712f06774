//! End-to-end elimination scenarios on small synthetic layouts.
//!
//! All coordinates are metres, so a 100 × 100 square is exactly one hectare.

use approx::assert_relative_eq;
use geo::{BoundingRect, LineString, MultiLineString, Polygon};
use parcelgis_algorithms::elimination::{
    eliminate_small_polygons, BarrierSet, EliminationOutput, EliminationParams, Rivers, Warning,
};
use parcelgis_algorithms::provider::PlanarProvider;
use parcelgis_core::io::read_layer_from_str;
use parcelgis_core::AttributeValue;

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
        vec![],
    )
}

fn segment(x0: f64, y0: f64, x1: f64, y1: f64) -> LineString<f64> {
    LineString::from(vec![(x0, y0), (x1, y1)])
}

/// Quarter lines of a 3 × 3 grid of 100 m cells, overshooting the grounds
fn grid_quarters() -> MultiLineString<f64> {
    let mut lines = Vec::new();
    for i in 0..=3 {
        let v = i as f64 * 100.0;
        lines.push(segment(v, -20.0, v, 320.0));
        lines.push(segment(-20.0, v, 320.0, v));
    }
    MultiLineString::new(lines)
}

/// Nine one-hectare cells, the centre one delivered as two half-hectare slivers
fn grid_grounds() -> Vec<Polygon<f64>> {
    let mut grounds = Vec::new();
    for row in 0..3 {
        for col in 0..3 {
            let (x, y) = (col as f64 * 100.0, row as f64 * 100.0);
            if row == 1 && col == 1 {
                grounds.push(rect(x, y, x + 50.0, y + 100.0));
                grounds.push(rect(x + 50.0, y, x + 100.0, y + 100.0));
            } else {
                grounds.push(rect(x, y, x + 100.0, y + 100.0));
            }
        }
    }
    grounds
}

fn run(
    grounds: &[Polygon<f64>],
    barriers: &BarrierSet,
    threshold_hectares: f64,
    max_passes: usize,
) -> EliminationOutput {
    let provider = PlanarProvider::default();
    let params = EliminationParams {
        threshold_hectares,
        max_passes,
    };
    eliminate_small_polygons(&provider, grounds, barriers, &params).unwrap()
}

fn no_barriers() -> BarrierSet {
    BarrierSet::new(MultiLineString::new(vec![]), Rivers::none())
}

#[test]
fn slivers_merge_back_into_their_cell() {
    let barriers = BarrierSet::new(grid_quarters(), Rivers::none());
    let output = run(&grid_grounds(), &barriers, 0.75, 100);

    assert_eq!(output.report.split_polygons, 10);
    assert_eq!(output.report.merges, 1);
    assert!(output.report.converged);
    assert!(output.report.warnings.is_empty());
    assert_eq!(output.parcels.len(), 9);
    for parcel in &output.parcels {
        assert_relative_eq!(parcel.area_hectares, 1.0, epsilon = 1e-9);
    }

    let ids: Vec<u64> = output.parcels.iter().map(|p| p.id).collect();
    assert_eq!(ids, (1..=9).collect::<Vec<u64>>());
}

#[test]
fn area_is_conserved() {
    let barriers = BarrierSet::new(
        grid_quarters(),
        Rivers::Lines(MultiLineString::new(vec![segment(-10.0, 250.0, 50.0, 310.0)])),
    );
    let output = run(&grid_grounds(), &barriers, 0.75, 100);

    assert_relative_eq!(output.total_area(), 9.0, epsilon = 1e-9);
}

#[test]
fn output_is_idempotent() {
    let barriers = BarrierSet::new(grid_quarters(), Rivers::none());
    let first = run(&grid_grounds(), &barriers, 0.75, 100);

    let again: Vec<Polygon<f64>> = first.parcels.iter().map(|p| p.geometry.clone()).collect();
    let second = run(&again, &barriers, 0.75, 100);

    assert_eq!(second.report.merges, 0);
    assert_eq!(second.parcels.len(), first.parcels.len());
    assert_relative_eq!(second.total_area(), first.total_area(), epsilon = 1e-9);
}

#[test]
fn quarter_line_redirects_merge_to_smaller_neighbor() {
    // the strip would prefer the 2 ha parcel, but the quarter line at x = 200 forbids it
    let grounds = vec![rect(100.0, 0.0, 190.0, 100.0), rect(190.0, 0.0, 400.0, 100.0)];
    let barriers = BarrierSet::new(
        MultiLineString::new(vec![segment(200.0, -50.0, 200.0, 150.0)]),
        Rivers::none(),
    );
    let output = run(&grounds, &barriers, 0.5, 100);

    assert_eq!(output.report.split_polygons, 3);
    assert_eq!(output.report.merges, 1);
    assert_eq!(output.parcels.len(), 2);

    let mut extents: Vec<(f64, f64, f64)> = output
        .parcels
        .iter()
        .map(|p| {
            let bbox = p.geometry.bounding_rect().unwrap();
            (bbox.min().x, bbox.max().x, p.area_hectares)
        })
        .collect();
    extents.sort_by(|a, b| a.0.total_cmp(&b.0));

    assert_relative_eq!(extents[0].0, 100.0);
    assert_relative_eq!(extents[0].1, 200.0);
    assert_relative_eq!(extents[0].2, 1.0, epsilon = 1e-9);
    assert_relative_eq!(extents[1].0, 200.0);
    assert_relative_eq!(extents[1].2, 2.0, epsilon = 1e-9);
}

#[test]
fn river_isolated_parcel_is_unresolved() {
    let grounds = vec![rect(0.0, 0.0, 100.0, 100.0), rect(100.0, 0.0, 110.0, 100.0)];
    let barriers = BarrierSet::new(
        MultiLineString::new(vec![]),
        Rivers::Lines(MultiLineString::new(vec![segment(100.0, -10.0, 100.0, 110.0)])),
    );
    let output = run(&grounds, &barriers, 0.5, 100);

    assert_eq!(output.report.merges, 0);
    assert!(output.report.converged);
    assert_eq!(output.parcels.len(), 2);

    let unresolved: Vec<&Warning> = output
        .report
        .warnings
        .iter()
        .filter(|w| matches!(w, Warning::Unresolved { .. }))
        .collect();
    assert_eq!(unresolved.len(), 1);
    if let Warning::Unresolved { id, area_hectares } = unresolved[0] {
        assert_relative_eq!(*area_hectares, 0.1, epsilon = 1e-9);
        assert!(output.parcels.iter().any(|p| p.id == *id));
    }
}

#[test]
fn pass_limit_reports_non_convergence() {
    // one strip can merge west, the other is cut off by the river
    let grounds = vec![
        rect(-10.0, 0.0, 0.0, 100.0),
        rect(0.0, 0.0, 100.0, 100.0),
        rect(100.0, 0.0, 110.0, 100.0),
    ];
    let barriers = BarrierSet::new(
        MultiLineString::new(vec![]),
        Rivers::Lines(MultiLineString::new(vec![segment(100.0, -10.0, 100.0, 110.0)])),
    );
    let output = run(&grounds, &barriers, 0.5, 1);

    assert!(!output.report.converged);
    assert_eq!(output.report.passes.len(), 1);
    assert_eq!(output.report.merges, 1);
    assert!(output.report.warnings.contains(&Warning::NonConvergence {
        passes: 1,
        remaining_small: 1
    }));
    assert_eq!(output.parcels.len(), 2);
}

#[test]
fn two_small_parcels_join_the_large_one() {
    let grounds = vec![
        rect(0.0, 0.0, 100.0, 100.0),
        rect(100.0, 0.0, 110.0, 50.0),
        rect(100.0, 50.0, 110.0, 100.0),
    ];
    let output = run(&grounds, &no_barriers(), 0.5, 100);

    assert!(output.report.converged);
    assert_eq!(output.report.merges, 2);
    assert_eq!(output.parcels.len(), 1);
    assert_relative_eq!(output.parcels[0].area_hectares, 1.1, epsilon = 1e-9);
    assert!(output.parcels[0].geometry.interiors().is_empty());
}

#[test]
fn area_river_separates_parcels() {
    let grounds = vec![rect(0.0, 0.0, 100.0, 100.0), rect(100.0, 0.0, 104.0, 100.0)];
    let barriers = BarrierSet::new(
        MultiLineString::new(vec![]),
        Rivers::Areas(vec![rect(100.0, -10.0, 101.0, 110.0)]),
    );
    let output = run(&grounds, &barriers, 0.5, 100);

    assert_eq!(output.report.merges, 0);
    assert_eq!(output.parcels.len(), 2);
    assert_relative_eq!(output.total_area(), 1.03, epsilon = 1e-9);
    assert!(output
        .report
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::Unresolved { area_hectares, .. } if (area_hectares - 0.03).abs() < 1e-9)));
}

#[test]
fn geojson_layers_end_to_end() {
    let grounds = read_layer_from_str(
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[100,0],[100,100],[0,100],[0,0]]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Polygon", "coordinates": [[[100,0],[120,0],[120,100],[100,100],[100,0]]]}}
        ]}"#,
    )
    .unwrap();
    let quarters = read_layer_from_str(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
    let rivers = read_layer_from_str(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();

    let barriers = BarrierSet::from_layers(&quarters, &rivers).unwrap();
    let output = run(&grounds.polygons("grounds").unwrap(), &barriers, 0.5, 100);

    let layer = output.to_features();
    assert_eq!(layer.len(), 1);
    let feature = &layer.features[0];
    assert_eq!(feature.get_property("id"), Some(&AttributeValue::Int(1)));
    match feature.get_property("area_ha") {
        Some(AttributeValue::Float(area)) => assert_relative_eq!(*area, 1.2, epsilon = 1e-9),
        other => panic!("unexpected area attribute: {:?}", other),
    }
}
