//! Polygon overlay on top of the planar graph
//!
//! - Split: subdivide polygons by a line network
//! - Dissolve: union polygons that form a planar partition
//! - Erase / Intersect: per-polygon boolean difference and intersection
//!
//! All operations node the combined line work once, trace faces, and decide
//! per face (through an interior point) which inputs cover it.

use geo::{
    BoundingRect, Contains, InteriorPoint, Intersects, Line, MultiLineString, MultiPolygon, Point, Polygon,
    Rect,
};

use super::planar::{node_segments, polygonize};
use super::segments::{grow, ring_segments};

/// Polygons with their bounding rectangles, for point-in-polygon lookups
struct Cover<'a> {
    polygons: Vec<(&'a Polygon<f64>, Rect<f64>)>,
}

impl<'a> Cover<'a> {
    fn new(polygons: &'a [Polygon<f64>]) -> Self {
        Self {
            polygons: polygons
                .iter()
                .filter_map(|p| p.bounding_rect().map(|r| (p, r)))
                .collect(),
        }
    }

    /// Index of the first polygon strictly containing `p`
    fn owner(&self, p: &Point<f64>) -> Option<usize> {
        self.polygons
            .iter()
            .position(|(poly, rect)| rect.intersects(&p.0) && poly.contains(p))
    }

    fn covers(&self, p: &Point<f64>) -> bool {
        self.owner(p).is_some()
    }

    /// True when `p` lies inside or on the boundary of some polygon
    fn touches(&self, p: &Point<f64>) -> bool {
        self.polygons
            .iter()
            .any(|(poly, rect)| rect.intersects(&p.0) && poly.intersects(&p.0))
    }

    fn extent(&self) -> Option<Rect<f64>> {
        self.polygons.iter().map(|(_, r)| *r).reduce(|a, b| {
            Rect::new(
                geo::Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                geo::Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        })
    }
}

fn all_ring_segments(polygons: &[Polygon<f64>]) -> Vec<Line<f64>> {
    polygons.iter().flat_map(ring_segments).collect()
}

/// Subdivide `polygons` by the line network `lines`.
///
/// Returns every face of the combined arrangement that lies inside one of
/// the input polygons. Line work outside the polygons never yields faces, and
/// line ends that stop inside a polygon are ignored.
pub fn split_by_lines(
    polygons: &[Polygon<f64>],
    lines: &MultiLineString<f64>,
    tolerance: f64,
) -> Vec<Polygon<f64>> {
    let cover = Cover::new(polygons);
    let Some(extent) = cover.extent() else {
        return Vec::new();
    };
    let extent = grow(extent, tolerance);

    let mut segments = all_ring_segments(polygons);
    segments.extend(
        lines
            .0
            .iter()
            .flat_map(|ls| ls.lines())
            .filter(|l| l.bounding_rect().intersects(&extent)),
    );

    let graph = node_segments(&segments, tolerance);
    polygonize(&graph, tolerance)
        .into_iter()
        .filter(|face| face.interior_point().is_some_and(|p| cover.covers(&p)))
        .collect()
}

/// Union of polygons that do not overlap each other.
///
/// Shared edges cancel out (they are produced an even number of times), so
/// only the outline of the union survives. Disjoint inputs give several
/// parts.
///
/// A merged face may have its interior point on a cancelled edge, so faces
/// are kept when the point touches an input, boundary included. Faces
/// enclosed by the inputs without belonging to them only meet the inputs
/// along their own outline.
pub fn dissolve_parts(polygons: &[Polygon<f64>], tolerance: f64) -> Vec<Polygon<f64>> {
    match polygons {
        [] => Vec::new(),
        [single] => vec![single.clone()],
        _ => {
            let cover = Cover::new(polygons);
            let mut graph = node_segments(&all_ring_segments(polygons), tolerance);
            graph.retain_edges(|e| e.multiplicity % 2 == 1);
            polygonize(&graph, tolerance)
                .into_iter()
                .filter(|face| face.interior_point().is_some_and(|p| cover.touches(&p)))
                .collect()
        }
    }
}

/// Overlay `subjects` with `others` and dissolve the kept faces per subject.
fn overlay_by_subject(
    subjects: &[Polygon<f64>],
    others: &[Polygon<f64>],
    keep_inside_other: bool,
    tolerance: f64,
) -> Vec<MultiPolygon<f64>> {
    let subject_cover = Cover::new(subjects);
    let other_cover = Cover::new(others);

    let mut segments = all_ring_segments(subjects);
    segments.extend(all_ring_segments(others));
    let graph = node_segments(&segments, tolerance);

    let mut faces_by_subject: Vec<Vec<Polygon<f64>>> = vec![Vec::new(); subjects.len()];
    for face in polygonize(&graph, tolerance) {
        let Some(p) = face.interior_point() else { continue };
        let Some(owner) = subject_cover.owner(&p) else { continue };
        if other_cover.covers(&p) == keep_inside_other {
            faces_by_subject[owner].push(face);
        }
    }

    faces_by_subject
        .iter()
        .map(|faces| MultiPolygon::new(dissolve_parts(faces, tolerance)))
        .collect()
}

/// Boolean difference: each subject minus every `cutter`
pub fn erase(
    subjects: &[Polygon<f64>],
    cutters: &[Polygon<f64>],
    tolerance: f64,
) -> Vec<MultiPolygon<f64>> {
    if cutters.is_empty() {
        return subjects.iter().map(|p| MultiPolygon::new(vec![p.clone()])).collect();
    }
    overlay_by_subject(subjects, cutters, false, tolerance)
}

/// Boolean intersection: each subject clipped to the union of `clips`
pub fn intersect(
    subjects: &[Polygon<f64>],
    clips: &[Polygon<f64>],
    tolerance: f64,
) -> Vec<MultiPolygon<f64>> {
    if clips.is_empty() {
        return vec![MultiPolygon::new(vec![]); subjects.len()];
    }
    overlay_by_subject(subjects, clips, true, tolerance)
}
