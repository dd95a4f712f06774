//! Segment-level primitives: ring boundaries, collinear overlap, projections
//!
//! Shared boundaries between parcels are found by overlapping their ring
//! segments. Two segments share a line when every endpoint of one lies within
//! `tolerance` of the other's supporting line and their projections overlap by
//! more than `tolerance`.

use geo::{BoundingRect, Coord, Euclidean, Intersects, Length, Line, LineString, MultiLineString, Polygon, Rect};

/// All ring segments of a polygon (exterior first, then holes)
pub fn ring_segments(polygon: &Polygon<f64>) -> impl Iterator<Item = Line<f64>> + '_ {
    polygon
        .exterior()
        .lines()
        .chain(polygon.interiors().iter().flat_map(|ring| ring.lines()))
}

/// The boundary of a polygon as line work
pub fn boundary(polygon: &Polygon<f64>) -> MultiLineString<f64> {
    let mut rings = Vec::with_capacity(1 + polygon.interiors().len());
    rings.push(polygon.exterior().clone());
    rings.extend(polygon.interiors().iter().cloned());
    MultiLineString::new(rings)
}

/// Bounding rectangle of a segment grown by `margin` on every side
pub(crate) fn padded_rect(line: &Line<f64>, margin: f64) -> Rect<f64> {
    grow(line.bounding_rect(), margin)
}

pub(crate) fn grow(r: Rect<f64>, margin: f64) -> Rect<f64> {
    Rect::new(
        Coord { x: r.min().x - margin, y: r.min().y - margin },
        Coord { x: r.max().x + margin, y: r.max().y + margin },
    )
}

/// Portion of `b` lying on `a`, if it is longer than `tolerance`.
///
/// The result runs along `a`'s direction.
pub fn collinear_overlap(a: &Line<f64>, b: &Line<f64>, tolerance: f64) -> Option<Line<f64>> {
    let len = a.length::<Euclidean>();
    if len <= tolerance {
        return None;
    }
    let ux = (a.end.x - a.start.x) / len;
    let uy = (a.end.y - a.start.y) / len;

    let offset = |p: Coord<f64>| ux * (p.y - a.start.y) - uy * (p.x - a.start.x);
    if offset(b.start).abs() > tolerance || offset(b.end).abs() > tolerance {
        return None;
    }

    let along = |p: Coord<f64>| ux * (p.x - a.start.x) + uy * (p.y - a.start.y);
    let (ta, tb) = (along(b.start), along(b.end));
    let lo = ta.min(tb).max(0.0);
    let hi = ta.max(tb).min(len);
    if hi - lo <= tolerance {
        return None;
    }

    let at = |t: f64| Coord { x: a.start.x + ux * t, y: a.start.y + uy * t };
    Some(Line::new(at(lo), at(hi)))
}

/// Nonzero-length overlap between two sets of line work.
///
/// Each overlapping stretch comes back as its own two-point line string, so
/// the number of parts is a usable existence test.
pub fn overlap_lines(
    a: &MultiLineString<f64>,
    b: &MultiLineString<f64>,
    tolerance: f64,
) -> MultiLineString<f64> {
    let Some(a_rect) = a.bounding_rect() else {
        return MultiLineString::new(vec![]);
    };
    let a_rect = grow(a_rect, tolerance);

    let b_segments: Vec<(Line<f64>, Rect<f64>)> = b
        .0
        .iter()
        .flat_map(|ls| ls.lines())
        .map(|l| (l, padded_rect(&l, tolerance)))
        .filter(|(_, r)| r.intersects(&a_rect))
        .collect();

    let mut parts = Vec::new();
    if b_segments.is_empty() {
        return MultiLineString::new(parts);
    }

    for seg in a.0.iter().flat_map(|ls| ls.lines()) {
        let seg_rect = padded_rect(&seg, tolerance);
        for (other, other_rect) in &b_segments {
            if !seg_rect.intersects(other_rect) {
                continue;
            }
            if let Some(shared) = collinear_overlap(&seg, other, tolerance) {
                parts.push(LineString::from(vec![shared.start, shared.end]));
            }
        }
    }

    MultiLineString::new(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Line<f64> {
        Line::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
    }

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (x, y), (x + size, y), (x + size, y + size), (x, y + size), (x, y),
            ]),
            vec![],
        )
    }

    #[test]
    fn test_collinear_overlap_partial() {
        let shared = collinear_overlap(&line(0.0, 0.0, 10.0, 0.0), &line(5.0, 0.0, 15.0, 0.0), 1e-9)
            .unwrap();
        assert_relative_eq!(shared.start.x, 5.0);
        assert_relative_eq!(shared.end.x, 10.0);
    }

    #[test]
    fn test_collinear_overlap_reversed_direction() {
        let shared = collinear_overlap(&line(0.0, 0.0, 10.0, 0.0), &line(8.0, 0.0, 2.0, 0.0), 1e-9)
            .unwrap();
        assert_relative_eq!(shared.length::<Euclidean>(), 6.0);
    }

    #[test]
    fn test_touching_at_point_is_not_overlap() {
        assert!(collinear_overlap(&line(0.0, 0.0, 10.0, 0.0), &line(10.0, 0.0, 20.0, 0.0), 1e-9)
            .is_none());
        assert!(collinear_overlap(&line(0.0, 0.0, 10.0, 0.0), &line(5.0, -5.0, 5.0, 5.0), 1e-9)
            .is_none());
    }

    #[test]
    fn test_parallel_offset_is_not_overlap() {
        assert!(collinear_overlap(&line(0.0, 0.0, 10.0, 0.0), &line(0.0, 1.0, 10.0, 1.0), 1e-6)
            .is_none());
    }

    #[test]
    fn test_overlap_within_tolerance() {
        let shared =
            collinear_overlap(&line(0.0, 0.0, 10.0, 0.0), &line(0.0, 1e-9, 10.0, -1e-9), 1e-6);
        assert!(shared.is_some());
    }

    #[test]
    fn test_overlap_lines_between_adjacent_squares() {
        let a = boundary(&square(0.0, 0.0, 10.0));
        let b = boundary(&square(10.0, 0.0, 10.0));
        let shared = overlap_lines(&a, &b, 1e-9);
        assert_eq!(shared.0.len(), 1);
        assert_relative_eq!(shared.length::<Euclidean>(), 10.0);
    }

    #[test]
    fn test_overlap_lines_corner_touch_is_empty() {
        let a = boundary(&square(0.0, 0.0, 10.0));
        let b = boundary(&square(10.0, 10.0, 10.0));
        assert!(overlap_lines(&a, &b, 1e-9).0.is_empty());
    }

    #[test]
    fn test_padded_rect() {
        let r = padded_rect(&line(0.0, 0.0, 10.0, 5.0), 1.0);
        assert_relative_eq!(r.min().x, -1.0);
        assert_relative_eq!(r.max().y, 6.0);
    }

    #[test]
    fn test_ring_segments_includes_holes() {
        let poly = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![LineString::from(vec![(2.0, 2.0), (8.0, 2.0), (8.0, 8.0), (2.0, 8.0), (2.0, 2.0)])],
        );
        assert_eq!(ring_segments(&poly).count(), 8);
        assert_eq!(boundary(&poly).0.len(), 2);
    }
}
