//! Geometric measurements: hectares, length

use geo::{Area, Euclidean, Length, MultiLineString, Polygon};

/// Square metres in one hectare
pub const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

/// Area of a polygon in hectares.
///
/// `square_metres_per_unit` converts one squared CRS unit to square metres
/// (1.0 for metric projected CRSs).
pub fn area_hectares(polygon: &Polygon<f64>, square_metres_per_unit: f64) -> f64 {
    polygon.unsigned_area() * square_metres_per_unit / SQUARE_METRES_PER_HECTARE
}

/// Total length of line work.
///
/// Returns Euclidean length in CRS units.
pub fn line_length(lines: &MultiLineString<f64>) -> f64 {
    lines.length::<Euclidean>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::LineString;

    fn square(size: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (0.0, 0.0), (size, 0.0), (size, size), (0.0, size), (0.0, 0.0),
            ]),
            vec![],
        )
    }

    #[test]
    fn test_hectares_metric() {
        // 100 m x 100 m = 1 ha
        assert_relative_eq!(area_hectares(&square(100.0), 1.0), 1.0);
    }

    #[test]
    fn test_hectares_with_unit_conversion() {
        // 100 ft x 100 ft, 1 ft^2 = 0.09290304 m^2
        assert_relative_eq!(area_hectares(&square(100.0), 0.092_903_04), 0.092_903_04);
    }

    #[test]
    fn test_hectares_ignores_orientation() {
        let clockwise = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (0.0, 100.0), (50.0, 100.0), (50.0, 0.0), (0.0, 0.0)]),
            vec![],
        );
        assert_relative_eq!(area_hectares(&clockwise, 1.0), 0.5);
    }

    #[test]
    fn test_line_length() {
        let mls = MultiLineString::new(vec![
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]),
            LineString::from(vec![(0.0, 0.0), (3.0, 4.0)]),
        ]);
        assert_relative_eq!(line_length(&mls), 15.0);
    }
}
