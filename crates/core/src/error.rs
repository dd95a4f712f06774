//! Error types for parcelgis

use thiserror::Error;

/// Main error type for parcelgis operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Wrong geometry type in {layer} layer: expected {expected}, found {found}")]
    InputType {
        layer: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("Geometry operation '{operation}' failed{}: {reason}", polygon_suffix(*.polygon))]
    GeometryOperation {
        operation: &'static str,
        polygon: Option<u64>,
        reason: String,
    },

    #[error("Polygon {0} is not in the working set")]
    UnknownPolygon(u64),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

fn polygon_suffix(polygon: Option<u64>) -> String {
    match polygon {
        Some(id) => format!(" on polygon {}", id),
        None => String::new(),
    }
}

impl Error {
    /// Shorthand for a provider failure that is not tied to one polygon.
    pub fn geometry(operation: &'static str, reason: impl Into<String>) -> Self {
        Error::GeometryOperation {
            operation,
            polygon: None,
            reason: reason.into(),
        }
    }

    /// Attach a polygon id to a geometry failure that does not carry one yet.
    pub fn on_polygon(self, id: u64) -> Self {
        match self {
            Error::GeometryOperation {
                operation,
                polygon: None,
                reason,
            } => Error::GeometryOperation {
                operation,
                polygon: Some(id),
                reason,
            },
            other => other,
        }
    }
}

/// Result type alias for parcelgis operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_message_names_polygon() {
        let err = Error::geometry("dissolve", "empty output").on_polygon(42);
        assert_eq!(
            err.to_string(),
            "Geometry operation 'dissolve' failed on polygon 42: empty output"
        );
    }

    #[test]
    fn test_geometry_message_without_polygon() {
        let err = Error::geometry("split_by_lines", "no faces");
        assert_eq!(
            err.to_string(),
            "Geometry operation 'split_by_lines' failed: no faces"
        );
    }

    #[test]
    fn test_on_polygon_keeps_existing_id() {
        let err = Error::GeometryOperation {
            operation: "union",
            polygon: Some(1),
            reason: "disjoint".into(),
        }
        .on_polygon(2);
        assert!(matches!(err, Error::GeometryOperation { polygon: Some(1), .. }));
    }
}
