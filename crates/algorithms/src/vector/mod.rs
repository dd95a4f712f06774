//! Vector geometry operations
//!
//! Planar operations on polygon and line features:
//! - Measurements: hectares, length
//! - Segments: ring boundaries and collinear overlap of line work
//! - Planar graph: segment noding and face extraction
//! - Overlay: split by lines, dissolve, erase, intersect

mod measurements;
mod overlay;
mod planar;
mod segments;

pub use measurements::{area_hectares, line_length};
pub use overlay::{dissolve_parts, erase, intersect, split_by_lines};
pub use segments::{boundary, overlap_lines};
pub(crate) use segments::grow;
