//! I/O operations for reading and writing vector layers
//!
//! Layers are exchanged as GeoJSON FeatureCollections. Only the load and
//! save edges of a run touch the filesystem; everything in between stays in
//! memory.

mod geojson_io;

pub use geojson_io::{
    read_layer, read_layer_from_str, write_layer, write_layer_to_writer,
};
