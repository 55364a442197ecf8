//! I/O operations for reading and writing band assets

mod native;

pub use native::{read_geotiff, write_geotiff};
