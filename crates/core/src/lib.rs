//! # rivice core
//!
//! Core types and I/O for the rivice daily index pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced grid with NaN/no-data semantics
//! - `GeoTransform` and `BBox`: placing grids and footprints in map space
//! - `Scene` / `SceneCollection`: immutable timestamped multi-band observations
//! - `RegionOfInterest`: the validated study polygon
//! - Native GeoTIFF I/O for band assets

pub mod error;
pub mod io;
pub mod raster;
pub mod scene;
pub mod vector;

pub use error::{Error, Result};
pub use raster::{BBox, GeoTransform, Raster, RasterElement};
pub use scene::{bands, BandAliases, JoinedScene, Scene, SceneCollection};
pub use vector::RegionOfInterest;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{BBox, GeoTransform, Raster, RasterElement};
    pub use crate::scene::{bands, JoinedScene, Scene, SceneCollection};
    pub use crate::vector::RegionOfInterest;
}
