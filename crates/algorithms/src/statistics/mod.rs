//! Statistical reductions for raster data
//!
//! - **zonal**: mean of a grid over a region of interest at a fixed sampling step

pub mod zonal;

pub use zonal::{sample_pixels, valid_coverage, zonal_mean, ZonalStats};
