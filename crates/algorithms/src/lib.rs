//! # rivice algorithms
//!
//! Raster stages of the daily index pipeline.
//!
//! ## Modules
//!
//! - **masking**: Cloud-probability validity masks
//! - **composite**: Same-day mosaics, first valid pixel wins
//! - **imagery**: Spectral indices, formula builder, index definitions
//! - **statistics**: Zonal mean over a region of interest

pub(crate) mod maybe_rayon;

pub mod composite;
pub mod imagery;
pub mod masking;
pub mod statistics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::composite::{daily_composites, group_by_date, mosaic, DailyComposite};
    pub use crate::imagery::{
        compute_indices, normalized_difference, water_ice_indices, Formula, IndexDefinition,
        IndexGrid, IndexKind,
    };
    pub use crate::masking::{cloud_mask, mask_collection, mask_scene, CloudMaskParams};
    pub use crate::statistics::{valid_coverage, zonal_mean, ZonalStats};
    pub use rivice_core::prelude::*;
}
