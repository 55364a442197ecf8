//! Index engine
//!
//! - Default set: NDWI, NDWI_SWIR, NIR_SWIR, RDRI
//! - Normalized difference: generic two-band kernel
//! - Formula builder: band algebra parsed from text
//! - Index definitions: named indices evaluated per composite

mod definition;
mod index_builder;
mod indices;

pub use definition::{compute_indices, water_ice_indices, IndexDefinition, IndexGrid, IndexKind};
pub use index_builder::Formula;
pub use indices::normalized_difference;
