//! # rivice catalog
//!
//! Scene sources for the daily index pipeline and the join between an
//! imagery collection and its cloud-probability companion.
//!
//! - [`InMemoryCatalog`]: scenes already in memory
//! - [`LocalCatalog`]: a directory holding a STAC `items.json` and GeoTIFF
//!   band assets
//! - [`join`] / [`join_from_catalogs`]: pair imagery with probability scenes
//!   by id

pub mod error;
pub mod join;
pub mod local;
pub mod memory;
pub mod query;
pub mod stac_models;

pub use error::{CatalogError, Result};
pub use join::{join, join_from_catalogs, JoinedCollection};
pub use local::LocalCatalog;
pub use memory::InMemoryCatalog;
pub use query::{Catalog, DateRange, SceneQuery, DEFAULT_CLOUD_COVER_KEY};
pub use stac_models::{StacAsset, StacItem, StacItemCollection};
