//! # rivice pipeline
//!
//! Daily water/ice index time series from an imagery catalog and its
//! cloud-probability companion.
//!
//! This crate provides:
//! - [`Pipeline`]: join → mask → composite → index → reduce → table
//! - [`PipelineConfig`]: TOML run configuration
//! - [`TimeSeriesTable`] with CSV and JSON sinks
//! - [`ProcessingMode`]: thread pool selection for a run

pub mod config;
pub mod error;
pub mod executor;
pub mod export;
pub mod pipeline;
pub mod table;

pub use config::{IndexConfig, PipelineConfig, RoiConfig};
pub use error::{PipelineError, Result, Stage};
pub use executor::ProcessingMode;
pub use export::{CsvSink, JsonSink, TableSink};
pub use pipeline::{Pipeline, DEFAULT_SCALE};
pub use table::{
    IndexValue, TableBuilder, TableError, TimeSeriesRecord, TimeSeriesTable, COVERAGE_COLUMN,
    DATE_COLUMN,
};
