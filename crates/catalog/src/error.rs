//! Error types for scene catalogs.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while querying catalogs or joining their output.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed item collection {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid item '{id}': {reason}")]
    InvalidItem { id: String, reason: String },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("core error: {0}")]
    Core(#[from] rivice_core::Error),
}

/// Result alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
