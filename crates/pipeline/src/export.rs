//! Table sinks: CSV and JSON files in an output directory.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::table::{IndexValue, TimeSeriesTable};

/// Persists a finished table under a name.
pub trait TableSink {
    /// Write the table; returns the path written.
    fn write(&self, table: &TimeSeriesTable, name: &str) -> Result<PathBuf>;
}

/// Writes `<dir>/<name>.csv`: header `Dates,<indices>,ROI_VALID_PCT`,
/// no-data as an empty cell.
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TableSink for CsvSink {
    fn write(&self, table: &TimeSeriesTable, name: &str) -> Result<PathBuf> {
        let path = prepare(&self.dir, name, "csv")?;
        let csv_err = |source| PipelineError::Csv {
            path: path.clone(),
            source,
        };

        let mut writer = csv::Writer::from_path(&path).map_err(csv_err)?;
        writer.write_record(table.header()).map_err(csv_err)?;
        for record in table.records() {
            let mut row = Vec::with_capacity(record.values().len() + 2);
            row.push(record.date().format("%Y-%m-%d").to_string());
            row.extend(record.values().iter().map(IndexValue::to_string));
            row.push(record.coverage().to_string());
            writer.write_record(&row).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| PipelineError::Io {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), rows = table.len(), "table written");
        Ok(path)
    }
}

/// Writes `<dir>/<name>.json`: an array of row objects, no-data as `null`.
#[derive(Debug, Clone)]
pub struct JsonSink {
    dir: PathBuf,
}

impl JsonSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TableSink for JsonSink {
    fn write(&self, table: &TimeSeriesTable, name: &str) -> Result<PathBuf> {
        let path = prepare(&self.dir, name, "json")?;
        let file = File::create(&path).map_err(|source| PipelineError::Io {
            path: path.clone(),
            source,
        })?;

        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, table)?;
        out.flush().map_err(|source| PipelineError::Io {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), rows = table.len(), "table written");
        Ok(path)
    }
}

/// Validate the name, create the directory and return the target path.
fn prepare(dir: &Path, name: &str, extension: &str) -> Result<PathBuf> {
    if name.trim().is_empty() || name.contains(['/', '\\']) {
        return Err(PipelineError::Config(format!(
            "output name '{}' must be a plain file name",
            name
        )));
    }
    fs::create_dir_all(dir).map_err(|source| PipelineError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(dir.join(format!("{}.{}", name, extension)))
}
