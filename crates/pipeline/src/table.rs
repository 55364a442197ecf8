//! Date-ordered tables of per-index spatial means.

use std::fmt;

use chrono::NaiveDate;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Header of the date column.
pub const DATE_COLUMN: &str = "Dates";
/// Header of the ROI valid-coverage column.
pub const COVERAGE_COLUMN: &str = "ROI_VALID_PCT";

/// A reduced value, or explicit no-data when nothing valid was sampled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndexValue {
    Value(f64),
    NoData,
}

impl IndexValue {
    pub fn as_option(&self) -> Option<f64> {
        match self {
            IndexValue::Value(v) => Some(*v),
            IndexValue::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, IndexValue::NoData)
    }
}

impl From<Option<f64>> for IndexValue {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => IndexValue::Value(v),
            _ => IndexValue::NoData,
        }
    }
}

impl fmt::Display for IndexValue {
    /// Empty for no-data, so the value can go straight into a CSV cell
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::Value(v) => write!(f, "{}", v),
            IndexValue::NoData => Ok(()),
        }
    }
}

impl Serialize for IndexValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            IndexValue::Value(v) => serializer.serialize_f64(*v),
            IndexValue::NoData => serializer.serialize_none(),
        }
    }
}

/// One row of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRecord {
    date: NaiveDate,
    values: Vec<IndexValue>,
    coverage: IndexValue,
}

impl TimeSeriesRecord {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// One value per index, in definition order
    pub fn values(&self) -> &[IndexValue] {
        &self.values
    }

    /// Percentage of ROI samples where every band was valid
    pub fn coverage(&self) -> IndexValue {
        self.coverage
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum TableError {
    #[error("date {0} appears more than once")]
    DuplicateDate(NaiveDate),

    #[error("record for {date} has {actual} values, expected {expected}")]
    WidthMismatch {
        date: NaiveDate,
        expected: usize,
        actual: usize,
    },
}

/// Collects records in any order and produces a sorted table.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    index_names: Vec<String>,
    records: Vec<TimeSeriesRecord>,
}

impl TableBuilder {
    pub fn new(index_names: Vec<String>) -> Self {
        Self {
            index_names,
            records: Vec::new(),
        }
    }

    /// Add a record; `values` must hold one entry per index.
    pub fn push(
        &mut self,
        date: NaiveDate,
        values: Vec<IndexValue>,
        coverage: IndexValue,
    ) -> std::result::Result<(), TableError> {
        if values.len() != self.index_names.len() {
            return Err(TableError::WidthMismatch {
                date,
                expected: self.index_names.len(),
                actual: values.len(),
            });
        }
        self.records.push(TimeSeriesRecord {
            date,
            values,
            coverage,
        });
        Ok(())
    }

    /// Sort by date and reject duplicates.
    pub fn build(mut self) -> std::result::Result<TimeSeriesTable, TableError> {
        self.records.sort_by_key(|r| r.date);
        for pair in self.records.windows(2) {
            if pair[0].date == pair[1].date {
                return Err(TableError::DuplicateDate(pair[0].date));
            }
        }
        Ok(TimeSeriesTable {
            index_names: self.index_names,
            records: self.records,
        })
    }
}

/// Strictly date-ascending table, one column per index.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    index_names: Vec<String>,
    records: Vec<TimeSeriesRecord>,
}

impl TimeSeriesTable {
    /// Table with columns but no rows
    pub fn empty(index_names: Vec<String>) -> Self {
        Self {
            index_names,
            records: Vec::new(),
        }
    }

    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    pub fn records(&self) -> &[TimeSeriesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column headers: dates, every index, coverage
    pub fn header(&self) -> Vec<&str> {
        std::iter::once(DATE_COLUMN)
            .chain(self.index_names.iter().map(String::as_str))
            .chain(std::iter::once(COVERAGE_COLUMN))
            .collect()
    }

    /// Values of one index by name, in date order
    pub fn column(&self, name: &str) -> Option<Vec<(NaiveDate, IndexValue)>> {
        let idx = self.index_names.iter().position(|n| n == name)?;
        Some(self.records.iter().map(|r| (r.date, r.values[idx])).collect())
    }
}

/// Serialises as an array of `{ "Dates": ..., "<index>": ..., "ROI_VALID_PCT": ... }`
/// objects, keys in column order.
impl Serialize for TimeSeriesTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.records.len()))?;
        for record in &self.records {
            seq.serialize_element(&Row {
                names: &self.index_names,
                record,
            })?;
        }
        seq.end()
    }
}

struct Row<'a> {
    names: &'a [String],
    record: &'a TimeSeriesRecord,
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.names.len() + 2))?;
        map.serialize_entry(DATE_COLUMN, &self.record.date.format("%Y-%m-%d").to_string())?;
        for (name, value) in self.names.iter().zip(&self.record.values) {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(COVERAGE_COLUMN, &self.record.coverage)?;
        map.end()
    }
}
