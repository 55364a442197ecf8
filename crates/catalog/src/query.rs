//! Scene queries: spatial bounds, a date window and a cloud-cover ceiling.

use chrono::{DateTime, NaiveDate, Utc};
use rivice_core::{BBox, Scene, SceneCollection};

use crate::error::{CatalogError, Result};

/// Scene metadata key holding the scene-level cloud percentage (Sentinel-2).
pub const DEFAULT_CLOUD_COVER_KEY: &str = "CLOUDY_PIXEL_PERCENTAGE";

/// Half-open UTC date window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// # Errors
    /// `start` must be strictly before `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(CatalogError::InvalidQuery(format!(
                "date range is empty: {} .. {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether the instant falls on a UTC day in the window
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let day = timestamp.date_naive();
        day >= self.start && day < self.end
    }
}

/// Filter applied to a catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneQuery {
    pub bounds: BBox,
    pub dates: DateRange,
    /// Scenes above this cloud percentage are dropped; `None` disables the check.
    pub max_cloud_pct: Option<f64>,
    /// Metadata key read for the cloud check
    pub cloud_cover_key: String,
}

impl SceneQuery {
    pub fn new(bounds: BBox, dates: DateRange) -> Self {
        Self {
            bounds,
            dates,
            max_cloud_pct: None,
            cloud_cover_key: DEFAULT_CLOUD_COVER_KEY.to_string(),
        }
    }

    pub fn with_max_cloud(mut self, pct: f64) -> Self {
        self.max_cloud_pct = Some(pct);
        self
    }

    pub fn with_cloud_cover_key(mut self, key: impl Into<String>) -> Self {
        self.cloud_cover_key = key.into();
        self
    }

    /// Same bounds and dates without the cloud ceiling.
    ///
    /// Probability collections carry no scene-level cloud percentage.
    pub fn without_cloud_filter(&self) -> Self {
        Self {
            max_cloud_pct: None,
            ..self.clone()
        }
    }

    /// Check an item from its parts, before any band is loaded.
    ///
    /// A missing cloud value fails the cloud check when one is set.
    pub fn accepts(&self, timestamp: DateTime<Utc>, footprint: &BBox, cloud: Option<f64>) -> bool {
        if !self.dates.contains(timestamp) || !footprint.intersects(&self.bounds) {
            return false;
        }
        match (self.max_cloud_pct, cloud) {
            (None, _) => true,
            (Some(max), Some(c)) => c <= max,
            (Some(_), None) => false,
        }
    }

    pub fn matches(&self, scene: &Scene) -> bool {
        self.accepts(
            scene.timestamp(),
            &scene.footprint(),
            scene.metadata(&self.cloud_cover_key),
        )
    }

    /// Scenes of the collection passing the filter, order kept
    pub fn apply(&self, scenes: &SceneCollection) -> SceneCollection {
        scenes.filter(|s| self.matches(s))
    }
}

/// A source of scenes.
pub trait Catalog {
    /// Scenes matching the query, in ascending timestamp order.
    fn query(&self, query: &SceneQuery) -> Result<SceneCollection>;
}
