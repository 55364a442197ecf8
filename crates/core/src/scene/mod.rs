//! Scenes: timestamped multi-band observations
//!
//! A [`Scene`] never changes after it is built. Band grids sit behind `Arc`
//! so masking and compositing can derive new scenes without copying or
//! touching the source reflectances.

pub mod bands;
mod collection;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Error, Result};
use crate::raster::{BBox, GeoTransform, Raster};

pub use bands::BandAliases;
pub use collection::SceneCollection;

/// One satellite observation.
#[derive(Debug, Clone)]
pub struct Scene {
    id: String,
    timestamp: DateTime<Utc>,
    bands: BTreeMap<String, Arc<Raster<f64>>>,
    metadata: BTreeMap<String, f64>,
    /// Non-zero = valid. `None` means every pixel is valid.
    mask: Option<Arc<Raster<u8>>>,
    shape: (usize, usize),
    transform: GeoTransform,
}

impl Scene {
    /// Start building a scene
    pub fn builder(id: impl Into<String>, timestamp: DateTime<Utc>) -> SceneBuilder {
        SceneBuilder {
            id: id.into(),
            timestamp,
            bands: Vec::new(),
            metadata: BTreeMap::new(),
            mask: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Calendar day of the acquisition (UTC)
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Grid shape shared by every band, as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Map-space footprint of the scene grid
    pub fn footprint(&self) -> BBox {
        self.transform.bounds(self.shape.1, self.shape.0)
    }

    // Bands

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.contains_key(name)
    }

    /// Band names in lexical order
    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    /// Raw band grid, without the mask applied
    pub fn band(&self, name: &str) -> Result<&Raster<f64>> {
        self.bands
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| Error::MissingBand {
                scene: self.id.clone(),
                band: name.to_string(),
            })
    }

    /// Band grid with masked and no-data pixels materialised as NaN
    pub fn valid_band(&self, name: &str) -> Result<Raster<f64>> {
        let band = self.band(name)?;
        let (rows, cols) = self.shape;

        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                data.push(self.valid_value(band, row, col).unwrap_or(f64::NAN));
            }
        }

        band.with_same_meta(data)
    }

    /// Value of a band at a pixel, or `None` if the pixel is invalid
    pub fn pixel(&self, name: &str, row: usize, col: usize) -> Result<Option<f64>> {
        let band = self.band(name)?;
        if row >= self.shape.0 || col >= self.shape.1 {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.shape.0,
                cols: self.shape.1,
            });
        }
        Ok(self.valid_value(band, row, col))
    }

    /// Number of invalid pixels of a band (masked or no-data)
    pub fn invalid_count(&self, name: &str) -> Result<usize> {
        let band = self.band(name)?;
        let (rows, cols) = self.shape;
        let mut count = 0;
        for row in 0..rows {
            for col in 0..cols {
                if self.valid_value(band, row, col).is_none() {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    /// Caller guarantees `band` belongs to this scene and the pixel is in range.
    fn valid_value(&self, band: &Raster<f64>, row: usize, col: usize) -> Option<f64> {
        if let Some(mask) = &self.mask {
            if unsafe { mask.get_unchecked(row, col) } == 0 {
                return None;
            }
        }
        let value = unsafe { band.get_unchecked(row, col) };
        if band.is_nodata(value) {
            None
        } else {
            Some(value)
        }
    }

    // Mask

    pub fn mask(&self) -> Option<&Raster<u8>> {
        self.mask.as_deref()
    }

    /// Derive a scene whose mask is this scene's mask AND `validity`.
    ///
    /// Bands are shared with `self`; nothing is copied or modified.
    pub fn with_mask(&self, validity: &Raster<u8>) -> Result<Scene> {
        if validity.shape() != self.shape {
            return Err(Error::size_mismatch(self.shape, validity.shape()));
        }

        let combined = match &self.mask {
            Some(existing) => {
                let data = existing
                    .data()
                    .iter()
                    .zip(validity.data().iter())
                    .map(|(&a, &b)| u8::from(a != 0 && b != 0))
                    .collect();
                existing.with_same_meta(data)?
            }
            None => validity.clone(),
        };

        Ok(Scene {
            mask: Some(Arc::new(combined)),
            ..self.clone()
        })
    }

    // Metadata

    /// Scalar metadata value by key
    pub fn metadata(&self, key: &str) -> Option<f64> {
        self.metadata.get(key).copied()
    }
}

/// Builder for [`Scene`]; validation happens in [`SceneBuilder::build`].
#[derive(Debug)]
pub struct SceneBuilder {
    id: String,
    timestamp: DateTime<Utc>,
    bands: Vec<(String, Arc<Raster<f64>>)>,
    metadata: BTreeMap<String, f64>,
    mask: Option<Raster<u8>>,
}

impl SceneBuilder {
    pub fn band(self, name: impl Into<String>, raster: Raster<f64>) -> Self {
        self.shared_band(name, Arc::new(raster))
    }

    pub fn shared_band(mut self, name: impl Into<String>, raster: Arc<Raster<f64>>) -> Self {
        self.bands.push((name.into(), raster));
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn mask(mut self, mask: Raster<u8>) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Validate band shapes and produce the scene.
    ///
    /// The first band added fixes the grid shape and transform.
    pub fn build(self) -> Result<Scene> {
        let (shape, transform) = match self.bands.first() {
            Some((_, first)) => (first.shape(), *first.transform()),
            None => {
                return Err(Error::InvalidParameter {
                    name: "bands",
                    value: self.id,
                    reason: "a scene needs at least one band".into(),
                })
            }
        };

        let mut bands = BTreeMap::new();
        for (name, raster) in self.bands {
            if raster.shape() != shape {
                return Err(Error::size_mismatch(shape, raster.shape()));
            }
            if bands.insert(name.clone(), raster).is_some() {
                return Err(Error::InvalidParameter {
                    name: "bands",
                    value: name,
                    reason: format!("band added twice to scene '{}'", self.id),
                });
            }
        }

        if let Some(mask) = &self.mask {
            if mask.shape() != shape {
                return Err(Error::size_mismatch(shape, mask.shape()));
            }
        }

        Ok(Scene {
            id: self.id,
            timestamp: self.timestamp,
            bands,
            metadata: self.metadata,
            mask: self.mask.map(Arc::new),
            shape,
            transform,
        })
    }
}

/// An imagery scene paired with its cloud-probability scene, if one was found.
#[derive(Debug, Clone)]
pub struct JoinedScene {
    pub scene: Scene,
    pub probability: Option<Scene>,
}
