//! TOML configuration for a pipeline run.
//!
//! ```toml
//! start_date = "2022-09-01"
//! end_date = "2023-07-01"
//! max_cloud_pct = 30
//! output_name = "kuskokwim_bethel"
//!
//! [roi]
//! exterior = [[500000.0, 7190000.0], [500200.0, 7190000.0], [500200.0, 7190200.0]]
//!
//! [[index]]
//! name = "GREEN_SWIR_RATIO"
//! expression = "green / swir"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use rivice_algorithms::imagery::{water_ice_indices, IndexDefinition};
use rivice_algorithms::masking::CloudMaskParams;
use rivice_catalog::{DateRange, SceneQuery, DEFAULT_CLOUD_COVER_KEY};
use rivice_core::scene::bands;
use rivice_core::{BandAliases, RegionOfInterest};
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::executor::ProcessingMode;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// First day of the window (inclusive).
    pub start_date: NaiveDate,
    /// Day after the window (exclusive).
    pub end_date: NaiveDate,

    #[serde(default = "default_max_cloud_pct")]
    pub max_cloud_pct: f64,

    /// Pixel cloud probability (percent) above which a pixel is masked.
    #[serde(default = "default_cloud_probability_threshold")]
    pub cloud_probability_threshold: f64,

    /// Sampling step of the zonal mean, in map units.
    #[serde(default = "default_scale")]
    pub scale: f64,

    pub output_name: String,

    #[serde(default = "default_cloud_cover_key")]
    pub cloud_cover_key: String,

    pub roi: RoiConfig,

    /// Extra asset-name → band aliases, on top of the Sentinel-2 names.
    #[serde(default)]
    pub bands: BTreeMap<String, String>,

    /// Emit NDWI, NDWI_SWIR, NIR_SWIR and RDRI before any custom index.
    #[serde(default = "default_true")]
    pub default_indices: bool,

    #[serde(default, rename = "index")]
    pub indices: Vec<IndexConfig>,

    /// Worker threads; 0 uses every core.
    #[serde(default)]
    pub threads: usize,
}

fn default_max_cloud_pct() -> f64 {
    30.0
}
fn default_cloud_probability_threshold() -> f64 {
    50.0
}
fn default_scale() -> f64 {
    10.0
}
fn default_cloud_cover_key() -> String {
    DEFAULT_CLOUD_COVER_KEY.to_string()
}
fn default_true() -> bool {
    true
}

/// Study polygon as `[x, y]` rings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoiConfig {
    pub exterior: Vec<[f64; 2]>,
    #[serde(default)]
    pub holes: Vec<Vec<[f64; 2]>>,
}

/// A custom index: exactly one of `normalized_difference` or `expression`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    pub name: String,
    #[serde(default)]
    pub normalized_difference: Option<[String; 2]>,
    #[serde(default)]
    pub expression: Option<String>,
}

impl IndexConfig {
    fn to_definition(&self) -> Result<IndexDefinition> {
        let def = match (&self.normalized_difference, &self.expression) {
            (Some([a, b]), None) => IndexDefinition::normalized_difference(&self.name, a, b),
            (None, Some(formula)) => IndexDefinition::expression(&self.name, formula),
            _ => {
                return Err(PipelineError::Config(format!(
                    "index '{}' needs exactly one of normalized_difference or expression",
                    self.name
                )))
            }
        };
        def.map_err(|e| PipelineError::Config(format!("index '{}': {}", self.name, e)))
    }
}

impl PipelineConfig {
    /// Read and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PipelineConfig =
            toml::from_str(&text).map_err(|source| PipelineError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text)
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Range checks plus a dry build of the ROI and index set.
    pub fn validate(&self) -> Result<()> {
        if self.start_date >= self.end_date {
            return Err(PipelineError::Config(format!(
                "start_date {} must be before end_date {}",
                self.start_date, self.end_date
            )));
        }
        check_percent("max_cloud_pct", self.max_cloud_pct)?;
        check_percent("cloud_probability_threshold", self.cloud_probability_threshold)?;
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(PipelineError::Config(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if self.output_name.trim().is_empty() {
            return Err(PipelineError::Config("output_name is empty".into()));
        }
        if self.cloud_cover_key.trim().is_empty() {
            return Err(PipelineError::Config("cloud_cover_key is empty".into()));
        }
        for (source, band) in &self.bands {
            if !bands::is_reflectance(band) && band != bands::PROBABILITY {
                return Err(PipelineError::Config(format!(
                    "alias '{}' maps to unknown band '{}'",
                    source, band
                )));
            }
        }

        self.region()?;
        self.index_definitions()?;
        Ok(())
    }

    pub fn date_range(&self) -> Result<DateRange> {
        DateRange::new(self.start_date, self.end_date)
            .map_err(|e| PipelineError::Config(e.to_string()))
    }

    pub fn region(&self) -> Result<RegionOfInterest> {
        RegionOfInterest::from_coords(&self.roi.exterior, &self.roi.holes)
            .map_err(|e| PipelineError::Config(format!("roi: {}", e)))
    }

    /// Catalog query over the ROI bounds and date window.
    pub fn query(&self, roi: &RegionOfInterest) -> Result<SceneQuery> {
        Ok(SceneQuery::new(roi.bounds(), self.date_range()?)
            .with_max_cloud(self.max_cloud_pct)
            .with_cloud_cover_key(self.cloud_cover_key.clone()))
    }

    /// Sentinel-2 aliases extended with the configured table
    pub fn band_aliases(&self) -> BandAliases {
        self.bands
            .iter()
            .fold(BandAliases::sentinel2(), |aliases, (source, band)| aliases.with(source, band))
    }

    pub fn mask_params(&self) -> CloudMaskParams {
        CloudMaskParams {
            probability_threshold: self.cloud_probability_threshold,
            ..CloudMaskParams::default()
        }
    }

    /// Defaults (if enabled) followed by the custom indices; names are unique.
    pub fn index_definitions(&self) -> Result<Vec<IndexDefinition>> {
        let mut defs = if self.default_indices {
            water_ice_indices()
        } else {
            Vec::new()
        };
        for index in &self.indices {
            let def = index.to_definition()?;
            if defs.iter().any(|d| d.name() == def.name()) {
                return Err(PipelineError::Config(format!(
                    "index '{}' defined twice",
                    def.name()
                )));
            }
            defs.push(def);
        }
        if defs.is_empty() {
            return Err(PipelineError::Config("no indices to compute".into()));
        }
        Ok(defs)
    }

    pub fn processing_mode(&self) -> ProcessingMode {
        match self.threads {
            0 => ProcessingMode::Parallel,
            1 => ProcessingMode::Sequential,
            n => ProcessingMode::ParallelWith(n),
        }
    }
}

fn check_percent(name: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(PipelineError::Config(format!(
            "{} must be within 0..=100, got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
start_date = "2022-09-01"
end_date = "2023-07-01"
output_name = "river"

[roi]
exterior = [[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]]
"#;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.max_cloud_pct, 30.0);
        assert_eq!(config.cloud_probability_threshold, 50.0);
        assert_eq!(config.scale, 10.0);
        assert_eq!(config.cloud_cover_key, "CLOUDY_PIXEL_PERCENTAGE");
        assert_eq!(config.processing_mode(), ProcessingMode::Parallel);

        let names: Vec<String> = config
            .index_definitions()
            .unwrap()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, vec!["NDWI", "NDWI_SWIR", "NIR_SWIR", "RDRI"]);

        let query = config.query(&config.region().unwrap()).unwrap();
        assert_eq!(query.max_cloud_pct, Some(30.0));
        assert_eq!(config.mask_params().probability_threshold, 50.0);
    }

    #[test]
    fn test_custom_indices_and_aliases() {
        let text = format!(
            "{}{}",
            MINIMAL.replace("output_name = \"river\"", "output_name = \"river\"\nthreads = 4\n\n[bands]\nSR_B3 = \"green\""),
            r#"
[[index]]
name = "GREEN_SWIR"
expression = "green / swir"

[[index]]
name = "ND_RED_NIR"
normalized_difference = ["red", "nir"]
"#
        );
        let config = PipelineConfig::from_toml_str(&text).unwrap();
        let defs = config.index_definitions().unwrap();
        assert_eq!(defs.len(), 6);
        assert_eq!(defs[4].name(), "GREEN_SWIR");
        assert_eq!(config.band_aliases().resolve("SR_B3"), Some("green"));
        assert_eq!(config.band_aliases().resolve("B11"), Some("swir"));
        assert_eq!(config.processing_mode(), ProcessingMode::ParallelWith(4));
    }

    #[test]
    fn test_rejections() {
        let bad = [
            MINIMAL.replace("2023-07-01", "2022-08-01"),
            format!("max_cloud_pct = 130\n{}", MINIMAL),
            format!("scale = 0.0\n{}", MINIMAL),
            MINIMAL.replace("\"river\"", "\"  \""),
            format!("unknown_key = 1\n{}", MINIMAL),
            MINIMAL.replace(
                "[[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]]",
                "[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]",
            ),
            format!("{}\n[[index]]\nname = \"NDWI\"\nexpression = \"green / nir\"\n", MINIMAL),
            format!("{}\n[[index]]\nname = \"X\"\nexpression = \"green / blue\"\n", MINIMAL),
            format!(
                "{}\n[[index]]\nname = \"Y\"\nexpression = \"nir\"\nnormalized_difference = [\"nir\", \"red\"]\n",
                MINIMAL
            ),
            format!("{}\n[bands]\nB2 = \"blue\"\n", MINIMAL),
        ];
        for text in bad {
            assert!(PipelineConfig::from_toml_str(&text).is_err(), "accepted:\n{}", text);
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.output_name, "river");

        let missing = PipelineConfig::from_file("/nonexistent/rivice.toml").unwrap_err();
        assert!(matches!(missing, PipelineError::Io { .. }));
    }
}
