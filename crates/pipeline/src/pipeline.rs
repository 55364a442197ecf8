//! The staged daily index pipeline.
//!
//! join → mask → composite → index → reduce → table. Each stage is an
//! eager pure function over the previous stage's full output; a failure is
//! reported with the stage it happened in.

use chrono::NaiveDate;
use rivice_algorithms::composite::daily_composites;
use rivice_algorithms::imagery::{compute_indices, IndexDefinition};
use rivice_algorithms::masking::{mask_collection, CloudMaskParams};
use rivice_algorithms::statistics::{valid_coverage, zonal_mean};
use rivice_catalog::{join_from_catalogs, Catalog, JoinedCollection, SceneQuery};
use rivice_core::RegionOfInterest;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, Stage};
use crate::executor::ProcessingMode;
use crate::table::{IndexValue, TableBuilder, TimeSeriesTable};

/// Default zonal sampling step, in map units.
pub const DEFAULT_SCALE: f64 = 10.0;

/// A configured pipeline, reusable across catalogs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    roi: RegionOfInterest,
    query: SceneQuery,
    mask: CloudMaskParams,
    indices: Vec<IndexDefinition>,
    scale: f64,
    mode: ProcessingMode,
}

impl Pipeline {
    pub fn new(roi: RegionOfInterest, query: SceneQuery, indices: Vec<IndexDefinition>) -> Self {
        Self {
            roi,
            query,
            mask: CloudMaskParams::default(),
            indices,
            scale: DEFAULT_SCALE,
            mode: ProcessingMode::default(),
        }
    }

    /// Build from a validated configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let roi = config.region()?;
        let query = config.query(&roi)?;
        Ok(Self::new(roi, query, config.index_definitions()?)
            .with_mask_params(config.mask_params())
            .with_scale(config.scale)
            .with_mode(config.processing_mode()))
    }

    pub fn with_mask_params(mut self, params: CloudMaskParams) -> Self {
        self.mask = params;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn query(&self) -> &SceneQuery {
        &self.query
    }

    pub fn indices(&self) -> &[IndexDefinition] {
        &self.indices
    }

    /// Table column names, in definition order
    pub fn index_names(&self) -> Vec<String> {
        self.indices.iter().map(|d| d.name().to_string()).collect()
    }

    /// Query both catalogs and run every stage.
    pub fn run(&self, imagery: &dyn Catalog, probability: &dyn Catalog) -> Result<TimeSeriesTable> {
        let joined = join_from_catalogs(imagery, probability, &self.query)
            .map_err(|e| PipelineError::stage(Stage::Join, e))?;
        self.run_joined(&joined)
    }

    /// Run the stages after the join.
    ///
    /// An empty collection yields an empty table.
    pub fn run_joined(&self, joined: &JoinedCollection) -> Result<TimeSeriesTable> {
        if joined.is_empty() {
            info!("no scenes to process, table is empty");
            return Ok(TimeSeriesTable::empty(self.index_names()));
        }
        self.mode.install(|| self.run_stages(joined))?
    }

    fn run_stages(&self, joined: &JoinedCollection) -> Result<TimeSeriesTable> {
        let masked = mask_collection(joined.as_slice(), &self.mask)
            .map_err(|e| PipelineError::stage(Stage::Mask, e))?;
        info!(scenes = masked.len(), "cloud masks applied");

        let composites =
            daily_composites(&masked).map_err(|e| PipelineError::stage(Stage::Composite, e))?;
        info!(dates = composites.len(), "daily composites built");

        let mut builder = TableBuilder::new(self.index_names());
        for composite in &composites {
            let grids = compute_indices(&composite.scene, &self.indices)
                .map_err(|e| PipelineError::stage(Stage::Index, e))?;

            let values = grids
                .iter()
                .map(|grid| {
                    zonal_mean(&grid.raster, &self.roi, self.scale).map(|stats| IndexValue::from(stats.mean))
                })
                .collect::<rivice_core::Result<Vec<_>>>()
                .map_err(|e| PipelineError::stage(Stage::Reduce, e))?;
            let coverage = valid_coverage(&composite.scene, &self.roi, self.scale)
                .map_err(|e| PipelineError::stage(Stage::Reduce, e))?;

            log_row(composite.date, &composite.sources, &values);
            builder
                .push(composite.date, values, IndexValue::from(coverage))
                .map_err(|e| PipelineError::stage(Stage::Table, e))?;
        }

        let table = builder
            .build()
            .map_err(|e| PipelineError::stage(Stage::Table, e))?;
        info!(rows = table.len(), "time series assembled");
        Ok(table)
    }
}

fn log_row(date: NaiveDate, sources: &[String], values: &[IndexValue]) {
    let no_data = values.iter().filter(|v| v.is_no_data()).count();
    debug!(%date, sources = sources.join(","), no_data, "date reduced");
}
