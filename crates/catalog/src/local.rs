//! Catalog backed by a local directory.
//!
//! Layout:
//!
//! ```text
//! <root>/items.json        STAC ItemCollection
//! <root>/<asset href>.tif  one single-band GeoTIFF per band asset
//! ```
//!
//! Asset keys are mapped onto canonical band names through [`BandAliases`];
//! assets with no mapping (thumbnails, extra bands) are ignored. Band files
//! are read only for items that pass the query.

use std::fs;
use std::path::{Path, PathBuf};

use rivice_core::io::read_geotiff;
use rivice_core::{BandAliases, Scene, SceneCollection};
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::query::{Catalog, SceneQuery};
use crate::stac_models::{StacItem, StacItemCollection};

/// Name of the item collection file inside a catalog directory.
pub const ITEMS_FILE: &str = "items.json";

/// A directory of STAC items and GeoTIFF band assets.
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    root: PathBuf,
    items: Vec<StacItem>,
    aliases: BandAliases,
}

impl LocalCatalog {
    /// Open a catalog directory, parsing its `items.json`.
    ///
    /// Band names default to the Sentinel-2 aliases.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let path = root.join(ITEMS_FILE);

        let text = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
            path: path.clone(),
            source,
        })?;
        let collection: StacItemCollection =
            serde_json::from_str(&text).map_err(|source| CatalogError::Json {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), items = collection.len(), "catalog opened");

        Ok(Self {
            root,
            items: collection.features,
            aliases: BandAliases::default(),
        })
    }

    /// Replace the band alias table
    pub fn with_aliases(mut self, aliases: BandAliases) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn items(&self) -> &[StacItem] {
        &self.items
    }

    /// Read every recognised band asset of an item into a scene.
    pub fn load_scene(&self, item: &StacItem) -> Result<Scene> {
        let mut builder = Scene::builder(item.id.clone(), item.timestamp()?);

        for (key, value) in item.numeric_properties() {
            builder = builder.metadata(key, value);
        }

        let mut loaded = 0;
        for (key, asset) in &item.assets {
            let band = match self.aliases.resolve(key) {
                Some(band) => band,
                None => continue,
            };
            let path = self.root.join(&asset.href);
            let raster = read_geotiff::<f64, _>(&path).map_err(|e| CatalogError::InvalidItem {
                id: item.id.clone(),
                reason: format!("band '{}' at {}: {}", key, path.display(), e),
            })?;
            builder = builder.band(band, raster);
            loaded += 1;
        }

        if loaded == 0 {
            return Err(CatalogError::InvalidItem {
                id: item.id.clone(),
                reason: "no recognised band assets".into(),
            });
        }

        Ok(builder.build()?)
    }
}

impl Catalog for LocalCatalog {
    fn query(&self, query: &SceneQuery) -> Result<SceneCollection> {
        let mut scenes = Vec::new();

        for item in &self.items {
            let timestamp = item.timestamp()?;
            let cloud = item.number(&query.cloud_cover_key);

            let accepted = match item.footprint()? {
                Some(footprint) => {
                    if !query.accepts(timestamp, &footprint, cloud) {
                        continue;
                    }
                    self.load_scene(item)?
                }
                // no bbox: the grid footprint decides
                None => {
                    if !query.dates.contains(timestamp) {
                        continue;
                    }
                    let scene = self.load_scene(item)?;
                    if !query.matches(&scene) {
                        continue;
                    }
                    scene
                }
            };
            scenes.push(accepted);
        }

        debug!(
            root = %self.root.display(),
            matched = scenes.len(),
            total = self.items.len(),
            "catalog query"
        );

        Ok(SceneCollection::new(scenes))
    }
}
