//! Catalog over scenes already held in memory.

use rivice_core::{Scene, SceneCollection};

use crate::error::Result;
use crate::query::{Catalog, SceneQuery};

/// A catalog that filters a fixed scene collection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    scenes: SceneCollection,
}

impl InMemoryCatalog {
    pub fn new(scenes: impl IntoIterator<Item = Scene>) -> Self {
        Self {
            scenes: scenes.into_iter().collect(),
        }
    }

    pub fn scenes(&self) -> &SceneCollection {
        &self.scenes
    }
}

impl Catalog for InMemoryCatalog {
    fn query(&self, query: &SceneQuery) -> Result<SceneCollection> {
        Ok(query.apply(&self.scenes))
    }
}
