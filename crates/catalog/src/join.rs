//! Join an imagery collection with its cloud-probability companion.
//!
//! Imagery scenes are filtered by bounds, dates and the scene-level cloud
//! percentage; probability scenes by bounds and dates only. Each imagery
//! scene is paired with the first probability scene sharing its id.

use std::collections::{HashMap, HashSet};

use rivice_core::{JoinedScene, Scene, SceneCollection};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::query::{Catalog, SceneQuery};

/// Imagery scenes with their matched probability scenes.
///
/// Ascending timestamp order; imagery ids are unique.
#[derive(Debug, Clone, Default)]
pub struct JoinedCollection {
    pairs: Vec<JoinedScene>,
}

impl JoinedCollection {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JoinedScene> {
        self.pairs.iter()
    }

    pub fn as_slice(&self) -> &[JoinedScene] {
        &self.pairs
    }

    pub fn into_vec(self) -> Vec<JoinedScene> {
        self.pairs
    }

    /// Pairs that found a probability scene
    pub fn matched(&self) -> usize {
        self.pairs.iter().filter(|p| p.probability.is_some()).count()
    }
}

/// Filter both collections and pair them by scene id.
pub fn join(primary: &SceneCollection, secondary: &SceneCollection, query: &SceneQuery) -> JoinedCollection {
    let secondary = query.without_cloud_filter().apply(secondary);

    let mut by_id: HashMap<&str, &Scene> = HashMap::new();
    for scene in &secondary {
        by_id.entry(scene.id()).or_insert(scene);
    }

    let no_probability = secondary.is_empty();
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();

    for scene in primary.iter().filter(|s| query.matches(s)) {
        if !seen.insert(scene.id()) {
            debug!(scene = scene.id(), "duplicate imagery id dropped");
            continue;
        }

        let probability = by_id.get(scene.id()).map(|p| (*p).clone());
        if probability.is_none() && !no_probability {
            warn!(scene = scene.id(), "no cloud probability scene, treating all pixels as valid");
        }

        pairs.push(JoinedScene {
            scene: scene.clone(),
            probability,
        });
    }

    if no_probability && !pairs.is_empty() {
        warn!(
            scenes = pairs.len(),
            "cloud probability collection is empty, treating all pixels as valid"
        );
    }

    JoinedCollection { pairs }
}

/// Query both catalogs and join the results.
///
/// An empty imagery result is an empty collection, not an error.
pub fn join_from_catalogs(
    imagery: &dyn Catalog,
    probability: &dyn Catalog,
    query: &SceneQuery,
) -> Result<JoinedCollection> {
    let primary = imagery.query(query)?;
    if primary.is_empty() {
        info!("no imagery scenes match the query");
        return Ok(JoinedCollection::default());
    }

    let secondary = probability.query(&query.without_cloud_filter())?;
    let joined = join(&primary, &secondary, query);

    info!(
        imagery = joined.len(),
        probability = secondary.len(),
        matched = joined.matched(),
        "collections joined"
    );

    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCatalog;
    use crate::query::DateRange;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rivice_core::scene::bands;
    use rivice_core::{BBox, GeoTransform, Raster};

    fn grid(value: f64) -> Raster<f64> {
        Raster::filled(2, 2, value).with_transform(GeoTransform::new(0.0, 20.0, 10.0, -10.0))
    }

    fn imagery(id: &str, day: u32, cloud: Option<f64>) -> Scene {
        let mut b = Scene::builder(id, Utc.with_ymd_and_hms(2022, 10, day, 22, 0, 0).unwrap())
            .band(bands::GREEN, grid(0.2));
        if let Some(c) = cloud {
            b = b.metadata("CLOUDY_PIXEL_PERCENTAGE", c);
        }
        b.build().unwrap()
    }

    fn probability(id: &str, day: u32, p: f64) -> Scene {
        Scene::builder(id, Utc.with_ymd_and_hms(2022, 10, day, 22, 0, 0).unwrap())
            .band(bands::PROBABILITY, grid(p))
            .build()
            .unwrap()
    }

    fn query() -> SceneQuery {
        SceneQuery::new(
            BBox::new(0.0, 0.0, 20.0, 20.0),
            DateRange::new(
                NaiveDate::from_ymd_opt(2022, 10, 1).unwrap(),
                NaiveDate::from_ymd_opt(2022, 10, 20).unwrap(),
            )
            .unwrap(),
        )
        .with_max_cloud(30.0)
    }

    #[test]
    fn test_cloud_threshold_applies_to_imagery_only() {
        let primary = SceneCollection::new(vec![
            imagery("a", 3, Some(10.0)),
            imagery("b", 4, Some(45.0)),
            imagery("c", 5, None),
        ]);
        let secondary = SceneCollection::new(vec![probability("a", 3, 80.0)]);

        let joined = join(&primary, &secondary, &query());
        let ids: Vec<&str> = joined.iter().map(|p| p.scene.id()).collect();
        assert_eq!(ids, vec!["a"]);
        assert!(joined.as_slice()[0].probability.is_some());
    }

    #[test]
    fn test_unmatched_pair_has_no_probability() {
        let primary = SceneCollection::new(vec![imagery("a", 3, Some(1.0)), imagery("b", 4, Some(1.0))]);
        let secondary = SceneCollection::new(vec![probability("b", 4, 0.0), probability("b", 4, 99.0)]);

        let joined = join(&primary, &secondary, &query());
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.matched(), 1);
        assert!(joined.as_slice()[0].probability.is_none());

        // first secondary with the id wins
        let matched = joined.as_slice()[1].probability.as_ref().unwrap();
        assert_eq!(matched.band(bands::PROBABILITY).unwrap().get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_duplicate_imagery_ids_first_wins() {
        let primary = SceneCollection::new(vec![imagery("a", 3, Some(1.0)), imagery("a", 6, Some(2.0))]);
        let joined = join(&primary, &SceneCollection::empty(), &query());
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.as_slice()[0].scene.metadata("CLOUDY_PIXEL_PERCENTAGE"), Some(1.0));
    }

    #[test]
    fn test_secondary_outside_window_ignored() {
        let primary = SceneCollection::new(vec![imagery("a", 3, Some(1.0))]);
        let late = Scene::builder("a", Utc.with_ymd_and_hms(2022, 11, 30, 0, 0, 0).unwrap())
            .band(bands::PROBABILITY, grid(0.0))
            .build()
            .unwrap();
        let joined = join(&primary, &SceneCollection::new(vec![late]), &query());
        assert_eq!(joined.matched(), 0);
    }

    #[test]
    fn test_join_from_catalogs() {
        let imagery_catalog = InMemoryCatalog::new(vec![imagery("a", 3, Some(5.0)), imagery("z", 25, Some(5.0))]);
        let probability_catalog = InMemoryCatalog::new(vec![probability("a", 3, 10.0)]);

        let joined = join_from_catalogs(&imagery_catalog, &probability_catalog, &query()).unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.matched(), 1);

        let empty = InMemoryCatalog::default();
        let none = join_from_catalogs(&empty, &probability_catalog, &query()).unwrap();
        assert!(none.is_empty());
    }
}
