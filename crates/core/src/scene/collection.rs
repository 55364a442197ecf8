//! Timestamp-ordered scene collections

use super::Scene;

/// Scenes ordered by ascending timestamp.
///
/// Ordering is stable: scenes with equal timestamps keep the order they
/// were supplied in, which is the order compositing treats as priority.
#[derive(Debug, Clone, Default)]
pub struct SceneCollection {
    scenes: Vec<Scene>,
}

impl SceneCollection {
    pub fn new(mut scenes: Vec<Scene>) -> Self {
        scenes.sort_by_key(|s| s.timestamp());
        Self { scenes }
    }

    pub fn empty() -> Self {
        Self { scenes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter()
    }

    pub fn as_slice(&self) -> &[Scene] {
        &self.scenes
    }

    /// First scene (in collection order) with the given id
    pub fn find(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id() == id)
    }

    /// Keep the scenes matching `predicate`, preserving order
    pub fn filter<F>(&self, predicate: F) -> SceneCollection
    where
        F: Fn(&Scene) -> bool,
    {
        Self {
            scenes: self.scenes.iter().filter(|s| predicate(s)).cloned().collect(),
        }
    }
}

impl FromIterator<Scene> for SceneCollection {
    fn from_iter<I: IntoIterator<Item = Scene>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for SceneCollection {
    type Item = Scene;
    type IntoIter = std::vec::IntoIter<Scene>;

    fn into_iter(self) -> Self::IntoIter {
        self.scenes.into_iter()
    }
}

impl<'a> IntoIterator for &'a SceneCollection {
    type Item = &'a Scene;
    type IntoIter = std::slice::Iter<'a, Scene>;

    fn into_iter(self) -> Self::IntoIter {
        self.scenes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;
    use chrono::{TimeZone, Utc};

    fn scene(id: &str, hour: u32) -> Scene {
        Scene::builder(id, Utc.with_ymd_and_hms(2022, 9, 5, hour, 0, 0).unwrap())
            .band("green", Raster::filled(1, 1, 0.1))
            .build()
            .unwrap()
    }

    #[test]
    fn test_sorted_by_timestamp_stable() {
        let c = SceneCollection::new(vec![scene("late", 22), scene("a", 10), scene("b", 10)]);
        let ids: Vec<&str> = c.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["a", "b", "late"]);
    }

    #[test]
    fn test_find_first_match() {
        let c = SceneCollection::new(vec![scene("dup", 9), scene("dup", 11)]);
        let found = c.find("dup").unwrap();
        assert_eq!(found.timestamp().format("%H").to_string(), "09");
        assert!(c.find("missing").is_none());
    }
}
