//! Canonical band names and source-specific aliases.

use std::collections::BTreeMap;

/// Red reflectance
pub const RED: &str = "red";
/// Green reflectance
pub const GREEN: &str = "green";
/// Near-infrared reflectance
pub const NIR: &str = "nir";
/// Short-wave infrared reflectance
pub const SWIR: &str = "swir";
/// Per-pixel cloud probability in percent
pub const PROBABILITY: &str = "probability";

/// The reflectance bands the index engine may read.
pub const REFLECTANCE: [&str; 4] = [RED, GREEN, NIR, SWIR];

/// Whether `name` is one of the four canonical reflectance bands
pub fn is_reflectance(name: &str) -> bool {
    REFLECTANCE.contains(&name)
}

/// Maps source asset names (e.g. Sentinel-2 `B3`) onto canonical band names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandAliases {
    aliases: BTreeMap<String, String>,
}

impl BandAliases {
    /// Empty table: only canonical names are recognised
    pub fn new() -> Self {
        Self {
            aliases: BTreeMap::new(),
        }
    }

    /// Sentinel-2 MSI L2A naming (B4 red, B3 green, B8 NIR, B11 SWIR)
    pub fn sentinel2() -> Self {
        Self::new()
            .with("B4", RED)
            .with("B3", GREEN)
            .with("B8", NIR)
            .with("B11", SWIR)
    }

    /// Add an alias
    pub fn with(mut self, source: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases.insert(source.into(), canonical.into());
        self
    }

    /// Canonical name for a source asset, if the asset is a recognised band.
    ///
    /// Canonical names map to themselves.
    pub fn resolve<'a>(&'a self, source: &'a str) -> Option<&'a str> {
        if let Some(canonical) = self.aliases.get(source) {
            return Some(canonical.as_str());
        }
        if is_reflectance(source) || source == PROBABILITY {
            Some(source)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for BandAliases {
    fn default() -> Self {
        Self::sentinel2()
    }
}
