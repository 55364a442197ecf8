//! STAC (SpatioTemporal Asset Catalog) item types.
//!
//! Lightweight serde models for the `items.json` of a local catalog: a
//! GeoJSON FeatureCollection whose items carry a bbox, a datetime, scalar
//! properties and band assets pointing at GeoTIFF files.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rivice_core::BBox;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// A STAC Item Collection (GeoJSON FeatureCollection).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemCollection {
    #[serde(rename = "type", default = "feature_collection")]
    pub type_: String,

    pub features: Vec<StacItem>,
}

fn feature_collection() -> String {
    "FeatureCollection".to_string()
}

impl StacItemCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A single STAC Item (GeoJSON Feature).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItem {
    #[serde(rename = "type", default = "feature")]
    pub type_: String,

    /// Unique item identifier; the join key between collections.
    pub id: String,

    /// Bounding box `[west, south, east, north]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    pub properties: StacItemProperties,

    #[serde(default)]
    pub assets: BTreeMap<String, StacAsset>,
}

fn feature() -> String {
    "Feature".to_string()
}

impl StacItem {
    /// Get an asset by key.
    pub fn asset(&self, key: &str) -> Option<&StacAsset> {
        self.assets.get(key)
    }

    /// Acquisition instant from `properties.datetime` (RFC 3339).
    pub fn timestamp(&self) -> Result<DateTime<Utc>> {
        let raw = self
            .properties
            .datetime
            .as_deref()
            .ok_or_else(|| self.invalid("missing properties.datetime"))?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| self.invalid(format!("bad datetime '{}': {}", raw, e)))
    }

    /// Footprint from `bbox`, if present.
    pub fn footprint(&self) -> Result<Option<BBox>> {
        match &self.bbox {
            None => Ok(None),
            Some(values) => BBox::from_slice(values)
                .map(Some)
                .ok_or_else(|| self.invalid(format!("bbox needs 4 values, got {}", values.len()))),
        }
    }

    /// Numeric property by key.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.properties.extra.get(key).and_then(|v| v.as_f64())
    }

    /// Every numeric property, in key order.
    pub fn numeric_properties(&self) -> impl Iterator<Item = (&str, f64)> {
        self.properties
            .extra
            .iter()
            .filter_map(|(k, v)| v.as_f64().map(|n| (k.as_str(), n)))
    }

    fn invalid(&self, reason: impl Into<String>) -> CatalogError {
        CatalogError::InvalidItem {
            id: self.id.clone(),
            reason: reason.into(),
        }
    }
}

/// STAC Item properties.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemProperties {
    /// ISO 8601 datetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// Everything else, e.g. `CLOUDY_PIXEL_PERCENTAGE`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A single STAC Asset (file reference).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacAsset {
    /// Path to the asset file, relative to the catalog directory.
    pub href: String,

    /// Media type (e.g., `"image/tiff; application=geotiff"`).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "id": "20220905T221611_20220905T221610_T03WXT",
      "bbox": [500000.0, 7190000.0, 500200.0, 7190200.0],
      "properties": {
        "datetime": "2022-09-05T22:16:11Z",
        "CLOUDY_PIXEL_PERCENTAGE": 12.4,
        "SPACECRAFT_NAME": "Sentinel-2A"
      },
      "assets": {
        "B3": { "href": "20220905/B3.tif", "type": "image/tiff; application=geotiff" },
        "B8": { "href": "20220905/B8.tif" },
        "thumbnail": { "href": "20220905/thumb.png", "type": "image/png" }
      }
    },
    {
      "id": "no-bbox",
      "properties": { "datetime": "2022-09-06T01:00:00+02:00" }
    }
  ]
}"#;

    fn collection() -> StacItemCollection {
        serde_json::from_str(FIXTURE).unwrap()
    }

    #[test]
    fn parse_item_collection() {
        let col = collection();
        assert_eq!(col.type_, "FeatureCollection");
        assert_eq!(col.len(), 2);
        assert_eq!(col.features[1].type_, "Feature");
        assert!(col.features[1].assets.is_empty());
    }

    #[test]
    fn parse_properties() {
        let item = &collection().features[0];
        assert_eq!(item.number("CLOUDY_PIXEL_PERCENTAGE"), Some(12.4));
        assert_eq!(item.number("SPACECRAFT_NAME"), None);
        let numeric: Vec<&str> = item.numeric_properties().map(|(k, _)| k).collect();
        assert_eq!(numeric, vec!["CLOUDY_PIXEL_PERCENTAGE"]);
    }

    #[test]
    fn timestamp_normalised_to_utc() {
        let col = collection();
        assert_eq!(
            col.features[0].timestamp().unwrap().to_rfc3339(),
            "2022-09-05T22:16:11+00:00"
        );
        // +02:00 offset lands on the previous UTC day
        assert_eq!(
            col.features[1].timestamp().unwrap().date_naive().to_string(),
            "2022-09-05"
        );
    }

    #[test]
    fn footprint_and_assets() {
        let col = collection();
        let item = &col.features[0];
        assert_eq!(
            item.footprint().unwrap(),
            Some(BBox::new(500000.0, 7190000.0, 500200.0, 7190200.0))
        );
        assert_eq!(col.features[1].footprint().unwrap(), None);
        assert_eq!(item.asset("B3").unwrap().href, "20220905/B3.tif");
        assert!(item.asset("B11").is_none());
    }

    #[test]
    fn malformed_fields_are_errors() {
        let mut item = collection().features[0].clone();
        item.bbox = Some(vec![1.0, 2.0]);
        assert!(item.footprint().is_err());
        item.properties.datetime = Some("yesterday".into());
        assert!(item.timestamp().is_err());
        item.properties.datetime = None;
        assert!(matches!(item.timestamp(), Err(CatalogError::InvalidItem { .. })));
    }
}
