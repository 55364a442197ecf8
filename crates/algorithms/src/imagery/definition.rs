//! Named index definitions evaluated against daily composites

use chrono::NaiveDate;
use rivice_core::raster::Raster;
use rivice_core::scene::bands;
use rivice_core::{Error, Result, Scene};

use crate::imagery::index_builder::Formula;
use crate::imagery::indices::normalized_difference;
use crate::maybe_rayon::*;

/// How an index combines its bands.
#[derive(Debug, Clone)]
pub enum IndexKind {
    /// `(a - b) / (a + b)`
    NormalizedDifference { a: String, b: String },
    /// Arbitrary band-algebra formula
    Expression(Formula),
}

/// A named spectral index.
#[derive(Debug, Clone)]
pub struct IndexDefinition {
    name: String,
    kind: IndexKind,
}

/// One index evaluated over one composite.
#[derive(Debug, Clone)]
pub struct IndexGrid {
    pub name: String,
    pub date: NaiveDate,
    pub raster: Raster<f64>,
}

impl IndexDefinition {
    /// Normalized difference of two canonical reflectance bands.
    pub fn normalized_difference(
        name: impl Into<String>,
        a: impl Into<String>,
        b: impl Into<String>,
    ) -> Result<Self> {
        let def = Self {
            name: name.into(),
            kind: IndexKind::NormalizedDifference {
                a: a.into(),
                b: b.into(),
            },
        };
        def.check_bands()?;
        Ok(def)
    }

    /// Parse a formula over canonical reflectance bands.
    pub fn expression(name: impl Into<String>, formula: &str) -> Result<Self> {
        let def = Self {
            name: name.into(),
            kind: IndexKind::Expression(Formula::parse(formula)?),
        };
        def.check_bands()?;
        Ok(def)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &IndexKind {
        &self.kind
    }

    /// Bands this index reads, without duplicates
    pub fn required_bands(&self) -> Vec<&str> {
        match &self.kind {
            IndexKind::NormalizedDifference { a, b } if a == b => vec![a.as_str()],
            IndexKind::NormalizedDifference { a, b } => vec![a.as_str(), b.as_str()],
            IndexKind::Expression(formula) => formula.bands().iter().map(String::as_str).collect(),
        }
    }

    fn check_bands(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidParameter {
                name: "index",
                value: self.name.clone(),
                reason: "index name is empty".into(),
            });
        }
        let required = self.required_bands();
        if required.is_empty() {
            return Err(Error::InvalidParameter {
                name: "index",
                value: self.name.clone(),
                reason: "index reads no bands".into(),
            });
        }
        for band in required {
            if !bands::is_reflectance(band) {
                return Err(Error::InvalidParameter {
                    name: "index",
                    value: self.name.clone(),
                    reason: format!(
                        "unknown band '{}', expected one of {}",
                        band,
                        bands::REFLECTANCE.join(", ")
                    ),
                });
            }
        }
        Ok(())
    }

    /// Evaluate against a composite.
    ///
    /// Only the required bands are read; masked pixels become NaN before
    /// the arithmetic runs.
    pub fn evaluate(&self, composite: &Scene) -> Result<IndexGrid> {
        let raster = match &self.kind {
            IndexKind::NormalizedDifference { a, b } => {
                let a = composite.valid_band(a)?;
                let b = composite.valid_band(b)?;
                normalized_difference(&a, &b)?
            }
            IndexKind::Expression(formula) => {
                let inputs = formula
                    .bands()
                    .iter()
                    .map(|band| composite.valid_band(band))
                    .collect::<Result<Vec<_>>>()?;
                let refs: Vec<&Raster<f64>> = inputs.iter().collect();
                formula.evaluate(&refs)?
            }
        };

        Ok(IndexGrid {
            name: self.name.clone(),
            date: composite.date(),
            raster,
        })
    }
}

/// The default water/ice index set, in output column order.
pub fn water_ice_indices() -> Vec<IndexDefinition> {
    let nd = |name: &str, a: &str, b: &str| IndexDefinition {
        name: name.to_string(),
        kind: IndexKind::NormalizedDifference {
            a: a.to_string(),
            b: b.to_string(),
        },
    };

    vec![
        // McFeeters NDWI
        nd("NDWI", bands::GREEN, bands::NIR),
        nd("NDWI_SWIR", bands::GREEN, bands::SWIR),
        nd("NIR_SWIR", bands::NIR, bands::SWIR),
        // ratio index, unbounded; NaN where nir == swir
        IndexDefinition {
            name: "RDRI".to_string(),
            kind: IndexKind::Expression(Formula::difference_ratio(
                bands::RED,
                bands::NIR,
                bands::SWIR,
            )),
        },
    ]
}

/// Evaluate every definition against one composite, in definition order.
pub fn compute_indices(composite: &Scene, defs: &[IndexDefinition]) -> Result<Vec<IndexGrid>> {
    defs.into_par_iter().map(|def| def.evaluate(composite)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn composite() -> Scene {
        let grid = |v: f64| Raster::filled(2, 2, v);
        Scene::builder("2022-10-03", Utc.with_ymd_and_hms(2022, 10, 3, 0, 0, 0).unwrap())
            .band(bands::RED, grid(0.30))
            .band(bands::GREEN, grid(0.30))
            .band(bands::NIR, grid(0.20))
            .band(bands::SWIR, grid(0.05))
            .mask(Raster::from_vec(vec![1, 1, 1, 0], 2, 2).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_set() {
        let defs = water_ice_indices();
        let names: Vec<&str> = defs.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["NDWI", "NDWI_SWIR", "NIR_SWIR", "RDRI"]);
        assert_eq!(defs[3].required_bands(), vec!["red", "nir", "swir"]);
    }

    #[test]
    fn test_compute_indices_in_order() {
        let grids = compute_indices(&composite(), &water_ice_indices()).unwrap();
        assert_eq!(grids.len(), 4);
        assert_eq!(grids[0].name, "NDWI");
        assert_eq!(grids[0].date, NaiveDate::from_ymd_opt(2022, 10, 3).unwrap());

        assert_relative_eq!(grids[0].raster.get(0, 0).unwrap(), 0.1 / 0.5, epsilon = 1e-12);
        assert_relative_eq!(grids[1].raster.get(0, 0).unwrap(), 0.25 / 0.35, epsilon = 1e-12);
        assert_relative_eq!(grids[2].raster.get(0, 0).unwrap(), 0.15 / 0.25, epsilon = 1e-12);
        assert_relative_eq!(grids[3].raster.get(0, 0).unwrap(), 0.1 / 0.15, epsilon = 1e-12);

        // masked pixel is invalid in every index
        for grid in &grids {
            assert!(grid.raster.get(1, 1).unwrap().is_nan(), "{}", grid.name);
        }
    }

    #[test]
    fn test_rdri_matches_parsed_formula() {
        let defs = water_ice_indices();
        let rdri = &defs[3];
        match rdri.kind() {
            IndexKind::Expression(formula) => {
                assert_eq!(formula.source(), "(red - nir) / (nir - swir)")
            }
            other => panic!("RDRI built as {:?}", other),
        }

        let parsed = IndexDefinition::expression("RDRI", "(red - nir) / (nir - swir)").unwrap();
        let scene = composite();
        let built = rdri.evaluate(&scene).unwrap();
        let reference = parsed.evaluate(&scene).unwrap();
        assert_eq!(built.raster.valid_count(), reference.raster.valid_count());
        assert_relative_eq!(
            built.raster.get(0, 1).unwrap(),
            reference.raster.get(0, 1).unwrap(),
            epsilon = 1e-15
        );
    }

    fn uniform(red: f64, green: f64, nir: f64, swir: f64) -> Scene {
        Scene::builder("2022-10-04", Utc.with_ymd_and_hms(2022, 10, 4, 0, 0, 0).unwrap())
            .band(bands::RED, Raster::filled(2, 2, red))
            .band(bands::GREEN, Raster::filled(2, 2, green))
            .band(bands::NIR, Raster::filled(2, 2, nir))
            .band(bands::SWIR, Raster::filled(2, 2, swir))
            .build()
            .unwrap()
    }

    fn index(name: &str, scene: &Scene) -> Raster<f64> {
        water_ice_indices()
            .into_iter()
            .find(|d| d.name() == name)
            .unwrap()
            .evaluate(scene)
            .unwrap()
            .raster
    }

    #[test]
    fn test_ndwi_water_positive() {
        let val = index("NDWI", &uniform(0.1, 0.3, 0.05, 0.02)).get(1, 1).unwrap();
        assert_relative_eq!(val, 0.25 / 0.35, epsilon = 1e-12);
        assert!((val - 0.714).abs() < 1e-3);
    }

    #[test]
    fn test_nir_swir() {
        let val = index("NIR_SWIR", &uniform(0.1, 0.3, 0.4, 0.1)).get(0, 0).unwrap();
        assert_relative_eq!(val, 0.6, epsilon = 1e-10);
    }

    #[test]
    fn test_rdri_equal_nir_swir_is_nan() {
        let rdri = index("RDRI", &uniform(0.3, 0.3, 0.2, 0.2));
        assert!(rdri.get(0, 0).unwrap().is_nan());
        assert_eq!(rdri.valid_count(), 0);
    }

    #[test]
    fn test_unknown_band_rejected() {
        assert!(IndexDefinition::normalized_difference("X", "green", "blue").is_err());
        assert!(IndexDefinition::expression("Y", "nir / B8").is_err());
        assert!(IndexDefinition::expression("Z", "2 * 3").is_err());
        assert!(IndexDefinition::expression("", "nir").is_err());
        assert!(IndexDefinition::expression("OK", "swir / nir").is_ok());
    }

    #[test]
    fn test_missing_band_in_composite() {
        let scene = Scene::builder("2022-10-03", Utc.with_ymd_and_hms(2022, 10, 3, 0, 0, 0).unwrap())
            .band(bands::GREEN, Raster::filled(1, 1, 0.2))
            .build()
            .unwrap();
        let err = water_ice_indices()[0].evaluate(&scene).unwrap_err();
        assert!(matches!(err, Error::MissingBand { .. }));
    }
}
