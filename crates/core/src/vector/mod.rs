//! Region of interest geometry
//!
//! The study polygon is supplied once and read by every reduction, so it is
//! validated at construction and never changes afterwards.

use geo::{Area, BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon};

use crate::error::{Error, Result};
use crate::raster::BBox;

/// An immutable (multi)polygon defining the area of analysis.
#[derive(Debug, Clone)]
pub struct RegionOfInterest {
    shape: MultiPolygon<f64>,
    bounds: BBox,
}

impl RegionOfInterest {
    /// Build from a single polygon.
    pub fn from_polygon(polygon: Polygon<f64>) -> Result<Self> {
        Self::from_multi_polygon(MultiPolygon::new(vec![polygon]))
    }

    /// Build from an exterior ring and optional holes given as `[x, y]` pairs.
    ///
    /// Rings are closed automatically if the last coordinate differs from
    /// the first.
    pub fn from_coords(exterior: &[[f64; 2]], holes: &[Vec<[f64; 2]>]) -> Result<Self> {
        let ring = |coords: &[[f64; 2]]| {
            LineString::from(coords.iter().map(|&[x, y]| Coord { x, y }).collect::<Vec<_>>())
        };
        let polygon = Polygon::new(ring(exterior), holes.iter().map(|h| ring(h)).collect());
        Self::from_polygon(polygon)
    }

    /// Build from a multipolygon, validating every ring.
    pub fn from_multi_polygon(shape: MultiPolygon<f64>) -> Result<Self> {
        if shape.0.is_empty() {
            return Err(Error::InvalidGeometry("region has no polygons".into()));
        }

        for polygon in &shape.0 {
            validate_ring(polygon.exterior(), "exterior")?;
            for hole in polygon.interiors() {
                validate_ring(hole, "interior")?;
            }
        }

        if shape.unsigned_area() <= 0.0 {
            return Err(Error::InvalidGeometry("region has zero area".into()));
        }

        let rect = shape
            .bounding_rect()
            .ok_or_else(|| Error::InvalidGeometry("region has no extent".into()))?;
        let bounds = BBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);

        Ok(Self { shape, bounds })
    }

    /// Bounding box of the region
    pub fn bounds(&self) -> BBox {
        self.bounds
    }

    /// Area in squared map units
    pub fn area(&self) -> f64 {
        self.shape.unsigned_area()
    }

    /// Whether the map coordinate lies strictly inside the region
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.shape.contains(&Point::new(x, y))
    }

    /// Underlying geometry
    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.shape
    }
}

fn validate_ring(ring: &LineString<f64>, which: &str) -> Result<()> {
    // geo closes rings on construction, so a triangle has 4 coordinates
    if ring.0.len() < 4 {
        return Err(Error::InvalidGeometry(format!(
            "{} ring has {} coordinates, need at least 4",
            which,
            ring.0.len()
        )));
    }
    if ring.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(Error::InvalidGeometry(format!(
            "{} ring has non-finite coordinates",
            which
        )));
    }
    Ok(())
}
