//! Zonal reduction over a region of interest
//!
//! A raster is sampled on a regular grid of step `scale` map units anchored
//! at the raster origin. A sample counts when its centre lies inside the
//! region; its value is the raster pixel containing the centre. When the
//! cell size equals `scale`, every pixel whose centre is in the region is
//! sampled exactly once.

use rivice_core::raster::{Raster, RasterElement};
use rivice_core::{Error, RegionOfInterest, Result, Scene};

/// Mean of the valid samples of a raster inside a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZonalStats {
    /// Valid samples
    pub count: usize,
    pub sum: f64,
    /// `None` when no sample is valid
    pub mean: Option<f64>,
}

/// Pixels `(row, col)` hit by the in-region samples, in row-major sample order.
///
/// Samples outside the raster extent are skipped. A pixel appears once per
/// sample that falls in it.
pub fn sample_pixels<T: RasterElement>(
    raster: &Raster<T>,
    roi: &RegionOfInterest,
    scale: f64,
) -> Result<Vec<(usize, usize)>> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "scale",
            value: scale.to_string(),
            reason: "sampling step must be a positive number".into(),
        });
    }

    let area = match roi.bounds().intersection(&raster.bounds()) {
        Some(area) => area,
        None => return Ok(Vec::new()),
    };

    let t = raster.transform();
    let step_x = scale * t.pixel_width.signum();
    let step_y = scale * t.pixel_height.signum();

    let (i0, i1) = index_range(t.origin_x, step_x, area.min_x, area.max_x);
    let (j0, j1) = index_range(t.origin_y, step_y, area.min_y, area.max_y);

    let mut pixels = Vec::new();
    for j in j0..j1 {
        let y = t.origin_y + (j as f64 + 0.5) * step_y;
        for i in i0..i1 {
            let x = t.origin_x + (i as f64 + 0.5) * step_x;
            if !roi.contains(x, y) {
                continue;
            }
            if let Some(pixel) = raster.pixel_at(x, y) {
                pixels.push(pixel);
            }
        }
    }

    Ok(pixels)
}

/// Sample indices `[lo, hi)` along one axis whose cells cover `[min, max]`.
fn index_range(origin: f64, step: f64, min: f64, max: f64) -> (i64, i64) {
    let a = (min - origin) / step;
    let b = (max - origin) / step;
    (a.min(b).floor() as i64, a.max(b).ceil() as i64)
}

/// Spatial mean of a grid over a region at the given sampling step.
///
/// Invalid (NaN / no-data) samples are excluded from both sum and count.
/// Summation runs in row-major sample order.
pub fn zonal_mean(grid: &Raster<f64>, roi: &RegionOfInterest, scale: f64) -> Result<ZonalStats> {
    let mut count = 0;
    let mut sum = 0.0;

    for (row, col) in sample_pixels(grid, roi, scale)? {
        let v = unsafe { grid.get_unchecked(row, col) };
        if grid.is_nodata(v) {
            continue;
        }
        sum += v;
        count += 1;
    }

    let mean = if count > 0 {
        Some(sum / count as f64)
    } else {
        None
    };

    Ok(ZonalStats { count, sum, mean })
}

/// Percentage of in-region samples at which every band of the scene is valid.
///
/// `None` when the region has no samples on the scene grid.
pub fn valid_coverage(scene: &Scene, roi: &RegionOfInterest, scale: f64) -> Result<Option<f64>> {
    let names: Vec<&str> = scene.band_names().collect();
    let template = match names.first() {
        Some(name) => scene.band(name)?,
        None => return Ok(None),
    };

    let pixels = sample_pixels(template, roi, scale)?;
    if pixels.is_empty() {
        return Ok(None);
    }

    let mut valid = 0usize;
    for &(row, col) in &pixels {
        let mut all_valid = true;
        for name in &names {
            if scene.pixel(name, row, col)?.is_none() {
                all_valid = false;
                break;
            }
        }
        if all_valid {
            valid += 1;
        }
    }

    Ok(Some(valid as f64 / pixels.len() as f64 * 100.0))
}
