//! Cloud masking from a per-pixel probability band
//!
//! A pixel is cloudy when its probability is strictly above the threshold.
//! The mask is the inverse: 1 = valid, 0 = cloud. A NaN or no-data
//! probability is not cloud, so the pixel stays valid.

use rivice_core::raster::Raster;
use rivice_core::scene::bands;
use rivice_core::{Error, JoinedScene, Result, Scene};
use tracing::debug;

use crate::maybe_rayon::*;

/// Parameters for cloud masking
#[derive(Debug, Clone)]
pub struct CloudMaskParams {
    /// Probability (percent) above which a pixel is cloud
    pub probability_threshold: f64,
    /// Band of the probability scene holding the probability grid
    pub probability_band: String,
}

impl Default for CloudMaskParams {
    fn default() -> Self {
        Self {
            probability_threshold: 50.0,
            probability_band: bands::PROBABILITY.to_string(),
        }
    }
}

/// Validity mask from a probability grid: 1 where `p <= threshold` or `p`
/// is invalid, 0 where `p > threshold`.
pub fn cloud_mask(probability: &Raster<f64>, threshold: f64) -> Result<Raster<u8>> {
    let (rows, cols) = probability.shape();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![1u8; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let p = unsafe { probability.get_unchecked(row, col) };
                if !probability.is_nodata(p) && p > threshold {
                    *out = 0;
                }
            }
            row_data
        })
        .collect();

    probability.with_same_meta(data)
}

/// Apply the cloud mask of a joined pair to the imagery scene.
///
/// Returns a new scene whose mask is the existing mask AND the cloud
/// validity; band grids are shared, never modified. Without a probability
/// scene the imagery scene is returned as is.
///
/// # Errors
/// `MissingBand` if the probability scene lacks the probability band,
/// `SizeMismatch` if its grid differs from the imagery grid.
pub fn mask_scene(joined: &JoinedScene, params: &CloudMaskParams) -> Result<Scene> {
    let scene = &joined.scene;
    let probability = match &joined.probability {
        Some(p) => p,
        None => {
            debug!(scene = scene.id(), "no probability scene, keeping all pixels");
            return Ok(scene.clone());
        }
    };

    let grid = probability.band(&params.probability_band)?;
    if grid.shape() != scene.shape() {
        return Err(Error::size_mismatch(scene.shape(), grid.shape()));
    }

    let validity = cloud_mask(grid, params.probability_threshold)?;
    let masked = scene.with_mask(&validity)?;

    debug!(
        scene = scene.id(),
        cloudy = validity.len() - validity.data().iter().filter(|&&v| v != 0).count(),
        "cloud mask applied"
    );

    Ok(masked)
}

/// Mask every joined pair, preserving order.
pub fn mask_collection(joined: &[JoinedScene], params: &CloudMaskParams) -> Result<Vec<Scene>> {
    joined
        .into_par_iter()
        .map(|pair| mask_scene(pair, params))
        .collect()
}
