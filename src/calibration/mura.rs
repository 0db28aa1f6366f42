//! Mura (luminance non-uniformity) compensation map
//!
//! Sparse `(x, y, luminance)` samples are interpolated linearly over their
//! Delaunay triangulation onto every integer pixel of the target raster.
//! Pixels outside the convex hull of the samples take the value of the
//! nearest sample instead, which decides how edges and corners behave.
//! The factor per pixel is `mean / luminance`, clamped to the configured
//! range. Clamping keeps gains bounded in very dark regions, at the price
//! of leaving those regions less uniform than the rest of the panel.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::MuraConfig;
use crate::constants::mura;
use crate::error::{CalibrationError, Result};
use crate::geometry::{nearest_site, LinearInterpolator, Point};
use crate::session::MuraMap;
use crate::{Solved, WarningKind};

/// Builds compensation maps from spatial luminance samples
#[derive(Debug, Clone, Default)]
pub struct MuraMapBuilder {
    config: MuraConfig,
}

impl MuraMapBuilder {
    pub fn new(config: MuraConfig) -> Self {
        Self { config }
    }

    /// Build the compensation map for a `width × height` display.
    ///
    /// # Arguments
    ///
    /// * `samples` - `(x, y, luminance)` rows in pixel coordinates
    /// * `width`, `height` - Target resolution
    ///
    /// # Errors
    ///
    /// `InvalidShape` if a sample does not have 3 components;
    /// `InvalidParameter` for no samples, non-finite values, a zero
    /// resolution or an invalid clamp range.
    pub fn build<R: AsRef<[f64]>>(
        &self,
        samples: &[R],
        width: usize,
        height: usize,
    ) -> Result<Solved<MuraMap>> {
        self.config.validate()?;
        if width == 0 || height == 0 {
            return Err(CalibrationError::invalid_parameter(
                "resolution",
                format!("{width}x{height}"),
            ));
        }
        if samples.is_empty() {
            return Err(CalibrationError::invalid_parameter("samples", "empty"));
        }

        let mut points: Vec<Point> = Vec::with_capacity(samples.len());
        let mut luminance = Vec::with_capacity(samples.len());
        for (i, sample) in samples.iter().enumerate() {
            let &[x, y, l] = sample.as_ref() else {
                return Err(CalibrationError::invalid_shape(
                    format!("mura sample {i}"),
                    "3 components (x, y, luminance)",
                    format!("{} components", sample.as_ref().len()),
                ));
            };
            if !(x.is_finite() && y.is_finite() && l.is_finite()) {
                return Err(CalibrationError::invalid_parameter(
                    format!("mura sample {i}"),
                    format!("[{x}, {y}, {l}]"),
                ));
            }
            points.push([x, y]);
            luminance.push(l);
        }

        let interpolator = LinearInterpolator::new(&points, &luminance);
        let mut grid = interpolator.fill_grid(width, height);
        debug!(
            samples = points.len(),
            triangles = interpolator.triangulation().triangles().len(),
            "Linear interpolation pass done"
        );

        // Second pass: nearest sample for cells outside the hull
        let filled: usize = grid
            .par_chunks_mut(width)
            .enumerate()
            .map(|(y, row)| {
                let mut count = 0;
                for (x, cell) in row.iter_mut().enumerate() {
                    if cell.is_nan() {
                        if let Some(i) = nearest_site(&points, x as f64, y as f64) {
                            *cell = luminance[i];
                            count += 1;
                        }
                    }
                }
                count
            })
            .sum();

        let mut warnings = Vec::new();
        if filled > 0 {
            debug!(cells = filled, "Filled cells outside the sample hull");
            warnings.push(WarningKind::MuraNearestFill { cells: filled });
        }

        let (min, max) = (self.config.min_factor, self.config.max_factor);
        let mean = grid.par_iter().sum::<f64>() / grid.len() as f64;
        if mean.abs() <= mura::ZERO_MEAN_EPSILON {
            warn!("Mean interpolated luminance is zero, compensation disabled");
            warnings.push(WarningKind::MuraZeroMean);
            grid.fill(1.0_f64.clamp(min, max));
        } else {
            // A zero cell gives an infinite factor, which clamps to max
            grid.par_iter_mut()
                .for_each(|cell| *cell = (mean / *cell).clamp(min, max));
        }

        info!(width, height, mean_luminance = mean, "Mura compensation map built");
        Ok(Solved::with_warnings(MuraMap::new(width, height, grid), warnings))
    }
}
