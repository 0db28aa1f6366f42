//! Color correction matrix fitting
//!
//! Finds the 3×3 matrix `M` minimizing the mean perceptual distance between
//! `clip(M · measured, 0, 1)` and the target colors. Both color sets are
//! linear RGB; distances are taken in CIE Lab (D65). The clipping makes the
//! objective non-smooth, so the fit uses argmin's Nelder–Mead simplex
//! seeded at the identity.

use tracing::{debug, info, warn};

use crate::color::conversion::linear_from_slice;
use crate::color::{distance_stats, rgb_to_lab, ColorDistance, DistanceMetric, DistanceStats};
use crate::color::{LabD65, LinearRgb};
use crate::config::CcmConfig;
use crate::error::{CalibrationError, Result};
use crate::numeric::{minimize, Minimum, SimplexOptions};
use crate::session::ColorCorrectionMatrix;
use crate::{Solved, WarningKind};

/// Result of a color correction fit
#[derive(Debug, Clone, PartialEq)]
pub struct CcmFit {
    /// Best matrix found
    pub matrix: ColorCorrectionMatrix,
    /// Residual distance of the corrected colors against the targets
    pub error: DistanceStats,
    pub iterations: usize,
    /// Whether the optimizer met its tolerance. A `false` fit is still the
    /// best matrix seen, never a partially updated one.
    pub converged: bool,
}

/// Color correction solver, generic over the distance metric
#[derive(Debug, Clone)]
pub struct CcmSolver<D = DistanceMetric> {
    options: SimplexOptions,
    metric: D,
}

impl CcmSolver<DistanceMetric> {
    pub fn new(config: &CcmConfig) -> Self {
        Self::with_metric(config, config.distance)
    }
}

impl Default for CcmSolver<DistanceMetric> {
    fn default() -> Self {
        Self::new(&CcmConfig::default())
    }
}

fn validate_rows<R: AsRef<[f64]>>(name: &str, rows: &[R]) -> Result<Vec<LinearRgb>> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let row = row.as_ref();
            if row.len() != 3 {
                return Err(CalibrationError::ShapeMismatch {
                    message: format!("{name} color {i} has {} columns, expected 3", row.len()),
                });
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(CalibrationError::invalid_parameter(
                    format!("{name}[{i}]"),
                    format!("{row:?}"),
                ));
            }
            Ok(linear_from_slice(row))
        })
        .collect()
}

impl<D: ColorDistance> CcmSolver<D> {
    /// Solver using a custom distance metric
    pub fn with_metric(config: &CcmConfig, metric: D) -> Self {
        Self {
            options: SimplexOptions {
                sd_tolerance: config.tolerance,
                max_iterations: config.max_iterations as u64,
            },
            metric,
        }
    }

    /// Mean distance between the corrected measured colors and the targets
    fn mean_distance(
        &self,
        matrix: &ColorCorrectionMatrix,
        measured: &[LinearRgb],
        target: &[LabD65],
    ) -> f64 {
        let total: f64 = measured
            .iter()
            .zip(target)
            .map(|(&c, &t)| self.metric.distance(rgb_to_lab(matrix.apply_clipped(c)), t))
            .sum();
        total / measured.len() as f64
    }

    /// Fit the matrix mapping `measured` onto `target`.
    ///
    /// # Arguments
    ///
    /// * `measured` - Measured linear RGB colors, one row of 3 per patch
    /// * `target` - Reference linear RGB colors, same length as `measured`
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the sets differ in length, are empty, or any row
    /// does not have 3 columns.
    pub fn solve<R: AsRef<[f64]>>(&self, measured: &[R], target: &[R]) -> Result<Solved<CcmFit>> {
        if measured.len() != target.len() {
            return Err(CalibrationError::ShapeMismatch {
                message: format!(
                    "measured has {} colors, target has {}",
                    measured.len(),
                    target.len()
                ),
            });
        }
        if measured.is_empty() {
            return Err(CalibrationError::ShapeMismatch {
                message: "no color pairs to fit".to_string(),
            });
        }
        let measured = validate_rows("measured", measured)?;
        let target_lab: Vec<LabD65> = validate_rows("target", target)?
            .into_iter()
            .map(rgb_to_lab)
            .collect();

        let identity = ColorCorrectionMatrix::identity();
        let x0: Vec<f64> = identity.rows().iter().flatten().copied().collect();
        debug!(
            colors = measured.len(),
            initial_error = self.mean_distance(&identity, &measured, &target_lab),
            "Fitting color correction matrix"
        );

        let outcome = minimize(
            |params| {
                let matrix = ColorCorrectionMatrix::from_row_slice(params);
                self.mean_distance(&matrix, &measured, &target_lab)
            },
            &x0,
            self.options,
        )
        .unwrap_or_else(|e| {
            warn!(error = %e, "Color correction optimizer failed, keeping identity");
            Minimum {
                value: self.mean_distance(&identity, &measured, &target_lab),
                x: x0.clone(),
                iterations: 0,
                converged: false,
            }
        });
        let iterations = outcome.iterations as usize;

        let matrix = ColorCorrectionMatrix::from_row_slice(&outcome.x);
        let corrected: Vec<LabD65> = measured
            .iter()
            .map(|&c| rgb_to_lab(matrix.apply_clipped(c)))
            .collect();
        let error = distance_stats(&self.metric, &corrected, &target_lab).unwrap_or(
            DistanceStats {
                mean: outcome.value,
                max: outcome.value,
            },
        );

        let mut warnings = Vec::new();
        if outcome.converged {
            info!(
                iterations,
                mean_delta_e = error.mean,
                max_delta_e = error.max,
                "Color correction matrix converged"
            );
        } else {
            warn!(
                iterations,
                mean_delta_e = error.mean,
                "Color correction optimizer stopped before convergence, keeping best matrix"
            );
            warnings.push(WarningKind::CcmNotConverged {
                iterations,
                mean_delta_e: error.mean,
            });
        }

        Ok(Solved::with_warnings(
            CcmFit {
                matrix,
                error,
                iterations,
                converged: outcome.converged,
            },
            warnings,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::EuclideanLab;

    fn solver() -> CcmSolver {
        CcmSolver::new(&CcmConfig::default())
    }

    fn patches() -> Vec<[f64; 3]> {
        vec![
            [0.8, 0.1, 0.1],
            [0.1, 0.7, 0.2],
            [0.1, 0.2, 0.6],
            [0.5, 0.5, 0.5],
            [0.3, 0.25, 0.2],
            [0.6, 0.5, 0.1],
        ]
    }

    #[test]
    fn test_identity_when_measured_equals_target() {
        let colors = patches();
        let solved = solver().solve(&colors, &colors).unwrap();
        assert!(solved.value.error.mean < 1e-3);
        let rows = solved.value.matrix.rows();
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < 0.05, "entry ({r},{c}) = {v}");
            }
        }
    }

    #[test]
    fn test_fit_reduces_error() {
        let measured = patches();
        let cast = ColorCorrectionMatrix::from_rows([
            [0.9, 0.05, 0.0],
            [0.0, 1.0, 0.0],
            [0.05, 0.0, 0.8],
        ]);
        let target: Vec<[f64; 3]> = measured
            .iter()
            .map(|c| {
                let out = cast.apply_clipped(LinearRgb::new(c[0], c[1], c[2]));
                [out.red, out.green, out.blue]
            })
            .collect();

        let before = distance_stats(
            &EuclideanLab,
            &measured.iter().map(|c| rgb_to_lab(linear_from_slice(c))).collect::<Vec<_>>(),
            &target.iter().map(|c| rgb_to_lab(linear_from_slice(c))).collect::<Vec<_>>(),
        )
        .unwrap();
        let solved = solver().solve(&measured, &target).unwrap();
        assert!(solved.value.error.mean < before.mean);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let measured = patches();
        let target = &measured[..3];
        let err = solver().solve(&measured, target).unwrap_err();
        assert!(matches!(err, CalibrationError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_column_mismatch_rejected() {
        let measured = vec![vec![0.1, 0.2, 0.3], vec![0.1, 0.2]];
        let target = vec![vec![0.1, 0.2, 0.3], vec![0.1, 0.2, 0.3]];
        let err = solver().solve(&measured, &target).unwrap_err();
        assert!(matches!(err, CalibrationError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_empty_rejected() {
        let empty: Vec<[f64; 3]> = Vec::new();
        assert!(solver().solve(&empty, &empty).is_err());
    }

    #[test]
    fn test_budget_exhaustion_is_a_warning() {
        let measured = patches();
        let target: Vec<[f64; 3]> = measured.iter().map(|c| [c[1], c[2], c[0]]).collect();
        let config = CcmConfig {
            max_iterations: 5,
            ..CcmConfig::default()
        };
        let solved = CcmSolver::new(&config).solve(&measured, &target).unwrap();
        assert!(!solved.value.converged);
        assert!(matches!(
            solved.warnings.as_slice(),
            [WarningKind::CcmNotConverged { iterations: 5, .. }]
        ));
        assert!(solved.value.error.mean.is_finite());
    }

    #[test]
    fn test_custom_metric() {
        let colors = patches();
        let solver = CcmSolver::with_metric(&CcmConfig::default(), EuclideanLab);
        let solved = solver.solve(&colors, &colors).unwrap();
        assert!(solved.value.error.max < 1e-3);
    }
}
