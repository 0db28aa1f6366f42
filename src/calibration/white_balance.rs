//! White balance gain estimation
//!
//! Derives per-channel gains that map a measured white patch onto neutral
//! linear [1, 1, 1]. This is a reciprocal-gain estimate: it ignores the
//! chromaticities of the display primaries, so it only neutralizes the
//! patch in the device's own RGB, not a physically correct white point.

use tracing::{debug, info};

use crate::error::{CalibrationError, Result};
use crate::session::GainVector;

/// White balance estimator using reciprocal channel gains
#[derive(Debug, Clone, Copy, Default)]
pub struct WhiteBalanceEstimator;

impl WhiteBalanceEstimator {
    /// Create a new white balance estimator
    pub fn new() -> Self {
        Self
    }

    /// Estimate gains from a measured white patch
    ///
    /// Raw gains are `1 / measured` per channel. If the largest raw gain
    /// exceeds 1 the whole vector is scaled by `1 / max` afterwards, so the
    /// strongest channel ends at exactly 1.0 and the device never clips.
    ///
    /// # Arguments
    ///
    /// * `measured` - Linear RGB of the white patch, 3 components
    ///
    /// # Returns
    ///
    /// Gains with `max <= 1`. An all-zero patch yields unit gains.
    ///
    /// # Errors
    ///
    /// `InvalidShape` unless exactly 3 components are given, and
    /// `InvalidParameter` for negative, non-finite, or partially zero input.
    pub fn estimate_gains(&self, measured: &[f64]) -> Result<GainVector> {
        let &[r, g, b] = measured else {
            return Err(CalibrationError::invalid_shape(
                "white patch",
                "3 components",
                format!("{} components", measured.len()),
            ));
        };
        let measured = [r, g, b];

        if measured.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(CalibrationError::invalid_parameter(
                "white patch",
                format!("{measured:?}"),
            ));
        }
        if measured.iter().all(|&v| v == 0.0) {
            debug!("All-zero white patch, returning unit gains");
            return Ok(GainVector::UNITY);
        }
        if measured.iter().any(|&v| v == 0.0) {
            return Err(CalibrationError::invalid_parameter(
                "white patch",
                format!("{measured:?} has a zero channel"),
            ));
        }

        let raw = measured.map(|v| 1.0 / v);
        let raw_max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let gains = if raw_max > 1.0 {
            raw.map(|v| v / raw_max)
        } else {
            raw
        };

        info!(?measured, ?gains, "White balance gains estimated");
        Ok(GainVector(gains))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_white_is_identity() {
        let gains = WhiteBalanceEstimator::new().estimate_gains(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(gains, GainVector([1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_gains_rescaled_to_unit_max() {
        let gains = WhiteBalanceEstimator::new().estimate_gains(&[0.5, 0.8, 1.0]).unwrap();
        // raw [2.0, 1.25, 1.0] scaled by 1/2
        assert!((gains.0[0] - 1.0).abs() < 1e-12);
        assert!((gains.0[1] - 0.625).abs() < 1e-12);
        assert!((gains.0[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_bright_patch_not_rescaled() {
        // raw gains all below 1 stay as they are
        let gains = WhiteBalanceEstimator::new().estimate_gains(&[2.0, 4.0, 5.0]).unwrap();
        assert_eq!(gains, GainVector([0.5, 0.25, 0.2]));
    }

    #[test]
    fn test_max_gain_never_exceeds_one() {
        let estimator = WhiteBalanceEstimator::default();
        for patch in [[0.1, 0.2, 0.3], [0.9, 0.95, 0.7], [1e-6, 0.5, 1.0], [3.0, 0.2, 1.0]] {
            let gains = estimator.estimate_gains(&patch).unwrap();
            assert!(gains.max() <= 1.0 + 1e-12, "{patch:?} -> {gains:?}");
        }
    }

    #[test]
    fn test_all_zero_patch_gives_unit_gains() {
        let gains = WhiteBalanceEstimator::new().estimate_gains(&[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(gains, GainVector::UNITY);
    }

    #[test]
    fn test_invalid_input() {
        let estimator = WhiteBalanceEstimator::new();
        assert!(matches!(
            estimator.estimate_gains(&[1.0, 1.0]),
            Err(CalibrationError::InvalidShape { .. })
        ));
        assert!(matches!(
            estimator.estimate_gains(&[0.5, 0.0, 0.5]),
            Err(CalibrationError::InvalidParameter { .. })
        ));
        assert!(estimator.estimate_gains(&[0.5, -0.1, 0.5]).is_err());
        assert!(estimator.estimate_gains(&[0.5, f64::NAN, 0.5]).is_err());
    }
}
