//! Lens calibration service boundary
//!
//! Locating a checkerboard and solving for camera intrinsics belongs to an
//! external computer-vision service. The engine only sees the
//! [`LensCalibrator`] contract.

use std::path::{Path, PathBuf};

use nalgebra::Matrix3;
use tracing::debug;

use crate::error::{CalibrationError, Result};
use crate::session::CameraIntrinsics;

/// Checkerboard capture to calibrate the camera from
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTarget {
    pub image_path: PathBuf,
    /// Inner corners per row and column
    pub pattern_size: (u32, u32),
    /// Physical edge length of one square, in millimetres
    pub square_size: f64,
}

impl CalibrationTarget {
    pub fn new(image_path: impl Into<PathBuf>, pattern_size: (u32, u32), square_size: f64) -> Result<Self> {
        if pattern_size.0 < 2 || pattern_size.1 < 2 {
            return Err(CalibrationError::invalid_parameter(
                "pattern_size",
                format!("{}x{}", pattern_size.0, pattern_size.1),
            ));
        }
        if !(square_size.is_finite() && square_size > 0.0) {
            return Err(CalibrationError::invalid_parameter("square_size", square_size));
        }
        Ok(Self {
            image_path: image_path.into(),
            pattern_size,
            square_size,
        })
    }
}

/// External lens calibration service.
///
/// Implementations report a missing image as `ImageNotFound` and an image
/// without a detectable pattern as `PatternNotFound`.
pub trait LensCalibrator: Send + Sync {
    fn calibrate(&self, target: &CalibrationTarget) -> Result<CameraIntrinsics>;
}

/// Calibrator that returns intrinsics measured earlier, for rigs whose
/// camera has already been characterized.
#[derive(Debug, Clone)]
pub struct PrecomputedIntrinsics {
    intrinsics: CameraIntrinsics,
}

impl PrecomputedIntrinsics {
    pub fn new(camera_matrix: Matrix3<f64>, dist_coeffs: Vec<f64>) -> Self {
        Self {
            intrinsics: CameraIntrinsics {
                camera_matrix,
                dist_coeffs,
            },
        }
    }
}

fn require_image(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CalibrationError::ImageNotFound {
            path: path.to_path_buf(),
        })
    }
}

impl LensCalibrator for PrecomputedIntrinsics {
    fn calibrate(&self, target: &CalibrationTarget) -> Result<CameraIntrinsics> {
        require_image(&target.image_path)?;
        debug!(image = %target.image_path.display(), "Using precomputed camera intrinsics");
        Ok(self.intrinsics.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn calibrator() -> PrecomputedIntrinsics {
        PrecomputedIntrinsics::new(
            Matrix3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0),
            vec![0.0; 5],
        )
    }

    #[test]
    fn test_target_validation() {
        assert!(CalibrationTarget::new("board.png", (7, 6), 25.0).is_ok());
        assert!(CalibrationTarget::new("board.png", (1, 6), 25.0).is_err());
        assert!(CalibrationTarget::new("board.png", (7, 6), 0.0).is_err());
    }

    #[test]
    fn test_missing_image() {
        let target = CalibrationTarget::new("/nonexistent/board.png", (7, 6), 25.0).unwrap();
        let err = calibrator().calibrate(&target).unwrap_err();
        assert!(matches!(err, CalibrationError::ImageNotFound { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_existing_image_returns_intrinsics() {
        let image = NamedTempFile::new().unwrap();
        let target = CalibrationTarget::new(image.path(), (7, 6), 25.0).unwrap();
        let intrinsics = calibrator().calibrate(&target).unwrap();
        assert_eq!(intrinsics.camera_matrix[(0, 2)], 320.0);
        assert_eq!(intrinsics.dist_coeffs.len(), 5);
    }
}
