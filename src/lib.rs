//! # Display Calib
//!
//! Numerical solvers that turn raw display measurements into calibration
//! artifacts, plus a drift analyzer over stored calibration history.
//!
//! This library provides:
//! - Gamma fitting and inverse-gamma LUT generation
//! - A 3×3 color correction matrix minimizing perceptual error
//! - White balance gains from a measured white patch
//! - A per-pixel mura (luminance uniformity) compensation map
//! - Gamut coverage against sRGB, Adobe RGB and DCI-P3
//! - Drift analysis and recalibration recommendations
//!
//! Solvers that can degrade instead of failing return [`Solved`], which
//! carries the best-effort value together with the [`WarningKind`]s raised
//! along the way.
//!
//! ## Example
//!
//! ```rust,no_run
//! use display_calib::calibration::GammaSolver;
//! use display_calib::config::GammaConfig;
//!
//! let samples: Vec<[f64; 2]> = (0..100)
//!     .map(|i| {
//!         let s = i as f64 / 99.0;
//!         [s, s.powf(2.4)]
//!     })
//!     .collect();
//! let solved = GammaSolver::new(GammaConfig::default()).solve(&samples)?;
//! println!("gamma = {:.3}", solved.value.gamma());
//! # Ok::<(), display_calib::CalibrationError>(())
//! ```

use serde::{Deserialize, Serialize};

pub mod calibration;
pub mod color;
pub mod config;
pub mod constants;
pub mod drift;
pub mod engine;
pub mod error;
pub mod gamut;
pub mod geometry;
pub mod lens;
pub mod numeric;
pub mod persistence;
pub mod report;
pub mod session;

pub use config::EngineConfig;
pub use drift::{analyze_color_drift, DriftReport, Recommendation, TrendAnalysis};
pub use engine::{CalibrationEngine, CalibrationRun, MeasurementSet};
pub use error::{CalibrationError, Result};
pub use gamut::{calculate_gamut_coverage, GamutCoverageResult};
pub use report::{generate_json_report, CalibrationReport};
pub use session::{
    CalibrationSession, CameraIntrinsics, ColorCorrectionMatrix, GainVector, MuraMap,
    ToneCurveModel,
};

/// A solver result that may have been degraded along the way
#[derive(Debug, Clone, PartialEq)]
pub struct Solved<T> {
    pub value: T,
    pub warnings: Vec<WarningKind>,
}

impl<T> Solved<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<WarningKind>) -> Self {
        Self { value, warnings }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Solved<U> {
        Solved {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

/// Non-fatal conditions raised while producing calibration artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// The tone curve fit did not converge; the default gamma was used
    GammaFitFallback { reason: String },
    /// The color correction optimizer stopped before meeting its tolerance
    CcmNotConverged { iterations: usize, mean_delta_e: f64 },
    /// Mura cells outside the sample hull were filled from the nearest sample
    MuraNearestFill { cells: usize },
    /// Mean luminance was zero; the mura map is all ones
    MuraZeroMean,
    /// The mura map exceeded the record size limit and was not stored
    MuraMapNotStored { cells: usize, max_cells: usize },
    LensCalibrationFailed { message: String },
    PersistenceFailed { message: String },
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningKind::GammaFitFallback { reason } => {
                write!(f, "gamma fit failed ({reason}); using default gamma")
            }
            WarningKind::CcmNotConverged {
                iterations,
                mean_delta_e,
            } => write!(
                f,
                "color correction did not converge after {iterations} iterations (mean ΔE {mean_delta_e:.3})"
            ),
            WarningKind::MuraNearestFill { cells } => {
                write!(f, "{cells} mura cells filled from nearest sample")
            }
            WarningKind::MuraZeroMean => write!(f, "zero mean luminance; mura compensation disabled"),
            WarningKind::MuraMapNotStored { cells, max_cells } => write!(
                f,
                "mura map of {cells} cells exceeds the {max_cells}-cell record limit; not stored"
            ),
            WarningKind::LensCalibrationFailed { message } => {
                write!(f, "lens calibration failed: {message}")
            }
            WarningKind::PersistenceFailed { message } => {
                write!(f, "session could not be stored: {message}")
            }
        }
    }
}
