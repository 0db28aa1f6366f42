//! Configuration structures for the display_calib engine.
//!
//! This module defines all tunable parameters of the solvers and the drift
//! analyzer, organized into one section per component.
//!
//! # Configuration Loading
//!
//! Configuration can be loaded from JSON files or constructed programmatically:
//!
//! ```no_run
//! use display_calib::EngineConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = EngineConfig::from_json_file(Path::new("calibration.json"))?;
//!
//! // Or use defaults
//! let config = EngineConfig::default();
//! # Ok::<(), display_calib::CalibrationError>(())
//! ```
//!
//! # Configuration Sections
//!
//! - [`GammaConfig`]: Tone curve fit settings
//! - [`CcmConfig`]: Color correction optimizer and distance metric
//! - [`MuraConfig`]: Compensation factor clamp range
//! - [`DriftThresholds`]: Trend analysis thresholds
//! - [`PersistenceConfig`]: Session store location and retry budget

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::color::DistanceMetric;
use crate::constants::{ccm, drift, mura, tone};
use crate::error::{CalibrationError, Result};

/// Complete engine configuration.
///
/// Missing sections fall back to their defaults when deserializing, so a
/// config file only needs the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub gamma: GammaConfig,
    pub ccm: CcmConfig,
    pub mura: MuraConfig,
    pub drift: DriftThresholds,
    pub persistence: PersistenceConfig,
}

/// Tone curve fit parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GammaConfig {
    /// Starting gamma for the least-squares fit
    pub initial_gamma: f64,

    /// Maximum simplex iterations
    pub max_iterations: usize,

    /// Spread of the residual sums across the simplex at convergence
    pub tolerance: f64,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            initial_gamma: tone::DEFAULT_GAMMA,
            max_iterations: 200,
            tolerance: 1e-10,
        }
    }
}

/// Color correction matrix optimizer parameters.
///
/// The optimizer is argmin's Nelder–Mead simplex over the 9 matrix entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CcmConfig {
    /// Spread of the mean distance across the simplex at convergence
    pub tolerance: f64,

    pub max_iterations: usize,

    /// Perceptual distance minimized by the fit
    pub distance: DistanceMetric,
}

impl Default for CcmConfig {
    fn default() -> Self {
        Self {
            tolerance: ccm::TOLERANCE,
            max_iterations: ccm::MAX_ITERATIONS,
            distance: DistanceMetric::default(),
        }
    }
}

/// Mura compensation parameters.
///
/// Factors are clamped to `[min_factor, max_factor]`. Clamping bounds the
/// gain in very dark regions, which leaves those regions less uniform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuraConfig {
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for MuraConfig {
    fn default() -> Self {
        Self {
            min_factor: mura::MIN_FACTOR,
            max_factor: mura::MAX_FACTOR,
        }
    }
}

/// Drift analysis thresholds.
///
/// Only `gamma` drives the recommendation today. `delta_e` and
/// `gamut_coverage` are accepted so stored configurations stay valid once
/// the analyzer compares those quantities too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftThresholds {
    /// Maximum tolerated absolute gamma change
    pub gamma: f64,

    /// Maximum tolerated mean color error (ΔE)
    pub delta_e: f64,

    /// Maximum tolerated gamut coverage change in percent
    pub gamut_coverage: f64,
}

impl Default for DriftThresholds {
    fn default() -> Self {
        Self {
            gamma: drift::GAMMA_THRESHOLD,
            delta_e: drift::DELTA_E_THRESHOLD,
            gamut_coverage: drift::GAMUT_COVERAGE_THRESHOLD,
        }
    }
}

/// Session store parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// JSON file holding stored session records
    pub path: PathBuf,

    /// Attempts per write before the failure is reported
    pub max_attempts: usize,

    /// Pause between attempts in milliseconds
    pub backoff_ms: u64,

    /// Mura maps with more cells than this are not stored
    pub max_mura_cells: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("calibration_sessions.json"),
            max_attempts: 3,
            backoff_ms: 100,
            max_mura_cells: mura::MAX_STORED_CELLS,
        }
    }
}

fn positive_finite(parameter: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CalibrationError::invalid_parameter(parameter, value))
    }
}

fn non_zero(parameter: &str, value: usize) -> Result<()> {
    if value > 0 {
        Ok(())
    } else {
        Err(CalibrationError::invalid_parameter(parameter, value))
    }
}

impl EngineConfig {
    /// Check every section for values the solvers cannot work with
    pub fn validate(&self) -> Result<()> {
        positive_finite("gamma.initial_gamma", self.gamma.initial_gamma)?;
        positive_finite("gamma.tolerance", self.gamma.tolerance)?;
        non_zero("gamma.max_iterations", self.gamma.max_iterations)?;

        positive_finite("ccm.tolerance", self.ccm.tolerance)?;
        non_zero("ccm.max_iterations", self.ccm.max_iterations)?;

        self.mura.validate()?;

        positive_finite("drift.gamma", self.drift.gamma)?;
        positive_finite("drift.delta_e", self.drift.delta_e)?;
        positive_finite("drift.gamut_coverage", self.drift.gamut_coverage)?;

        non_zero("persistence.max_attempts", self.persistence.max_attempts)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CalibrationError::config(format!("cannot read {}", path.display()), e)
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            CalibrationError::config(format!("cannot parse {}", path.display()), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl MuraConfig {
    pub fn validate(&self) -> Result<()> {
        positive_finite("mura.min_factor", self.min_factor)?;
        positive_finite("mura.max_factor", self.max_factor)?;
        if self.min_factor > self.max_factor {
            return Err(CalibrationError::invalid_parameter(
                "mura.min_factor",
                format!("{} > max_factor {}", self.min_factor, self.max_factor),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gamma.initial_gamma, 2.2);
        assert_eq!(config.ccm.tolerance, 1e-4);
        assert_eq!(config.mura.min_factor, 0.5);
        assert_eq!(config.mura.max_factor, 2.0);
        assert_eq!(config.drift.gamma, 0.1);
    }

    #[test]
    fn test_inverted_mura_range_rejected() {
        let mut config = EngineConfig::default();
        config.mura.min_factor = 3.0;
        assert!(matches!(
            config.validate(),
            Err(CalibrationError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let mut config = EngineConfig::default();
        config.ccm.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"drift": {"gamma": 0.05}, "ccm": {"distance": "Ciede2000"}}"#)
                .unwrap();
        assert_eq!(config.drift.gamma, 0.05);
        assert_eq!(config.drift.delta_e, 3.0);
        assert_eq!(config.ccm.distance, DistanceMetric::Ciede2000);
        assert_eq!(config.mura, MuraConfig::default());
    }
}
