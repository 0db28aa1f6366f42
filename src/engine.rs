//! Calibration engine
//!
//! Runs the solvers over one set of measurements, assembles the session,
//! and talks to the external collaborators (lens calibration, session
//! store). Failures of those collaborators are reported as warnings; the
//! locally computed artifacts are always returned.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::calibration::{CcmSolver, GammaSolver, MuraMapBuilder, WhiteBalanceEstimator};
use crate::config::EngineConfig;
use crate::drift::{analyze_color_drift, TrendAnalysis};
use crate::error::{CalibrationError, Result};
use crate::gamut::{calculate_gamut_coverage, GamutCoverageResult};
use crate::lens::{CalibrationTarget, LensCalibrator};
use crate::persistence::{insert_with_retry, load_history, RetryPolicy, SessionRecord, SessionStore};
use crate::report::{generate_json_report, CalibrationReport};
use crate::session::{CalibrationSession, CameraIntrinsics};
use crate::WarningKind;

/// Measured and reference colors for the color correction fit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorPatches {
    pub measured: Vec<[f64; 3]>,
    pub target: Vec<[f64; 3]>,
}

/// Spatial luminance samples for the mura map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MuraSamples {
    /// `(x, y, luminance)` in pixel coordinates
    pub samples: Vec<[f64; 3]>,
    pub width: usize,
    pub height: usize,
}

/// Everything measured during one calibration run.
///
/// Only the tone curve samples are mandatory; each optional measurement
/// enables the matching artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementSet {
    pub device_id: String,
    pub session_name: String,
    /// Capture time; the run time when absent
    pub captured_at: Option<DateTime<Utc>>,
    /// `(signal, luminance)` pairs
    pub luminance: Vec<[f64; 2]>,
    pub color_patches: Option<ColorPatches>,
    /// Linear RGB of the white patch
    pub white_patch: Option<[f64; 3]>,
    pub mura: Option<MuraSamples>,
    /// Linear RGB response of the R, G and B primaries
    pub primaries: Option<[[f64; 3]; 3]>,
    pub lens_target: Option<CalibrationTarget>,
}

/// Artifacts of one run together with every warning raised
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationRun {
    pub session: CalibrationSession,
    pub gamut: Option<GamutCoverageResult>,
    pub warnings: Vec<WarningKind>,
}

/// Calibration engine
pub struct CalibrationEngine {
    config: EngineConfig,
    lens: Option<Arc<dyn LensCalibrator>>,
}

impl CalibrationEngine {
    /// Create an engine after validating the configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, lens: None })
    }

    /// Use `lens` for measurement sets that carry a lens target
    pub fn with_lens_calibrator(mut self, lens: Arc<dyn LensCalibrator>) -> Self {
        self.lens = Some(lens);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run every applicable solver on `measurements`.
    ///
    /// The solvers are independent and run in parallel. Malformed
    /// measurements fail the run; convergence problems and lens calibration
    /// failures only add warnings.
    pub fn run(&self, measurements: &MeasurementSet) -> Result<CalibrationRun> {
        let m = measurements;
        info!(
            device_id = %m.device_id,
            session = %m.session_name,
            "Starting calibration run"
        );

        let ((tone, ccm), (mura, (awb, gamut))) = rayon::join(
            || {
                rayon::join(
                    || GammaSolver::new(self.config.gamma.clone()).solve(&m.luminance),
                    || {
                        m.color_patches
                            .as_ref()
                            .map(|p| CcmSolver::new(&self.config.ccm).solve(&p.measured, &p.target))
                            .transpose()
                    },
                )
            },
            || {
                rayon::join(
                    || {
                        m.mura
                            .as_ref()
                            .map(|s| {
                                MuraMapBuilder::new(self.config.mura.clone())
                                    .build(&s.samples, s.width, s.height)
                            })
                            .transpose()
                    },
                    || {
                        rayon::join(
                            || {
                                m.white_patch
                                    .map(|w| WhiteBalanceEstimator::new().estimate_gains(&w))
                                    .transpose()
                            },
                            || m.primaries.as_ref().map(|p| calculate_gamut_coverage(p)).transpose(),
                        )
                    },
                )
            },
        );

        let tone = tone?;
        let mut warnings = tone.warnings;
        let ccm = ccm?.map(|solved| {
            warnings.extend(solved.warnings);
            solved.value
        });
        let mura_map = mura?.map(|solved| {
            warnings.extend(solved.warnings);
            solved.value
        });
        let awb_gains = awb?;
        let gamut = gamut?;

        let camera = self.calibrate_lens(m.lens_target.as_ref(), &mut warnings);

        let session = CalibrationSession {
            device_id: m.device_id.clone(),
            session_name: m.session_name.clone(),
            timestamp: m.captured_at.unwrap_or_else(Utc::now),
            tone_curve: tone.value,
            color_correction: ccm.as_ref().map(|fit| fit.matrix),
            color_error: ccm.as_ref().map(|fit| fit.error),
            awb_gains,
            mura_map,
            camera,
        };

        info!(
            device_id = %session.device_id,
            gamma = session.tone_curve.gamma(),
            warnings = warnings.len(),
            "Calibration run complete"
        );
        Ok(CalibrationRun {
            session,
            gamut,
            warnings,
        })
    }

    fn calibrate_lens(
        &self,
        target: Option<&CalibrationTarget>,
        warnings: &mut Vec<WarningKind>,
    ) -> Option<CameraIntrinsics> {
        let target = target?;
        let Some(lens) = &self.lens else {
            warn!("Lens target given but no lens calibrator configured");
            warnings.push(WarningKind::LensCalibrationFailed {
                message: "no lens calibrator configured".to_string(),
            });
            return None;
        };
        match lens.calibrate(target) {
            Ok(intrinsics) => {
                debug!(dist_coeffs = intrinsics.dist_coeffs.len(), "Lens calibrated");
                Some(intrinsics)
            }
            Err(e) => {
                warn!(error = %e, image = %target.image_path.display(), "Lens calibration failed");
                warnings.push(WarningKind::LensCalibrationFailed {
                    message: e.to_string(),
                });
                None
            }
        }
    }

    /// Store the run's session.
    ///
    /// A failed write is retried per the persistence configuration and then
    /// recorded as a warning on the returned run; the artifacts are kept.
    pub fn publish(&self, mut run: CalibrationRun, store: &dyn SessionStore) -> CalibrationRun {
        let policy = RetryPolicy::from(&self.config.persistence);
        let max_cells = self.config.persistence.max_mura_cells;
        let record = SessionRecord::from_session(&run.session, max_cells);
        if let (Ok(record), Some(map)) = (&record, &run.session.mura_map) {
            if record.mura_compensation_map.is_none() {
                run.warnings.push(WarningKind::MuraMapNotStored {
                    cells: map.len(),
                    max_cells,
                });
            }
        }
        let stored = record.and_then(|record| insert_with_retry(store, &record, &policy));
        if let Err(e) = stored {
            warn!(
                session = %run.session.session_name,
                error = %e,
                "Session not stored, keeping local artifacts"
            );
            run.warnings.push(WarningKind::PersistenceFailed {
                message: e.to_string(),
            });
        }
        run
    }

    /// Drift analysis over the device's stored history
    pub fn trend(&self, store: &dyn SessionStore, device_id: &str) -> Result<TrendAnalysis> {
        let history = load_history(store, device_id)?;
        Ok(analyze_color_drift(device_id, &history, &self.config.drift))
    }

    /// Report for a run, with the trend taken from the stored history
    pub fn report(&self, run: &CalibrationRun, store: &dyn SessionStore) -> Result<CalibrationReport> {
        let gamut = run.gamut.as_ref().ok_or_else(|| {
            CalibrationError::invalid_parameter("primaries", "not measured in this run")
        })?;
        let device_id = &run.session.device_id;
        let trend = self.trend(store, device_id)?;
        Ok(generate_json_report(device_id, &run.session, gamut, &trend))
    }
}
