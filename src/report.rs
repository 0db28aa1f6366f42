//! Calibration report payload
//!
//! Flat JSON summary of the latest session, its gamut coverage and the
//! device's drift analysis, as consumed by the report renderer.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::tone;
use crate::drift::TrendAnalysis;
use crate::error::Result;
use crate::gamut::GamutCoverageResult;
use crate::session::CalibrationSession;

const NO_TARGET_DATA: &str = "N/A (requires stored target data)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GammaStatistics {
    pub latest_gamma: f64,
}

/// A color error figure, or the reason it is missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorFigure {
    Measured(f64),
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorStatistics {
    pub max_delta_e: ErrorFigure,
    pub avg_delta_e: ErrorFigure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuminanceLinearity {
    /// |gamma − 2.2|, rounded to 3 decimals
    pub deviation_from_2_2: f64,
}

/// Report document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub report_generated_at: DateTime<Utc>,
    pub device_id: String,
    pub session_name: String,
    pub last_calibration_timestamp: DateTime<Utc>,
    pub gamma_statistics: GammaStatistics,
    /// xy of the R, G and B primaries
    pub display_chromaticity: [[f64; 2]; 3],
    pub gamut_coverage: BTreeMap<String, f64>,
    pub gamut_overlap: BTreeMap<String, f64>,
    /// Empty when the session has no white balance gains
    pub awb_gains: Vec<f64>,
    /// Camera matrix rows; empty without lens calibration
    pub distortion_matrix: Vec<Vec<f64>>,
    pub trend_analysis: TrendAnalysis,
    pub error_statistics: ErrorStatistics,
    pub luminance_linearity: LuminanceLinearity,
}

impl CalibrationReport {
    /// Write the report as indented JSON
    pub fn write_json_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), device_id = %self.device_id, "Calibration report written");
        Ok(())
    }
}

/// Assemble the report for a device from its latest session.
pub fn generate_json_report(
    device_id: &str,
    latest: &CalibrationSession,
    gamut: &GamutCoverageResult,
    trend: &TrendAnalysis,
) -> CalibrationReport {
    let gamma = latest.tone_curve.gamma();
    let error_statistics = match latest.color_error {
        Some(stats) => ErrorStatistics {
            max_delta_e: ErrorFigure::Measured(stats.max),
            avg_delta_e: ErrorFigure::Measured(stats.mean),
        },
        None => ErrorStatistics {
            max_delta_e: ErrorFigure::Unavailable(NO_TARGET_DATA.to_string()),
            avg_delta_e: ErrorFigure::Unavailable(NO_TARGET_DATA.to_string()),
        },
    };

    CalibrationReport {
        report_generated_at: Utc::now(),
        device_id: device_id.to_string(),
        session_name: latest.session_name.clone(),
        last_calibration_timestamp: latest.timestamp,
        gamma_statistics: GammaStatistics {
            latest_gamma: gamma,
        },
        display_chromaticity: gamut.display_primaries_xy.map(|c| c.as_point()),
        gamut_coverage: gamut.coverage.clone(),
        gamut_overlap: gamut.overlap.clone(),
        awb_gains: latest
            .awb_gains
            .map(|g| g.as_array().to_vec())
            .unwrap_or_default(),
        distortion_matrix: latest
            .camera
            .as_ref()
            .map(|c| c.camera_matrix_rows())
            .unwrap_or_default(),
        trend_analysis: trend.clone(),
        error_statistics,
        luminance_linearity: LuminanceLinearity {
            deviation_from_2_2: ((gamma - tone::REFERENCE_GAMMA).abs() * 1000.0).round() / 1000.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::DistanceStats;
    use crate::config::DriftThresholds;
    use crate::drift::analyze_color_drift;
    use crate::gamut::calculate_gamut_coverage;
    use crate::session::{GainVector, ToneCurveModel};
    use chrono::TimeZone;

    fn latest(color_error: Option<DistanceStats>) -> CalibrationSession {
        CalibrationSession {
            device_id: "DISPLAY_SN_ABC123".to_string(),
            session_name: "weekly".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
            tone_curve: ToneCurveModel::from_gamma(2.4567).unwrap(),
            color_correction: None,
            color_error,
            awb_gains: Some(GainVector([1.0, 0.9, 0.8])),
            mura_map: None,
            camera: None,
        }
    }

    fn report(session: &CalibrationSession) -> CalibrationReport {
        let gamut = calculate_gamut_coverage(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
            .unwrap();
        let trend = analyze_color_drift(
            "DISPLAY_SN_ABC123",
            std::slice::from_ref(session),
            &DriftThresholds::default(),
        );
        generate_json_report("DISPLAY_SN_ABC123", session, &gamut, &trend)
    }

    #[test]
    fn test_report_fields() {
        let session = latest(None);
        let report = report(&session);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["gamma_statistics"]["latest_gamma"], 2.4567);
        assert_eq!(json["luminance_linearity"]["deviation_from_2_2"], 0.257);
        assert_eq!(json["error_statistics"]["avg_delta_e"], NO_TARGET_DATA);
        assert_eq!(json["awb_gains"], serde_json::json!([1.0, 0.9, 0.8]));
        assert_eq!(json["distortion_matrix"], serde_json::json!([]));
        assert_eq!(
            json["trend_analysis"]["recommendation"],
            "Initial calibration completed. Monitor for drift."
        );
        assert!(json["gamut_coverage"]["sRGB"].as_f64().unwrap() > 99.0);
        assert_eq!(json["display_chromaticity"].as_array().unwrap().len(), 3);
        assert_eq!(json["last_calibration_timestamp"], "2024-06-01T08:00:00Z");
    }

    #[test]
    fn test_measured_error_statistics() {
        let session = latest(Some(DistanceStats { mean: 0.75, max: 2.5 }));
        let report = report(&session);
        assert_eq!(report.error_statistics.max_delta_e, ErrorFigure::Measured(2.5));
        assert_eq!(report.error_statistics.avg_delta_e, ErrorFigure::Measured(0.75));
    }

    #[test]
    fn test_report_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("calibration_report.json");
        let report = report(&latest(None));
        report.write_json_file(&path).unwrap();
        let back: CalibrationReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, report);
    }
}
