//! Calibration drift analysis
//!
//! Compares the earliest and latest stored sessions of a device and turns
//! the differences into warnings and a recalibration recommendation. This
//! is a fixed decision table over two sessions rather than a statistical
//! trend model; a regression over the whole series would use more of the
//! history. The order of the checks and their thresholds are stable, so
//! recommendations stay comparable across releases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DriftThresholds;
use crate::constants::drift;
use crate::session::CalibrationSession;

/// Recalibration advice.
///
/// Serialized as the human-readable sentence shown in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Calibrate immediately.")]
    CalibrateImmediately,
    #[serde(rename = "Recommend calibration soon.")]
    CalibrateSoon,
    #[serde(rename = "Consider routine calibration.")]
    RoutineCalibration,
    #[serde(rename = "Initial calibration completed. Monitor for drift.")]
    MonitorForDrift,
    #[serde(rename = "Calibration cycle is good.")]
    CycleGood,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::CalibrateImmediately => "Calibrate immediately.",
            Recommendation::CalibrateSoon => "Recommend calibration soon.",
            Recommendation::RoutineCalibration => "Consider routine calibration.",
            Recommendation::MonitorForDrift => "Initial calibration completed. Monitor for drift.",
            Recommendation::CycleGood => "Calibration cycle is good.",
        }
    }

    fn urgency(self) -> u8 {
        match self {
            Recommendation::CycleGood | Recommendation::MonitorForDrift => 0,
            Recommendation::RoutineCalibration => 1,
            Recommendation::CalibrateSoon => 2,
            Recommendation::CalibrateImmediately => 3,
        }
    }

    /// Move to `other` only if it is more urgent; never downgrades
    pub fn escalate(&mut self, other: Recommendation) {
        if other.urgency() > self.urgency() {
            *self = other;
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drift findings for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub device_id: String,
    /// |latest gamma − earliest gamma|, rounded to 2 decimals
    pub gamma_drift: f64,
    pub warnings: Vec<String>,
    pub recommendation: Recommendation,
    pub last_calibration_date: DateTime<Utc>,
}

/// Outcome of a trend analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrendAnalysis {
    /// No stored session for the device
    NoData {
        status: String,
        recommendation: Recommendation,
    },
    Report(DriftReport),
}

impl TrendAnalysis {
    pub fn recommendation(&self) -> Recommendation {
        match self {
            TrendAnalysis::NoData { recommendation, .. } => *recommendation,
            TrendAnalysis::Report(report) => report.recommendation,
        }
    }

    pub fn report(&self) -> Option<&DriftReport> {
        match self {
            TrendAnalysis::Report(report) => Some(report),
            TrendAnalysis::NoData { .. } => None,
        }
    }
}

/// Analyze the drift of a device over its calibration history.
///
/// Sessions may come in any order; they are sorted by timestamp with ties
/// kept in input order. Only `thresholds.gamma` is compared today, the AWB
/// check uses a fixed threshold of 0.1.
pub fn analyze_color_drift(
    device_id: &str,
    sessions: &[CalibrationSession],
    thresholds: &DriftThresholds,
) -> TrendAnalysis {
    if sessions.is_empty() {
        warn!(device_id, "No calibration history for device");
        return TrendAnalysis::NoData {
            status: "No historical data for trend analysis.".to_string(),
            recommendation: Recommendation::CalibrateImmediately,
        };
    }

    let mut ordered: Vec<&CalibrationSession> = sessions.iter().collect();
    ordered.sort_by_key(|s| s.timestamp);

    let earliest = ordered[0];
    let latest = ordered[ordered.len() - 1];

    let initial_gamma = earliest.tone_curve.gamma();
    let latest_gamma = latest.tone_curve.gamma();
    let gamma_drift = (latest_gamma - initial_gamma).abs();

    let mut recommendation = Recommendation::CycleGood;
    let mut warnings = Vec::new();

    if gamma_drift > thresholds.gamma {
        warnings.push(format!(
            "Significant gamma drift detected: {gamma_drift:.2} (from {initial_gamma:.2} to {latest_gamma:.2})."
        ));
        recommendation.escalate(Recommendation::CalibrateSoon);
    }

    if let (Some(initial_gains), Some(latest_gains)) = (&earliest.awb_gains, &latest.awb_gains) {
        let gain_drift = latest_gains.distance(initial_gains);
        debug!(device_id, gain_drift, "AWB gain drift");
        if gain_drift > drift::AWB_GAIN_THRESHOLD {
            warnings.push(format!("Significant AWB gain drift detected: {gain_drift:.2}."));
            recommendation.escalate(Recommendation::CalibrateSoon);
        }
    }

    if warnings.is_empty() {
        let days_since_last = match ordered.as_slice() {
            [.., previous, last] => (last.timestamp - previous.timestamp).num_days(),
            _ => 0,
        };
        if days_since_last > drift::ROUTINE_INTERVAL_DAYS {
            recommendation = Recommendation::RoutineCalibration;
        } else if days_since_last == 0 {
            recommendation = Recommendation::MonitorForDrift;
        }
    } else {
        for warning in &warnings {
            warn!(device_id, "{warning}");
        }
    }

    info!(
        device_id,
        sessions = ordered.len(),
        gamma_drift,
        %recommendation,
        "Drift analysis complete"
    );

    TrendAnalysis::Report(DriftReport {
        device_id: device_id.to_string(),
        gamma_drift: (gamma_drift * 100.0).round() / 100.0,
        warnings,
        recommendation,
        last_calibration_date: latest.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{GainVector, ToneCurveModel};
    use chrono::{Duration, TimeZone};

    fn session(day: i64, gamma: f64, gains: Option<[f64; 3]>) -> CalibrationSession {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        CalibrationSession {
            device_id: "DISPLAY_SN_ABC123".to_string(),
            session_name: format!("day-{day}"),
            timestamp: base + Duration::days(day),
            tone_curve: ToneCurveModel::from_gamma(gamma).unwrap(),
            color_correction: None,
            color_error: None,
            awb_gains: gains.map(GainVector),
            mura_map: None,
            camera: None,
        }
    }

    fn analyze(sessions: &[CalibrationSession]) -> TrendAnalysis {
        analyze_color_drift("DISPLAY_SN_ABC123", sessions, &DriftThresholds::default())
    }

    #[test]
    fn test_empty_history() {
        let analysis = analyze(&[]);
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["status"], "No historical data for trend analysis.");
        assert_eq!(json["recommendation"], "Calibrate immediately.");
    }

    #[test]
    fn test_gamma_drift_escalates() {
        let analysis = analyze(&[session(0, 2.2, None), session(30, 2.45, None)]);
        let report = analysis.report().unwrap();
        assert_eq!(report.gamma_drift, 0.25);
        assert_eq!(
            report.warnings,
            vec!["Significant gamma drift detected: 0.25 (from 2.20 to 2.45).".to_string()]
        );
        assert_eq!(report.recommendation, Recommendation::CalibrateSoon);
        assert_eq!(report.recommendation.as_str(), "Recommend calibration soon.");
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let analysis = analyze(&[session(30, 2.45, None), session(0, 2.2, None)]);
        let report = analysis.report().unwrap();
        assert_eq!(report.gamma_drift, 0.25);
        assert!(report.warnings[0].contains("from 2.20 to 2.45"));
        assert_eq!(report.last_calibration_date, session(30, 2.45, None).timestamp);
    }

    #[test]
    fn test_awb_drift_warns() {
        let analysis = analyze(&[
            session(0, 2.2, Some([1.0, 1.0, 1.0])),
            session(10, 2.22, Some([1.0, 0.8, 0.9])),
        ]);
        let report = analysis.report().unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0], "Significant AWB gain drift detected: 0.22.");
        assert_eq!(report.recommendation, Recommendation::CalibrateSoon);
    }

    #[test]
    fn test_both_warnings_keep_single_escalation() {
        let analysis = analyze(&[
            session(0, 2.2, Some([1.0, 1.0, 1.0])),
            session(10, 2.6, Some([0.5, 1.0, 1.0])),
        ]);
        let report = analysis.report().unwrap();
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.recommendation, Recommendation::CalibrateSoon);
    }

    #[test]
    fn test_single_session_is_initial() {
        let report = analyze(&[session(0, 2.2, None)]).report().cloned().unwrap();
        assert!(report.warnings.is_empty());
        assert_eq!(report.recommendation, Recommendation::MonitorForDrift);
    }

    #[test]
    fn test_routine_after_ninety_days() {
        let analysis = analyze(&[session(0, 2.2, None), session(91, 2.21, None)]);
        assert_eq!(analysis.recommendation(), Recommendation::RoutineCalibration);

        let analysis = analyze(&[session(0, 2.2, None), session(90, 2.21, None)]);
        assert_eq!(analysis.recommendation(), Recommendation::CycleGood);
    }

    #[test]
    fn test_elapsed_days_use_two_latest_sessions() {
        let analysis = analyze(&[
            session(0, 2.2, None),
            session(200, 2.2, None),
            session(200, 2.21, None),
        ]);
        assert_eq!(analysis.recommendation(), Recommendation::MonitorForDrift);
    }

    #[test]
    fn test_escalation_never_downgrades() {
        let mut rec = Recommendation::CalibrateSoon;
        rec.escalate(Recommendation::CycleGood);
        rec.escalate(Recommendation::RoutineCalibration);
        assert_eq!(rec, Recommendation::CalibrateSoon);
        rec.escalate(Recommendation::CalibrateImmediately);
        assert_eq!(rec, Recommendation::CalibrateImmediately);
    }

    #[test]
    fn test_custom_threshold() {
        let thresholds = DriftThresholds {
            gamma: 0.5,
            ..DriftThresholds::default()
        };
        let analysis = analyze_color_drift(
            "dev",
            &[session(0, 2.2, None), session(30, 2.45, None)],
            &thresholds,
        );
        assert_eq!(analysis.recommendation(), Recommendation::CycleGood);
    }
}
