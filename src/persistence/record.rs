//! Flat session record as kept by the session store
//!
//! Array-valued artifacts are stored as JSON-encoded strings inside the
//! record, and the timestamp is a JSON-encoded ISO-8601 string. Encoding and
//! decoding happen here only; the rest of the crate sees typed sessions.

use chrono::{DateTime, NaiveDateTime, Utc};
use nalgebra::Matrix3;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::color::DistanceStats;
use crate::error::{CalibrationError, Result};
use crate::session::{
    CalibrationSession, CameraIntrinsics, ColorCorrectionMatrix, GainVector, MuraMap,
    ToneCurveModel,
};

/// One stored calibration session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub device_id: String,
    pub session_name: String,
    pub gamma_value: f64,
    /// JSON array of 256 integers
    pub lut: String,
    /// JSON 3×3 array, `[]` without lens calibration
    #[serde(default = "empty_array")]
    pub camera_matrix: String,
    /// JSON array, `[]` without lens calibration
    #[serde(default = "empty_array")]
    pub dist_coeffs: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_correction_matrix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awb_gains: Option<String>,
    /// JSON 2D array; omitted for maps above the storage budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mura_compensation_map: Option<String>,
    /// JSON `{"mean": .., "max": ..}` of the color correction residual
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_statistics: Option<String>,
    /// JSON-encoded ISO-8601 string, e.g. `"\"2024-05-01T12:00:00Z\""`
    pub timestamp: String,
}

fn empty_array() -> String {
    "[]".to_string()
}

fn decode<T: DeserializeOwned>(field: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| CalibrationError::RecordDecode {
        field: field.to_string(),
        message: e.to_string(),
    })
}

/// Parse a stored timestamp.
///
/// Accepts the JSON-encoded form as well as a bare string, and both RFC 3339
/// and offset-less ISO-8601 (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let text = serde_json::from_str::<String>(raw).unwrap_or_else(|_| raw.to_string());
    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| CalibrationError::RecordDecode {
            field: "timestamp".to_string(),
            message: format!("{text:?}: {e}"),
        })
}

/// Encode a timestamp the way records store it
pub fn encode_timestamp(timestamp: &DateTime<Utc>) -> String {
    serde_json::Value::String(timestamp.to_rfc3339()).to_string()
}

impl SessionRecord {
    /// Encode a session. Mura maps with more than `max_mura_cells` cells
    /// are left out of the record.
    pub fn from_session(session: &CalibrationSession, max_mura_cells: usize) -> Result<Self> {
        let (camera_matrix, dist_coeffs) = match &session.camera {
            Some(camera) => (
                serde_json::to_string(&camera.camera_matrix_rows())?,
                serde_json::to_string(&camera.dist_coeffs)?,
            ),
            None => (empty_array(), empty_array()),
        };

        let mura_compensation_map = match &session.mura_map {
            Some(map) if map.len() <= max_mura_cells => Some(serde_json::to_string(&map.rows())?),
            Some(map) => {
                warn!(
                    cells = map.len(),
                    max_mura_cells, "Mura map too large for the session record, omitted"
                );
                None
            }
            None => None,
        };

        Ok(Self {
            device_id: session.device_id.clone(),
            session_name: session.session_name.clone(),
            gamma_value: session.tone_curve.gamma(),
            lut: serde_json::to_string(session.tone_curve.lut())?,
            camera_matrix,
            dist_coeffs,
            color_correction_matrix: session
                .color_correction
                .map(|m| serde_json::to_string(&m))
                .transpose()?,
            awb_gains: session
                .awb_gains
                .map(|g| serde_json::to_string(&g))
                .transpose()?,
            mura_compensation_map,
            error_statistics: session
                .color_error
                .map(|e| serde_json::to_string(&e))
                .transpose()?,
            timestamp: encode_timestamp(&session.timestamp),
        })
    }

    /// Decode into a typed session
    pub fn into_session(self) -> Result<CalibrationSession> {
        let lut: Vec<u8> = decode("lut", &self.lut)?;
        let tone_curve = ToneCurveModel::from_parts(self.gamma_value, lut)?;

        let camera_rows: Vec<Vec<f64>> = decode("camera_matrix", &self.camera_matrix)?;
        let dist_coeffs: Vec<f64> = decode("dist_coeffs", &self.dist_coeffs)?;
        let camera = match camera_rows.len() {
            0 => None,
            3 if camera_rows.iter().all(|r| r.len() == 3) => Some(CameraIntrinsics {
                camera_matrix: Matrix3::from_fn(|r, c| camera_rows[r][c]),
                dist_coeffs,
            }),
            _ => {
                return Err(CalibrationError::RecordDecode {
                    field: "camera_matrix".to_string(),
                    message: format!("expected 3×3, found {} rows", camera_rows.len()),
                })
            }
        };

        let color_correction = self
            .color_correction_matrix
            .as_deref()
            .map(|raw| decode::<ColorCorrectionMatrix>("color_correction_matrix", raw))
            .transpose()?;
        let awb_gains = self
            .awb_gains
            .as_deref()
            .map(|raw| decode::<GainVector>("awb_gains", raw))
            .transpose()?;
        let mura_map = self
            .mura_compensation_map
            .as_deref()
            .map(|raw| decode::<Vec<Vec<f64>>>("mura_compensation_map", raw))
            .transpose()?
            .map(MuraMap::from_rows)
            .transpose()?;
        let color_error = self
            .error_statistics
            .as_deref()
            .map(|raw| decode::<DistanceStats>("error_statistics", raw))
            .transpose()?;

        Ok(CalibrationSession {
            device_id: self.device_id,
            session_name: self.session_name,
            timestamp: parse_timestamp(&self.timestamp)?,
            tone_curve,
            color_correction,
            color_error,
            awb_gains,
            mura_map,
            camera,
        })
    }
}
