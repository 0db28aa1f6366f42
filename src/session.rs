//! Calibration artifacts
//!
//! Typed, fixed-shape results of the solvers and the session bundle that
//! groups them. These types never carry JSON-encoded payloads; encoding
//! happens in [`crate::persistence`] only.

use chrono::{DateTime, Utc};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::color::{DistanceStats, LinearRgb};
use crate::constants::tone;
use crate::error::{CalibrationError, Result};

/// Power-law tone response and its inverse lookup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneCurveModel {
    gamma: f64,
    lut: Vec<u8>,
}

impl ToneCurveModel {
    /// Build the model for `gamma`, deriving the inverse-gamma LUT:
    /// `lut[i] = round(255 * (i / 255)^(1 / gamma))`.
    pub fn from_gamma(gamma: f64) -> Result<Self> {
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(CalibrationError::invalid_parameter("gamma", gamma));
        }
        let last = (tone::LUT_SIZE - 1) as f64;
        let lut = (0..tone::LUT_SIZE)
            .map(|i| {
                let v = (255.0 * (i as f64 / last).powf(1.0 / gamma)).round();
                v.clamp(0.0, 255.0) as u8
            })
            .collect();
        Ok(Self { gamma, lut })
    }

    /// Rebuild a model from stored parts, checking the LUT invariants
    pub fn from_parts(gamma: f64, lut: Vec<u8>) -> Result<Self> {
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(CalibrationError::invalid_parameter("gamma", gamma));
        }
        if lut.len() != tone::LUT_SIZE {
            return Err(CalibrationError::invalid_shape(
                "lut",
                format!("{} entries", tone::LUT_SIZE),
                lut.len().to_string(),
            ));
        }
        if lut.windows(2).any(|w| w[0] > w[1]) {
            return Err(CalibrationError::invalid_parameter(
                "lut",
                "not monotonically non-decreasing",
            ));
        }
        Ok(Self { gamma, lut })
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn lut(&self) -> &[u8] {
        &self.lut
    }
}

/// 3×3 linear transform applied to linear RGB
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f64; 3]; 3]", into = "[[f64; 3]; 3]")]
pub struct ColorCorrectionMatrix(Matrix3<f64>);

impl ColorCorrectionMatrix {
    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    /// Matrix from 9 values in row-major order
    pub fn from_row_slice(values: &[f64]) -> Self {
        Self(Matrix3::from_row_slice(values))
    }

    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self(Matrix3::from_fn(|r, c| rows[r][c]))
    }

    pub fn rows(&self) -> [[f64; 3]; 3] {
        std::array::from_fn(|r| std::array::from_fn(|c| self.0[(r, c)]))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    /// Transform a color and clip every channel to [0, 1]
    pub fn apply_clipped(&self, color: LinearRgb) -> LinearRgb {
        let v = self.0 * nalgebra::Vector3::new(color.red, color.green, color.blue);
        LinearRgb::new(
            v.x.clamp(0.0, 1.0),
            v.y.clamp(0.0, 1.0),
            v.z.clamp(0.0, 1.0),
        )
    }
}

impl From<[[f64; 3]; 3]> for ColorCorrectionMatrix {
    fn from(rows: [[f64; 3]; 3]) -> Self {
        Self::from_rows(rows)
    }
}

impl From<ColorCorrectionMatrix> for [[f64; 3]; 3] {
    fn from(ccm: ColorCorrectionMatrix) -> Self {
        ccm.rows()
    }
}

/// Per-channel white balance gains (R, G, B)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainVector(pub [f64; 3]);

impl GainVector {
    pub const UNITY: GainVector = GainVector([1.0, 1.0, 1.0]);

    pub fn as_array(&self) -> [f64; 3] {
        self.0
    }

    pub fn max(&self) -> f64 {
        self.0.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Euclidean distance between two gain vectors
    pub fn distance(&self, other: &GainVector) -> f64 {
        self.0
            .iter()
            .zip(other.0)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Per-pixel luminance compensation factors, row-major `height × width`
#[derive(Debug, Clone, PartialEq)]
pub struct MuraMap {
    width: usize,
    height: usize,
    factors: Vec<f64>,
}

impl MuraMap {
    pub(crate) fn new(width: usize, height: usize, factors: Vec<f64>) -> Self {
        debug_assert_eq!(factors.len(), width * height);
        Self {
            width,
            height,
            factors,
        }
    }

    /// Rebuild a map from rows, as stored
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 || rows.iter().any(|r| r.len() != width) {
            return Err(CalibrationError::invalid_shape(
                "mura map",
                "non-empty rows of equal length",
                format!("{height} rows"),
            ));
        }
        Ok(Self {
            width,
            height,
            factors: rows.into_iter().flatten().collect(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn factors(&self) -> &[f64] {
        &self.factors
    }

    /// Factor at pixel `(x, y)`
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        (x < self.width && y < self.height).then(|| self.factors[y * self.width + x])
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.factors
            .chunks(self.width)
            .map(<[f64]>::to_vec)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// Camera intrinsics returned by the lens calibration service
#[derive(Debug, Clone, PartialEq)]
pub struct CameraIntrinsics {
    pub camera_matrix: Matrix3<f64>,
    pub dist_coeffs: Vec<f64>,
}

impl CameraIntrinsics {
    pub fn camera_matrix_rows(&self) -> Vec<Vec<f64>> {
        (0..3)
            .map(|r| (0..3).map(|c| self.camera_matrix[(r, c)]).collect())
            .collect()
    }
}

/// One calibration run's artifact bundle. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSession {
    pub device_id: String,
    pub session_name: String,
    pub timestamp: DateTime<Utc>,
    pub tone_curve: ToneCurveModel,
    pub color_correction: Option<ColorCorrectionMatrix>,
    /// Residual color error of the color correction fit
    pub color_error: Option<DistanceStats>,
    pub awb_gains: Option<GainVector>,
    pub mura_map: Option<MuraMap>,
    pub camera: Option<CameraIntrinsics>,
}
