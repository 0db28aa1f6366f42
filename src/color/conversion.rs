//! Color space conversion utilities
//!
//! Provides the fixed conversion chain used by every solver:
//! - gamma-encoded sRGB to linear RGB (inverse sRGB companding)
//! - linear RGB to CIE XYZ (D65 sRGB matrix)
//! - CIE XYZ to CIE Lab (D65 white point)
//! - CIE XYZ to CIE 1931 xy chromaticity
//!
//! The formulas are spelled out rather than delegated to palette's own
//! conversions so that the matrix and thresholds stay exactly the published
//! ones; palette supplies the color types.

use palette::white_point::D65;
use palette::{Lab, LinSrgb, Srgb, Xyz};
use serde::{Deserialize, Serialize};

use crate::constants::{d65, lab, srgb};

/// Gamma-encoded sRGB triplet, components in [0, 1]
pub type EncodedRgb = Srgb<f64>;

/// Linear-light RGB triplet with sRGB primaries
pub type LinearRgb = LinSrgb<f64>;

/// CIE XYZ relative to D65
pub type XyzD65 = Xyz<D65, f64>;

/// CIE Lab relative to D65
pub type LabD65 = Lab<D65, f64>;

/// CIE 1931 xy chromaticity coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Chromaticity {
    pub x: f64,
    pub y: f64,
}

impl Chromaticity {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Coordinates as a planar point
    pub fn as_point(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl From<(f64, f64)> for Chromaticity {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Build a linear RGB triplet from a slice already checked to hold 3 values
pub(crate) fn linear_from_slice(values: &[f64]) -> LinearRgb {
    LinSrgb::new(values[0], values[1], values[2])
}

/// Invert sRGB companding for a single channel
#[inline]
pub fn channel_to_linear(v: f64) -> f64 {
    if v <= srgb::LINEAR_THRESHOLD {
        v / srgb::LINEAR_SLOPE
    } else {
        ((v + srgb::OFFSET) / (1.0 + srgb::OFFSET)).powf(srgb::EXPONENT)
    }
}

/// Convert gamma-encoded sRGB to linear RGB
pub fn to_linear(encoded: EncodedRgb) -> LinearRgb {
    LinSrgb::new(
        channel_to_linear(encoded.red),
        channel_to_linear(encoded.green),
        channel_to_linear(encoded.blue),
    )
}

/// Convert linear RGB to CIE XYZ using the D65 sRGB matrix
pub fn rgb_to_xyz(linear: LinearRgb) -> XyzD65 {
    let rgb = [linear.red, linear.green, linear.blue];
    let m = &srgb::RGB_TO_XYZ;
    let dot = |row: &[f64; 3]| row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2];
    Xyz::new(dot(&m[0]), dot(&m[1]), dot(&m[2]))
}

/// CIE Lab companding function f(t)
#[inline]
fn lab_f(t: f64) -> f64 {
    if t > lab::EPSILON {
        t.cbrt()
    } else {
        t * lab::LINEAR_SLOPE + lab::LINEAR_OFFSET
    }
}

/// Convert CIE XYZ to CIE Lab, normalized by the D65 white point
pub fn xyz_to_lab(xyz: XyzD65) -> LabD65 {
    let [xn, yn, zn] = d65::WHITE_POINT_XYZ;
    let fx = lab_f(xyz.x / xn);
    let fy = lab_f(xyz.y / yn);
    let fz = lab_f(xyz.z / zn);
    Lab::new(116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// Convert CIE XYZ to xy chromaticity.
///
/// Black (X + Y + Z = 0) maps to (0, 0) rather than failing.
pub fn xyz_to_xy(xyz: XyzD65) -> Chromaticity {
    let sum = xyz.x + xyz.y + xyz.z;
    if sum == 0.0 {
        return Chromaticity::default();
    }
    Chromaticity::new(xyz.x / sum, xyz.y / sum)
}

/// Linear RGB straight to Lab
pub fn rgb_to_lab(linear: LinearRgb) -> LabD65 {
    xyz_to_lab(rgb_to_xyz(linear))
}

/// Linear RGB straight to xy chromaticity
pub fn rgb_to_xy(linear: LinearRgb) -> Chromaticity {
    xyz_to_xy(rgb_to_xyz(linear))
}

/// Convert a batch of linear RGB colors to Lab
pub fn rgb_batch_to_lab(colors: &[LinearRgb]) -> Vec<LabD65> {
    colors.iter().copied().map(rgb_to_lab).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_linear_branches() {
        // Linear segment below the threshold
        let low = to_linear(Srgb::new(0.04, 0.0, 0.02));
        assert!((low.red - 0.04 / 12.92).abs() < 1e-12);
        assert_eq!(low.green, 0.0);

        // Power segment above it
        let high = to_linear(Srgb::new(0.5, 1.0, 0.5));
        assert!((high.red - 0.214041).abs() < 1e-6);
        assert!((high.green - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_to_linear_is_continuous_at_threshold() {
        let below = channel_to_linear(srgb::LINEAR_THRESHOLD);
        let above = channel_to_linear(srgb::LINEAR_THRESHOLD + 1e-9);
        assert!((below - above).abs() < 1e-6);
    }

    #[test]
    fn test_white_maps_to_d65() {
        let xyz = rgb_to_xyz(LinSrgb::new(1.0, 1.0, 1.0));
        assert!((xyz.x - 0.95047).abs() < 1e-4);
        assert!((xyz.y - 1.0).abs() < 1e-4);
        assert!((xyz.z - 1.08883).abs() < 1e-4);
    }

    #[test]
    fn test_lab_white_and_black() {
        let white = rgb_to_lab(LinSrgb::new(1.0, 1.0, 1.0));
        assert!((white.l - 100.0).abs() < 1e-2);
        assert!(white.a.abs() < 1e-2);
        assert!(white.b.abs() < 1e-2);

        let black = rgb_to_lab(LinSrgb::new(0.0, 0.0, 0.0));
        assert!(black.l.abs() < 1e-9);
        assert!(black.a.abs() < 1e-9);
        assert!(black.b.abs() < 1e-9);
    }

    #[test]
    fn test_lab_linear_segment_for_dark_colors() {
        // Y/Yn below (6/29)^3 uses the linear branch: L = 116 * (t * slope + 4/29) - 16
        let xyz = Xyz::new(0.0, 0.001, 0.0);
        let lab = xyz_to_lab(xyz);
        assert!((lab.l - 0.9033).abs() < 1e-3);
    }

    #[test]
    fn test_xyz_to_xy_zero_sum() {
        let xy = xyz_to_xy(Xyz::new(0.0, 0.0, 0.0));
        assert_eq!(xy, Chromaticity::new(0.0, 0.0));
    }

    #[test]
    fn test_srgb_primaries_chromaticity() {
        let red = rgb_to_xy(LinSrgb::new(1.0, 0.0, 0.0));
        assert!((red.x - 0.64).abs() < 1e-3);
        assert!((red.y - 0.33).abs() < 1e-3);

        let white = rgb_to_xy(LinSrgb::new(1.0, 1.0, 1.0));
        assert!((white.x - 0.3127).abs() < 1e-3);
        assert!((white.y - 0.3290).abs() < 1e-3);
    }

    #[test]
    fn test_batch_matches_single() {
        let colors = [LinSrgb::new(0.2, 0.4, 0.8), LinSrgb::new(0.9, 0.1, 0.3)];
        let batch = rgb_batch_to_lab(&colors);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], rgb_to_lab(colors[1]));
    }
}
