//! Calibration constants and reference values
//!
//! This module contains compile-time constants for display calibration,
//! based on colorimetry standards and the defaults of the solvers.

/// D65 Standard Illuminant Reference
///
/// CIE Standard Illuminant D65 represents average daylight with a correlated
/// color temperature of 6504K. It is the reference white for sRGB displays
/// and for every Lab conversion performed by this crate.
pub mod d65 {
    /// D65 white point in CIE XYZ color space (Xn, Yn, Zn)
    /// Source: CIE 15:2004 Colorimetry, 3rd edition
    pub const WHITE_POINT_XYZ: [f64; 3] = [0.95047, 1.00000, 1.08883];

    /// D65 chromaticity coordinates used by the reference gamut table
    pub const CHROMATICITY: (f64, f64) = (0.3127, 0.3290);
}

/// sRGB transfer function and primaries
pub mod srgb {
    /// Encoded values at or below this threshold use the linear segment
    pub const LINEAR_THRESHOLD: f64 = 0.04045;

    /// Slope of the linear segment
    pub const LINEAR_SLOPE: f64 = 12.92;

    /// Offset of the power segment
    pub const OFFSET: f64 = 0.055;

    /// Exponent of the power segment
    pub const EXPONENT: f64 = 2.4;

    /// Linear sRGB to CIE XYZ (D65), rows X, Y, Z
    pub const RGB_TO_XYZ: [[f64; 3]; 3] = [
        [0.4124564, 0.3575761, 0.1804375],
        [0.2126729, 0.7151522, 0.0721750],
        [0.0193339, 0.1191920, 0.9503041],
    ];
}

/// CIE Lab companding constants
pub mod lab {
    /// Threshold of the cube-root segment of f(t): (6/29)^3
    pub const EPSILON: f64 = (6.0 / 29.0) * (6.0 / 29.0) * (6.0 / 29.0);

    /// Slope of the linear segment of f(t): 1 / (3 * (6/29)^2)
    pub const LINEAR_SLOPE: f64 = 1.0 / (3.0 * (6.0 / 29.0) * (6.0 / 29.0));

    /// Offset of the linear segment of f(t)
    pub const LINEAR_OFFSET: f64 = 4.0 / 29.0;
}

/// Tone curve solver defaults
pub mod tone {
    /// Initial guess and non-convergence fallback for the power-law exponent
    pub const DEFAULT_GAMMA: f64 = 2.2;

    /// Number of entries in the inverse tone curve
    pub const LUT_SIZE: usize = 256;

    /// Reference gamma for the luminance linearity statistic
    pub const REFERENCE_GAMMA: f64 = 2.2;
}

/// Color correction matrix solver defaults
pub mod ccm {
    /// Simplex convergence tolerance on the objective spread
    pub const TOLERANCE: f64 = 1e-4;

    /// Iteration budget: 200 per free parameter
    pub const MAX_ITERATIONS: usize = 9 * 200;
}

/// Mura compensation defaults
pub mod mura {
    /// Lower bound of the compensation factor
    pub const MIN_FACTOR: f64 = 0.5;

    /// Upper bound of the compensation factor
    pub const MAX_FACTOR: f64 = 2.0;

    /// Global mean luminance at or below which no compensation is applied
    pub const ZERO_MEAN_EPSILON: f64 = 1e-12;

    /// Maps with more cells than this are omitted from stored records
    pub const MAX_STORED_CELLS: usize = 256 * 256;
}

/// Drift analysis thresholds and limits
pub mod drift {
    /// Maximum allowed gamma deviation between first and latest session
    pub const GAMMA_THRESHOLD: f64 = 0.1;

    /// Maximum allowed average color difference drift
    pub const DELTA_E_THRESHOLD: f64 = 3.0;

    /// Maximum allowed change in gamut coverage percentage
    pub const GAMUT_COVERAGE_THRESHOLD: f64 = 5.0;

    /// Euclidean distance between white balance gain vectors considered drift
    pub const AWB_GAIN_THRESHOLD: f64 = 0.1;

    /// Days between sessions after which routine recalibration is suggested
    pub const ROUTINE_INTERVAL_DAYS: i64 = 90;
}

/// Reference gamuts as CIE 1931 xy primaries with a D65 white point
pub mod gamuts {
    /// A named reference gamut
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct ReferenceGamut {
        pub name: &'static str,
        pub red: (f64, f64),
        pub green: (f64, f64),
        pub blue: (f64, f64),
        pub white: (f64, f64),
    }

    impl ReferenceGamut {
        /// Primaries in R, G, B order
        pub fn primaries(&self) -> [(f64, f64); 3] {
            [self.red, self.green, self.blue]
        }
    }

    pub const SRGB: ReferenceGamut = ReferenceGamut {
        name: "sRGB",
        red: (0.6400, 0.3300),
        green: (0.3000, 0.6000),
        blue: (0.1500, 0.0600),
        white: super::d65::CHROMATICITY,
    };

    pub const ADOBE_RGB: ReferenceGamut = ReferenceGamut {
        name: "AdobeRGB",
        red: (0.6400, 0.3300),
        green: (0.2100, 0.7100),
        blue: (0.1500, 0.0300),
        white: super::d65::CHROMATICITY,
    };

    /// DCI-P3 with the D65 white point (Display P3 primaries)
    pub const DCI_P3: ReferenceGamut = ReferenceGamut {
        name: "DCI-P3",
        red: (0.6800, 0.3200),
        green: (0.2650, 0.6900),
        blue: (0.1500, 0.0600),
        white: super::d65::CHROMATICITY,
    };

    /// All reference gamuts, in reporting order
    pub const ALL: [ReferenceGamut; 3] = [SRGB, ADOBE_RGB, DCI_P3];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_d65_constants() {
        assert!((d65::WHITE_POINT_XYZ[0] - 0.95047).abs() < 1e-9);
        assert!((d65::WHITE_POINT_XYZ[1] - 1.00000).abs() < 1e-9);
        assert!((d65::WHITE_POINT_XYZ[2] - 1.08883).abs() < 1e-9);
    }

    #[test]
    fn test_srgb_matrix_maps_white_to_d65() {
        // Row sums of the sRGB matrix reproduce the D65 white point
        for (row, expected) in srgb::RGB_TO_XYZ.iter().zip(d65::WHITE_POINT_XYZ) {
            let sum: f64 = row.iter().sum();
            assert!((sum - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn test_lab_epsilon() {
        assert!((lab::EPSILON - 0.008856).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_ranges() {
        assert!(mura::MIN_FACTOR < mura::MAX_FACTOR);
        assert!(drift::GAMMA_THRESHOLD > 0.0);
        assert_eq!(gamuts::ALL.len(), 3);
    }
}
