//! Gamut coverage against reference color spaces
//!
//! The display's primaries are projected onto the CIE 1931 xy plane and the
//! area of their convex hull is compared with each reference triangle.
//! `coverage` is the plain ratio of areas, which can exceed 100% for a wide
//! gamut display and ignores where the two triangles actually lie. It is an
//! approximation of gamut coverage, not a volume measure. `overlap` uses
//! the intersection of the two triangles instead and never exceeds 100%.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::conversion::linear_from_slice;
use crate::color::{rgb_to_xy, Chromaticity};
use crate::constants::gamuts::{self, ReferenceGamut};
use crate::error::{CalibrationError, Result};
use crate::geometry::{clip_convex, convex_hull, polygon_area, Point};

/// Display primaries in xy and their coverage of each reference gamut
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamutCoverageResult {
    /// Chromaticity of the R, G and B primaries
    pub display_primaries_xy: [Chromaticity; 3],
    /// Display area ÷ reference area × 100, rounded to 2 decimals
    pub coverage: BTreeMap<String, f64>,
    /// Area of display ∩ reference ÷ reference area × 100, rounded to 2 decimals
    pub overlap: BTreeMap<String, f64>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent_of(area: f64, reference_area: f64) -> f64 {
    if reference_area > 0.0 {
        round2(area / reference_area * 100.0)
    } else {
        0.0
    }
}

fn reference_hull(gamut: &ReferenceGamut) -> Vec<Point> {
    let points: Vec<Point> = gamut.primaries().iter().map(|&(x, y)| [x, y]).collect();
    convex_hull(&points)
}

/// Compute the chromaticities of the display primaries and their coverage
/// of sRGB, Adobe RGB and DCI-P3.
///
/// # Arguments
///
/// * `primaries` - 3 rows (R, G, B), each the measured linear RGB response
///   of that primary
///
/// # Errors
///
/// `InvalidShape` unless the input is exactly 3 rows of 3 components.
/// Degenerate primaries (collinear, coincident, black) are not an error:
/// their area is 0 and so is every coverage figure.
pub fn calculate_gamut_coverage<R: AsRef<[f64]>>(primaries: &[R]) -> Result<GamutCoverageResult> {
    if primaries.len() != 3 || primaries.iter().any(|row| row.as_ref().len() != 3) {
        let widths: Vec<usize> = primaries.iter().map(|row| row.as_ref().len()).collect();
        return Err(CalibrationError::invalid_shape(
            "display primaries",
            "3×3",
            format!("{} rows with widths {widths:?}", primaries.len()),
        ));
    }

    let xy: [Chromaticity; 3] =
        std::array::from_fn(|i| rgb_to_xy(linear_from_slice(primaries[i].as_ref())));
    let display_hull = convex_hull(&xy.map(|c| c.as_point()));
    let display_area = polygon_area(&display_hull);

    let mut coverage = BTreeMap::new();
    let mut overlap = BTreeMap::new();
    for gamut in gamuts::ALL.iter() {
        let reference = reference_hull(gamut);
        let reference_area = polygon_area(&reference);
        let shared_area = if display_hull.len() >= 3 {
            polygon_area(&clip_convex(&display_hull, &reference))
        } else {
            0.0
        };
        coverage.insert(gamut.name.to_string(), percent_of(display_area, reference_area));
        overlap.insert(gamut.name.to_string(), percent_of(shared_area, reference_area));
    }

    debug!(display_area, ?coverage, "Gamut coverage computed");
    Ok(GamutCoverageResult {
        display_primaries_xy: xy,
        coverage,
        overlap,
    })
}
