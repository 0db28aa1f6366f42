//! Perceptual color difference metrics
//!
//! The default metric is the plain Euclidean distance in L*a*b* (CIE76
//! ΔE*ab). It is NOT CIEDE2000: values differ noticeably for saturated and
//! dark colors, and consumers that assume standards-compliant ΔE00 numbers
//! will see different results. The metric is a strategy so callers can opt
//! into [`Ciede2000`], which delegates to palette's implementation.

use palette::color_difference::Ciede2000 as PaletteCiede2000;
use serde::{Deserialize, Serialize};

use super::conversion::LabD65;

/// Distance between two Lab colors
pub trait ColorDistance: Send + Sync {
    fn distance(&self, a: LabD65, b: LabD65) -> f64;
}

/// Euclidean distance in L*a*b* (ΔE76)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EuclideanLab;

impl ColorDistance for EuclideanLab {
    fn distance(&self, a: LabD65, b: LabD65) -> f64 {
        let dl = a.l - b.l;
        let da = a.a - b.a;
        let db = a.b - b.b;
        (dl * dl + da * da + db * db).sqrt()
    }
}

/// CIEDE2000 color difference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ciede2000;

impl ColorDistance for Ciede2000 {
    fn distance(&self, a: LabD65, b: LabD65) -> f64 {
        a.difference(b)
    }
}

/// Serializable selection of a distance metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    #[default]
    EuclideanLab,
    Ciede2000,
}

impl ColorDistance for DistanceMetric {
    fn distance(&self, a: LabD65, b: LabD65) -> f64 {
        match self {
            DistanceMetric::EuclideanLab => EuclideanLab.distance(a, b),
            DistanceMetric::Ciede2000 => Ciede2000.distance(a, b),
        }
    }
}

/// Summary of pairwise distances between two equally long color sets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceStats {
    pub mean: f64,
    pub max: f64,
}

/// Mean and maximum pairwise distance.
///
/// Returns `None` when the sets are empty.
pub fn distance_stats<D: ColorDistance + ?Sized>(
    metric: &D,
    a: &[LabD65],
    b: &[LabD65],
) -> Option<DistanceStats> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let (sum, max) = a
        .iter()
        .zip(b)
        .map(|(x, y)| metric.distance(*x, *y))
        .fold((0.0, 0.0_f64), |(sum, max), d| (sum + d, max.max(d)));
    Some(DistanceStats {
        mean: sum / a.len() as f64,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use palette::Lab;

    #[test]
    fn test_euclidean_same_color() {
        let lab = Lab::new(50.0, 0.0, 0.0);
        assert!(EuclideanLab.distance(lab, lab) < 1e-12);
    }

    #[test]
    fn test_euclidean_known_distance() {
        let a = Lab::new(50.0, 0.0, 0.0);
        let b = Lab::new(53.0, 4.0, 0.0);
        assert!((EuclideanLab.distance(a, b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_ciede2000_differs_from_euclidean() {
        let a = Lab::new(50.0, 2.6772, -79.7751);
        let b = Lab::new(50.0, 0.0, -82.7485);
        let de00 = Ciede2000.distance(a, b);
        let de76 = EuclideanLab.distance(a, b);
        // Published CIEDE2000 test pair #1 (Sharma et al.)
        assert!((de00 - 2.0425).abs() < 1e-3);
        assert!((de76 - de00).abs() > 0.5);
    }

    #[test]
    fn test_metric_dispatch() {
        let a = Lab::new(40.0, 10.0, 10.0);
        let b = Lab::new(45.0, 12.0, 8.0);
        assert_eq!(
            DistanceMetric::EuclideanLab.distance(a, b),
            EuclideanLab.distance(a, b)
        );
        assert_eq!(DistanceMetric::Ciede2000.distance(a, b), Ciede2000.distance(a, b));
        assert_eq!(DistanceMetric::default(), DistanceMetric::EuclideanLab);
    }

    #[test]
    fn test_distance_stats() {
        let a = [Lab::new(50.0, 0.0, 0.0), Lab::new(50.0, 0.0, 0.0)];
        let b = [Lab::new(50.0, 0.0, 0.0), Lab::new(54.0, 0.0, 3.0)];
        let stats = distance_stats(&EuclideanLab, &a, &b).unwrap();
        assert!((stats.mean - 2.5).abs() < 1e-12);
        assert!((stats.max - 5.0).abs() < 1e-12);
        assert!(distance_stats(&EuclideanLab, &[], &[]).is_none());
    }
}
