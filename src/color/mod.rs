//! Color conversion and color difference module
//!
//! This module holds the color space transforms shared by every solver
//! and the perceptual distance metrics used by the color correction fit.

pub mod conversion;
pub mod difference;

pub use conversion::{
    rgb_to_lab, rgb_to_xy, rgb_to_xyz, to_linear, xyz_to_lab, xyz_to_xy, Chromaticity,
    EncodedRgb, LabD65, LinearRgb, XyzD65,
};
pub use difference::{
    distance_stats, Ciede2000, ColorDistance, DistanceMetric, DistanceStats, EuclideanLab,
};
