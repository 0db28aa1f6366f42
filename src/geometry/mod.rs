//! Planar geometry used by the gamut and mura solvers

pub mod delaunay;
pub mod hull;

pub use delaunay::{nearest_site, LinearInterpolator, Triangulation};
pub use hull::{clip_convex, convex_hull, hull_area, polygon_area, Point};
