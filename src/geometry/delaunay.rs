//! Delaunay triangulation and scattered-data interpolation.
//!
//! The triangulation is spade's, built with exact orientation predicates so
//! every triangle of the convex hull is present. Interpolation is piecewise
//! linear (barycentric) inside the hull and undefined (`None` / NaN)
//! outside it.

use rayon::prelude::*;
use spade::{DelaunayTriangulation, FloatTriangulation as _, HasPosition, Point2, Triangulation as _};
use tracing::debug;

use super::hull::Point;

/// Triangulation vertex; `index` points back into the caller's site list
#[derive(Debug, Clone, Copy)]
struct Site {
    position: Point2<f64>,
    index: usize,
}

impl HasPosition for Site {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        self.position
    }
}

/// Triangulation of a point set; triangles index into `points`
#[derive(Debug, Clone)]
pub struct Triangulation {
    inner: DelaunayTriangulation<Site>,
    triangles: Vec<[usize; 3]>,
}

impl Triangulation {
    /// Triangulate `points`. Duplicate sites are inserted once (the first
    /// occurrence wins); non-finite sites are skipped. Collinear or fewer
    /// than three sites produce an empty triangulation.
    pub fn new(points: &[Point]) -> Self {
        let mut inner: DelaunayTriangulation<Site> = DelaunayTriangulation::new();
        for (index, p) in points.iter().enumerate() {
            if !(p[0].is_finite() && p[1].is_finite()) {
                continue;
            }
            let position = Point2::new(p[0], p[1]);
            if inner.locate_vertex(position).is_some() {
                continue;
            }
            if let Err(e) = inner.insert(Site { position, index }) {
                debug!(index, error = ?e, "Site rejected by triangulation");
            }
        }

        let triangles = inner
            .inner_faces()
            .map(|face| face.vertices().map(|v| v.data().index))
            .collect();
        Self { inner, triangles }
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Piecewise-linear interpolation over a Delaunay triangulation
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    triangulation: Triangulation,
    values: Vec<f64>,
}

impl LinearInterpolator {
    /// `values[i]` is the sample value at `points[i]`
    pub fn new(points: &[Point], values: &[f64]) -> Self {
        Self {
            triangulation: Triangulation::new(points),
            values: values.to_vec(),
        }
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    /// Interpolated value at `(x, y)`, `None` outside the convex hull
    pub fn interpolate(&self, x: f64, y: f64) -> Option<f64> {
        if self.triangulation.is_empty() {
            return None;
        }
        self.triangulation
            .inner
            .barycentric()
            .interpolate(|v| self.values[v.data().index], Point2::new(x, y))
    }

    /// Evaluate on every integer grid point of a `width × height` raster.
    ///
    /// Row-major output; cells outside the convex hull are NaN.
    pub fn fill_grid(&self, width: usize, height: usize) -> Vec<f64> {
        let mut grid = vec![f64::NAN; width * height];
        if self.triangulation.is_empty() {
            return grid;
        }
        grid.par_chunks_mut(width.max(1))
            .enumerate()
            .for_each(|(y, row)| {
                let barycentric = self.triangulation.inner.barycentric();
                for (x, cell) in row.iter_mut().enumerate() {
                    let value = barycentric.interpolate(
                        |v| self.values[v.data().index],
                        Point2::new(x as f64, y as f64),
                    );
                    if let Some(v) = value {
                        *cell = v;
                    }
                }
            });
        grid
    }
}

/// Index of the site nearest to `(x, y)`; ties resolve to the lowest index
pub fn nearest_site(points: &[Point], x: f64, y: f64) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| p[0].is_finite() && p[1].is_finite())
        .map(|(i, p)| (i, (p[0] - x).powi(2) + (p[1] - y).powi(2)))
        .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
            Some((_, bd)) if bd <= d => best,
            _ => Some((i, d)),
        })
        .map(|(i, _)| i)
}
