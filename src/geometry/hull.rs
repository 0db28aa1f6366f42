//! Planar convex hull, polygon area and convex polygon clipping

/// Planar point
pub type Point = [f64; 2];

#[inline]
fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Convex hull in counter-clockwise order (Andrew's monotone chain).
///
/// Collinear and duplicate points are dropped, as are non-finite ones, so a
/// degenerate input yields fewer than 3 vertices.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts: Vec<Point> = points
        .iter()
        .copied()
        .filter(|p| p[0].is_finite() && p[1].is_finite())
        .collect();
    pts.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Point> = Vec::with_capacity(pts.len() * 2);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Unsigned polygon area (shoelace formula)
pub fn polygon_area(polygon: &[Point]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let twice: f64 = polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(a, b)| a[0] * b[1] - b[0] * a[1])
        .sum();
    twice.abs() / 2.0
}

/// Area of the convex hull of `points`; 0 for fewer than 3 non-collinear points
pub fn hull_area(points: &[Point]) -> f64 {
    polygon_area(&convex_hull(points))
}

fn segment_intersection(p1: Point, p2: Point, a: Point, b: Point) -> Point {
    let d1 = [p2[0] - p1[0], p2[1] - p1[1]];
    let d2 = [b[0] - a[0], b[1] - a[1]];
    let denom = d1[0] * d2[1] - d1[1] * d2[0];
    if denom == 0.0 {
        return p2;
    }
    let t = ((a[0] - p1[0]) * d2[1] - (a[1] - p1[1]) * d2[0]) / denom;
    [p1[0] + t * d1[0], p1[1] + t * d1[1]]
}

/// Intersection of a polygon with a convex counter-clockwise clip polygon
/// (Sutherland–Hodgman).
pub fn clip_convex(subject: &[Point], clip: &[Point]) -> Vec<Point> {
    if clip.len() < 3 {
        return Vec::new();
    }
    let mut output = subject.to_vec();
    for (i, &a) in clip.iter().enumerate() {
        let b = clip[(i + 1) % clip.len()];
        let input = std::mem::take(&mut output);
        if input.is_empty() {
            break;
        }
        let inside = |p: Point| cross(a, b, p) >= 0.0;
        for (j, &current) in input.iter().enumerate() {
            let previous = input[(j + input.len() - 1) % input.len()];
            match (inside(previous), inside(current)) {
                (true, true) => output.push(current),
                (true, false) => output.push(segment_intersection(previous, current, a, b)),
                (false, true) => {
                    output.push(segment_intersection(previous, current, a, b));
                    output.push(current);
                }
                (false, false) => {}
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hull_of_square_with_interior_point() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.5, 0.5]];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!((polygon_area(&hull) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_hull_is_counter_clockwise() {
        let hull = convex_hull(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0]]);
        let signed: f64 = hull
            .iter()
            .zip(hull.iter().cycle().skip(1))
            .map(|(a, b)| a[0] * b[1] - b[0] * a[1])
            .sum();
        assert!(signed > 0.0);
    }

    #[test]
    fn test_collinear_points_have_zero_area() {
        let pts = [[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]];
        assert!(convex_hull(&pts).len() < 3);
        assert_eq!(hull_area(&pts), 0.0);
    }

    #[test]
    fn test_duplicates_and_nan_ignored() {
        let pts = [[0.0, 0.0], [0.0, 0.0], [f64::NAN, 1.0], [2.0, 0.0]];
        assert_eq!(hull_area(&pts), 0.0);
    }

    #[test]
    fn test_triangle_area() {
        let tri = [[0.64, 0.33], [0.30, 0.60], [0.15, 0.06]];
        assert!((hull_area(&tri) - 0.112050).abs() < 1e-6);
    }

    #[test]
    fn test_clip_overlapping_squares() {
        let a = convex_hull(&[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]);
        let b = convex_hull(&[[1.0, 1.0], [3.0, 1.0], [3.0, 3.0], [1.0, 3.0]]);
        let overlap = clip_convex(&a, &b);
        assert!((polygon_area(&overlap) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_clip_disjoint() {
        let a = convex_hull(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        let b = convex_hull(&[[5.0, 5.0], [6.0, 5.0], [5.0, 6.0]]);
        assert_eq!(polygon_area(&clip_convex(&a, &b)), 0.0);
    }
}
