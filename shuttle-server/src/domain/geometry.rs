//! Route geometry: a fixed closed polyline and the arc-length queries on it.
//!
//! The shuttle loop is modelled as an ordered list of [`RoutePoint`]s in map
//! coordinates. Progress along the loop is a fraction in `[0, 1)`: 0 is the
//! first vertex and the path wraps back to 0 after the last vertex.
//!
//! All functions here are pure and `O(segments)`. Degenerate paths (fewer
//! than two points, or zero total length) never divide by zero.

use serde::Serialize;

/// A 2-D point in route (map) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoutePoint {
    pub x: f64,
    pub y: f64,
}

impl RoutePoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &RoutePoint) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    fn distance_squared(&self, other: &RoutePoint) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

/// Cumulative arc length at each vertex of a polyline.
///
/// `cumulative[i]` is the distance travelled from the first vertex to
/// vertex `i`, so `cumulative[0] == 0` and the sequence never decreases.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcLengthTable {
    cumulative: Vec<f64>,
    total: f64,
}

impl ArcLengthTable {
    /// Build the table for a polyline.
    ///
    /// A path with fewer than two points has total length 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use shuttle_server::domain::{ArcLengthTable, RoutePoint};
    ///
    /// let points = [
    ///     RoutePoint::new(0.0, 0.0),
    ///     RoutePoint::new(3.0, 4.0),
    ///     RoutePoint::new(3.0, 10.0),
    /// ];
    /// let table = ArcLengthTable::build(&points);
    /// assert_eq!(table.cumulative(), &[0.0, 5.0, 11.0]);
    /// assert_eq!(table.total(), 11.0);
    /// ```
    pub fn build(points: &[RoutePoint]) -> Self {
        let mut cumulative = Vec::with_capacity(points.len());
        let mut acc = 0.0;
        for (i, point) in points.iter().enumerate() {
            if i > 0 {
                acc += points[i - 1].distance(point);
            }
            cumulative.push(acc);
        }
        let total = if points.len() < 2 { 0.0 } else { acc };
        Self { cumulative, total }
    }

    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }
}

/// Reduce any progress value into `[0, 1)`.
pub fn wrap_progress(t: f64) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    let wrapped = t.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

/// The point at fractional progress `t` along the path.
///
/// `t` is wrapped into `[0, 1)` first, so `1.25` and `0.25` give the same
/// point. A single-point path returns that point for every `t`; an empty
/// path returns the origin.
pub fn point_at_progress(points: &[RoutePoint], table: &ArcLengthTable, t: f64) -> RoutePoint {
    match points {
        [] => return RoutePoint::new(0.0, 0.0),
        [only] => return *only,
        _ => {}
    }

    let cumulative = table.cumulative();
    let target = wrap_progress(t) * table.total();

    let mut i = 1;
    while i < cumulative.len() && cumulative[i] < target {
        i += 1;
    }
    // Only reachable if the table was built for a different path.
    if i >= points.len() || i >= cumulative.len() {
        return points[points.len() - 1];
    }

    let a = points[i - 1];
    let b = points[i];
    let seg = cumulative[i] - cumulative[i - 1];
    let seg = if seg > 0.0 { seg } else { 1.0 };
    let lt = (target - cumulative[i - 1]) / seg;

    RoutePoint::new(a.x + (b.x - a.x) * lt, a.y + (b.y - a.y) * lt)
}

/// Project a point onto the path, returning its progress in `[0, 1]`.
///
/// Every segment is checked: the perpendicular foot is clamped onto the
/// segment and the globally nearest foot wins. Under exact distance ties the
/// first segment in traversal order is kept.
pub fn project_point(points: &[RoutePoint], table: &ArcLengthTable, p: RoutePoint) -> f64 {
    let total = table.total();
    if points.len() < 2 || total <= 0.0 {
        return 0.0;
    }

    let mut best_t = 0.0;
    let mut best_d = f64::INFINITY;
    let mut acc = 0.0;

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let abx = b.x - a.x;
        let aby = b.y - a.y;
        let ab2 = abx * abx + aby * aby;
        let ab2 = if ab2 > 0.0 { ab2 } else { 1.0 };

        let u = ((p.x - a.x) * abx + (p.y - a.y) * aby) / ab2;
        let u = u.clamp(0.0, 1.0);
        let foot = RoutePoint::new(a.x + abx * u, a.y + aby * u);

        let d2 = p.distance_squared(&foot);
        if d2 < best_d {
            best_d = d2;
            best_t = (acc + a.distance(&foot)) / total;
        }
        acc += a.distance(&b);
    }

    best_t.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<RoutePoint> {
        vec![
            RoutePoint::new(0.0, 0.0),
            RoutePoint::new(10.0, 0.0),
            RoutePoint::new(10.0, 10.0),
            RoutePoint::new(0.0, 10.0),
            RoutePoint::new(0.0, 0.0),
        ]
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn table_is_cumulative() {
        let table = ArcLengthTable::build(&square());
        assert_eq!(table.cumulative(), &[0.0, 10.0, 20.0, 30.0, 40.0]);
        assert_eq!(table.total(), 40.0);
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn degenerate_tables() {
        let empty = ArcLengthTable::build(&[]);
        assert!(empty.is_empty());
        assert_eq!(empty.total(), 0.0);

        let single = ArcLengthTable::build(&[RoutePoint::new(4.0, 2.0)]);
        assert_eq!(single.cumulative(), &[0.0]);
        assert_eq!(single.total(), 0.0);
    }

    #[test]
    fn point_at_zero_is_first_point() {
        let points = square();
        let table = ArcLengthTable::build(&points);
        assert_eq!(point_at_progress(&points, &table, 0.0), points[0]);
    }

    #[test]
    fn point_at_quarter_marks() {
        let points = square();
        let table = ArcLengthTable::build(&points);

        assert_eq!(
            point_at_progress(&points, &table, 0.25),
            RoutePoint::new(10.0, 0.0)
        );
        assert_eq!(
            point_at_progress(&points, &table, 0.375),
            RoutePoint::new(10.0, 5.0)
        );
        assert_eq!(
            point_at_progress(&points, &table, 0.5),
            RoutePoint::new(10.0, 10.0)
        );
    }

    #[test]
    fn progress_wraps() {
        let points = square();
        let table = ArcLengthTable::build(&points);

        let a = point_at_progress(&points, &table, 0.125);
        let b = point_at_progress(&points, &table, 1.125);
        let c = point_at_progress(&points, &table, -0.875);
        assert!(approx(a.x, b.x) && approx(a.y, b.y));
        assert!(approx(a.x, c.x) && approx(a.y, c.y));
        assert_eq!(point_at_progress(&points, &table, 1.0), points[0]);
    }

    #[test]
    fn degenerate_paths_never_panic() {
        let single = vec![RoutePoint::new(7.0, 3.0)];
        let table = ArcLengthTable::build(&single);
        assert_eq!(point_at_progress(&single, &table, 0.6), single[0]);
        assert_eq!(project_point(&single, &table, RoutePoint::new(1.0, 1.0)), 0.0);

        let table = ArcLengthTable::build(&[]);
        assert_eq!(
            point_at_progress(&[], &table, 0.3),
            RoutePoint::new(0.0, 0.0)
        );

        // Two coincident points: zero total length.
        let flat = vec![RoutePoint::new(2.0, 2.0), RoutePoint::new(2.0, 2.0)];
        let table = ArcLengthTable::build(&flat);
        assert_eq!(point_at_progress(&flat, &table, 0.5), flat[0]);
        assert_eq!(project_point(&flat, &table, RoutePoint::new(9.0, 9.0)), 0.0);
    }

    #[test]
    fn duplicate_vertices_are_skipped() {
        let points = vec![
            RoutePoint::new(0.0, 0.0),
            RoutePoint::new(10.0, 0.0),
            RoutePoint::new(10.0, 0.0),
            RoutePoint::new(10.0, 10.0),
        ];
        let table = ArcLengthTable::build(&points);
        let p = point_at_progress(&points, &table, 0.75);
        assert!(approx(p.x, 10.0) && approx(p.y, 5.0));
    }

    #[test]
    fn projects_onto_nearest_segment() {
        let points = square();
        let table = ArcLengthTable::build(&points);

        // Just outside the right edge, halfway up.
        let t = project_point(&points, &table, RoutePoint::new(12.0, 5.0));
        assert!(approx(t, 0.375));

        // Beyond a corner clamps to the corner.
        let t = project_point(&points, &table, RoutePoint::new(15.0, -5.0));
        assert!(approx(t, 0.25));
    }

    #[test]
    fn symmetric_stop_takes_first_segment() {
        // The centre of the square is 5 units from all four edges.
        let points = square();
        let table = ArcLengthTable::build(&points);
        let t = project_point(&points, &table, RoutePoint::new(5.0, 5.0));
        assert!(approx(t, 0.125));
    }
}
