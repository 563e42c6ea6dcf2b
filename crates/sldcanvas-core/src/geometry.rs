//! Planar geometry helpers shared by hit-testing and marquee selection.
//!
//! Every function here is total: degenerate input (zero-length segments,
//! empty point lists, inverted rectangles) yields a defined value instead of
//! NaN.

use kurbo::{Point, Rect, Vec2};

/// Distance from a point to a line segment (a→b).
///
/// A zero-length segment is treated as the point `a`.
pub fn point_to_segment_distance(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    (point - proj).hypot()
}

/// Minimum distance from a point to an open polyline.
///
/// A single point counts as a zero-length segment; an empty list is
/// infinitely far away.
pub fn polyline_distance(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => (point - *only).hypot(),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_distance(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Minimum distance from a point to the closed boundary of a polygon.
pub fn polygon_boundary_distance(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => (point - *only).hypot(),
        _ => closed_edges(points)
            .map(|(a, b)| point_to_segment_distance(point, a, b))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Even-odd (crossing number) containment test.
pub fn point_in_polygon(point: Point, points: &[Point]) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (pi, pj) = (points[i], points[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Iterate the edges of a closed polygon, including the closing edge.
pub fn closed_edges(points: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    let closing = match points {
        [first, .., last] if points.len() > 2 => Some((*last, *first)),
        _ => None,
    };
    points.windows(2).map(|w| (w[0], w[1])).chain(closing)
}

/// Test whether segments p1→p2 and q1→q2 intersect (endpoints included).
///
/// Parallel segments only intersect when they are collinear and their
/// projections overlap.
pub fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let r = p2 - p1;
    let s = q2 - q1;
    let qp = q1 - p1;
    let denom = r.cross(s);

    if denom.abs() < f64::EPSILON {
        if qp.cross(r).abs() > f64::EPSILON {
            return false;
        }
        return collinear_overlap(p1, r, q1, q2);
    }

    let t = qp.cross(s) / denom;
    let u = qp.cross(r) / denom;
    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

fn collinear_overlap(p1: Point, r: Vec2, q1: Point, q2: Point) -> bool {
    let len_sq = r.hypot2();
    if len_sq < f64::EPSILON {
        // p is a point lying on q's line.
        return point_to_segment_distance(p1, q1, q2) < f64::EPSILON;
    }
    let t0 = (q1 - p1).dot(r) / len_sq;
    let t1 = (q2 - p1).dot(r) / len_sq;
    let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
    hi >= 0.0 && lo <= 1.0
}

/// Inclusive point-in-rectangle test (edges count as inside).
pub fn rect_contains_inclusive(rect: Rect, point: Point) -> bool {
    let rect = rect.abs();
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// Euclidean distance from a point to a rectangle, 0 when inside or on it.
pub fn rect_distance(rect: Rect, point: Point) -> f64 {
    let rect = rect.abs();
    let dx = (rect.x0 - point.x).max(0.0).max(point.x - rect.x1);
    let dy = (rect.y0 - point.y).max(0.0).max(point.y - rect.y1);
    Vec2::new(dx, dy).hypot()
}

/// Inclusive rectangle overlap; touching edges count.
pub fn rects_overlap_inclusive(a: Rect, b: Rect) -> bool {
    let (a, b) = (a.abs(), b.abs());
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}

/// The four edges of a rectangle, clockwise from the top-left corner.
pub fn rect_edges(rect: Rect) -> [(Point, Point); 4] {
    let rect = rect.abs();
    let tl = Point::new(rect.x0, rect.y0);
    let tr = Point::new(rect.x1, rect.y0);
    let br = Point::new(rect.x1, rect.y1);
    let bl = Point::new(rect.x0, rect.y1);
    [(tl, tr), (tr, br), (br, bl), (bl, tl)]
}

/// Whether a segment touches a rectangle: an endpoint inside, or a crossing
/// with any of its edges.
pub fn segment_intersects_rect(a: Point, b: Point, rect: Rect) -> bool {
    if rect_contains_inclusive(rect, a) || rect_contains_inclusive(rect, b) {
        return true;
    }
    rect_edges(rect)
        .iter()
        .any(|&(e1, e2)| segments_intersect(a, b, e1, e2))
}

/// Circle/rectangle intersection via the closest point of the rectangle.
pub fn circle_intersects_rect(center: Point, radius: f64, rect: Rect) -> bool {
    rect_distance(rect, center) <= radius
}

/// Smallest rectangle containing every point, or `None` for an empty list.
pub fn points_bounds(points: &[Point]) -> Option<Rect> {
    let (first, rest) = points.split_first()?;
    Some(
        rest.iter()
            .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p)),
    )
}
