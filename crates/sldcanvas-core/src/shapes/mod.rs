//! Shape geometry for drawable objects.

mod object;

pub use object::{DEFAULT_PATH_TOLERANCE, DrawableObject, ObjectId, ObjectKind};

use crate::geometry::{
    circle_intersects_rect, closed_edges, point_in_polygon, polygon_boundary_distance,
    polyline_distance, rect_contains_inclusive, rect_distance, rects_overlap_inclusive,
    segment_intersects_rect,
};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Outline of a drawable object.
///
/// `Rectangle` has no payload: its geometry is the object's bounding box.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Shape {
    #[default]
    Rectangle,
    Circle { center: Point, radius: f64 },
    /// Closed polygon; the last point connects back to the first.
    Polygon { points: Vec<Point> },
    /// Open polyline (wires, leader lines).
    Path { points: Vec<Point> },
}

/// Outcome of a shape-level point test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeHit {
    /// Whether the shape test itself succeeded.
    pub inside: bool,
    /// Distance to the outline, 0 when inside.
    pub distance: f64,
}

impl ShapeHit {
    /// A candidate is a hit if the shape test passed or it lies within tolerance.
    pub fn is_hit(&self, tolerance: f64) -> bool {
        self.inside || self.distance <= tolerance
    }
}

impl Shape {
    /// Short name used in logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Rectangle => "rectangle",
            Shape::Circle { .. } => "circle",
            Shape::Polygon { .. } => "polygon",
            Shape::Path { .. } => "path",
        }
    }

    /// Run the shape-specific point test.
    ///
    /// `bounds` is the owning object's bounding box, which is the geometry of
    /// a `Rectangle`.
    pub fn hit_test(&self, bounds: Rect, point: Point, tolerance: f64) -> ShapeHit {
        match self {
            Shape::Rectangle => ShapeHit {
                inside: rect_contains_inclusive(bounds.inflate(tolerance, tolerance), point),
                distance: rect_distance(bounds, point),
            },
            Shape::Circle { center, radius } => {
                let to_center = (point - *center).hypot();
                ShapeHit {
                    inside: to_center <= radius + tolerance,
                    distance: (to_center - radius).max(0.0),
                }
            }
            Shape::Polygon { points } => {
                let inside = point_in_polygon(point, points);
                let distance = if inside {
                    0.0
                } else {
                    polygon_boundary_distance(point, points)
                };
                ShapeHit { inside, distance }
            }
            Shape::Path { points } => {
                let distance = polyline_distance(point, points);
                ShapeHit {
                    inside: distance <= tolerance,
                    distance,
                }
            }
        }
    }

    /// Shape-aware intersection with a selection rectangle.
    pub fn intersects_rect(&self, bounds: Rect, rect: Rect) -> bool {
        match self {
            Shape::Rectangle => rects_overlap_inclusive(bounds, rect),
            Shape::Circle { center, radius } => circle_intersects_rect(*center, *radius, rect),
            Shape::Polygon { points } => {
                points.iter().any(|p| rect_contains_inclusive(rect, *p))
                    || closed_edges(points).any(|(a, b)| segment_intersects_rect(a, b, rect))
            }
            Shape::Path { points } => match points.as_slice() {
                [only] => rect_contains_inclusive(rect, *only),
                _ => points
                    .windows(2)
                    .any(|w| segment_intersects_rect(w[0], w[1], rect)),
            },
        }
    }

    /// Points that make up the outline, if the shape carries any.
    pub fn points(&self) -> &[Point] {
        match self {
            Shape::Polygon { points } | Shape::Path { points } => points,
            Shape::Rectangle | Shape::Circle { .. } => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Shape {
        Shape::Polygon {
            points: vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
        }
    }

    #[test]
    fn test_rectangle_tolerance_band() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        let shape = Shape::Rectangle;

        let at_edge = shape.hit_test(bounds, Point::new(105.0, 25.0), 5.0);
        assert!(at_edge.is_hit(5.0));
        assert!((at_edge.distance - 5.0).abs() < f64::EPSILON);

        let beyond = shape.hit_test(bounds, Point::new(106.0, 25.0), 5.0);
        assert!(!beyond.is_hit(5.0));
    }

    #[test]
    fn test_rectangle_corner_distance() {
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        let hit = Shape::Rectangle.hit_test(bounds, Point::new(13.0, 14.0), 0.0);
        assert!(!hit.inside);
        assert!((hit.distance - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_circle_hit_and_distance() {
        let shape = Shape::Circle {
            center: Point::new(50.0, 50.0),
            radius: 10.0,
        };
        let bounds = Rect::new(40.0, 40.0, 60.0, 60.0);

        let inside = shape.hit_test(bounds, Point::new(55.0, 50.0), 0.0);
        assert!(inside.inside);
        assert!(inside.distance.abs() < f64::EPSILON);

        let near = shape.hit_test(bounds, Point::new(63.0, 50.0), 3.0);
        assert!(near.is_hit(3.0));
        assert!((near.distance - 3.0).abs() < 1e-9);

        let far = shape.hit_test(bounds, Point::new(70.0, 50.0), 3.0);
        assert!(!far.is_hit(3.0));
    }

    #[test]
    fn test_polygon_inside_outside() {
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        let inside = square().hit_test(bounds, Point::new(5.0, 5.0), 0.0);
        assert!(inside.inside);
        let outside = square().hit_test(bounds, Point::new(15.0, 5.0), 0.0);
        assert!(!outside.is_hit(0.0));
        assert!((outside.distance - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_polygon_never_hits() {
        let shape = Shape::Polygon { points: Vec::new() };
        let hit = shape.hit_test(Rect::ZERO, Point::ZERO, 10.0);
        assert!(!hit.is_hit(10.0));
        assert!(hit.distance.is_infinite());
    }

    #[test]
    fn test_path_within_tolerance() {
        let shape = Shape::Path {
            points: vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
        };
        let bounds = Rect::new(0.0, 0.0, 100.0, 0.0);
        assert!(shape.hit_test(bounds, Point::new(50.0, 4.0), 5.0).is_hit(5.0));
        assert!(!shape.hit_test(bounds, Point::new(50.0, 6.0), 5.0).is_hit(5.0));
    }

    #[test]
    fn test_circle_rect_intersection() {
        let shape = Shape::Circle {
            center: Point::new(25.0, 5.0),
            radius: 6.0,
        };
        let bounds = Rect::new(19.0, -1.0, 31.0, 11.0);
        assert!(shape.intersects_rect(bounds, Rect::new(0.0, 0.0, 20.0, 20.0)));
        assert!(!shape.intersects_rect(bounds, Rect::new(0.0, 0.0, 18.0, 20.0)));
    }

    #[test]
    fn test_polygon_rect_intersection_by_edge_crossing() {
        // Thin diamond whose vertices all lie outside the selection.
        let shape = Shape::Polygon {
            points: vec![
                Point::new(-10.0, 5.0),
                Point::new(5.0, 4.0),
                Point::new(20.0, 5.0),
                Point::new(5.0, 6.0),
            ],
        };
        let bounds = Rect::new(-10.0, 4.0, 20.0, 6.0);
        assert!(shape.intersects_rect(bounds, Rect::new(0.0, 0.0, 3.0, 10.0)));
        assert!(!shape.intersects_rect(bounds, Rect::new(0.0, 20.0, 3.0, 30.0)));
    }

    #[test]
    fn test_path_rect_intersection() {
        let shape = Shape::Path {
            points: vec![
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(100.0, 100.0),
            ],
        };
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(shape.intersects_rect(bounds, Rect::new(90.0, 40.0, 110.0, 60.0)));
        assert!(!shape.intersects_rect(bounds, Rect::new(20.0, 20.0, 80.0, 80.0)));
    }

    #[test]
    fn test_shape_serializes_with_tag() {
        let json = serde_json::to_value(Shape::Circle {
            center: Point::new(1.0, 2.0),
            radius: 3.0,
        })
        .unwrap();
        assert_eq!(json["shape"], "circle");
        let back: Shape = serde_json::from_value(json).unwrap();
        let Shape::Circle { radius, .. } = back else {
            panic!("expected a circle, got {back:?}");
        };
        assert!((radius - 3.0).abs() < f64::EPSILON);
    }
}
