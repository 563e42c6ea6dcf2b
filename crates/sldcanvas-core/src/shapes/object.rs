//! Drawable object registry entries.

use super::Shape;
use crate::geometry::points_bounds;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for drawable objects.
pub type ObjectId = Uuid;

/// Default hit tolerance for open paths when the object carries none.
pub const DEFAULT_PATH_TOLERANCE: f64 = 5.0;

/// What a drawable object represents on the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    #[default]
    Component,
    Connection,
    Label,
    Handle,
}

fn default_true() -> bool {
    true
}

/// A selectable entry in the hit-test index.
///
/// Objects are flat: none owns another. The payload in `metadata` belongs to
/// the host (wire sizing annotations and the like) and is never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawableObject {
    pub id: ObjectId,
    #[serde(default)]
    pub kind: ObjectKind,
    /// Axis-aligned bounding box in logical coordinates.
    pub bounds: Rect,
    #[serde(default)]
    pub shape: Shape,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default = "default_true")]
    pub selectable: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Hit tolerance in logical units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl DrawableObject {
    /// Create an object with an explicit shape and bounding box.
    pub fn new(id: ObjectId, kind: ObjectKind, bounds: Rect, shape: Shape) -> Self {
        Self {
            id,
            kind,
            bounds: bounds.abs(),
            shape,
            z_index: 0,
            selectable: true,
            locked: false,
            visible: true,
            hit_tolerance: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// A rectangular component at `origin` with the given size.
    pub fn rectangle(origin: Point, width: f64, height: f64) -> Self {
        Self::new(
            Uuid::new_v4(),
            ObjectKind::Component,
            Rect::from_origin_size(origin, (width, height)),
            Shape::Rectangle,
        )
    }

    /// A circular component.
    pub fn circle(center: Point, radius: f64) -> Self {
        let radius = radius.abs();
        Self::new(
            Uuid::new_v4(),
            ObjectKind::Component,
            Rect::new(
                center.x - radius,
                center.y - radius,
                center.x + radius,
                center.y + radius,
            ),
            Shape::Circle { center, radius },
        )
    }

    /// A closed polygon; the bounding box is derived from the vertices.
    pub fn polygon(points: Vec<Point>) -> Self {
        let bounds = points_bounds(&points).unwrap_or(Rect::ZERO);
        Self::new(
            Uuid::new_v4(),
            ObjectKind::Component,
            bounds,
            Shape::Polygon { points },
        )
    }

    /// An open polyline, registered as a connection.
    pub fn path(points: Vec<Point>) -> Self {
        let bounds = points_bounds(&points).unwrap_or(Rect::ZERO);
        Self::new(
            Uuid::new_v4(),
            ObjectKind::Connection,
            bounds,
            Shape::Path { points },
        )
    }

    pub fn with_id(mut self, id: ObjectId) -> Self {
        self.id = id;
        self
    }

    pub fn with_kind(mut self, kind: ObjectKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.hit_tolerance = Some(tolerance.max(0.0));
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn set_selectable(&mut self, selectable: bool) {
        self.selectable = selectable;
    }

    /// Tolerance used by hit-testing: the explicit value, or the per-shape default.
    pub fn effective_tolerance(&self) -> f64 {
        match (self.hit_tolerance, &self.shape) {
            (Some(tolerance), _) => tolerance,
            (None, Shape::Path { .. }) => DEFAULT_PATH_TOLERANCE,
            (None, _) => 0.0,
        }
    }

    /// Whether interactive queries may return this object.
    pub fn is_interactive(&self) -> bool {
        self.visible && self.selectable && !self.locked
    }
}
