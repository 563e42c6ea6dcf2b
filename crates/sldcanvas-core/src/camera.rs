//! Viewport transform: pan/zoom state and coordinate conversion.
//!
//! Screen coordinates are absolute (the same space pointer events arrive
//! in); the container rectangle locates the interactive surface within it.
//! A logical point `p` appears on screen at
//! `container.origin + p * zoom + (x, y)`.

use crate::config::ViewportConfig;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Pan offset (screen pixels) and zoom scale.
///
/// A plain value: readers always hold a complete snapshot and the engine
/// replaces it wholesale on every update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        x: 0.0,
        y: 0.0,
        zoom: 1.0,
    };

    pub fn new(x: f64, y: f64, zoom: f64) -> Self {
        Self { x, y, zoom }
    }

    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Convert a screen point to logical coordinates.
    pub fn screen_to_logical(&self, screen: Point, container: Rect) -> Point {
        let zoom = self.safe_zoom();
        Point::new(
            (screen.x - container.x0 - self.x) / zoom,
            (screen.y - container.y0 - self.y) / zoom,
        )
    }

    /// Convert a logical point to screen coordinates.
    pub fn logical_to_screen(&self, logical: Point, container: Rect) -> Point {
        let zoom = self.safe_zoom();
        Point::new(
            logical.x * zoom + self.x + container.x0,
            logical.y * zoom + self.y + container.y0,
        )
    }

    /// Logical rectangle currently visible through a container of `size`.
    pub fn view_box(&self, size: Size) -> Rect {
        let zoom = self.safe_zoom();
        let origin = Point::new(-self.x / zoom, -self.y / zoom);
        Rect::from_origin_size(origin, (size.width / zoom, size.height / zoom))
    }

    /// Offset by a screen-space delta; panning speed is independent of zoom.
    pub fn pan_by_delta(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            zoom: self.zoom,
        }
    }

    /// Change zoom while keeping the logical point under `screen` fixed.
    ///
    /// Non-positive or non-finite zooms leave the transform unchanged.
    pub fn zoom_to_point(&self, screen: Point, new_zoom: f64, container: Rect) -> Self {
        if !(new_zoom > 0.0 && new_zoom.is_finite()) {
            return *self;
        }
        let anchor = self.screen_to_logical(screen, container);
        Self {
            x: screen.x - container.x0 - anchor.x * new_zoom,
            y: screen.y - container.y0 - anchor.y * new_zoom,
            zoom: new_zoom,
        }
    }

    /// Component-wise linear interpolation.
    pub fn lerp(&self, to: &Transform, t: f64) -> Self {
        Self {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
            zoom: self.zoom + (to.zoom - self.zoom) * t,
        }
    }

    fn safe_zoom(&self) -> f64 {
        if self.zoom > 0.0 && self.zoom.is_finite() {
            self.zoom
        } else {
            1.0
        }
    }
}

/// Clamp zoom into the configured range and, when enabled, nudge the offset
/// so the visible viewport stays inside the configured logical bounds.
///
/// Never rejects: any input, including NaN or negative zoom and an
/// unvalidated zoom range, maps to a valid transform.
pub fn constrain_transform(t: Transform, config: &ViewportConfig, container: Size) -> Transform {
    let (min_zoom, max_zoom) = config.zoom_range();
    let zoom = if t.zoom.is_nan() {
        min_zoom
    } else {
        t.zoom.clamp(min_zoom, max_zoom)
    };
    let mut out = Transform::new(finite_or_zero(t.x), finite_or_zero(t.y), zoom);

    if let (true, Some(bounds)) = (config.constrain_to_bounds, config.bounds) {
        let bounds = bounds.abs();
        let view = out.view_box(container);
        out.x = -constrain_axis(view.x0, view.width(), bounds.x0, bounds.x1) * zoom;
        out.y = -constrain_axis(view.y0, view.height(), bounds.y0, bounds.y1) * zoom;
    }
    out
}

/// New viewport start along one axis: centred when the view is wider than
/// the bounds, otherwise clamped inside them.
fn constrain_axis(start: f64, extent: f64, min: f64, max: f64) -> f64 {
    if extent >= max - min {
        (min + max - extent) / 2.0
    } else {
        start.clamp(min, max - extent)
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

/// Transform that shows `bounds` centred in a container of `size`, leaving
/// `padding` screen pixels on every side.
///
/// Zero-area bounds fit nothing and yield `None`.
pub fn fit_transform(bounds: Rect, size: Size, padding: f64) -> Option<Transform> {
    let bounds = bounds.abs();
    if bounds.is_zero_area() {
        return None;
    }
    let available = Size::new(
        (size.width - padding * 2.0).max(1.0),
        (size.height - padding * 2.0).max(1.0),
    );
    let zoom = (available.width / bounds.width()).min(available.height / bounds.height());
    let center = bounds.center();
    Some(Transform::new(
        size.width / 2.0 - center.x * zoom,
        size.height / 2.0 - center.y * zoom,
        zoom,
    ))
}
