//! Gesture engine: turns pointer, wheel and touch input into viewport
//! transform changes, with cancellable animations and inertial panning.
//!
//! The engine is the single writer of the [`Transform`]. Every mutation
//! replaces the whole value and notifies subscribers with a snapshot.
//! Starting any interaction cancels an in-flight animation or inertia, so
//! two motions never compete for the same frame.

use crate::animation::{AnimationId, Easing, Inertia, TransformAnimation};
use crate::camera::{Transform, constrain_transform, fit_transform};
use crate::config::{EngineConfig, GestureConfig, ViewportConfig};
use crate::input::{MouseButton, PointerEvent, TouchEvent, TouchPoint, WheelEvent};
use crate::observer::{SubscriptionId, Subscribers};
use kurbo::{Point, Rect, Size, Vec2};
use std::time::Duration;

/// Notification sent after every transform change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformChange {
    pub transform: Transform,
    /// Logical rectangle now visible, for culling.
    pub view_box: Rect,
}

/// Result of one frame tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameUpdate {
    /// New transform, if this frame changed it.
    pub transform: Option<Transform>,
    /// Animation that reached its target on this frame.
    pub completed: Option<AnimationId>,
    /// Whether the host should schedule another frame.
    pub needs_frame: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragSource {
    Mouse(MouseButton),
    Touch(u64),
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    source: DragSource,
    last_position: Point,
    last_time: Duration,
    /// Screen pixels per second, from the latest move. Zero once the
    /// pointer has been still for longer than the release window.
    velocity: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct PinchState {
    centroid: Point,
    distance: f64,
}

/// Owns the authoritative viewport transform and all in-flight motion.
pub struct GestureEngine {
    viewport: ViewportConfig,
    config: GestureConfig,
    transform: Transform,
    container: Option<Rect>,
    animation: Option<TransformAnimation>,
    inertia: Option<Inertia>,
    drag: Option<DragState>,
    pinch: Option<PinchState>,
    /// Active touch contacts in arrival order.
    touches: Vec<TouchPoint>,
    next_animation_id: u64,
    subscribers: Subscribers<TransformChange>,
}

impl std::fmt::Debug for GestureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureEngine")
            .field("transform", &self.transform)
            .field("container", &self.container)
            .field("animating", &self.animation.is_some())
            .field("inertia", &self.inertia.is_some())
            .field("dragging", &self.drag.is_some())
            .field("pinching", &self.pinch.is_some())
            .finish()
    }
}

impl Default for GestureEngine {
    fn default() -> Self {
        Self::new(ViewportConfig::default(), GestureConfig::default())
    }
}

impl GestureEngine {
    pub fn new(viewport: ViewportConfig, config: GestureConfig) -> Self {
        let mut engine = Self {
            transform: viewport.initial_transform,
            viewport,
            config,
            container: None,
            animation: None,
            inertia: None,
            drag: None,
            pinch: None,
            touches: Vec::new(),
            next_animation_id: 1,
            subscribers: Subscribers::new(),
        };
        engine.transform = engine.constrain(engine.transform);
        engine
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.viewport.clone(), config.gesture.clone())
    }

    // --- State ---

    /// Current transform snapshot.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn viewport_config(&self) -> &ViewportConfig {
        &self.viewport
    }

    pub fn gesture_config(&self) -> &GestureConfig {
        &self.config
    }

    /// Record the measured bounding rectangle of the interactive surface.
    pub fn set_container(&mut self, container: Rect) {
        let container = container.abs();
        if container.is_zero_area() {
            log::warn!("gesture: ignoring zero-area container {:?}", container);
            return;
        }
        self.container = Some(container);
        let constrained = self.constrain(self.transform);
        self.apply(constrained);
    }

    /// Surface rectangle, or the configured default until the host measures it.
    pub fn container(&self) -> Rect {
        self.container
            .unwrap_or_else(|| Rect::from_origin_size(Point::ZERO, self.viewport.default_container))
    }

    pub fn container_size(&self) -> Size {
        self.container().size()
    }

    pub fn screen_to_logical(&self, screen: Point) -> Point {
        self.transform.screen_to_logical(screen, self.container())
    }

    pub fn logical_to_screen(&self, logical: Point) -> Point {
        self.transform.logical_to_screen(logical, self.container())
    }

    /// Logical rectangle currently visible.
    pub fn calculate_view_box(&self) -> Rect {
        self.transform.view_box(self.container_size())
    }

    /// Clamp zoom and, if configured, keep the viewport inside its bounds.
    pub fn constrain(&self, t: Transform) -> Transform {
        constrain_transform(t, &self.viewport, self.container_size())
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn has_inertia(&self) -> bool {
        self.inertia.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_pinching(&self) -> bool {
        self.pinch.is_some()
    }

    // --- Subscriptions ---

    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&TransformChange) + 'static,
    ) -> SubscriptionId {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    // --- Direct manipulation ---

    /// Jump to a transform without animating.
    pub fn set_transform(&mut self, t: Transform) {
        self.cancel_motion();
        let constrained = self.constrain(t);
        self.apply(constrained);
    }

    /// Pan immediately by a screen-space delta.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.cancel_motion();
        let panned = self.constrain(self.transform.pan_by_delta(delta.x, delta.y));
        self.apply(panned);
    }

    /// Zoom immediately by `factor`, anchored at a screen point.
    pub fn zoom_at(&mut self, screen: Point, factor: f64) {
        self.cancel_motion();
        self.zoom_anchored(screen, self.transform.zoom * factor);
    }

    /// Stop any running animation or inertia.
    pub fn cancel_motion(&mut self) {
        if let Some(animation) = self.animation.take() {
            log::debug!("gesture: cancelled animation {:?}", animation.id());
        }
        if self.inertia.take().is_some() {
            log::debug!("gesture: cancelled inertia");
        }
    }

    // --- Animation ---

    /// Animate from the current transform to a constrained `target`.
    ///
    /// Preempts any animation or inertia already running.
    pub fn animate_to_transform(
        &mut self,
        target: Transform,
        duration: Duration,
        easing: Easing,
    ) -> AnimationId {
        self.cancel_motion();
        let id = AnimationId(self.next_animation_id);
        self.next_animation_id += 1;
        let target = self.constrain(target);
        log::debug!("gesture: animation {:?} to {:?} over {:?}", id, target, duration);
        self.animation = Some(TransformAnimation::new(
            id,
            self.transform,
            target,
            duration,
            easing,
        ));
        id
    }

    /// Animate so `bounds` fills the container minus `padding` on every side.
    ///
    /// Bounds without area are centred at the current zoom instead.
    pub fn fit_to_viewport(&mut self, bounds: Rect, padding: f64) -> AnimationId {
        let size = self.container_size();
        let target = fit_transform(bounds, size, padding).unwrap_or_else(|| {
            let center = bounds.center();
            let zoom = self.transform.zoom;
            Transform::new(
                size.width / 2.0 - center.x * zoom,
                size.height / 2.0 - center.y * zoom,
                zoom,
            )
        });
        self.animate_to_transform(target, self.default_duration(), Easing::default())
    }

    /// Animate back to the configured initial transform.
    pub fn reset(&mut self) -> AnimationId {
        let initial = self.viewport.initial_transform;
        self.animate_to_transform(initial, self.default_duration(), Easing::default())
    }

    /// Animated zoom in by one step about the container centre.
    pub fn zoom_in(&mut self) -> AnimationId {
        self.zoom_step(self.config.zoom_step)
    }

    /// Animated zoom out by one step about the container centre.
    pub fn zoom_out(&mut self) -> AnimationId {
        self.zoom_step(1.0 / self.config.zoom_step)
    }

    fn zoom_step(&mut self, factor: f64) -> AnimationId {
        let container = self.container();
        let zoom = self.clamp_zoom(self.transform.zoom * factor);
        let target = self.transform.zoom_to_point(container.center(), zoom, container);
        self.animate_to_transform(target, self.default_duration(), Easing::default())
    }

    fn default_duration(&self) -> Duration {
        Duration::from_millis(self.config.animation_duration_ms)
    }

    /// Start inertial panning with a velocity in screen pixels per second.
    ///
    /// Returns false when inertia is disabled or the velocity is too slow.
    pub fn start_inertia(&mut self, velocity: Vec2, now: Duration) -> bool {
        self.cancel_motion();
        if !self.config.inertia_enabled || velocity.hypot() <= self.config.inertia_start_velocity {
            return false;
        }
        log::debug!("gesture: inertia from {:?} px/s", velocity);
        self.inertia = Some(Inertia::new(
            velocity,
            self.config.decay_factor,
            self.config.inertia_stop_velocity,
            now,
        ));
        true
    }

    /// Per-frame callback: advance the running animation or inertia.
    pub fn tick(&mut self, now: Duration) -> FrameUpdate {
        let before = self.transform;
        let mut completed = None;

        if let Some(animation) = self.animation.as_mut() {
            let (next, finished) = animation.sample(now);
            if finished {
                completed = Some(animation.id());
                self.animation = None;
            }
            self.apply(next);
        } else if let Some(inertia) = self.inertia.as_mut() {
            match inertia.step(now) {
                Some(delta) => {
                    let panned = self.constrain(self.transform.pan_by_delta(delta.x, delta.y));
                    self.apply(panned);
                }
                None => {
                    log::debug!("gesture: inertia settled");
                    self.inertia = None;
                }
            }
        }

        FrameUpdate {
            transform: (self.transform != before).then_some(self.transform),
            completed,
            needs_frame: self.animation.is_some() || self.inertia.is_some(),
        }
    }

    // --- Pointer ---

    /// Handle a pointer event. Returns true if the engine consumed it.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Down {
                position,
                button,
                time,
            } => {
                if !self.config.pan_buttons.contains(&button) || self.pinch.is_some() {
                    return false;
                }
                self.begin_drag(DragSource::Mouse(button), position, time);
                true
            }
            PointerEvent::Move { position, time } => match self.drag {
                Some(drag) if matches!(drag.source, DragSource::Mouse(_)) => {
                    self.drag_to(position, time);
                    true
                }
                _ => false,
            },
            PointerEvent::Up {
                position,
                button,
                time,
            } => match self.drag {
                Some(drag) if drag.source == DragSource::Mouse(button) => {
                    self.drag_to(position, time);
                    self.release_drag(time, true);
                    true
                }
                _ => false,
            },
        }
    }

    fn begin_drag(&mut self, source: DragSource, position: Point, time: Duration) {
        self.cancel_motion();
        log::debug!("gesture: drag start {:?} at {:?}", source, position);
        self.drag = Some(DragState {
            source,
            last_position: position,
            last_time: time,
            velocity: Vec2::ZERO,
        });
    }

    fn drag_to(&mut self, position: Point, time: Duration) {
        let Some(mut drag) = self.drag else {
            return;
        };
        let delta = position - drag.last_position;
        let elapsed = time.saturating_sub(drag.last_time);
        if delta == Vec2::ZERO {
            if elapsed > Duration::from_millis(self.config.release_window_ms) {
                drag.velocity = Vec2::ZERO;
                drag.last_time = time;
                self.drag = Some(drag);
            }
            return;
        }
        let dt = elapsed.as_secs_f64();
        if dt > 0.0 {
            drag.velocity = delta / dt;
        }
        drag.last_position = position;
        drag.last_time = time;
        self.drag = Some(drag);

        let panned = self.constrain(self.transform.pan_by_delta(delta.x, delta.y));
        self.apply(panned);
    }

    fn release_drag(&mut self, time: Duration, allow_inertia: bool) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        log::debug!("gesture: drag end, velocity {:?}", drag.velocity);
        if allow_inertia {
            self.start_inertia(drag.velocity, time);
        }
    }

    // --- Wheel ---

    /// Zoom (modifier held) or pan (otherwise) from a wheel event.
    pub fn handle_wheel(&mut self, event: WheelEvent) {
        self.cancel_motion();
        if self.config.zoom_modifier.is_held(event.modifiers) {
            let factor = (-event.delta.y * self.config.zoom_sensitivity).exp();
            self.zoom_anchored(event.position, self.transform.zoom * factor);
        } else {
            let scale = self.config.pan_sensitivity;
            let panned = self
                .transform
                .pan_by_delta(-event.delta.x * scale, -event.delta.y * scale);
            let panned = self.constrain(panned);
            self.apply(panned);
        }
    }

    fn zoom_anchored(&mut self, screen: Point, zoom: f64) {
        let zoom = self.clamp_zoom(zoom);
        let zoomed = self.transform.zoom_to_point(screen, zoom, self.container());
        let constrained = self.constrain(zoomed);
        self.apply(constrained);
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.transform.zoom;
        }
        let (min_zoom, max_zoom) = self.viewport.zoom_range();
        zoom.clamp(min_zoom, max_zoom)
    }

    // --- Touch ---

    /// Handle a touch event. Two contacts pinch-zoom and pan together; a
    /// single contact drags.
    pub fn handle_touch(&mut self, event: TouchEvent) -> bool {
        let time = event.time();
        match event {
            TouchEvent::Start { touches, .. } => {
                self.cancel_motion();
                for touch in touches {
                    match self.touches.iter_mut().find(|t| t.id == touch.id) {
                        Some(existing) => existing.position = touch.position,
                        None => self.touches.push(touch),
                    }
                }
                self.sync_touch_gesture(time);
                true
            }
            TouchEvent::Move { touches, .. } => {
                for touch in &touches {
                    if let Some(existing) = self.touches.iter_mut().find(|t| t.id == touch.id) {
                        existing.position = touch.position;
                    }
                }
                if self.pinch.is_some() {
                    self.update_pinch();
                    true
                } else if let Some(DragState {
                    source: DragSource::Touch(id),
                    ..
                }) = self.drag
                {
                    if let Some(touch) = self.touches.iter().find(|t| t.id == id).copied() {
                        self.drag_to(touch.position, time);
                    }
                    true
                } else {
                    false
                }
            }
            TouchEvent::End { touches, .. } => {
                self.end_touches(&touches, time, true);
                true
            }
            TouchEvent::Cancel { touches, .. } => {
                self.end_touches(&touches, time, false);
                true
            }
        }
    }

    fn end_touches(&mut self, ended: &[TouchPoint], time: Duration, allow_inertia: bool) {
        self.touches.retain(|t| !ended.iter().any(|e| e.id == t.id));
        if let Some(DragState {
            source: DragSource::Touch(id),
            ..
        }) = self.drag
        {
            if ended.iter().any(|e| e.id == id) {
                self.release_drag(time, allow_inertia);
            }
        }
        self.sync_touch_gesture(time);
    }

    /// Re-derive pinch or single-touch drag from the active contacts.
    fn sync_touch_gesture(&mut self, time: Duration) {
        match self.touches.as_slice() {
            [] => {
                self.pinch = None;
            }
            [only] => {
                let only = *only;
                if self.pinch.take().is_some() {
                    log::debug!("gesture: pinch end");
                }
                let dragging_this = matches!(
                    self.drag,
                    Some(DragState { source: DragSource::Touch(id), .. }) if id == only.id
                );
                if !dragging_this {
                    self.begin_drag(DragSource::Touch(only.id), only.position, time);
                }
            }
            [a, b, ..] => {
                let (a, b) = (*a, *b);
                if self.drag.take().is_some() {
                    log::debug!("gesture: drag handed over to pinch");
                }
                self.pinch = Some(PinchState {
                    centroid: a.position.midpoint(b.position),
                    distance: (b.position - a.position).hypot(),
                });
            }
        }
    }

    fn update_pinch(&mut self) {
        let (Some(previous), [a, b, ..]) = (self.pinch, self.touches.as_slice()) else {
            return;
        };
        let centroid = a.position.midpoint(b.position);
        let distance = (b.position - a.position).hypot();
        let ratio = if previous.distance > f64::EPSILON {
            distance / previous.distance
        } else {
            1.0
        };

        // Zoom about the previous centroid, then follow the centroid: the
        // logical point under the fingers stays under the fingers.
        let container = self.container();
        let zoom = self.clamp_zoom(self.transform.zoom * ratio);
        let shift = centroid - previous.centroid;
        let next = self
            .transform
            .zoom_to_point(previous.centroid, zoom, container)
            .pan_by_delta(shift.x, shift.y);
        let constrained = self.constrain(next);
        self.apply(constrained);

        self.pinch = Some(PinchState { centroid, distance });
    }

    // --- Internals ---

    fn apply(&mut self, t: Transform) {
        if t == self.transform {
            return;
        }
        self.transform = t;
        if !self.subscribers.is_empty() {
            let change = TransformChange {
                transform: t,
                view_box: self.calculate_view_box(),
            };
            self.subscribers.notify(&change);
        }
    }
}
