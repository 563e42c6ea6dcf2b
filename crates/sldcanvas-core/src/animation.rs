//! Frame-driven transform animation and inertial panning.
//!
//! Nothing here owns a timer. The host calls into the gesture engine once per
//! display frame with the frame timestamp and these types advance from it.

use crate::camera::Transform;
use kurbo::Vec2;
use std::fmt;
use std::time::Duration;

/// Easing curve applied to animation progress.
#[derive(Clone, Copy, Default)]
pub enum Easing {
    Linear,
    #[default]
    EaseOutCubic,
    EaseInCubic,
    EaseInOutCubic,
    /// Caller-supplied curve mapping `[0, 1]` onto `[0, 1]`.
    Custom(fn(f64) -> f64),
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => f.write_str("Linear"),
            Easing::EaseOutCubic => f.write_str("EaseOutCubic"),
            Easing::EaseInCubic => f.write_str("EaseInCubic"),
            Easing::EaseInOutCubic => f.write_str("EaseInOutCubic"),
            Easing::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseOutCubic => ease_out_cubic(t),
            Easing::EaseInCubic => t * t * t,
            Easing::EaseInOutCubic => ease_in_out_cubic(t),
            Easing::Custom(curve) => curve(t),
        }
    }
}

#[inline]
pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

#[inline]
pub fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Identifies one `animate_to_transform` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(pub(crate) u64);

/// Interpolation from one transform to another over a fixed duration.
///
/// The start time binds to the first frame the animation is sampled on.
#[derive(Debug, Clone)]
pub struct TransformAnimation {
    id: AnimationId,
    from: Transform,
    to: Transform,
    duration: Duration,
    easing: Easing,
    started_at: Option<Duration>,
}

impl TransformAnimation {
    pub fn new(
        id: AnimationId,
        from: Transform,
        to: Transform,
        duration: Duration,
        easing: Easing,
    ) -> Self {
        Self {
            id,
            from,
            to,
            duration,
            easing,
            started_at: None,
        }
    }

    pub fn id(&self) -> AnimationId {
        self.id
    }

    pub fn target(&self) -> Transform {
        self.to
    }

    /// Progress in `[0, 1]` at frame time `now`.
    pub fn progress(&mut self, now: Duration) -> f64 {
        let start = *self.started_at.get_or_insert(now);
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(start);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Transform for frame time `now`, and whether the animation has finished.
    pub fn sample(&mut self, now: Duration) -> (Transform, bool) {
        let progress = self.progress(now);
        if progress >= 1.0 {
            return (self.to, true);
        }
        (self.from.lerp(&self.to, self.easing.apply(progress)), false)
    }
}

/// Exponentially decaying pan velocity after a drag is released.
#[derive(Debug, Clone)]
pub struct Inertia {
    /// Screen pixels per second.
    velocity: Vec2,
    decay: f64,
    stop_below: f64,
    last_frame: Duration,
}

impl Inertia {
    pub fn new(velocity: Vec2, decay: f64, stop_below: f64, now: Duration) -> Self {
        Self {
            velocity,
            decay,
            stop_below,
            last_frame: now,
        }
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Advance one frame. Returns the pan delta for this frame, or `None` once
    /// the velocity has decayed below the stop threshold.
    pub fn step(&mut self, now: Duration) -> Option<Vec2> {
        if self.velocity.hypot() < self.stop_below {
            return None;
        }
        let dt = now.saturating_sub(self.last_frame).as_secs_f64();
        self.last_frame = now;
        let delta = self.velocity * dt;
        self.velocity = self.velocity * self.decay;
        Some(delta)
    }
}
