//! Input events forwarded by the host UI.
//!
//! Positions are screen coordinates. Timestamps come from the host's frame
//! clock (any fixed epoch) so velocity and animation stay deterministic.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Which modifier turns wheel scrolling into zooming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomModifier {
    /// Ctrl on most platforms, Cmd on macOS. Trackpad pinch also arrives as
    /// ctrl+wheel in browsers.
    #[default]
    CtrlOrMeta,
    Ctrl,
    Meta,
    Alt,
    Shift,
    /// Wheel always zooms.
    Always,
}

impl ZoomModifier {
    pub fn is_held(self, modifiers: Modifiers) -> bool {
        match self {
            ZoomModifier::CtrlOrMeta => modifiers.ctrl || modifiers.meta,
            ZoomModifier::Ctrl => modifiers.ctrl,
            ZoomModifier::Meta => modifiers.meta,
            ZoomModifier::Alt => modifiers.alt,
            ZoomModifier::Shift => modifiers.shift,
            ZoomModifier::Always => true,
        }
    }
}

/// Pointer event for mouse and pen input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
        time: Duration,
    },
    Move {
        position: Point,
        time: Duration,
    },
    Up {
        position: Point,
        button: MouseButton,
        time: Duration,
    },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Move { position, .. }
            | PointerEvent::Up { position, .. } => *position,
        }
    }

    pub fn time(&self) -> Duration {
        match self {
            PointerEvent::Down { time, .. }
            | PointerEvent::Move { time, .. }
            | PointerEvent::Up { time, .. } => *time,
        }
    }
}

/// Mouse wheel or trackpad scroll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelEvent {
    pub position: Point,
    /// Scroll delta in pixels; positive `y` scrolls down.
    pub delta: Vec2,
    #[serde(default)]
    pub modifiers: Modifiers,
    pub time: Duration,
}

/// One active touch contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    pub id: u64,
    pub position: Point,
}

/// Multi-touch event. `touches` lists the contacts that changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TouchEvent {
    Start {
        touches: Vec<TouchPoint>,
        time: Duration,
    },
    Move {
        touches: Vec<TouchPoint>,
        time: Duration,
    },
    End {
        touches: Vec<TouchPoint>,
        time: Duration,
    },
    Cancel {
        touches: Vec<TouchPoint>,
        time: Duration,
    },
}

impl TouchEvent {
    pub fn touches(&self) -> &[TouchPoint] {
        match self {
            TouchEvent::Start { touches, .. }
            | TouchEvent::Move { touches, .. }
            | TouchEvent::End { touches, .. }
            | TouchEvent::Cancel { touches, .. } => touches,
        }
    }

    pub fn time(&self) -> Duration {
        match self {
            TouchEvent::Start { time, .. }
            | TouchEvent::Move { time, .. }
            | TouchEvent::End { time, .. }
            | TouchEvent::Cancel { time, .. } => *time,
        }
    }
}
