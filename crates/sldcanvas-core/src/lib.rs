//! SLD Canvas Core Library
//!
//! Interaction engine for single-line-diagram editors: a grid-accelerated
//! hit-test index, a z-ordered layer manager and a pan/zoom gesture engine
//! with animation and inertia. Painting is left to the host.

pub mod animation;
pub mod camera;
pub mod canvas;
pub mod config;
pub mod geometry;
pub mod gesture;
pub mod index;
pub mod input;
pub mod layers;
pub mod observer;
pub mod shapes;

pub use animation::{AnimationId, Easing};
pub use camera::{Transform, constrain_transform, fit_transform};
pub use canvas::{Canvas, CanvasSnapshot, SceneObject};
pub use config::{ConfigError, EngineConfig, GestureConfig, IndexConfig, ViewportConfig};
pub use gesture::{FrameUpdate, GestureEngine, TransformChange};
pub use index::{HitResult, HitTestIndex, IndexStats, MAX_CELLS_PER_OBJECT};
pub use input::{
    Modifiers, MouseButton, PointerEvent, TouchEvent, TouchPoint, WheelEvent, ZoomModifier,
};
pub use layers::{
    Layer, LayerChange, LayerConfiguration, LayerError, LayerManager, LayerObject, LayerOptions,
    LayerRecord, LayerUpdate,
};
pub use observer::SubscriptionId;
pub use shapes::{DrawableObject, ObjectId, ObjectKind, Shape};
