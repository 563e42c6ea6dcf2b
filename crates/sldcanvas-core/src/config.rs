//! Engine configuration.
//!
//! Every table defaults field by field, so a host may ship a partial JSON file
//! that only overrides what it cares about.

use crate::camera::Transform;
use crate::index::DEFAULT_CELL_SIZE;
use crate::input::{MouseButton, ZoomModifier};
use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

const DEFAULT_MIN_ZOOM: f64 = 0.1;
const DEFAULT_MAX_ZOOM: f64 = 10.0;

/// Spatial index tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Grid cell edge length in logical units.
    pub cell_size: f64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

/// Zoom limits, start position and optional panning bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Transform at construction and the target of `reset`.
    pub initial_transform: Transform,
    /// Logical region the visible viewport must stay within.
    pub bounds: Option<Rect>,
    pub constrain_to_bounds: bool,
    /// Surface size assumed until the host measures its container.
    pub default_container: Size,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            initial_transform: Transform::IDENTITY,
            bounds: None,
            constrain_to_bounds: false,
            default_container: Size::new(1280.0, 800.0),
        }
    }
}

impl ViewportConfig {
    /// Zoom limits as an ordered `(min, max)` pair.
    ///
    /// Configurations built in code skip `validate`, so a bound that is not a
    /// positive finite number falls back to its default and an inverted pair
    /// is swapped.
    pub fn zoom_range(&self) -> (f64, f64) {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        let min = if usable(self.min_zoom) {
            self.min_zoom
        } else {
            DEFAULT_MIN_ZOOM
        };
        let max = if usable(self.max_zoom) {
            self.max_zoom
        } else {
            DEFAULT_MAX_ZOOM
        };
        (min.min(max), min.max(max))
    }
}

/// Input sensitivity, inertia and animation tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Zoom change per wheel delta unit (exponential).
    pub zoom_sensitivity: f64,
    /// Screen pixels panned per wheel delta unit.
    pub pan_sensitivity: f64,
    /// Modifier that turns wheel scrolling into zooming.
    pub zoom_modifier: ZoomModifier,
    /// Buttons that start a drag-pan.
    pub pan_buttons: Vec<MouseButton>,
    pub inertia_enabled: bool,
    /// Velocity multiplier applied once per inertia frame.
    pub decay_factor: f64,
    /// Release speed (px/s) above which inertia starts.
    pub inertia_start_velocity: f64,
    /// Speed (px/s) below which inertia stops.
    pub inertia_stop_velocity: f64,
    /// A pointer held still for longer than this before release has no
    /// release velocity.
    pub release_window_ms: u64,
    /// Duration of programmatic transitions (fit, reset, zoom steps).
    pub animation_duration_ms: u64,
    /// Zoom factor used by `zoom_in` / `zoom_out`.
    pub zoom_step: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            zoom_sensitivity: 0.002,
            pan_sensitivity: 1.0,
            zoom_modifier: ZoomModifier::CtrlOrMeta,
            pan_buttons: vec![MouseButton::Left, MouseButton::Middle],
            inertia_enabled: true,
            decay_factor: 0.95,
            inertia_start_velocity: 10.0,
            inertia_stop_velocity: 0.1,
            release_window_ms: 100,
            animation_duration_ms: 300,
            zoom_step: 1.2,
        }
    }
}

/// Top-level configuration for a canvas engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub index: IndexConfig,
    pub viewport: ViewportConfig,
    pub gesture: GestureConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.index.cell_size.is_finite() && self.index.cell_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "cell_size must be positive, got {}",
                self.index.cell_size
            )));
        }
        let ViewportConfig {
            min_zoom, max_zoom, ..
        } = self.viewport;
        if !(min_zoom > 0.0 && min_zoom <= max_zoom && max_zoom.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "zoom range must satisfy 0 < min_zoom <= max_zoom, got [{}, {}]",
                min_zoom, max_zoom
            )));
        }
        let decay = self.gesture.decay_factor;
        if !(decay > 0.0 && decay < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "decay_factor must be in (0, 1), got {}",
                decay
            )));
        }
        if self.gesture.zoom_step <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "zoom_step must be greater than 1, got {}",
                self.gesture.zoom_step
            )));
        }
        Ok(())
    }
}
