//! Script format: an ordered list of host actions.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use sldcanvas_core::{DrawableObject, ObjectId, PointerEvent, TouchEvent, WheelEvent};

fn default_frame_ms() -> u64 {
    16
}

/// One host action. Query steps produce an output line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Measure the interactive surface.
    Container { rect: Rect },
    Pointer { event: PointerEvent },
    Wheel { event: WheelEvent },
    Touch { event: TouchEvent },
    /// One frame at `time_ms`.
    Tick { time_ms: u64 },
    /// Run frames from `from_ms` until motion stops.
    Settle {
        from_ms: u64,
        #[serde(default = "default_frame_ms")]
        frame_ms: u64,
    },
    HitTest { point: Point },
    Select {
        point: Point,
        #[serde(default)]
        additive: bool,
    },
    Marquee {
        rect: Rect,
        #[serde(default)]
        additive: bool,
    },
    ClearSelection,
    FitContent {
        #[serde(default)]
        padding: f64,
    },
    ZoomIn,
    ZoomOut,
    Reset,
    LayerVisibility { layer: String, visible: bool },
    LayerLocked { layer: String, locked: bool },
    ActiveLayer { layer: Option<String> },
    DeleteLayer { layer: String },
    /// Register an object in `layer`, or the active layer when omitted.
    AddObject {
        object: DrawableObject,
        #[serde(default)]
        layer: Option<String>,
    },
    /// Replace a registered object's geometry and flags.
    UpdateObject { object: DrawableObject },
    MoveObject { id: ObjectId, layer: String },
    RemoveObject { id: ObjectId },
    VisibleInView,
    Transform,
    Stats,
    Snapshot,
}

/// A replay script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let script = Script::from_json(
            r#"{ "steps": [
                { "op": "container", "rect": { "x0": 0, "y0": 0, "x1": 800, "y1": 600 } },
                { "op": "pointer", "event": {
                    "type": "down", "position": { "x": 1, "y": 2 }, "button": "left",
                    "time": { "secs": 0, "nanos": 0 } } },
                { "op": "settle", "from_ms": 100 },
                { "op": "select", "point": { "x": 5, "y": 5 } },
                { "op": "zoom_in" }
            ] }"#,
        )
        .unwrap();
        assert_eq!(script.steps.len(), 5);
        assert_eq!(
            script.steps[2],
            Step::Settle {
                from_ms: 100,
                frame_ms: 16
            }
        );
        assert!(matches!(script.steps[3], Step::Select { additive: false, .. }));
        assert_eq!(script.steps[4], Step::ZoomIn);
    }

    #[test]
    fn test_parse_object_steps() {
        let script = Script::from_json(
            r#"{ "steps": [
                { "op": "add_object", "object": {
                    "id": "6f1c2a4e-0d2b-4c1a-9f5e-3b7d8e9a0c11",
                    "bounds": { "x0": 0, "y0": 0, "x1": 40, "y1": 20 } } },
                { "op": "update_object", "object": {
                    "id": "6f1c2a4e-0d2b-4c1a-9f5e-3b7d8e9a0c11",
                    "kind": "label", "z_index": 3,
                    "bounds": { "x0": 10, "y0": 10, "x1": 50, "y1": 30 } } }
            ] }"#,
        )
        .unwrap();
        match &script.steps[..] {
            [
                Step::AddObject {
                    object: added,
                    layer: None,
                },
                Step::UpdateObject { object: updated },
            ] => {
                assert_eq!(added.id, updated.id);
                assert!(added.visible && added.selectable);
                assert_eq!(updated.z_index, 3);
            }
            other => panic!("unexpected steps {other:?}"),
        }
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        assert!(Script::from_json(r#"{ "steps": [ { "op": "explode" } ] }"#).is_err());
    }
}
