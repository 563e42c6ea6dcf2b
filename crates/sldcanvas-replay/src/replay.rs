//! Drive a canvas through a script and collect query results.

use crate::error::{ReplayError, ReplayResult};
use crate::script::{Script, Step};
use kurbo::Rect;
use serde::Serialize;
use sldcanvas_core::{Canvas, CanvasSnapshot, EngineConfig, ObjectId, Transform};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Frames `settle` runs before giving up on motion that never stops.
const MAX_SETTLE_FRAMES: usize = 10_000;

/// One entry of a hit-test result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitSummary {
    pub id: ObjectId,
    pub z_index: i32,
    pub distance: f64,
}

/// Output line for a query step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepOutput {
    Hits { hits: Vec<HitSummary> },
    Selection { ids: Vec<ObjectId> },
    Transform { transform: Transform, view_box: Rect },
    Settled { frames: usize, transform: Transform },
    Deleted { ids: Vec<ObjectId> },
    Visible { ids: Vec<ObjectId> },
    Rejected { op: String },
    Stats {
        object_count: usize,
        cell_count: usize,
        average_objects_per_cell: f64,
        oversized_count: usize,
    },
    Snapshot { snapshot: CanvasSnapshot },
}

/// Host harness around one [`Canvas`].
#[derive(Debug, Default)]
pub struct Replayer {
    canvas: Canvas,
}

impl Replayer {
    pub fn new(config: &EngineConfig, scene: Option<CanvasSnapshot>) -> Self {
        let mut canvas = Canvas::with_config(config);
        if let Some(scene) = scene {
            let orphans = canvas.restore(scene);
            if !orphans.is_empty() {
                log::warn!("{} scene objects reference missing layers", orphans.len());
            }
        }
        Self { canvas }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Run every step, returning the outputs of query steps in order.
    pub fn run(&mut self, script: &Script) -> Vec<StepOutput> {
        script
            .steps
            .iter()
            .filter_map(|step| self.run_step(step))
            .collect()
    }

    pub fn run_step(&mut self, step: &Step) -> Option<StepOutput> {
        log::debug!("step: {:?}", step);
        let canvas = &mut self.canvas;
        match step {
            Step::Container { rect } => {
                canvas.gesture_mut().set_container(*rect);
                None
            }
            Step::Pointer { event } => {
                canvas.gesture_mut().handle_pointer(*event);
                None
            }
            Step::Wheel { event } => {
                canvas.gesture_mut().handle_wheel(*event);
                None
            }
            Step::Touch { event } => {
                canvas.gesture_mut().handle_touch(event.clone());
                None
            }
            Step::Tick { time_ms } => {
                canvas.gesture_mut().tick(Duration::from_millis(*time_ms));
                None
            }
            Step::Settle { from_ms, frame_ms } => {
                let frame = Duration::from_millis((*frame_ms).max(1));
                let mut now = Duration::from_millis(*from_ms);
                let mut frames = 0;
                while frames < MAX_SETTLE_FRAMES {
                    frames += 1;
                    if !canvas.gesture_mut().tick(now).needs_frame {
                        break;
                    }
                    now += frame;
                }
                Some(StepOutput::Settled {
                    frames,
                    transform: canvas.gesture().transform(),
                })
            }
            Step::HitTest { point } => Some(StepOutput::Hits {
                hits: canvas
                    .objects_at(*point)
                    .iter()
                    .map(|hit| HitSummary {
                        id: hit.object.id,
                        z_index: hit.object.z_index,
                        distance: hit.distance,
                    })
                    .collect(),
            }),
            Step::Select { point, additive } => {
                canvas.select_at(*point, *additive);
                Some(selection(canvas))
            }
            Step::Marquee { rect, additive } => {
                canvas.marquee_select(*rect, *additive);
                Some(selection(canvas))
            }
            Step::ClearSelection => {
                canvas.clear_selection();
                Some(selection(canvas))
            }
            Step::FitContent { padding } => {
                canvas.fit_to_content(*padding);
                None
            }
            Step::ZoomIn => {
                canvas.gesture_mut().zoom_in();
                None
            }
            Step::ZoomOut => {
                canvas.gesture_mut().zoom_out();
                None
            }
            Step::Reset => {
                canvas.gesture_mut().reset();
                None
            }
            Step::LayerVisibility { layer, visible } => rejected_unless(
                canvas.set_layer_visibility(layer, *visible),
                "layer_visibility",
            ),
            Step::LayerLocked { layer, locked } => {
                rejected_unless(canvas.set_layer_locked(layer, *locked), "layer_locked")
            }
            Step::ActiveLayer { layer } => {
                rejected_unless(canvas.set_active_layer(layer.as_deref()), "active_layer")
            }
            Step::DeleteLayer { layer } => match canvas.delete_layer(layer) {
                Some(ids) => Some(StepOutput::Deleted { ids }),
                None => rejected_unless(false, "delete_layer"),
            },
            Step::AddObject { object, layer } => rejected_unless(
                canvas.add_object(object.clone(), layer.as_deref()),
                "add_object",
            ),
            Step::UpdateObject { object } => {
                rejected_unless(canvas.update_object(object.clone()), "update_object")
            }
            Step::MoveObject { id, layer } => {
                rejected_unless(canvas.move_object_to_layer(*id, layer), "move_object")
            }
            Step::RemoveObject { id } => {
                rejected_unless(canvas.remove_object(*id).is_some(), "remove_object")
            }
            Step::VisibleInView => Some(StepOutput::Visible {
                ids: canvas.visible_objects_in_view(),
            }),
            Step::Transform => Some(StepOutput::Transform {
                transform: canvas.gesture().transform(),
                view_box: canvas.gesture().calculate_view_box(),
            }),
            Step::Stats => {
                let stats = canvas.index().get_stats();
                Some(StepOutput::Stats {
                    object_count: stats.object_count,
                    cell_count: stats.cell_count,
                    average_objects_per_cell: stats.average_objects_per_cell,
                    oversized_count: stats.oversized_count,
                })
            }
            Step::Snapshot => Some(StepOutput::Snapshot {
                snapshot: canvas.snapshot(),
            }),
        }
    }
}

fn selection(canvas: &Canvas) -> StepOutput {
    StepOutput::Selection {
        ids: canvas.selection().to_vec(),
    }
}

/// Mutations are silent on success and report only when refused.
fn rejected_unless(ok: bool, op: &str) -> Option<StepOutput> {
    (!ok).then(|| StepOutput::Rejected { op: op.to_string() })
}

fn read(path: &Path) -> ReplayResult<String> {
    if !path.exists() {
        return Err(ReplayError::NotFound(path.display().to_string()));
    }
    fs::read_to_string(path)
        .map_err(|e| ReplayError::Io(format!("Failed to read {}: {}", path.display(), e)))
}

fn parse_error(path: &Path) -> impl FnOnce(serde_json::Error) -> ReplayError + '_ {
    move |source| ReplayError::Parse {
        path: path.display().to_string(),
        source,
    }
}

/// Load and validate an engine configuration file.
pub fn load_config(path: &Path) -> ReplayResult<EngineConfig> {
    Ok(EngineConfig::from_json(&read(path)?)?)
}

pub fn load_scene(path: &Path) -> ReplayResult<CanvasSnapshot> {
    CanvasSnapshot::from_json(&read(path)?).map_err(parse_error(path))
}

pub fn load_script(path: &Path) -> ReplayResult<Script> {
    Script::from_json(&read(path)?).map_err(parse_error(path))
}

/// Write a snapshot as pretty JSON.
pub fn save_scene(path: &Path, snapshot: &CanvasSnapshot) -> ReplayResult<()> {
    let json = snapshot.to_json()?;
    fs::write(path, json)
        .map_err(|e| ReplayError::Io(format!("Failed to write {}: {}", path.display(), e)))
}
