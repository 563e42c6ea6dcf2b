//! SLD Canvas replay harness
//!
//! Loads a scene, feeds scripted input and frame ticks through the canvas
//! engine, and reports the results of query steps as JSON.

mod error;
mod replay;
mod script;

pub use error::{ReplayError, ReplayResult};
pub use replay::{
    HitSummary, Replayer, StepOutput, load_config, load_scene, load_script, save_scene,
};
pub use script::{Script, Step};
