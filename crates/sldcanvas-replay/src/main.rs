//! Replay entry point.

use clap::Parser;
use sldcanvas_core::EngineConfig;
use sldcanvas_replay::{ReplayResult, Replayer, load_config, load_scene, load_script, save_scene};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "sldcanvas-replay", about = "Replay scripted input against an SLD canvas")]
struct Cli {
    /// Script of steps to run.
    script: PathBuf,

    /// Engine configuration (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scene snapshot to start from.
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Write the final scene snapshot here.
    #[arg(long)]
    save: Option<PathBuf>,
}

fn run(cli: &Cli) -> ReplayResult<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    let scene = cli.scene.as_deref().map(load_scene).transpose()?;
    let script = load_script(&cli.script)?;

    let mut replayer = Replayer::new(&config, scene);
    log::info!("Replaying {} steps", script.steps.len());
    for output in replayer.run(&script) {
        println!("{}", serde_json::to_string(&output)?);
    }

    if let Some(path) = &cli.save {
        save_scene(path, &replayer.canvas().snapshot())?;
        log::info!("Saved scene to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
