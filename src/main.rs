//! # Voxel Streamer Entry Point
//!
//! Flies a scripted camera over the streamed world without a window and logs
//! what the engine does each frame.
//!
//! ## Usage
//!
//! ```bash
//! voxel-streamer [config.json] [--frames N] [--wgpu]
//! ```
//!
//! By default the headless recording device stands in for the GPU. `--wgpu`
//! uploads to a real adapter instead (draws are recorded but never
//! submitted, since there is no surface).

use std::process::ExitCode;

use cgmath::Point3;
use thiserror::Error;
use web_time::Duration;

use voxel_streamer::{
    config::{ConfigError, EngineConfig},
    engine_state::{
        frame_clock::FrameClock,
        rendering::gpu::{GpuDevice, HeadlessDevice, RenderError, WgpuDevice},
        EngineState, PlayerAction,
    },
};

const DEFAULT_FRAMES: u64 = 600;
/// Simulated time per frame, independent of how fast frames actually run.
const SIMULATION_STEP: Duration = Duration::from_millis(33);
/// Frames between turns of the scripted path.
const TURN_INTERVAL: u64 = 150;
/// Mouse delta that turns the camera by roughly a quarter circle in one step.
const QUARTER_TURN: f64 = 119.0;
const START_POSITION: [f32; 3] = [0.0, 20.0, 20.0];

#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

struct Options {
    config_path: Option<String>,
    frames: u64,
    use_wgpu: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, AppError> {
    let mut options = Options {
        config_path: None,
        frames: DEFAULT_FRAMES,
        use_wgpu: false,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--wgpu" => options.use_wgpu = true,
            "--frames" => {
                let value = args
                    .next()
                    .ok_or_else(|| AppError::Usage("--frames needs a value".into()))?;
                options.frames = value
                    .parse()
                    .map_err(|_| AppError::Usage(format!("invalid frame count `{value}`")))?;
            }
            flag if flag.starts_with("--") => {
                return Err(AppError::Usage(format!("unknown option `{flag}`")));
            }
            path if options.config_path.is_none() => options.config_path = Some(path.to_owned()),
            extra => return Err(AppError::Usage(format!("unexpected argument `{extra}`"))),
        }
    }
    Ok(options)
}

/// Input for frame `frame` of the scripted path: fly forward at sprint speed
/// and turn left every `TURN_INTERVAL` frames, tracing a square.
fn scripted_actions(frame: u64) -> PlayerAction {
    PlayerAction {
        move_forward: true,
        sprint: true,
        rotate_view: (frame > 0 && frame % TURN_INTERVAL == 0).then_some((-QUARTER_TURN, 0.0)),
        ..PlayerAction::default()
    }
}

fn fly<D: GpuDevice>(
    engine: &mut EngineState<D>,
    frames: u64,
    mut after_frame: impl FnMut(&mut EngineState<D>),
) -> Result<(), AppError> {
    let mut clock = FrameClock::new();
    for frame in 0..frames {
        engine.player_actions = scripted_actions(frame);
        clock.tick();
        let stats = engine.frame(SIMULATION_STEP)?;
        after_frame(engine);

        if let Some(update) = &stats.visibility {
            log::info!(
                "frame {}: camera at {:?}, +{} -{} chunks",
                stats.frame,
                engine.camera_state.position(),
                update.generated.len(),
                update.evicted.len()
            );
        }
        log::debug!("{stats:?}");
    }

    let released = engine.shutdown()?;
    let manager = engine.chunk_manager();
    log::info!(
        "Flew {} frames (avg {:?} per frame), {} chunks uploaded, {} released at shutdown, {} stale generations discarded",
        clock.frame_count(),
        clock.average_frame_time(),
        engine.renderer().chunks_uploaded(),
        released,
        manager.discarded_count()
    );
    Ok(())
}

fn run(options: Options) -> Result<(), AppError> {
    let config = match &options.config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    if options.use_wgpu {
        let device = WgpuDevice::new_headless()?;
        let mut engine = EngineState::new(&config, device, Point3::from(START_POSITION));
        fly(&mut engine, options.frames, |engine| {
            let device = engine.renderer_mut().device_mut();
            log::trace!("{} draws queued", device.queued_draws());
            device.clear_draws();
        })?;
        let device = engine.renderer().device();
        log::info!(
            "GPU memory: {} bytes allocated, {} bytes in use",
            device.get_total_allocated_memory(),
            device.get_total_used_memory()
        );
    } else {
        let mut engine = EngineState::new(&config, HeadlessDevice::new(), Point3::from(START_POSITION));
        fly(&mut engine, options.frames, |engine| {
            engine.renderer_mut().device_mut().take_draws();
        })?;
        let stats = engine.renderer().device().stats();
        log::info!(
            "Device: {} buffers created, {} destroyed, {} draw calls, peak {} bytes",
            stats.buffers_created,
            stats.buffers_destroyed,
            stats.draw_calls,
            stats.peak_allocated_bytes
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    voxel_streamer::init_logging();
    let result = parse_args(std::env::args().skip(1)).and_then(run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            if matches!(err, AppError::Usage(_)) {
                log::error!("usage: voxel-streamer [config.json] [--frames N] [--wgpu]");
            }
            ExitCode::FAILURE
        }
    }
}
