#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Streamer
//!
//! A streamed voxel world: an endless grid of fixed-size chunks that are
//! generated, meshed, uploaded and drawn as the camera moves, and released
//! again when it moves away.
//!
//! ## Key Modules
//!
//! * `config` - load-time settings (JSON)
//! * `core` - shared synchronisation primitives
//! * `engine_state` - camera, chunk streaming, terrain, meshing, task
//!   management and rendering
//!
//! ## Architecture
//!
//! * Terrain and meshes are built on worker threads and never touch the GPU
//! * The render thread commits finished chunks, uploads their buffers exactly
//!   once and draws them
//! * Chunks that leave the visible radius are evicted immediately and their
//!   GPU resources are freed on the render thread
//!
//! ## Usage
//!
//! ```rust
//! use cgmath::Point3;
//! use voxel_streamer::{config::EngineConfig, engine_state::EngineState};
//! use voxel_streamer::engine_state::rendering::gpu::HeadlessDevice;
//!
//! voxel_streamer::init_logging();
//! let mut config = EngineConfig::default();
//! config.streaming.visible_radius = 1;
//! config.streaming.worker_threads = 0;
//!
//! let mut engine = EngineState::new(&config, HeadlessDevice::new(), Point3::new(0.0, 40.0, 0.0));
//! let stats = engine.frame(web_time::Duration::from_millis(16)).unwrap();
//! assert_eq!(stats.drawn, 9);
//! engine.shutdown().unwrap();
//! ```

pub mod config;
pub mod core;
pub mod engine_state;

/// Installs the `env_logger` backend writing to stdout.
///
/// The filter is read from `RUST_LOG` and defaults to `info`. Calling this
/// more than once is harmless; only the first call installs the logger.
pub fn init_logging() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info);
    if std::env::var_os("RUST_LOG").is_some() {
        log_builder.parse_env("RUST_LOG");
    }
    if log_builder.try_init().is_ok() {
        log::info!("Logger initialized");
    }
}
