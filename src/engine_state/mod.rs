//! # Engine State Module
//!
//! Ties the subsystems together into one per-frame update.
//!
//! ## Key Components
//!
//! * `EngineState` - owns the camera, the chunk manager and the renderer
//! * `camera_state` - camera positioning and movement
//! * `rendering` - meshing, the GPU device layer and the chunk renderer
//! * `task_management` - worker threads for background generation
//! * `voxels` - blocks, chunks, terrain and chunk streaming
//!
//! ## Frame order
//!
//! 1. Apply player input to the camera
//! 2. Recompute the visible chunk set if the camera changed chunk
//! 3. Hand queued generation work to the workers, collect finished results
//! 4. Commit generated chunks into the active collection
//! 5. Release GPU resources of evicted chunks
//! 6. Upload buffers for newly active chunks
//! 7. Draw every uploaded chunk

use cgmath::Point3;
use web_time::Duration;

use camera_state::CameraState;
use rendering::{gpu::GpuDevice, gpu::RenderError, Renderer};
use voxels::chunk_manager::{ChunkManager, VisibilityUpdate};

use crate::config::EngineConfig;

pub mod camera_state;
pub mod frame_clock;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// Input for one frame. Every field describes what the player is doing right
/// now; nothing accumulates across frames.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlayerAction {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub sprint: bool,
    /// Mouse delta since the last frame.
    pub rotate_view: Option<(f64, f64)>,
}

/// Counters describing one frame.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Set when the camera entered a new chunk this frame.
    pub visibility: Option<VisibilityUpdate>,
    /// Chunks committed from the pending list.
    pub committed: usize,
    /// Chunks whose buffers were uploaded.
    pub uploaded: usize,
    /// Draw calls issued.
    pub drawn: usize,
    /// Evicted chunks whose GPU resources were released.
    pub released: usize,
    /// Chunks in the active collection after the frame.
    pub active: usize,
    /// Generated chunks still waiting to be committed.
    pub pending: usize,
    /// Desired chunks not yet committed.
    pub generating: usize,
}

/// The main state container for the engine.
///
/// # Examples
///
/// ```
/// use cgmath::Point3;
/// use voxel_streamer::config::EngineConfig;
/// use voxel_streamer::engine_state::{rendering::gpu::HeadlessDevice, EngineState};
/// use web_time::Duration;
///
/// let mut config = EngineConfig::default();
/// config.streaming.worker_threads = 0;
/// let mut engine = EngineState::new(&config, HeadlessDevice::new(), Point3::new(8.0, 40.0, 8.0));
///
/// let stats = engine.frame(Duration::from_millis(16)).unwrap();
/// assert_eq!(stats.active, 25);
/// engine.shutdown().unwrap();
/// ```
pub struct EngineState<D: GpuDevice> {
    /// Camera state managing position, orientation and movement
    pub camera_state: CameraState,
    /// Current player actions, consumed by the next frame
    pub player_actions: PlayerAction,
    chunk_manager: ChunkManager,
    renderer: Renderer<D>,
}

impl<D: GpuDevice> EngineState<D> {
    /// Creates the engine with the camera at `camera_position`. Nothing is
    /// generated until the first frame.
    pub fn new(config: &EngineConfig, device: D, camera_position: Point3<f32>) -> Self {
        log::info!(
            "Starting engine: visible radius {} ({:?}), {} worker threads, seed {}",
            config.streaming.visible_radius,
            config.streaming.radius_metric,
            config.streaming.worker_threads,
            config.terrain.seed
        );
        Self {
            camera_state: CameraState::new(camera_position),
            player_actions: PlayerAction::default(),
            chunk_manager: ChunkManager::new(config),
            renderer: Renderer::new(device),
        }
    }

    /// Runs one frame.
    ///
    /// # Errors
    /// Any [`RenderError`] from uploading, drawing or releasing. The frame is
    /// abandoned at that point; the caller decides whether to stop.
    pub fn frame(&mut self, dt: Duration) -> Result<FrameStats, RenderError> {
        let actions = std::mem::take(&mut self.player_actions);
        self.camera_state.intake_actions(&actions);
        self.camera_state.update(dt);

        let visibility = self
            .chunk_manager
            .update_visible_chunks(self.camera_state.position());
        self.chunk_manager.process_tasks();
        let committed = self.chunk_manager.add_pending_chunks();
        let released = self.renderer.release_retired_chunks(&mut self.chunk_manager)?;
        let uploaded = self.renderer.init_chunk_buffers(&self.chunk_manager)?;
        let drawn = self.renderer.render_chunks(&self.chunk_manager)?;
        let frame = self.chunk_manager.advance_frame();

        Ok(FrameStats {
            frame,
            visibility,
            committed,
            uploaded,
            drawn,
            released,
            active: self.chunk_manager.active_count(),
            pending: self.chunk_manager.pending_count(),
            generating: self.chunk_manager.generating_count(),
        })
    }

    /// Releases every chunk's GPU resources. The engine keeps working
    /// afterwards and reloads chunks on the next frame that moves the camera.
    pub fn shutdown(&mut self) -> Result<usize, RenderError> {
        self.renderer.shutdown(&mut self.chunk_manager)
    }

    pub fn chunk_manager(&self) -> &ChunkManager {
        &self.chunk_manager
    }

    pub fn renderer(&self) -> &Renderer<D> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<D> {
        &mut self.renderer
    }
}
