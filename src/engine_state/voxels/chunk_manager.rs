//! # Chunk Manager
//!
//! The streaming state machine. The manager owns the active chunk
//! collection, tracks which coordinates are desired around the camera,
//! dispatches generation for newly desired coordinates and evicts chunks
//! that fall out of range.
//!
//! ## Chunk states
//!
//! ```text
//! Unloaded -> Generating -> PendingActivation -> Active(BuffersPending) -> Active(Rendered)
//!     ^            |                |                      |                     |
//!     +------------+----------------+----------------------+---------------------+
//!                              leaves the visible radius
//! ```
//!
//! ## Tickets
//!
//! Every dispatch is tagged with a fresh ticket and the manager remembers the
//! current ticket of each coordinate it is waiting for. A generation result
//! is committed only if its ticket is still current. Results for
//! coordinates that left the visible set (or left and re-entered it) are
//! dropped in [`ChunkManager::add_pending_chunks`]. Background work is never
//! interrupted.
//!
//! ## Failed generations
//!
//! A generation that panics is reported back through a failure list. While
//! its ticket is still current the coordinate is dispatched again, up to
//! [`MAX_GENERATION_ATTEMPTS`] times. After that the coordinate is dropped
//! back to `Unloaded` and stays empty until it leaves the visible set and
//! re-enters it.
//!
//! ## Eviction
//!
//! Eviction is immediate: a chunk leaving the visible set is removed from the
//! active collection and parked in a retired list. The renderer releases its
//! GPU resources on the render thread before the chunk is dropped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cgmath::Point3;

use super::chunk::{coord::ChunkCoord, Chunk};
use super::tasks::chunk_generation_task::{
    ChunkGenerationContext, ChunkGenerationTask, GeneratedChunk, FailedGeneration,
};
use super::terrain::TerrainGenerator;
use crate::config::{EngineConfig, RadiusMetric};
use crate::core::MtResource;
use crate::engine_state::task_management::TaskManager;

/// Dispatches per coordinate and visit before a failing generation is given up.
pub const MAX_GENERATION_ATTEMPTS: u32 = 3;

/// Phase of a chunk that is in the active collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivePhase {
    /// Committed, GPU buffers not yet uploaded.
    BuffersPending,
    /// GPU buffers uploaded; the chunk is drawn every frame.
    Rendered,
}

/// Lifecycle state of a chunk coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    Unloaded,
    Generating,
    PendingActivation,
    Active(ActivePhase),
}

/// Changes made by one visible-set recomputation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibilityUpdate {
    /// Camera chunk the set was computed around.
    pub center: ChunkCoord,
    /// Coordinates dispatched for generation.
    pub generated: Vec<ChunkCoord>,
    /// Coordinates that left the visible set.
    pub evicted: Vec<ChunkCoord>,
    /// Coordinates that stayed in the set untouched.
    pub retained: usize,
}

/// Owner of the chunk collection and the streaming working set.
pub struct ChunkManager {
    context: Arc<ChunkGenerationContext>,
    visible_radius: i32,
    radius_metric: RadiusMetric,
    chunks: MtResource<HashMap<ChunkCoord, Chunk>>,
    pending: MtResource<Vec<GeneratedChunk>>,
    failures: MtResource<Vec<FailedGeneration>>,
    /// Coordinates awaiting generation, with their current ticket.
    generating: HashMap<ChunkCoord, u64>,
    visible: HashSet<ChunkCoord>,
    retired: Vec<Chunk>,
    last_camera_chunk: Option<ChunkCoord>,
    frame_counter: u64,
    next_ticket: u64,
    discarded: u64,
    abandoned: u64,
    task_manager: TaskManager,
}

impl ChunkManager {
    /// Creates an empty manager and starts its generation workers.
    pub fn new(config: &EngineConfig) -> Self {
        let context = ChunkGenerationContext {
            terrain: TerrainGenerator::new(config.terrain.clone(), config.rooms.clone()),
            mesh: config.mesh.clone(),
        };
        Self {
            context: Arc::new(context),
            visible_radius: config.streaming.visible_radius,
            radius_metric: config.streaming.radius_metric,
            chunks: MtResource::new(HashMap::new()),
            pending: MtResource::new(Vec::new()),
            failures: MtResource::new(Vec::new()),
            generating: HashMap::new(),
            visible: HashSet::new(),
            retired: Vec::new(),
            last_camera_chunk: None,
            frame_counter: 0,
            next_ticket: 0,
            discarded: 0,
            abandoned: 0,
            task_manager: TaskManager::new(config.streaming.worker_threads),
        }
    }

    /// Recomputes the visible set if the camera entered a different chunk.
    ///
    /// Newly desired coordinates are dispatched for generation, coordinates
    /// that left the set are evicted and everything else is left alone.
    ///
    /// # Returns
    /// `None` when the camera is still in the last recorded chunk, or when
    /// its position has no chunk coordinate (not finite yet, or beyond
    /// [`MAX_CHUNK_INDEX`](super::chunk::coord::MAX_CHUNK_INDEX)). The
    /// update is retried next frame.
    pub fn update_visible_chunks(&mut self, camera_position: Point3<f32>) -> Option<VisibilityUpdate> {
        let Some(center) = ChunkCoord::from_world_position(camera_position) else {
            log::debug!("Camera position {camera_position:?} is not usable yet");
            return None;
        };
        if self.last_camera_chunk == Some(center) {
            return None;
        }

        let desired = self.desired_coords(center);
        let desired_set: HashSet<ChunkCoord> = desired.iter().copied().collect();

        let mut evicted: Vec<ChunkCoord> = self
            .visible
            .iter()
            .filter(|coord| !desired_set.contains(coord))
            .copied()
            .collect();
        evicted.sort_unstable();
        for coord in &evicted {
            self.evict(*coord);
        }

        let mut generated = Vec::new();
        for coord in desired {
            if self.visible.insert(coord) {
                self.dispatch(coord, 1);
                generated.push(coord);
            }
        }

        self.last_camera_chunk = Some(center);
        let update = VisibilityUpdate {
            center,
            retained: self.visible.len() - generated.len(),
            generated,
            evicted,
        };
        log::info!(
            "Camera entered chunk {center}: {} to generate, {} evicted, {} retained",
            update.generated.len(),
            update.evicted.len(),
            update.retained
        );
        Some(update)
    }

    /// Coordinates within the visible radius of `center`, in a stable order.
    fn desired_coords(&self, center: ChunkCoord) -> Vec<ChunkCoord> {
        let radius = self.visible_radius;
        let mut coords = Vec::new();
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                if self.radius_metric.contains(dx, dz, radius) {
                    coords.push(center.offset(dx, dz));
                }
            }
        }
        coords
    }

    fn dispatch(&mut self, coord: ChunkCoord, attempt: u32) {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.generating.insert(coord, ticket);
        self.task_manager.publish_task(Box::new(ChunkGenerationTask::new(
            self.context.clone(),
            self.pending.clone(),
            self.failures.clone(),
            coord,
            ticket,
            attempt,
        )));
        log::debug!("Chunk {coord}: Unloaded -> Generating (ticket {ticket}, attempt {attempt})");
    }

    fn evict(&mut self, coord: ChunkCoord) {
        self.visible.remove(&coord);
        if let Some(ticket) = self.generating.remove(&coord) {
            log::debug!("Chunk {coord}: left view while generating, ticket {ticket} will be dropped");
        }
        if let Some(chunk) = self.chunks.get_mut().remove(&coord) {
            log::debug!("Chunk {coord}: Active -> Unloaded");
            self.retired.push(chunk);
        }
    }

    /// Hands queued generation work to the workers and handles finished
    /// results. In inline mode this is where chunks are actually generated.
    pub fn process_tasks(&mut self) {
        self.task_manager.process_completed_tasks();
        self.task_manager.process_queued_tasks();
        self.handle_failures();
    }

    /// Retries or abandons coordinates whose current generation panicked.
    fn handle_failures(&mut self) {
        let failures = self.failures.take();
        for FailedGeneration {
            coord,
            ticket,
            attempt,
        } in failures
        {
            if self.generating.get(&coord) != Some(&ticket) {
                continue;
            }
            if attempt < MAX_GENERATION_ATTEMPTS {
                self.dispatch(coord, attempt + 1);
            } else {
                self.generating.remove(&coord);
                self.abandoned += 1;
                log::error!("Chunk {coord}: giving up after {attempt} failed generations");
            }
        }
    }

    /// Commits generated chunks whose ticket is still current into the
    /// active collection. Must be called on the render thread.
    ///
    /// # Returns
    /// The number of chunks committed.
    pub fn add_pending_chunks(&mut self) -> usize {
        let arrived = self.pending.take();
        if arrived.is_empty() {
            return 0;
        }

        let mut committed = 0;
        let mut chunks = self.chunks.get_mut();
        for GeneratedChunk { ticket, chunk } in arrived {
            let coord = chunk.coord;
            if self.generating.get(&coord) != Some(&ticket) || chunks.contains_key(&coord) {
                log::warn!("Discarding stale generation of chunk {coord} (ticket {ticket})");
                self.discarded += 1;
                continue;
            }
            self.generating.remove(&coord);
            chunks.insert(coord, chunk);
            committed += 1;
            log::debug!("Chunk {coord}: PendingActivation -> Active(BuffersPending)");
        }
        committed
    }

    /// Current lifecycle state of `coord`.
    pub fn chunk_state(&self, coord: ChunkCoord) -> ChunkState {
        if let Some(chunk) = self.chunks.get().get(&coord) {
            return ChunkState::Active(if chunk.buffers_initialized() {
                ActivePhase::Rendered
            } else {
                ActivePhase::BuffersPending
            });
        }
        match self.generating.get(&coord) {
            Some(ticket) => {
                let arrived = self
                    .pending
                    .get()
                    .iter()
                    .any(|generated| generated.chunk.coord == coord && generated.ticket == *ticket);
                if arrived {
                    ChunkState::PendingActivation
                } else {
                    ChunkState::Generating
                }
            }
            None => ChunkState::Unloaded,
        }
    }

    /// The active chunk collection. Lock it only briefly.
    pub fn active_chunks(&self) -> &MtResource<HashMap<ChunkCoord, Chunk>> {
        &self.chunks
    }

    pub fn active_count(&self) -> usize {
        self.chunks.get().len()
    }

    /// Generated chunks waiting for [`ChunkManager::add_pending_chunks`].
    pub fn pending_count(&self) -> usize {
        self.pending.get().len()
    }

    /// Desired coordinates whose generation has not been committed yet.
    pub fn generating_count(&self) -> usize {
        self.generating.len()
    }

    /// Evicted chunks waiting for GPU release.
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    /// Generation results dropped because their coordinate was no longer wanted.
    pub fn discarded_count(&self) -> u64 {
        self.discarded
    }

    /// Coordinates left unloaded after every generation attempt failed.
    pub fn abandoned_count(&self) -> u64 {
        self.abandoned
    }

    /// The desired coordinate set, sorted.
    pub fn visible_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.visible.iter().copied().collect();
        coords.sort_unstable();
        coords
    }

    pub fn last_camera_chunk(&self) -> Option<ChunkCoord> {
        self.last_camera_chunk
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Advances the frame counter; returns the new value.
    pub fn advance_frame(&mut self) -> u64 {
        self.frame_counter += 1;
        self.frame_counter
    }

    /// Takes every evicted chunk. The caller must release their GPU
    /// resources before dropping them.
    pub fn take_retired(&mut self) -> Vec<Chunk> {
        std::mem::take(&mut self.retired)
    }

    /// Evicts every chunk and forgets the camera position, e.g. at shutdown.
    ///
    /// # Returns
    /// The number of active chunks moved to the retired list.
    pub fn evict_all(&mut self) -> usize {
        let before = self.retired.len();
        let mut coords: Vec<_> = self.visible.iter().copied().collect();
        coords.sort_unstable();
        for coord in coords {
            self.evict(coord);
        }
        self.last_camera_chunk = None;
        self.retired.len() - before
    }

    /// True when nothing is being generated or waiting to be committed.
    pub fn is_settled(&self) -> bool {
        self.generating.is_empty() && self.pending.get().is_empty()
    }

    pub fn task_manager(&self) -> &TaskManager {
        &self.task_manager
    }

    pub fn terrain(&self) -> &TerrainGenerator {
        &self.context.terrain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::chunk::CHUNK_SIZE;

    fn manager(radius: i32, metric: RadiusMetric) -> ChunkManager {
        let mut config = EngineConfig::default();
        config.streaming.visible_radius = radius;
        config.streaming.radius_metric = metric;
        config.streaming.worker_threads = 0;
        ChunkManager::new(&config)
    }

    /// World position in the middle of chunk `(x, z)`.
    fn inside(x: i32, z: i32) -> Point3<f32> {
        let size = CHUNK_SIZE as f32;
        Point3::new((x as f32 + 0.5) * size, 20.0, (z as f32 + 0.5) * size)
    }

    fn square(x0: i32, x1: i32, z0: i32, z1: i32) -> Vec<ChunkCoord> {
        let mut coords = Vec::new();
        for x in x0..=x1 {
            for z in z0..=z1 {
                coords.push(ChunkCoord::new(x, z));
            }
        }
        coords.sort_unstable();
        coords
    }

    fn settle(manager: &mut ChunkManager) -> usize {
        manager.process_tasks();
        manager.add_pending_chunks()
    }

    #[test]
    fn test_initial_visible_set() {
        let mut manager = manager(1, RadiusMetric::Chebyshev);
        let update = manager.update_visible_chunks(inside(0, 0)).unwrap();

        assert_eq!(update.center, ChunkCoord::new(0, 0));
        assert_eq!(update.generated.len(), 9);
        assert!(update.evicted.is_empty());
        assert_eq!(manager.visible_coords(), square(-1, 1, -1, 1));
        assert_eq!(manager.chunk_state(ChunkCoord::new(1, 1)), ChunkState::Generating);
        assert_eq!(manager.chunk_state(ChunkCoord::new(2, 0)), ChunkState::Unloaded);
    }

    #[test]
    fn test_same_chunk_does_not_recompute() {
        let mut manager = manager(1, RadiusMetric::Chebyshev);
        assert!(manager.update_visible_chunks(inside(0, 0)).is_some());
        let queued = manager.task_manager().queued_task_count();

        assert!(manager.update_visible_chunks(Point3::new(1.0, 50.0, 15.0)).is_none());
        assert!(manager.update_visible_chunks(inside(0, 0)).is_none());
        assert_eq!(manager.task_manager().queued_task_count(), queued);
        assert_eq!(manager.generating_count(), 9);
    }

    #[test]
    fn test_chunks_move_through_states() {
        let mut manager = manager(0, RadiusMetric::Chebyshev);
        let coord = ChunkCoord::new(0, 0);
        manager.update_visible_chunks(inside(0, 0));
        assert_eq!(manager.chunk_state(coord), ChunkState::Generating);

        manager.process_tasks();
        assert_eq!(manager.chunk_state(coord), ChunkState::PendingActivation);
        assert_eq!(manager.pending_count(), 1);

        assert_eq!(manager.add_pending_chunks(), 1);
        assert_eq!(
            manager.chunk_state(coord),
            ChunkState::Active(ActivePhase::BuffersPending)
        );
        assert!(manager.is_settled());
    }

    #[test]
    fn test_moving_one_chunk_shifts_window() {
        let mut manager = manager(1, RadiusMetric::Chebyshev);
        manager.update_visible_chunks(inside(0, 0));
        assert_eq!(settle(&mut manager), 9);

        let ids: HashMap<ChunkCoord, u64> = manager
            .active_chunks()
            .get()
            .iter()
            .map(|(coord, chunk)| (*coord, chunk.chunk_id))
            .collect();

        let update = manager.update_visible_chunks(inside(1, 0)).unwrap();
        assert_eq!(update.evicted, square(-1, -1, -1, 1));
        let mut generated = update.generated.clone();
        generated.sort_unstable();
        assert_eq!(generated, square(2, 2, -1, 1));
        assert_eq!(update.retained, 6);
        assert_eq!(manager.visible_coords(), square(0, 2, -1, 1));
        assert_eq!(manager.retired_count(), 3);

        assert_eq!(settle(&mut manager), 3);
        let chunks = manager.active_chunks().get();
        assert_eq!(chunks.len(), 9);
        for coord in square(0, 1, -1, 1) {
            assert_eq!(chunks[&coord].chunk_id, ids[&coord], "chunk {coord} was regenerated");
        }
    }

    #[test]
    fn test_stale_generations_are_discarded() {
        let mut manager = manager(1, RadiusMetric::Chebyshev);
        manager.update_visible_chunks(inside(0, 0));
        manager.update_visible_chunks(inside(10, 0));

        assert_eq!(settle(&mut manager), 9);
        assert_eq!(manager.discarded_count(), 9);
        assert_eq!(manager.retired_count(), 0);
        let chunks = manager.active_chunks().get();
        assert!(chunks.keys().all(|coord| (9..=11).contains(&coord.x)));
    }

    #[test]
    fn test_reentering_before_completion_uses_latest_ticket() {
        let mut manager = manager(0, RadiusMetric::Chebyshev);
        manager.update_visible_chunks(inside(0, 0));
        manager.update_visible_chunks(inside(5, 0));
        manager.update_visible_chunks(inside(0, 0));

        assert_eq!(settle(&mut manager), 1);
        assert_eq!(manager.discarded_count(), 2);
        assert_eq!(
            manager.chunk_state(ChunkCoord::new(0, 0)),
            ChunkState::Active(ActivePhase::BuffersPending)
        );
        assert_eq!(manager.chunk_state(ChunkCoord::new(5, 0)), ChunkState::Unloaded);
    }

    #[test]
    fn test_manhattan_radius() {
        let mut manager = manager(1, RadiusMetric::Manhattan);
        let update = manager.update_visible_chunks(inside(3, 3)).unwrap();
        assert_eq!(update.generated.len(), 5);
        assert!(!manager.visible_coords().contains(&ChunkCoord::new(4, 4)));
    }

    #[test]
    fn test_non_finite_camera_is_deferred() {
        let mut manager = manager(1, RadiusMetric::Chebyshev);
        assert!(manager
            .update_visible_chunks(Point3::new(f32::NAN, 0.0, 0.0))
            .is_none());
        assert_eq!(manager.last_camera_chunk(), None);
        assert!(manager.update_visible_chunks(inside(0, 0)).is_some());
    }

    fn report_failure(manager: &ChunkManager, coord: ChunkCoord, attempt: u32) {
        let ticket = manager.generating[&coord];
        manager.failures.get_mut().push(FailedGeneration {
            coord,
            ticket,
            attempt,
        });
    }

    #[test]
    fn test_failed_generation_is_dispatched_again() {
        let mut manager = manager(0, RadiusMetric::Chebyshev);
        let origin = ChunkCoord::new(0, 0);
        manager.update_visible_chunks(inside(0, 0));
        let first_ticket = manager.generating[&origin];
        report_failure(&manager, origin, 1);

        manager.process_tasks();
        assert!(manager.generating[&origin] > first_ticket);
        assert_eq!(manager.chunk_state(origin), ChunkState::Generating);

        // The result carrying the superseded ticket is dropped.
        assert_eq!(manager.add_pending_chunks(), 0);
        assert_eq!(manager.discarded_count(), 1);

        settle(&mut manager);
        assert_eq!(
            manager.chunk_state(origin),
            ChunkState::Active(ActivePhase::BuffersPending)
        );
        assert_eq!(manager.abandoned_count(), 0);
    }

    #[test]
    fn test_repeatedly_failing_generation_is_abandoned() {
        let mut manager = manager(0, RadiusMetric::Chebyshev);
        let origin = ChunkCoord::new(0, 0);
        manager.update_visible_chunks(inside(0, 0));
        report_failure(&manager, origin, MAX_GENERATION_ATTEMPTS);

        manager.process_tasks();
        assert_eq!(manager.abandoned_count(), 1);
        assert_eq!(manager.chunk_state(origin), ChunkState::Unloaded);
        assert_eq!(manager.add_pending_chunks(), 0);
        assert!(manager.is_settled());

        // Leaving and re-entering the coordinate starts over.
        manager.update_visible_chunks(inside(3, 0));
        manager.update_visible_chunks(inside(0, 0));
        assert_eq!(manager.chunk_state(origin), ChunkState::Generating);
        settle(&mut manager);
        assert_eq!(
            manager.chunk_state(origin),
            ChunkState::Active(ActivePhase::BuffersPending)
        );
    }

    #[test]
    fn test_far_camera_is_deferred() {
        let mut manager = manager(1, RadiusMetric::Chebyshev);
        assert!(manager
            .update_visible_chunks(Point3::new(4.0e10, 20.0, 0.0))
            .is_none());
        assert!(manager
            .update_visible_chunks(Point3::new(0.0, 20.0, -f32::MAX))
            .is_none());
        assert_eq!(manager.last_camera_chunk(), None);
        assert_eq!(manager.generating_count(), 0);
        assert!(manager.update_visible_chunks(inside(0, 0)).is_some());
    }

    #[test]
    fn test_evict_all_retires_everything() {
        let mut manager = manager(1, RadiusMetric::Chebyshev);
        manager.update_visible_chunks(inside(0, 0));
        settle(&mut manager);
        assert_eq!(manager.evict_all(), 9);
        assert_eq!(manager.active_count(), 0);
        assert!(manager.visible_coords().is_empty());
        assert_eq!(manager.take_retired().len(), 9);
        assert_eq!(manager.retired_count(), 0);
    }
}
