//! # Chunk Generation Task
//!
//! Builds a chunk off the render thread: terrain, optional room and CPU mesh.
//! The finished chunk is appended to the chunk manager's pending list; it
//! never touches the active chunk collection or the GPU. A generation that
//! panics is appended to the failure list instead, so the manager can retry
//! or give up on the coordinate.

use std::sync::Arc;

use web_time::{Duration, Instant};

use crate::{
    config::MeshConfig,
    core::MtResource,
    engine_state::{
        task_management::task::{Task, TaskResult},
        voxels::{
            chunk::{coord::ChunkCoord, Chunk},
            terrain::TerrainGenerator,
        },
    },
};

/// Immutable inputs shared by every generation task.
#[derive(Debug, Clone)]
pub struct ChunkGenerationContext {
    pub terrain: TerrainGenerator,
    pub mesh: MeshConfig,
}

/// A generated chunk waiting to be committed by the chunk manager.
pub struct GeneratedChunk {
    /// Dispatch ticket; results whose ticket is no longer current are discarded.
    pub ticket: u64,
    pub chunk: Chunk,
}

/// A generation that panicked before producing a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailedGeneration {
    pub coord: ChunkCoord,
    pub ticket: u64,
    /// One-based attempt number of the failed dispatch.
    pub attempt: u32,
}

/// A task that generates one chunk.
pub struct ChunkGenerationTask {
    context: Arc<ChunkGenerationContext>,
    pending: MtResource<Vec<GeneratedChunk>>,
    failures: MtResource<Vec<FailedGeneration>>,
    coord: ChunkCoord,
    ticket: u64,
    attempt: u32,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task.
    ///
    /// # Arguments
    /// * `context` - Terrain and mesh settings shared by all tasks
    /// * `pending` - List the finished chunk is appended to
    /// * `failures` - List a panicked generation is reported to
    /// * `coord` - Chunk to generate
    /// * `ticket` - Dispatch ticket issued by the chunk manager
    /// * `attempt` - How many times this coordinate has been dispatched for
    ///   the same visit, starting at 1
    pub fn new(
        context: Arc<ChunkGenerationContext>,
        pending: MtResource<Vec<GeneratedChunk>>,
        failures: MtResource<Vec<FailedGeneration>>,
        coord: ChunkCoord,
        ticket: u64,
        attempt: u32,
    ) -> Self {
        ChunkGenerationTask {
            context,
            pending,
            failures,
            coord,
            ticket,
            attempt,
        }
    }
}

impl Task for ChunkGenerationTask {
    fn process(&self) -> Box<dyn TaskResult + Send> {
        let started = Instant::now();

        let mut chunk = Chunk::new(self.coord);
        chunk.generate(&self.context.terrain, &self.context.mesh);
        let triangles = chunk.mesh().triangle_count();
        let has_room = chunk.room().is_some();

        self.pending.get_mut().push(GeneratedChunk {
            ticket: self.ticket,
            chunk,
        });

        Box::new(ChunkGenerationTaskResult {
            coord: self.coord,
            ticket: self.ticket,
            triangles,
            has_room,
            elapsed: started.elapsed(),
        })
    }

    fn recover(&self) -> Option<Box<dyn TaskResult + Send>> {
        let failure = FailedGeneration {
            coord: self.coord,
            ticket: self.ticket,
            attempt: self.attempt,
        };
        self.failures.get_mut().push(failure);
        Some(Box::new(ChunkGenerationFailed(failure)))
    }
}

struct ChunkGenerationFailed(FailedGeneration);

impl TaskResult for ChunkGenerationFailed {
    fn handle_result(self: Box<Self>) -> Vec<Box<dyn Task + Send>> {
        let FailedGeneration {
            coord,
            ticket,
            attempt,
        } = self.0;
        log::warn!("Generation of chunk {coord} failed (ticket {ticket}, attempt {attempt})");
        Vec::new()
    }
}

/// Summary of a finished generation, logged on the owning thread.
pub struct ChunkGenerationTaskResult {
    coord: ChunkCoord,
    ticket: u64,
    triangles: usize,
    has_room: bool,
    elapsed: Duration,
}

impl TaskResult for ChunkGenerationTaskResult {
    fn handle_result(self: Box<Self>) -> Vec<Box<dyn Task + Send>> {
        log::debug!(
            "Generated chunk {} (ticket {}) in {:?}: {} triangles{}",
            self.coord,
            self.ticket,
            self.elapsed,
            self.triangles,
            if self.has_room { ", with room" } else { "" }
        );
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RoomConfig, TerrainConfig};

    fn context() -> Arc<ChunkGenerationContext> {
        Arc::new(ChunkGenerationContext {
            terrain: TerrainGenerator::new(TerrainConfig::default(), RoomConfig::default()),
            mesh: MeshConfig::default(),
        })
    }

    #[test]
    fn process_appends_to_pending_list() {
        let pending = MtResource::new(Vec::new());
        let failures = MtResource::new(Vec::new());
        let task = ChunkGenerationTask::new(
            context(),
            pending.clone(),
            failures.clone(),
            ChunkCoord::new(4, -4),
            11,
            1,
        );

        let result = task.process();
        assert!(result.handle_result().is_empty());
        assert!(failures.get().is_empty());

        let pending = pending.take();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].ticket, 11);
        assert_eq!(pending[0].chunk.coord, ChunkCoord::new(4, -4));
        assert!(pending[0].chunk.buffers_generated());
        assert!(!pending[0].chunk.buffers_initialized());
    }

    #[test]
    fn recover_reports_the_failed_dispatch() {
        let pending = MtResource::new(Vec::new());
        let failures = MtResource::new(Vec::new());
        let task = ChunkGenerationTask::new(
            context(),
            pending.clone(),
            failures.clone(),
            ChunkCoord::new(-1, 2),
            5,
            2,
        );

        let result = task.recover().unwrap();
        assert!(result.handle_result().is_empty());
        assert!(pending.get().is_empty());
        assert_eq!(
            *failures.get(),
            vec![FailedGeneration {
                coord: ChunkCoord::new(-1, 2),
                ticket: 5,
                attempt: 2,
            }]
        );
    }
}
