//! Rendering side of the chunk lifecycle.
//!
//! Meshes are built on the CPU by [`meshing`] (usually on a generation
//! worker). The [`Renderer`] then runs on the thread that owns the GPU device
//! and does three things each frame:
//!
//! * uploads the mesh of every active chunk that has no buffers yet, exactly
//!   once per chunk
//! * issues one indexed draw per uploaded, non-empty chunk
//! * releases the GPU resources of chunks the chunk manager evicted

use crate::engine_state::voxels::{
    chunk::{coord::ChunkCoord, Chunk},
    chunk_manager::ChunkManager,
};

pub mod gpu;
pub mod meshing;

use gpu::{release_chunk_buffers, BufferKind, ChunkBuffers, GpuDevice, RenderError};
use meshing::ChunkMesh;

/// Uploads, draws and releases chunk meshes through a [`GpuDevice`].
pub struct Renderer<D: GpuDevice> {
    device: D,
    chunks_uploaded: u64,
    chunks_released: u64,
}

impl<D: GpuDevice> Renderer<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            chunks_uploaded: 0,
            chunks_released: 0,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Chunks uploaded since creation.
    pub fn chunks_uploaded(&self) -> u64 {
        self.chunks_uploaded
    }

    /// Chunks whose GPU resources were released since creation.
    pub fn chunks_released(&self) -> u64 {
        self.chunks_released
    }

    /// Uploads the mesh of `chunk` unless that already happened.
    ///
    /// A chunk without geometry still receives a vertex array so that it
    /// counts as uploaded; it just never produces a draw.
    ///
    /// # Returns
    /// `true` if buffers were created by this call, `false` if the chunk was
    /// already initialised or has no mesh yet.
    pub fn init_chunk_buffer(&mut self, chunk: &mut Chunk) -> Result<bool, RenderError> {
        if chunk.buffers_initialized() || !chunk.buffers_generated() {
            return Ok(false);
        }

        let buffers = self.upload_mesh(&format!("chunk {}", chunk.coord), chunk.mesh())?;
        log::debug!(
            "Chunk {}: uploaded {} buffers ({} triangles)",
            chunk.coord,
            buffers.buffer_count(),
            chunk.mesh().triangle_count()
        );
        if let Err(buffers) = chunk.gpu_resources_mut().install(buffers) {
            // Unreachable while the check above holds; free rather than leak.
            release_chunk_buffers(&mut self.device, buffers)?;
            return Ok(false);
        }
        self.chunks_uploaded += 1;
        Ok(true)
    }

    fn upload_mesh(&mut self, label: &str, mesh: &ChunkMesh) -> Result<ChunkBuffers, RenderError> {
        let index_count = u32::try_from(mesh.index_count())
            .map_err(|_| RenderError::IndexOverflow(mesh.index_count()))?;

        let vertex_array = self.device.create_vertex_array(label)?;
        let mut buffers = ChunkBuffers::new(vertex_array);
        match self.fill_buffers(&mut buffers, mesh, index_count) {
            Ok(()) => Ok(buffers),
            Err(err) => {
                if let Err(release_err) = release_chunk_buffers(&mut self.device, buffers) {
                    log::warn!("Failed to free partial upload of {label}: {release_err}");
                }
                Err(err)
            }
        }
    }

    fn fill_buffers(
        &mut self,
        buffers: &mut ChunkBuffers,
        mesh: &ChunkMesh,
        index_count: u32,
    ) -> Result<(), RenderError> {
        let streams = [
            (BufferKind::Position, Some(mesh.positions())),
            (BufferKind::Normal, Some(mesh.normals())),
            (BufferKind::Color, Some(mesh.colors())),
            (BufferKind::TexCoord, mesh.texcoords()),
            (BufferKind::Tangent, mesh.tangents()),
            (BufferKind::Bitangent, mesh.bitangents()),
        ];
        for (kind, data) in streams {
            // Empty streams get no buffer.
            let Some(data) = data.filter(|data| !data.is_empty()) else {
                continue;
            };
            let handle =
                self.device
                    .create_buffer(buffers.vertex_array, kind, bytemuck::cast_slice(data))?;
            buffers.vertex_streams.push((kind, handle));
        }

        if !mesh.indices().is_empty() {
            let handle = self.device.create_buffer(
                buffers.vertex_array,
                BufferKind::Index,
                bytemuck::cast_slice(mesh.indices()),
            )?;
            buffers.index_buffer = Some(handle);
            buffers.index_count = index_count;
        }
        Ok(())
    }

    /// Uploads every active chunk that has no GPU buffers yet.
    ///
    /// # Returns
    /// The number of chunks uploaded.
    pub fn init_chunk_buffers(&mut self, chunk_manager: &ChunkManager) -> Result<usize, RenderError> {
        let mut chunks = chunk_manager.active_chunks().get_mut();
        let mut uploaded = 0;
        for chunk in chunks.values_mut() {
            if self.init_chunk_buffer(chunk)? {
                uploaded += 1;
            }
        }
        Ok(uploaded)
    }

    /// Draws every active chunk whose buffers are uploaded and non-empty,
    /// ordered by chunk coordinate.
    ///
    /// # Returns
    /// The number of draw calls issued.
    pub fn render_chunks(&mut self, chunk_manager: &ChunkManager) -> Result<usize, RenderError> {
        let chunks = chunk_manager.active_chunks().get();
        let mut drawable: Vec<(&ChunkCoord, &ChunkBuffers)> = chunks
            .iter()
            .filter_map(|(coord, chunk)| chunk.gpu_resources().buffers().map(|b| (coord, b)))
            .filter(|(_, buffers)| buffers.is_drawable())
            .collect();
        drawable.sort_unstable_by_key(|(coord, _)| **coord);

        for (_, buffers) in &drawable {
            self.device.draw_indexed(buffers)?;
        }
        Ok(drawable.len())
    }

    /// Frees the GPU resources of one chunk and drops it.
    pub fn release_chunk(&mut self, mut chunk: Chunk) -> Result<(), RenderError> {
        let resident = chunk.gpu_resources().is_resident();
        chunk.gpu_resources_mut().release(&mut self.device)?;
        if resident {
            self.chunks_released += 1;
            log::debug!("Chunk {}: released GPU resources", chunk.coord);
        }
        Ok(())
    }

    /// Releases every chunk the manager evicted since the last call.
    ///
    /// All retired chunks are released and dropped even if one fails; the
    /// first error is returned.
    ///
    /// # Returns
    /// The number of chunks dropped.
    pub fn release_retired_chunks(
        &mut self,
        chunk_manager: &mut ChunkManager,
    ) -> Result<usize, RenderError> {
        let retired = chunk_manager.take_retired();
        let count = retired.len();
        let mut result = Ok(count);
        for chunk in retired {
            if let Err(err) = self.release_chunk(chunk) {
                log::error!("Failed to release evicted chunk: {err}");
                result = result.and(Err(err));
            }
        }
        result
    }

    /// Evicts every chunk and releases all GPU resources.
    pub fn shutdown(&mut self, chunk_manager: &mut ChunkManager) -> Result<usize, RenderError> {
        chunk_manager.evict_all();
        let released = self.release_retired_chunks(chunk_manager)?;
        log::info!(
            "Renderer shut down: {released} chunks released, {} uploaded in total",
            self.chunks_uploaded
        );
        Ok(released)
    }
}
