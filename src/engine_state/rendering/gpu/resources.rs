//! Per-chunk GPU resource bundle.

use super::{BufferHandle, BufferKind, GpuDevice, RenderError, VertexArrayHandle};

/// Handles of every GPU object created for one chunk's mesh.
#[derive(Debug, PartialEq, Eq)]
pub struct ChunkBuffers {
    pub vertex_array: VertexArrayHandle,
    /// Vertex streams in upload order. Empty for a chunk with no geometry.
    pub vertex_streams: Vec<(BufferKind, BufferHandle)>,
    pub index_buffer: Option<BufferHandle>,
    pub index_count: u32,
}

impl ChunkBuffers {
    /// Bundle with a vertex array and nothing attached yet.
    pub fn new(vertex_array: VertexArrayHandle) -> Self {
        Self {
            vertex_array,
            vertex_streams: Vec::new(),
            index_buffer: None,
            index_count: 0,
        }
    }

    /// Whether a draw call would produce anything.
    pub fn is_drawable(&self) -> bool {
        self.index_buffer.is_some() && self.index_count > 0
    }

    pub fn buffer(&self, kind: BufferKind) -> Option<BufferHandle> {
        if kind == BufferKind::Index {
            return self.index_buffer;
        }
        self.vertex_streams
            .iter()
            .find(|(stream, _)| *stream == kind)
            .map(|(_, handle)| *handle)
    }

    /// Number of GPU buffers in the bundle.
    pub fn buffer_count(&self) -> usize {
        self.vertex_streams.len() + usize::from(self.index_buffer.is_some())
    }
}

/// Destroys every buffer of `buffers` and then its vertex array.
///
/// All handles are attempted even if one fails; the first error is returned.
pub fn release_chunk_buffers<D: GpuDevice + ?Sized>(
    device: &mut D,
    buffers: ChunkBuffers,
) -> Result<(), RenderError> {
    let mut result = Ok(());
    let handles = buffers
        .vertex_streams
        .iter()
        .map(|(_, handle)| *handle)
        .chain(buffers.index_buffer);
    for handle in handles {
        if let Err(err) = device.destroy_buffer(handle) {
            result = result.and(Err(err));
        }
    }
    if let Err(err) = device.destroy_vertex_array(buffers.vertex_array) {
        result = result.and(Err(err));
    }
    result
}

/// GPU state owned by a chunk.
///
/// Buffers are installed at most once. The owner must call
/// [`GpuResources::release`] on the render thread before dropping; a bundle
/// dropped while still resident is reported as a leak.
#[derive(Debug, Default)]
pub struct GpuResources {
    buffers: Option<ChunkBuffers>,
    initialized: bool,
}

impl GpuResources {
    /// True once buffers have been installed, even after they were released.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// True while the bundle holds live GPU handles.
    pub fn is_resident(&self) -> bool {
        self.buffers.is_some()
    }

    pub fn buffers(&self) -> Option<&ChunkBuffers> {
        self.buffers.as_ref()
    }

    /// Installs freshly uploaded buffers.
    ///
    /// # Returns
    /// The buffers back as `Err` if this bundle was already initialised, so
    /// the caller can free them.
    pub fn install(&mut self, buffers: ChunkBuffers) -> Result<(), ChunkBuffers> {
        if self.initialized {
            return Err(buffers);
        }
        self.buffers = Some(buffers);
        self.initialized = true;
        Ok(())
    }

    /// Frees the installed buffers, if any. Calling it again is a no-op.
    pub fn release<D: GpuDevice + ?Sized>(&mut self, device: &mut D) -> Result<(), RenderError> {
        match self.buffers.take() {
            Some(buffers) => release_chunk_buffers(device, buffers),
            None => Ok(()),
        }
    }
}

impl Drop for GpuResources {
    fn drop(&mut self) {
        if let Some(buffers) = &self.buffers {
            log::warn!(
                "GPU resources of {} dropped without release ({} buffers leaked)",
                buffers.vertex_array,
                buffers.buffer_count()
            );
        }
    }
}
