//! # GPU Device Layer
//!
//! The renderer talks to the GPU through the [`GpuDevice`] trait, which deals
//! only in opaque handles. Two implementations ship with the crate:
//!
//! * [`HeadlessDevice`] records allocations and draws in memory. Tests and
//!   the default binary mode use it, and it can simulate a memory budget.
//! * [`WgpuDevice`] owns a `wgpu::Device`/`wgpu::Queue` pair and creates
//!   real buffers.
//!
//! Every call must be made from the thread that owns the device. Nothing in
//! this module is touched by generation workers.

mod headless;
mod resources;
mod wgpu_device;

use std::fmt;

use thiserror::Error;

pub use headless::{BufferRecord, DeviceStats, DrawRecord, HeadlessDevice};
pub use resources::{release_chunk_buffers, ChunkBuffers, GpuResources};
pub use wgpu_device::WgpuDevice;

/// Opaque identifier of a vertex array (the per-chunk binding of all its
/// buffers).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexArrayHandle(u64);

/// Opaque identifier of one GPU buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u64);

impl VertexArrayHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl BufferHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VertexArrayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vao#{}", self.0)
    }
}

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// What a buffer holds. Vertex kinds map to fixed shader locations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Position,
    Normal,
    Color,
    TexCoord,
    Tangent,
    Bitangent,
    Index,
}

impl BufferKind {
    /// Shader location of a vertex stream, `None` for the index buffer.
    pub fn shader_location(self) -> Option<u32> {
        match self {
            BufferKind::Position => Some(0),
            BufferKind::Normal => Some(1),
            BufferKind::Color => Some(2),
            BufferKind::TexCoord => Some(3),
            BufferKind::Tangent => Some(4),
            BufferKind::Bitangent => Some(5),
            BufferKind::Index => None,
        }
    }

    /// Scalar components per element.
    pub fn components(self) -> usize {
        match self {
            BufferKind::TexCoord => 2,
            BufferKind::Index => 1,
            _ => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BufferKind::Position => "Position Buffer",
            BufferKind::Normal => "Normal Buffer",
            BufferKind::Color => "Color Buffer",
            BufferKind::TexCoord => "TexCoord Buffer",
            BufferKind::Tangent => "Tangent Buffer",
            BufferKind::Bitangent => "Bitangent Buffer",
            BufferKind::Index => "Index Buffer",
        }
    }
}

/// Errors raised by GPU devices and the renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No adapter matched the requested options.
    #[error("failed to acquire a GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    /// The adapter refused to create a device.
    #[error("failed to create a GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    /// An allocation would exceed the device's memory budget.
    #[error("GPU memory exhausted: requested {requested} bytes with {available} bytes available")]
    OutOfMemory { requested: u64, available: u64 },
    /// A single buffer is larger than the device allows.
    #[error("buffer `{label}` of {size} bytes exceeds the device limit of {limit} bytes")]
    BufferTooLarge {
        label: String,
        size: u64,
        limit: u64,
    },
    /// The handle was never created or has already been destroyed.
    #[error("unknown or released {0}")]
    UnknownBuffer(BufferHandle),
    /// The handle was never created or has already been destroyed.
    #[error("unknown or released {0}")]
    UnknownVertexArray(VertexArrayHandle),
    /// The mesh has more indices than a 32-bit draw call can address.
    #[error("mesh has {0} indices, more than a single draw supports")]
    IndexOverflow(usize),
}

/// Minimal GPU interface needed to upload, draw and release chunk meshes.
pub trait GpuDevice {
    /// Creates an empty vertex array that buffers can be attached to.
    fn create_vertex_array(&mut self, label: &str) -> Result<VertexArrayHandle, RenderError>;

    /// Creates a buffer attached to `vertex_array`, initialised with `contents`.
    fn create_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        kind: BufferKind,
        contents: &[u8],
    ) -> Result<BufferHandle, RenderError>;

    /// Frees a buffer. The handle is invalid afterwards.
    fn destroy_buffer(&mut self, buffer: BufferHandle) -> Result<(), RenderError>;

    /// Frees a vertex array. The handle is invalid afterwards.
    fn destroy_vertex_array(&mut self, vertex_array: VertexArrayHandle)
        -> Result<(), RenderError>;

    /// Issues one indexed draw of a chunk's buffers.
    fn draw_indexed(&mut self, buffers: &ChunkBuffers) -> Result<(), RenderError>;
}
