//! # wgpu Device
//!
//! Registry of real GPU buffers keyed by [`BufferHandle`], with per-buffer
//! memory analytics.
//!
//! Draws requested through [`GpuDevice::draw_indexed`] are queued rather than
//! executed, because a `wgpu::RenderPass` only exists while the caller is
//! encoding a frame. Once the caller has begun a pass and bound a pipeline
//! built with [`WgpuDevice::vertex_buffer_layouts`], it calls
//! [`WgpuDevice::encode_draws`] to replay the queue into the pass.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::{BufferHandle, BufferKind, ChunkBuffers, GpuDevice, RenderError, VertexArrayHandle};
use crate::config::MeshConfig;

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const NORMAL_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x3];
const COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x3];
const TEXCOORD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![3 => Float32x2];
const TANGENT_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![4 => Float32x3];
const BITANGENT_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![5 => Float32x3];

/// Analytics data for a GPU buffer
#[derive(Debug, Clone, Copy)]
struct BufferAnalytics {
    /// Total memory allocated for the buffer in bytes
    allocated_memory: u64,
    /// Bytes actually written into the buffer
    used_memory: u64,
}

#[derive(Debug)]
struct RegisteredBuffer {
    buffer: wgpu::Buffer,
    vertex_array: VertexArrayHandle,
    analytics: BufferAnalytics,
}

/// Queued draw, replayed by [`WgpuDevice::encode_draws`].
#[derive(Debug, Clone)]
struct DrawCommand {
    vertex_buffers: Vec<BufferHandle>,
    index_buffer: BufferHandle,
    index_count: u32,
}

/// [`GpuDevice`] backed by wgpu.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    next_handle: u64,
    vertex_arrays: HashMap<VertexArrayHandle, String>,
    buffers: HashMap<BufferHandle, RegisteredBuffer>,
    draw_commands: Vec<DrawCommand>,
}

impl WgpuDevice {
    /// Wraps an existing device and queue, for example the ones driving a
    /// window surface.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            next_handle: 0,
            vertex_arrays: HashMap::new(),
            buffers: HashMap::new(),
            draw_commands: Vec::new(),
        }
    }

    /// Acquires an adapter without a surface and creates a device on it.
    ///
    /// Blocks on the adapter and device requests with `pollster`.
    pub fn new_headless() -> Result<Self, RenderError> {
        pollster::block_on(Self::request_headless())
    }

    async fn request_headless() -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::empty(),
            backend_options: wgpu::BackendOptions::from_env_or_default(),
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Voxel Streamer Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await?;

        let info = adapter.get_info();
        log::info!("Using GPU adapter {} ({:?})", info.name, info.backend);
        Ok(Self::new(device, queue))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Gets the wgpu buffer behind a handle.
    pub fn get_buffer(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(&handle).map(|registered| &registered.buffer)
    }

    /// Vertex buffer layouts matching the slot order of
    /// [`WgpuDevice::encode_draws`] for meshes built with `config`.
    ///
    /// Each stream lives in its own buffer, so there is one layout per stream.
    pub fn vertex_buffer_layouts(config: &MeshConfig) -> Vec<wgpu::VertexBufferLayout<'static>> {
        let layout = |kind: BufferKind, attributes: &'static [wgpu::VertexAttribute]| {
            wgpu::VertexBufferLayout {
                array_stride: (kind.components() * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            }
        };

        let mut layouts = vec![
            layout(BufferKind::Position, &POSITION_ATTRIBUTES),
            layout(BufferKind::Normal, &NORMAL_ATTRIBUTES),
            layout(BufferKind::Color, &COLOR_ATTRIBUTES),
        ];
        if config.texcoords {
            layouts.push(layout(BufferKind::TexCoord, &TEXCOORD_ATTRIBUTES));
        }
        if config.tangents {
            layouts.push(layout(BufferKind::Tangent, &TANGENT_ATTRIBUTES));
            layouts.push(layout(BufferKind::Bitangent, &BITANGENT_ATTRIBUTES));
        }
        layouts
    }

    /// Number of draws waiting for [`WgpuDevice::encode_draws`].
    pub fn queued_draws(&self) -> usize {
        self.draw_commands.len()
    }

    /// Replays every queued draw into `pass` and clears the queue.
    ///
    /// The pass must already have a pipeline bound whose vertex layouts come
    /// from [`WgpuDevice::vertex_buffer_layouts`].
    ///
    /// # Returns
    /// The number of draw calls encoded.
    pub fn encode_draws(&mut self, pass: &mut wgpu::RenderPass<'_>) -> Result<usize, RenderError> {
        let commands = std::mem::take(&mut self.draw_commands);
        for command in &commands {
            for (slot, handle) in command.vertex_buffers.iter().enumerate() {
                let buffer = self
                    .get_buffer(*handle)
                    .ok_or(RenderError::UnknownBuffer(*handle))?;
                pass.set_vertex_buffer(slot as u32, buffer.slice(..));
            }
            let index_buffer = self
                .get_buffer(command.index_buffer)
                .ok_or(RenderError::UnknownBuffer(command.index_buffer))?;
            pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..command.index_count, 0, 0..1);
        }
        Ok(commands.len())
    }

    /// Drops queued draws without encoding them, e.g. when a frame is skipped.
    pub fn clear_draws(&mut self) {
        self.draw_commands.clear();
    }

    /// Gets the total allocated memory across all buffers
    pub fn get_total_allocated_memory(&self) -> u64 {
        self.buffers
            .values()
            .fold(0, |acc, registered| acc + registered.analytics.allocated_memory)
    }

    /// Gets the total used memory across all buffers
    pub fn get_total_used_memory(&self) -> u64 {
        self.buffers
            .values()
            .fold(0, |acc, registered| acc + registered.analytics.used_memory)
    }

    fn next_raw(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl GpuDevice for WgpuDevice {
    fn create_vertex_array(&mut self, label: &str) -> Result<VertexArrayHandle, RenderError> {
        let handle = VertexArrayHandle::from_raw(self.next_raw());
        self.vertex_arrays.insert(handle, label.to_owned());
        Ok(handle)
    }

    fn create_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        kind: BufferKind,
        contents: &[u8],
    ) -> Result<BufferHandle, RenderError> {
        let vertex_array_label = self
            .vertex_arrays
            .get(&vertex_array)
            .ok_or(RenderError::UnknownVertexArray(vertex_array))?;
        let label = format!("{vertex_array_label} {}", kind.label());

        let size = contents.len() as u64;
        let limit = self.device.limits().max_buffer_size;
        if size > limit {
            return Err(RenderError::BufferTooLarge { label, size, limit });
        }

        let usage = match kind {
            BufferKind::Index => wgpu::BufferUsages::INDEX,
            _ => wgpu::BufferUsages::VERTEX,
        } | wgpu::BufferUsages::COPY_DST;
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&label),
                contents,
                usage,
            });

        let handle = BufferHandle::from_raw(self.next_raw());
        self.buffers.insert(
            handle,
            RegisteredBuffer {
                buffer,
                vertex_array,
                analytics: BufferAnalytics {
                    allocated_memory: size,
                    used_memory: size,
                },
            },
        );
        Ok(handle)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) -> Result<(), RenderError> {
        let registered = self
            .buffers
            .remove(&buffer)
            .ok_or(RenderError::UnknownBuffer(buffer))?;
        registered.buffer.destroy();
        Ok(())
    }

    fn destroy_vertex_array(
        &mut self,
        vertex_array: VertexArrayHandle,
    ) -> Result<(), RenderError> {
        self.vertex_arrays
            .remove(&vertex_array)
            .ok_or(RenderError::UnknownVertexArray(vertex_array))?;
        let orphans = self
            .buffers
            .values()
            .filter(|registered| registered.vertex_array == vertex_array)
            .count();
        if orphans > 0 {
            log::warn!("{vertex_array} destroyed with {orphans} buffers still attached");
        }
        Ok(())
    }

    fn draw_indexed(&mut self, buffers: &ChunkBuffers) -> Result<(), RenderError> {
        let Some(index_buffer) = buffers.index_buffer else {
            return Ok(());
        };
        if !self.vertex_arrays.contains_key(&buffers.vertex_array) {
            return Err(RenderError::UnknownVertexArray(buffers.vertex_array));
        }
        self.draw_commands.push(DrawCommand {
            vertex_buffers: buffers
                .vertex_streams
                .iter()
                .map(|(_, handle)| *handle)
                .collect(),
            index_buffer,
            index_count: buffers.index_count,
        });
        Ok(())
    }
}
