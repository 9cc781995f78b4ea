//! In-memory [`GpuDevice`] that records what a real device would be asked to do.

use std::collections::HashMap;

use super::{BufferHandle, BufferKind, ChunkBuffers, GpuDevice, RenderError, VertexArrayHandle};

/// Bookkeeping for one live buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRecord {
    pub vertex_array: VertexArrayHandle,
    pub kind: BufferKind,
    pub size: u64,
}

/// One recorded draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRecord {
    pub vertex_array: VertexArrayHandle,
    pub index_count: u32,
}

/// Lifetime counters of a [`HeadlessDevice`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub vertex_arrays_created: u64,
    pub vertex_arrays_destroyed: u64,
    pub buffers_created: u64,
    pub buffers_destroyed: u64,
    pub draw_calls: u64,
    pub peak_allocated_bytes: u64,
}

/// A GPU device with no GPU behind it.
///
/// Allocations are tracked by handle and draws are appended to a list that
/// the caller drains with [`HeadlessDevice::take_draws`]. With a byte budget
/// set, allocations beyond it fail with [`RenderError::OutOfMemory`].
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_handle: u64,
    byte_budget: Option<u64>,
    allocated_bytes: u64,
    vertex_arrays: HashMap<VertexArrayHandle, String>,
    buffers: HashMap<BufferHandle, BufferRecord>,
    draws: Vec<DrawRecord>,
    stats: DeviceStats,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device that refuses to hold more than `bytes` of buffer data at once.
    pub fn with_byte_budget(bytes: u64) -> Self {
        Self {
            byte_budget: Some(bytes),
            ..Self::default()
        }
    }

    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_bytes
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&BufferRecord> {
        self.buffers.get(&handle)
    }

    pub fn vertex_array_label(&self, handle: VertexArrayHandle) -> Option<&str> {
        self.vertex_arrays.get(&handle).map(String::as_str)
    }

    /// Draws recorded since the last call to [`HeadlessDevice::take_draws`].
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn take_draws(&mut self) -> Vec<DrawRecord> {
        std::mem::take(&mut self.draws)
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    fn next_raw(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_vertex_array(&mut self, label: &str) -> Result<VertexArrayHandle, RenderError> {
        let handle = VertexArrayHandle::from_raw(self.next_raw());
        self.vertex_arrays.insert(handle, label.to_owned());
        self.stats.vertex_arrays_created += 1;
        Ok(handle)
    }

    fn create_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        kind: BufferKind,
        contents: &[u8],
    ) -> Result<BufferHandle, RenderError> {
        if !self.vertex_arrays.contains_key(&vertex_array) {
            return Err(RenderError::UnknownVertexArray(vertex_array));
        }
        let size = contents.len() as u64;
        if let Some(budget) = self.byte_budget {
            let available = budget.saturating_sub(self.allocated_bytes);
            if size > available {
                return Err(RenderError::OutOfMemory {
                    requested: size,
                    available,
                });
            }
        }

        let handle = BufferHandle::from_raw(self.next_raw());
        self.buffers.insert(
            handle,
            BufferRecord {
                vertex_array,
                kind,
                size,
            },
        );
        self.allocated_bytes += size;
        self.stats.buffers_created += 1;
        self.stats.peak_allocated_bytes = self.stats.peak_allocated_bytes.max(self.allocated_bytes);
        Ok(handle)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) -> Result<(), RenderError> {
        let record = self
            .buffers
            .remove(&buffer)
            .ok_or(RenderError::UnknownBuffer(buffer))?;
        self.allocated_bytes -= record.size;
        self.stats.buffers_destroyed += 1;
        Ok(())
    }

    fn destroy_vertex_array(
        &mut self,
        vertex_array: VertexArrayHandle,
    ) -> Result<(), RenderError> {
        self.vertex_arrays
            .remove(&vertex_array)
            .ok_or(RenderError::UnknownVertexArray(vertex_array))?;
        self.stats.vertex_arrays_destroyed += 1;
        Ok(())
    }

    fn draw_indexed(&mut self, buffers: &ChunkBuffers) -> Result<(), RenderError> {
        if !self.vertex_arrays.contains_key(&buffers.vertex_array) {
            return Err(RenderError::UnknownVertexArray(buffers.vertex_array));
        }
        if let Some(index_buffer) = buffers.index_buffer {
            if !self.buffers.contains_key(&index_buffer) {
                return Err(RenderError::UnknownBuffer(index_buffer));
            }
        }
        self.draws.push(DrawRecord {
            vertex_array: buffers.vertex_array,
            index_count: buffers.index_count,
        });
        self.stats.draw_calls += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_allocations_by_handle() {
        let mut device = HeadlessDevice::new();
        let vao = device.create_vertex_array("chunk (0, 0)").unwrap();
        let a = device.create_buffer(vao, BufferKind::Position, &[0; 24]).unwrap();
        let b = device.create_buffer(vao, BufferKind::Index, &[0; 8]).unwrap();
        assert_ne!(a, b);
        assert_eq!(device.allocated_bytes(), 32);
        assert_eq!(device.buffer(b).map(|r| r.kind), Some(BufferKind::Index));
        assert_eq!(device.vertex_array_label(vao), Some("chunk (0, 0)"));

        device.destroy_buffer(a).unwrap();
        assert_eq!(device.allocated_bytes(), 8);
        assert!(matches!(device.destroy_buffer(a), Err(RenderError::UnknownBuffer(_))));
        assert_eq!(device.stats().peak_allocated_bytes, 32);
    }

    #[test]
    fn budget_exhaustion_is_an_error() {
        let mut device = HeadlessDevice::with_byte_budget(100);
        let vao = device.create_vertex_array("budget").unwrap();
        device.create_buffer(vao, BufferKind::Color, &[0; 80]).unwrap();
        let err = device.create_buffer(vao, BufferKind::Normal, &[0; 40]).unwrap_err();
        assert!(matches!(
            err,
            RenderError::OutOfMemory {
                requested: 40,
                available: 20
            }
        ));
        assert_eq!(device.live_buffers(), 1);
    }

    #[test]
    fn buffers_need_a_live_vertex_array() {
        let mut device = HeadlessDevice::new();
        let vao = device.create_vertex_array("gone").unwrap();
        device.destroy_vertex_array(vao).unwrap();
        assert!(matches!(
            device.create_buffer(vao, BufferKind::Position, &[0; 12]),
            Err(RenderError::UnknownVertexArray(_))
        ));
    }

    #[test]
    fn draws_are_recorded_until_taken() {
        let mut device = HeadlessDevice::new();
        let vao = device.create_vertex_array("draw").unwrap();
        let mut buffers = ChunkBuffers::new(vao);
        buffers.index_buffer = Some(device.create_buffer(vao, BufferKind::Index, &[0; 24]).unwrap());
        buffers.index_count = 6;

        device.draw_indexed(&buffers).unwrap();
        device.draw_indexed(&buffers).unwrap();
        assert_eq!(device.draws().len(), 2);
        assert_eq!(
            device.take_draws()[0],
            DrawRecord {
                vertex_array: vao,
                index_count: 6
            }
        );
        assert!(device.draws().is_empty());
        assert_eq!(device.stats().draw_calls, 2);
    }
}
