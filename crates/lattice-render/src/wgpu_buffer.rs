//! wgpu-backed chunk vertex buffers.
//!
//! Writes are staged in host memory and pushed with `queue.write_buffer` on
//! upload. The buffer is recreated only when the mesh outgrows it.

use std::sync::Arc;

use crate::gpu::{BasicBuffer, BufferFactory};

/// A vertex buffer on a wgpu device.
pub struct WgpuBuffer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    label: String,
    buffer: Option<wgpu::Buffer>,
    capacity: u64,
    staged: Vec<u8>,
}

impl WgpuBuffer {
    /// The underlying buffer, absent until the first `reserve_to_fit`.
    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    /// Binds the buffer to vertex slot 0 of `pass`.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        if let Some(buffer) = &self.buffer {
            pass.set_vertex_buffer(0, buffer.slice(..));
        }
    }
}

impl BasicBuffer for WgpuBuffer {
    fn reserve_to_fit(&mut self, bytes: u64) {
        let bytes = align(bytes);
        if bytes > self.capacity || self.buffer.is_none() {
            if let Some(old) = self.buffer.take() {
                old.destroy();
            }
            let size = bytes.max(wgpu::COPY_BUFFER_ALIGNMENT).next_power_of_two();
            self.buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&self.label),
                size,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.capacity = size;
        }
        self.staged.clear();
        self.staged.resize(bytes as usize, 0);
    }

    fn write(&mut self, offset: u64, data: &[u8]) {
        let start = offset as usize;
        let end = align(start as u64 + data.len() as u64) as usize;
        if end > self.staged.len() {
            self.staged.resize(end, 0);
        }
        self.staged[start..start + data.len()].copy_from_slice(data);
    }

    fn upload(&mut self) {
        let Some(buffer) = &self.buffer else {
            tracing::warn!(label = %self.label, "upload before reserve_to_fit");
            return;
        };
        if self.staged.len() as u64 > self.capacity {
            tracing::warn!(
                label = %self.label,
                staged = self.staged.len(),
                capacity = self.capacity,
                "staged data exceeds buffer, dropping upload"
            );
            return;
        }
        if !self.staged.is_empty() {
            self.queue.write_buffer(buffer, 0, &self.staged);
        }
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn destroy(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            buffer.destroy();
        }
        self.capacity = 0;
        self.staged = Vec::new();
    }
}

/// Creates [`WgpuBuffer`]s on one device.
#[derive(Clone)]
pub struct WgpuBufferFactory {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuBufferFactory {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }
}

impl BufferFactory for WgpuBufferFactory {
    type Buffer = WgpuBuffer;

    fn create_buffer(&self, label: &str) -> WgpuBuffer {
        WgpuBuffer {
            device: Arc::clone(&self.device),
            queue: Arc::clone(&self.queue),
            label: label.to_owned(),
            buffer: None,
            capacity: 0,
            staged: Vec::new(),
        }
    }
}

fn align(bytes: u64) -> u64 {
    bytes.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_mesh::ChunkVertex;

    fn test_factory() -> Option<WgpuBufferFactory> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .ok()?;
            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor::default())
                .await
                .ok()?;
            Some(WgpuBufferFactory::new(Arc::new(device), Arc::new(queue)))
        })
    }

    #[test]
    fn test_align_rounds_up() {
        assert_eq!(align(0), 0);
        assert_eq!(align(1), 4);
        assert_eq!(align(36), 36);
        assert_eq!(align(37), 40);
    }

    #[test]
    fn test_reserve_creates_vertex_buffer() {
        let Some(factory) = test_factory() else {
            return; // graceful skip when no GPU
        };
        let mut buffer = factory.create_buffer("chunk");
        assert!(buffer.buffer().is_none());
        let vertices = [ChunkVertex::default(); 6];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        buffer.reserve_to_fit(bytes.len() as u64);
        buffer.write(0, bytes);
        buffer.upload();
        assert!(buffer.capacity() >= bytes.len() as u64);
        let gpu = buffer.buffer().expect("buffer after reserve");
        assert!(gpu.usage().contains(wgpu::BufferUsages::VERTEX));
        buffer.destroy();
        assert!(buffer.buffer().is_none());
        assert_eq!(buffer.capacity(), 0);
    }

    #[test]
    fn test_smaller_mesh_reuses_buffer() {
        let Some(factory) = test_factory() else {
            return;
        };
        let mut buffer = factory.create_buffer("chunk");
        buffer.reserve_to_fit(36 * 60);
        let capacity = buffer.capacity();
        buffer.reserve_to_fit(36 * 6);
        assert_eq!(buffer.capacity(), capacity);
        buffer.reserve_to_fit(36 * 600);
        assert!(buffer.capacity() > capacity);
    }
}
