//! Seams between the renderer and a graphics backend.
//!
//! The renderer only needs growable vertex buffers, a command recorder that
//! can issue ranged draws and occlusion queries, and a way to postpone
//! destruction until the GPU is done with a resource. [`crate::headless`]
//! implements these in memory; [`crate::wgpu_buffer`] provides a wgpu buffer.

use std::ops::Range;

use lattice_voxel::ChunkPos;

use crate::frustum::Aabb;

/// A growable GPU vertex buffer.
pub trait BasicBuffer: Send + 'static {
    /// Ensures at least `bytes` of capacity. Existing contents may be lost.
    fn reserve_to_fit(&mut self, bytes: u64);

    /// Stages `data` at `offset` for the next [`upload`](Self::upload).
    fn write(&mut self, offset: u64, data: &[u8]);

    /// Makes all staged writes visible to the GPU.
    fn upload(&mut self);

    /// Allocated size in bytes.
    fn capacity(&self) -> u64;

    /// Frees the GPU allocation. Called once, from the defer queue.
    fn destroy(&mut self);
}

/// Creates buffers for a backend.
pub trait BufferFactory {
    type Buffer: BasicBuffer;

    fn create_buffer(&self, label: &str) -> Self::Buffer;
}

/// Records draw commands for one frame.
pub trait CommandRecorder<B> {
    /// Draws `vertices` of `buffer`, which holds the mesh of the chunk at `pos`.
    fn draw(&mut self, pos: ChunkPos, buffer: &B, vertices: Range<u32>);

    /// Draws the bounding-box proxy used to test a hidden chunk.
    fn draw_bounds(&mut self, aabb: &Aabb);

    fn begin_query(&mut self, slot: u32);

    fn end_query(&mut self, slot: u32);
}

/// Results of last frame's occlusion queries.
pub trait QueryPool {
    /// `true` if any sample of the query in `slot` passed. Slots never
    /// queried report visible.
    fn is_visible(&self, slot: u32) -> bool;
}

/// Runs closures once the GPU can no longer reference what they free.
pub trait DeferQueue: Send + Sync {
    fn defer(&self, task: Box<dyn FnOnce() + Send>);
}
