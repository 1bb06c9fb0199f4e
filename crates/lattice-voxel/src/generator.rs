//! Terrain generation seam.

use crate::chunk::Chunk;
use crate::pos::ChunkPos;

/// Produces the initial content of a chunk.
///
/// Called from generation pool threads, so implementations must be pure with
/// respect to shared state. The returned chunk must report `pos` as its
/// position; chunks for any other position are discarded.
pub trait WorldGenerator: Send + Sync {
    /// Builds the chunk at `pos`.
    fn generate(&self, pos: ChunkPos) -> Chunk;
}

impl<F> WorldGenerator for F
where
    F: Fn(ChunkPos) -> Chunk + Send + Sync,
{
    fn generate(&self, pos: ChunkPos) -> Chunk {
        self(pos)
    }
}

/// Generator that leaves every chunk unallocated.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyGenerator;

impl WorldGenerator for EmptyGenerator {
    fn generate(&self, pos: ChunkPos) -> Chunk {
        Chunk::new(pos)
    }
}

/// Generator filling every voxel below world height `surface_y` with one block.
#[derive(Clone, Copy, Debug)]
pub struct FlatGenerator {
    /// World y of the first air layer.
    pub surface_y: i32,
    /// Block placed below the surface.
    pub block: crate::Block,
}

impl WorldGenerator for FlatGenerator {
    fn generate(&self, pos: ChunkPos) -> Chunk {
        let mut chunk = Chunk::new(pos);
        let base = pos.origin_block().y;
        let top = (self.surface_y - base).clamp(0, crate::CHUNK_SIZE as i32) as usize;
        if top > 0 {
            let size = crate::CHUNK_SIZE;
            chunk.fill_box([0, 0, 0], [size, top, size], self.block);
        }
        chunk
    }
}
