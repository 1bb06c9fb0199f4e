//! Dense 32×32×32 voxel storage with lazy allocation.
//!
//! A chunk allocates its block grid on the first write. Until then every
//! read returns air and [`Chunk::is_empty`] reports `true` in O(1), which lets
//! the mesher skip never-touched chunks without scanning them.

use crate::block::Block;
use crate::pos::ChunkPos;

/// log2 of the chunk side length.
pub const CHUNK_BITS: u32 = 5;

/// Side length of a chunk in voxels.
pub const CHUNK_SIZE: usize = 1 << CHUNK_BITS;

/// Mask selecting the chunk-local part of a world coordinate.
pub const CHUNK_MASK: i32 = CHUNK_SIZE as i32 - 1;

/// Total number of voxels in a chunk (32³).
pub const CHUNK_VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;

/// A fixed-size voxel grid at an immutable chunk position.
#[derive(Clone, Debug)]
pub struct Chunk {
    pos: ChunkPos,
    /// `None` until the first write.
    blocks: Option<Box<[Block]>>,
}

impl Chunk {
    /// Creates an unallocated (all-air) chunk.
    pub fn new(pos: ChunkPos) -> Self {
        Self { pos, blocks: None }
    }

    /// The chunk's grid position.
    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// `true` while the grid has never been written.
    ///
    /// A chunk whose blocks were all set back to air is not empty in this
    /// sense; it still owns a grid.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_none()
    }

    /// Returns the block at chunk-local `(x, y, z)`. Each coordinate must be in `0..32`.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Block {
        match &self.blocks {
            Some(blocks) => blocks[Self::linear_index(x, y, z)],
            None => Block::AIR,
        }
    }

    /// Writes the block at chunk-local `(x, y, z)`, allocating the grid if needed.
    pub fn set(&mut self, x: usize, y: usize, z: usize, block: Block) {
        let index = Self::linear_index(x, y, z);
        let blocks = self
            .blocks
            .get_or_insert_with(|| vec![Block::AIR; CHUNK_VOLUME].into_boxed_slice());
        blocks[index] = block;
    }

    /// Fills the axis-aligned box `min..max` (exclusive, chunk-local) with `block`.
    pub fn fill_box(&mut self, min: [usize; 3], max: [usize; 3], block: Block) {
        for z in min[2]..max[2] {
            for y in min[1]..max[1] {
                for x in min[0]..max[0] {
                    self.set(x, y, z, block);
                }
            }
        }
    }

    /// Counts non-air blocks. Linear in the chunk volume.
    pub fn solid_count(&self) -> usize {
        self.blocks
            .as_ref()
            .map_or(0, |b| b.iter().filter(|b| !b.is_air()).count())
    }

    /// Converts `(x, y, z)` to a linear index (x varies fastest).
    fn linear_index(x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < CHUNK_SIZE && y < CHUNK_SIZE && z < CHUNK_SIZE);
        x | (y << CHUNK_BITS) | (z << (2 * CHUNK_BITS))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;

    #[test]
    fn test_new_chunk_is_empty() {
        let chunk = Chunk::new(ChunkPos::new(1, 2, 3));
        assert!(chunk.is_empty());
        assert_eq!(chunk.get(5, 5, 5), Block::AIR);
        assert_eq!(chunk.pos(), ChunkPos::new(1, 2, 3));
        assert_eq!(chunk.solid_count(), 0);
    }

    #[test]
    fn test_single_write_allocates_and_round_trips() {
        let mut chunk = Chunk::new(ChunkPos::default());
        let block = Block::new(BlockType(42)).with_fluid(1, 3);
        chunk.set(31, 0, 17, block);
        assert!(!chunk.is_empty());
        assert_eq!(chunk.get(31, 0, 17), block);
        assert_eq!(chunk.get(30, 0, 17), Block::AIR);
    }

    #[test]
    fn test_writing_air_still_allocates() {
        let mut chunk = Chunk::new(ChunkPos::default());
        chunk.set(0, 0, 0, Block::AIR);
        assert!(!chunk.is_empty());
    }

    #[test]
    fn test_all_voxels_accessible() {
        let mut chunk = Chunk::new(ChunkPos::default());
        for z in 0..CHUNK_SIZE {
            for y in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    let t = ((x + y + z) % 3) as u16;
                    chunk.set(x, y, z, Block::new(BlockType(t)));
                }
            }
        }
        for z in 0..CHUNK_SIZE {
            for y in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    let expected = Block::new(BlockType(((x + y + z) % 3) as u16));
                    assert_eq!(chunk.get(x, y, z), expected, "mismatch at ({x}, {y}, {z})");
                }
            }
        }
    }

    #[test]
    fn test_fill_box_counts() {
        let mut chunk = Chunk::new(ChunkPos::default());
        chunk.fill_box([0, 0, 0], [32, 1, 32], Block::new(BlockType(1)));
        assert_eq!(chunk.solid_count(), CHUNK_SIZE * CHUNK_SIZE);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut a = Chunk::new(ChunkPos::default());
        a.set(1, 1, 1, Block::new(BlockType(1)));
        let mut b = a.clone();
        b.set(1, 1, 1, Block::new(BlockType(2)));
        assert_eq!(a.get(1, 1, 1).block_type(), BlockType(1));
        assert_eq!(b.get(1, 1, 1).block_type(), BlockType(2));
    }
}
