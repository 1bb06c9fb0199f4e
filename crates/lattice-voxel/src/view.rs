//! Immutable 3×3×3 chunk neighbourhood snapshot used for meshing.
//!
//! A [`WorldView`] clones the `Arc` handles of a chunk and its neighbours out
//! of the world while the chunk map is locked. Reads afterwards need no lock,
//! and chunks evicted from the world stay alive until the view is dropped.

use std::sync::Arc;

use glam::IVec3;

use crate::block::Block;
use crate::chunk::{CHUNK_BITS, CHUNK_MASK, Chunk};
use crate::direction::Direction;
use crate::pos::ChunkPos;

/// Number of slots in the neighbourhood (3³).
pub const VIEW_SLOTS: usize = 27;

/// Snapshot of a centre chunk plus up to 26 neighbours.
#[derive(Clone)]
pub struct WorldView {
    center: ChunkPos,
    chunks: [Option<Arc<Chunk>>; VIEW_SLOTS],
    failed: bool,
}

impl WorldView {
    /// Captures the neighbourhood of `center`, fetching chunks through `lookup`.
    ///
    /// Every present neighbour is captured. A neighbour is required when
    /// `mask` covers its offset; the centre is always required. If any
    /// required chunk is missing the view is marked [`failed`](Self::failed).
    pub fn capture<F>(center: ChunkPos, mask: Direction, mut lookup: F) -> Self
    where
        F: FnMut(ChunkPos) -> Option<Arc<Chunk>>,
    {
        let mut chunks: [Option<Arc<Chunk>>; VIEW_SLOTS] = Default::default();
        let mut failed = false;
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let offset = IVec3::new(dx, dy, dz);
                    let chunk = lookup(center.offset(dx, dy, dz));
                    if chunk.is_none() && mask.covers_offset(offset) {
                        failed = true;
                    }
                    chunks[slot_index(dx, dy, dz)] = chunk;
                }
            }
        }
        Self {
            center,
            chunks,
            failed,
        }
    }

    /// The centre chunk position.
    pub fn center(&self) -> ChunkPos {
        self.center
    }

    /// `true` if a required chunk was missing. A failed view must be discarded.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// The centre chunk, absent only in a failed view.
    pub fn center_chunk(&self) -> Option<&Arc<Chunk>> {
        self.chunks[slot_index(0, 0, 0)].as_ref()
    }

    /// `true` when the centre chunk is missing or has never been written.
    pub fn is_empty(&self) -> bool {
        self.center_chunk().is_none_or(|c| c.is_empty())
    }

    /// The neighbour at chunk offset `(dx, dy, dz)`, each in `-1..=1`.
    pub fn neighbor(&self, dx: i32, dy: i32, dz: i32) -> Option<&Arc<Chunk>> {
        if !(-1..=1).contains(&dx) || !(-1..=1).contains(&dy) || !(-1..=1).contains(&dz) {
            return None;
        }
        self.chunks[slot_index(dx, dy, dz)].as_ref()
    }

    /// Number of captured chunks including the centre.
    pub fn captured_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_some()).count()
    }

    /// Reads a block at coordinates relative to the centre chunk's origin.
    ///
    /// Each coordinate covers `-32..64`. Missing chunks and coordinates
    /// outside the neighbourhood read as air.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Block {
        let (cx, cy, cz) = (x >> CHUNK_BITS, y >> CHUNK_BITS, z >> CHUNK_BITS);
        match self.neighbor(cx, cy, cz) {
            Some(chunk) => chunk.get(
                (x & CHUNK_MASK) as usize,
                (y & CHUNK_MASK) as usize,
                (z & CHUNK_MASK) as usize,
            ),
            None => Block::AIR,
        }
    }
}

impl std::fmt::Debug for WorldView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldView")
            .field("center", &self.center)
            .field("captured", &self.captured_count())
            .field("failed", &self.failed)
            .finish()
    }
}

fn slot_index(dx: i32, dy: i32, dz: i32) -> usize {
    ((dx + 1) + (dy + 1) * 3 + (dz + 1) * 9) as usize
}
