//! Chunk-grid coordinates.

use glam::IVec3;

use crate::chunk::{CHUNK_BITS, CHUNK_MASK};
use crate::direction::Face;

/// Identifies a chunk's position in the chunk grid.
///
/// World block `(x, y, z)` lives in chunk `(x >> 5, y >> 5, z >> 5)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ChunkPos {
    /// Chunk-grid X coordinate.
    pub x: i32,
    /// Chunk-grid Y coordinate.
    pub y: i32,
    /// Chunk-grid Z coordinate.
    pub z: i32,
}

impl ChunkPos {
    /// Creates a new chunk position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the chunk containing the given world block.
    pub fn from_block(x: i32, y: i32, z: i32) -> Self {
        Self::new(x >> CHUNK_BITS, y >> CHUNK_BITS, z >> CHUNK_BITS)
    }

    /// Returns the chunk containing a world-space point.
    pub fn from_world(point: glam::Vec3) -> Self {
        let block = point.floor().as_ivec3();
        Self::from_block(block.x, block.y, block.z)
    }

    /// Returns the position offset by `(dx, dy, dz)` chunks.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Returns the face-adjacent neighbour.
    pub fn neighbor(self, face: Face) -> Self {
        let d = face.offset();
        self.offset(d.x, d.y, d.z)
    }

    /// Squared Euclidean distance in chunk units.
    pub fn distance_sq(self, other: ChunkPos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dy * dy + dz * dz
    }

    /// World coordinates of the chunk's minimum corner block.
    pub fn origin_block(self) -> IVec3 {
        IVec3::new(
            self.x << CHUNK_BITS,
            self.y << CHUNK_BITS,
            self.z << CHUNK_BITS,
        )
    }

    /// Chunk position as a vector.
    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }
}

impl From<IVec3> for ChunkPos {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Splits a world block coordinate into its chunk-local component.
pub fn local_coord(value: i32) -> usize {
    (value & CHUNK_MASK) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_block_handles_negative_coordinates() {
        assert_eq!(ChunkPos::from_block(0, 31, 32), ChunkPos::new(0, 0, 1));
        assert_eq!(ChunkPos::from_block(-1, -32, -33), ChunkPos::new(-1, -1, -2));
    }

    #[test]
    fn test_local_coord_wraps_into_chunk() {
        assert_eq!(local_coord(0), 0);
        assert_eq!(local_coord(33), 1);
        assert_eq!(local_coord(-1), 31);
        assert_eq!(local_coord(-32), 0);
    }

    #[test]
    fn test_origin_block_round_trips() {
        let pos = ChunkPos::new(-3, 2, 7);
        let o = pos.origin_block();
        assert_eq!(ChunkPos::from_block(o.x, o.y, o.z), pos);
        assert_eq!(ChunkPos::from_block(o.x + 31, o.y + 31, o.z + 31), pos);
    }

    #[test]
    fn test_distance_sq() {
        let a = ChunkPos::new(0, 0, 0);
        assert_eq!(a.distance_sq(ChunkPos::new(3, 4, 0)), 25);
        assert_eq!(a.distance_sq(a), 0);
    }

    #[test]
    fn test_neighbor_matches_face_offset() {
        let p = ChunkPos::new(1, 1, 1);
        assert_eq!(p.neighbor(Face::West), ChunkPos::new(0, 1, 1));
        assert_eq!(p.neighbor(Face::Up), ChunkPos::new(1, 2, 1));
        assert_eq!(p.neighbor(Face::South), ChunkPos::new(1, 1, 2));
    }
}
