//! Mesher output: seven vertex streams and the packed per-chunk mesh.

use std::ops::Range;

use lattice_voxel::{ChunkPos, Face};

use crate::vertex::ChunkVertex;

/// Number of streams: one per face direction plus the generic LOD stream.
pub const STREAM_COUNT: usize = 7;

/// Index of the generic stream holding the coarse LOD mesh.
pub const GENERIC_STREAM: usize = 6;

/// Vertices emitted per quad (two triangles, non-indexed).
pub const VERTICES_PER_QUAD: usize = 6;

/// Growable vertex streams reused across meshing passes.
#[derive(Clone, Debug, Default)]
pub struct MeshEmitterSet {
    streams: [Vec<ChunkVertex>; STREAM_COUNT],
}

impl MeshEmitterSet {
    /// Creates empty streams.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties every stream, keeping capacity.
    pub fn clear(&mut self) {
        for stream in &mut self.streams {
            stream.clear();
        }
    }

    /// Stream `index` (0–5 faces, 6 generic).
    pub fn stream(&self, index: usize) -> &[ChunkVertex] {
        &self.streams[index]
    }

    pub(crate) fn stream_mut(&mut self, index: usize) -> &mut Vec<ChunkVertex> {
        &mut self.streams[index]
    }

    /// Full-detail stream for `face`.
    pub fn face(&self, face: Face) -> &[ChunkVertex] {
        self.stream(face.index())
    }

    /// Coarse LOD stream.
    pub fn generic(&self) -> &[ChunkVertex] {
        self.stream(GENERIC_STREAM)
    }

    /// Quads in stream `index`.
    pub fn quad_count(&self, index: usize) -> usize {
        self.streams[index].len() / VERTICES_PER_QUAD
    }

    /// Total vertices across all streams.
    pub fn vertex_count(&self) -> usize {
        self.streams.iter().map(Vec::len).sum()
    }

    /// `true` when no stream holds a vertex.
    pub fn is_empty(&self) -> bool {
        self.streams.iter().all(Vec::is_empty)
    }

    /// Packs all streams into one contiguous vertex list for upload.
    pub fn to_mesh(&self, pos: ChunkPos) -> ChunkMesh {
        let mut vertices = Vec::with_capacity(self.vertex_count());
        let mut ranges: [Range<u32>; STREAM_COUNT] = Default::default();
        for (range, stream) in ranges.iter_mut().zip(&self.streams) {
            let start = vertices.len() as u32;
            vertices.extend_from_slice(stream);
            *range = start..vertices.len() as u32;
        }
        ChunkMesh {
            pos,
            vertices,
            ranges,
        }
    }
}

/// One chunk's geometry packed for upload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkMesh {
    /// Chunk the mesh belongs to.
    pub pos: ChunkPos,
    /// All vertices, stream after stream.
    pub vertices: Vec<ChunkVertex>,
    /// Vertex range of each stream inside `vertices`.
    pub ranges: [Range<u32>; STREAM_COUNT],
}

impl ChunkMesh {
    /// Vertex range of the full-detail stream for `face`.
    pub fn face_range(&self, face: Face) -> Range<u32> {
        self.ranges[face.index()].clone()
    }

    /// Vertex range of the generic LOD stream.
    pub fn lod_range(&self) -> Range<u32> {
        self.ranges[GENERIC_STREAM].clone()
    }

    /// Total vertex count.
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// `true` when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}
