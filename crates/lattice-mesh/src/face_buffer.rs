//! Per-direction face scratch planes filled by the visibility pass.
//!
//! Each of the six directions owns `size` layers of `size × size` cells. A
//! cell holds the sprite id of a visible face, [`CULLED`] for a face hidden by
//! a solid neighbour, or [`EMPTY`] where there is no face at all.

use lattice_voxel::Face;

/// No face in this cell.
pub const EMPTY: u32 = u32::MAX;

/// A face exists but is hidden by a solid neighbour.
pub const CULLED: u32 = u32::MAX - 1;

/// Scratch planes for one chunk at one level of detail.
#[derive(Clone, Debug)]
pub struct ChunkFaceBuffer {
    size: usize,
    cells: Vec<u32>,
}

impl ChunkFaceBuffer {
    /// Allocates planes for a `size³` grid, all [`EMPTY`].
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![EMPTY; 6 * size * size * size],
        }
    }

    /// Resizes to `size` (reusing the allocation) and clears every cell.
    pub fn reset(&mut self, size: usize) {
        self.size = size;
        self.cells.clear();
        self.cells.resize(6 * size * size * size, EMPTY);
    }

    /// Grid side length in cells.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Reads the cell for `face` at `(layer, u, v)`.
    pub fn get(&self, face: Face, layer: usize, u: usize, v: usize) -> u32 {
        self.cells[self.index(face, layer, u, v)]
    }

    /// Writes the cell for `face` at `(layer, u, v)`.
    pub fn set(&mut self, face: Face, layer: usize, u: usize, v: usize, value: u32) {
        let index = self.index(face, layer, u, v);
        self.cells[index] = value;
    }

    /// Borrows one layer of one direction.
    pub fn plane(&self, face: Face, layer: usize) -> ChunkPlane<'_> {
        let area = self.size * self.size;
        let start = (face.index() * self.size + layer) * area;
        ChunkPlane {
            size: self.size,
            cells: &self.cells[start..start + area],
        }
    }

    fn index(&self, face: Face, layer: usize, u: usize, v: usize) -> usize {
        debug_assert!(layer < self.size && u < self.size && v < self.size);
        ((face.index() * self.size + layer) * self.size + v) * self.size + u
    }
}

/// One `size × size` layer, rows along `v`, cells along `u`.
#[derive(Clone, Copy, Debug)]
pub struct ChunkPlane<'a> {
    size: usize,
    cells: &'a [u32],
}

impl<'a> ChunkPlane<'a> {
    /// Side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Cell at `(u, v)`.
    pub fn get(&self, u: usize, v: usize) -> u32 {
        self.cells[v * self.size + u]
    }

    /// Row `v` as a slice indexed by `u`.
    pub fn row(&self, v: usize) -> &'a [u32] {
        &self.cells[v * self.size..(v + 1) * self.size]
    }

    /// `true` if no cell holds a visible face.
    pub fn has_no_visible(&self) -> bool {
        self.cells.iter().all(|&c| c == EMPTY || c == CULLED)
    }
}
