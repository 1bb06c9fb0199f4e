//! Vertical stack of chunks sharing one `(x, z)` chunk coordinate.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::chunk::Chunk;

/// Chunks of one column keyed by chunk-y.
///
/// Chunks are held behind `Arc` so a [`WorldView`](crate::WorldView) can keep
/// them alive after the column drops them.
#[derive(Debug, Default)]
pub struct ChunkColumn {
    chunks: BTreeMap<i32, Arc<Chunk>>,
}

impl ChunkColumn {
    /// Creates an empty column.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the chunk at chunk-y `y`.
    pub fn get(&self, y: i32) -> Option<&Arc<Chunk>> {
        self.chunks.get(&y)
    }

    /// Mutable access to the shared handle, for copy-on-write edits.
    pub fn get_mut(&mut self, y: i32) -> Option<&mut Arc<Chunk>> {
        self.chunks.get_mut(&y)
    }

    /// Inserts (or replaces) the chunk at chunk-y `y`.
    pub fn insert(&mut self, y: i32, chunk: Arc<Chunk>) -> Option<Arc<Chunk>> {
        self.chunks.insert(y, chunk)
    }

    /// Returns `true` if chunk-y `y` is loaded.
    pub fn contains(&self, y: i32) -> bool {
        self.chunks.contains_key(&y)
    }

    /// Lowest loaded chunk-y.
    pub fn min_y(&self) -> Option<i32> {
        self.chunks.keys().next().copied()
    }

    /// Highest loaded chunk-y.
    pub fn max_y(&self) -> Option<i32> {
        self.chunks.keys().next_back().copied()
    }

    /// Number of loaded chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` when no chunk is loaded.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Keeps only chunks with `|y - camera_y| <= max_distance` and returns
    /// how many were dropped.
    ///
    /// A negative `max_distance` empties the column.
    pub fn update(&mut self, max_distance: i32, camera_y: i32) -> usize {
        let before = self.chunks.len();
        if max_distance < 0 {
            self.chunks.clear();
            return before;
        }
        let lo = camera_y.saturating_sub(max_distance);
        let hi = camera_y.saturating_add(max_distance);
        self.chunks.retain(|y, _| (lo..=hi).contains(y));
        before - self.chunks.len()
    }

    /// Iterates chunks from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &Arc<Chunk>)> {
        self.chunks.iter().map(|(y, c)| (*y, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pos::ChunkPos;

    fn column_with(ys: &[i32]) -> ChunkColumn {
        let mut column = ChunkColumn::new();
        for &y in ys {
            column.insert(y, Arc::new(Chunk::new(ChunkPos::new(0, y, 0))));
        }
        column
    }

    #[test]
    fn test_min_max_track_loaded_range() {
        let column = column_with(&[3, -2, 7]);
        assert_eq!(column.min_y(), Some(-2));
        assert_eq!(column.max_y(), Some(7));
        assert_eq!(ChunkColumn::new().min_y(), None);
    }

    #[test]
    fn test_update_retains_vertical_window() {
        let mut column = column_with(&[-3, -1, 0, 1, 2, 5]);
        let dropped = column.update(1, 0);
        assert_eq!(dropped, 3);
        let ys: Vec<i32> = column.iter().map(|(y, _)| y).collect();
        assert_eq!(ys, vec![-1, 0, 1]);
    }

    #[test]
    fn test_negative_distance_clears() {
        let mut column = column_with(&[0, 1]);
        assert_eq!(column.update(-1, 0), 2);
        assert!(column.is_empty());
    }

    #[test]
    fn test_dropped_chunk_survives_outside_handle() {
        let mut column = column_with(&[4]);
        let held = column.get(4).cloned();
        column.update(0, 0);
        assert!(!column.contains(4));
        assert_eq!(held.map(|c| c.pos()), Some(ChunkPos::new(0, 4, 0)));
    }
}
