//! Voxel access errors.

use thiserror::Error;

use crate::pos::ChunkPos;

/// Failure to reach a block through the [`World`](crate::World).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The chunk containing the block is outside the streamed window.
    #[error("chunk {0:?} is not loaded")]
    NotLoaded(ChunkPos),
}
