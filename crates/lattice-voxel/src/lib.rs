//! Voxel storage for lattice: packed blocks, lazily allocated chunks, the
//! streaming [`World`] with dirty tracking, and [`WorldView`] snapshots.

pub mod block;
pub mod chunk;
pub mod column;
pub mod direction;
pub mod error;
mod generation;
pub mod generator;
pub mod pos;
pub mod raycast;
pub mod view;
pub mod world;

pub use block::{Block, BlockType};
pub use chunk::{CHUNK_BITS, CHUNK_MASK, CHUNK_SIZE, CHUNK_VOLUME, Chunk};
pub use column::ChunkColumn;
pub use direction::{Direction, Face};
pub use error::AccessError;
pub use generator::{EmptyGenerator, FlatGenerator, WorldGenerator};
pub use pos::{ChunkPos, local_coord};
pub use raycast::Raycast;
pub use view::WorldView;
pub use world::{IMPORTANT, StreamStats, World, WorldSettings};
