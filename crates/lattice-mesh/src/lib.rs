//! Chunk meshing for lattice: greedy face merging at two levels of detail and
//! the worker pool that runs it off the render thread.

pub mod emitter;
pub mod face_buffer;
pub mod greedy;
pub mod render_pool;
pub mod sprites;
pub mod vertex;

pub use emitter::{ChunkMesh, GENERIC_STREAM, MeshEmitterSet, STREAM_COUNT, VERTICES_PER_QUAD};
pub use face_buffer::{CULLED, ChunkFaceBuffer, ChunkPlane, EMPTY};
pub use greedy::{GreedyMesher, LOD_STRIDE, MesherSettings};
pub use render_pool::{ChunkRenderPool, MeshSink, PoolSettings};
pub use sprites::{BlockSprites, MossRule, SpriteAtlas, SpriteId, SpriteLookup, UvRect};
pub use vertex::{CHUNK_VERTEX_ATTRIBUTES, CHUNK_VERTEX_LAYOUT, ChunkVertex};
