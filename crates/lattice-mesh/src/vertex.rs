//! Chunk vertex format and its `wgpu` buffer layout.
//!
//! | Location | Offset | Format    | Field                                  |
//! |----------|--------|-----------|----------------------------------------|
//! | 0        | 0      | Float32x3 | world-space position                   |
//! | 1        | 12     | Float32x2 | uv in tile units (repeats per voxel)   |
//! | 2        | 20     | Float32x4 | atlas rect of the sprite (u0 v0 u1 v1) |

use std::mem;

use wgpu::{VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

/// One vertex of a meshed chunk. Quads are emitted as two non-indexed triangles.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ChunkVertex {
    /// World-space position.
    pub position: [f32; 3],
    /// Texture coordinates scaled by the quad's size in voxels, so the shader
    /// wraps them with `fract` inside `sprite_rect`.
    pub uv: [f32; 2],
    /// Normalized atlas rectangle `[u0, v0, u1, v1]`.
    pub sprite_rect: [f32; 4],
}

static_assertions::assert_eq_size!(ChunkVertex, [u8; 36]);

/// Vertex attributes matching [`ChunkVertex`].
pub const CHUNK_VERTEX_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    VertexAttribute {
        format: VertexFormat::Float32x2,
        offset: 12,
        shader_location: 1,
    },
    VertexAttribute {
        format: VertexFormat::Float32x4,
        offset: 20,
        shader_location: 2,
    },
];

/// Buffer layout shared by every chunk pipeline.
pub const CHUNK_VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: mem::size_of::<ChunkVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &CHUNK_VERTEX_ATTRIBUTES,
};

const _: () = assert!(
    CHUNK_VERTEX_ATTRIBUTES[2].offset + 16 == mem::size_of::<ChunkVertex>() as u64,
    "last attribute must end at the vertex stride"
);
