//! Chunk buffer lifecycle and culling: meshes submitted by the worker pool are
//! double-buffered, uploaded once and drawn every frame behind frustum,
//! per-face and occlusion culling.

pub mod camera;
pub mod defer;
pub mod frustum;
pub mod gpu;
pub mod headless;
pub mod wgpu_buffer;
pub mod world_renderer;

pub use camera::Camera;
pub use defer::FrameDeferQueue;
pub use frustum::{Aabb, Frustum};
pub use gpu::{BasicBuffer, BufferFactory, CommandRecorder, DeferQueue, QueryPool};
pub use headless::{Command, HeadlessBuffer, HeadlessFactory, HeadlessQueries, HeadlessRecorder};
pub use wgpu_buffer::{WgpuBuffer, WgpuBufferFactory};
pub use world_renderer::{ChunkBuffer, ChunkSubmitter, DrawStats, RendererSettings, WorldRenderer};
