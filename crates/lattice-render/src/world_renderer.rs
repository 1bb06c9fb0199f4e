//! Per-chunk GPU buffer lifecycle and culling.
//!
//! Mesh workers hand results to a [`ChunkSubmitter`], which keeps the newest
//! mesh per chunk in a back buffer. Once per frame the render thread swaps
//! that buffer out under the lock, uploads the meshes outside it, and draws.
//! Fresh uploads are drawn from the upload list for one frame and then join
//! the steady map, which is drawn every frame without re-upload.

use std::mem;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::Vec3;
use lattice_mesh::{ChunkMesh, GENERIC_STREAM, MeshSink, STREAM_COUNT};
use lattice_voxel::{ChunkPos, Face};
use rustc_hash::FxHashMap;

use crate::camera::Camera;
use crate::frustum::{Aabb, Frustum};
use crate::gpu::{BasicBuffer, BufferFactory, CommandRecorder, DeferQueue, QueryPool};

/// Renderer configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererSettings {
    /// Hide chunks whose last occlusion query passed no samples.
    pub occlusion_culling: bool,
    /// Chunks farther than this many chunks draw the coarse LOD stream.
    /// Zero disables LOD.
    pub lod_distance: u32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            occlusion_culling: true,
            lod_distance: 8,
        }
    }
}

/// Frames an erased chunk's stamp cutoff is kept before it is forgotten.
const ERASE_GRACE_FRAMES: u64 = 64;

#[derive(Default)]
struct Mailbox {
    pending: FxHashMap<ChunkPos, (ChunkMesh, u64)>,
    /// Highest accepted stamp per live chunk.
    newest: FxHashMap<ChunkPos, u64>,
    /// Cutoff stamp and the frame it was set on, per erased chunk.
    erased: FxHashMap<ChunkPos, (u64, u64)>,
    max_stamp_seen: u64,
    frame: u64,
    erase: Vec<ChunkPos>,
}

/// Producer side of the renderer, shared with the mesh pool.
#[derive(Clone, Default)]
pub struct ChunkSubmitter {
    mailbox: Arc<Mutex<Mailbox>>,
}

impl ChunkSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Meshes waiting for the next `prepare`.
    pub fn pending_len(&self) -> usize {
        lock(&self.mailbox).pending.len()
    }

    /// Coordinates whose stamps are remembered, live or recently erased.
    pub fn tracked_len(&self) -> usize {
        let mailbox = lock(&self.mailbox);
        mailbox.newest.len() + mailbox.erased.len()
    }

    /// Drops any waiting mesh for `pos` and rejects results stamped before now
    /// for the next `ERASE_GRACE_FRAMES` frames.
    fn schedule_erase(&self, positions: &[ChunkPos]) {
        let mut mailbox = lock(&self.mailbox);
        let (cutoff, frame) = (mailbox.max_stamp_seen, mailbox.frame);
        for &pos in positions {
            mailbox.pending.remove(&pos);
            mailbox.newest.remove(&pos);
            mailbox.erased.insert(pos, (cutoff, frame));
            mailbox.erase.push(pos);
        }
    }
}

impl MeshSink for ChunkSubmitter {
    fn submit(&self, mesh: ChunkMesh, stamp: u64) {
        let mut mailbox = lock(&self.mailbox);
        mailbox.max_stamp_seen = mailbox.max_stamp_seen.max(stamp);
        let pos = mesh.pos;
        let floor = match mailbox.newest.get(&pos) {
            Some(&newest) => Some(newest),
            None => mailbox.erased.get(&pos).map(|&(cutoff, _)| cutoff),
        };
        if let Some(newest) = floor
            && stamp <= newest
        {
            tracing::trace!(?pos, stamp, newest, "discarding stale mesh");
            return;
        }
        mailbox.erased.remove(&pos);
        mailbox.newest.insert(pos, stamp);
        mailbox.pending.insert(pos, (mesh, stamp));
    }
}

/// GPU geometry for one chunk.
pub struct ChunkBuffer<B> {
    pub pos: ChunkPos,
    pub stamp: u64,
    /// `None` when the mesh is empty.
    pub buffer: Option<B>,
    pub ranges: [Range<u32>; STREAM_COUNT],
    pub vertex_count: u32,
    query_slot: Option<u32>,
    queried: bool,
}

impl<B> ChunkBuffer<B> {
    pub fn aabb(&self) -> Aabb {
        Aabb::of_chunk(self.pos)
    }

    pub fn query_slot(&self) -> Option<u32> {
        self.query_slot
    }

    pub fn face_range(&self, face: Face) -> Range<u32> {
        self.ranges[face.index()].clone()
    }

    pub fn lod_range(&self) -> Range<u32> {
        self.ranges[GENERIC_STREAM].clone()
    }
}

/// Counters for one `draw` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Chunks that issued geometry.
    pub drawn: usize,
    pub draw_calls: usize,
    pub vertices: u64,
    pub frustum_culled: usize,
    pub occluded: usize,
    /// Chunks drawn with the LOD stream.
    pub lod: usize,
    /// Chunks whose mesh is empty.
    pub empty: usize,
    /// Uploads promoted into the steady map this frame.
    pub promoted: usize,
}

/// Occlusion query slots, recycled through a free list.
#[derive(Default)]
struct QuerySlots {
    free: Vec<u32>,
    next: u32,
}

impl QuerySlots {
    fn acquire(&mut self) -> u32 {
        self.free.pop().unwrap_or_else(|| {
            let slot = self.next;
            self.next += 1;
            slot
        })
    }

    fn release(&mut self, slot: u32) {
        self.free.push(slot);
    }
}

/// Owns every chunk's GPU buffer and draws the visible ones.
pub struct WorldRenderer<F: BufferFactory> {
    factory: F,
    settings: RendererSettings,
    defer: Arc<dyn DeferQueue>,
    submitter: ChunkSubmitter,
    front: FxHashMap<ChunkPos, (ChunkMesh, u64)>,
    uploaded: FxHashMap<ChunkPos, ChunkBuffer<F::Buffer>>,
    steady: FxHashMap<ChunkPos, ChunkBuffer<F::Buffer>>,
    slots: QuerySlots,
}

impl<F: BufferFactory> WorldRenderer<F> {
    pub fn new(factory: F, settings: RendererSettings, defer: Arc<dyn DeferQueue>) -> Self {
        Self {
            factory,
            settings,
            defer,
            submitter: ChunkSubmitter::new(),
            front: FxHashMap::default(),
            uploaded: FxHashMap::default(),
            steady: FxHashMap::default(),
            slots: QuerySlots::default(),
        }
    }

    /// A handle for mesh producers.
    pub fn submitter(&self) -> ChunkSubmitter {
        self.submitter.clone()
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Swaps in submitted meshes, applies erasures and uploads.
    /// Returns the number of meshes uploaded.
    pub fn prepare(&mut self) -> usize {
        let erase = {
            let mut mailbox = lock(&self.submitter.mailbox);
            mem::swap(&mut mailbox.pending, &mut self.front);
            mailbox.frame += 1;
            let frame = mailbox.frame;
            mailbox
                .erased
                .retain(|_, &mut (_, erased_at)| frame - erased_at <= ERASE_GRACE_FRAMES);
            mem::take(&mut mailbox.erase)
        };

        for pos in erase {
            self.front.remove(&pos);
            if let Some(chunk) = self.uploaded.remove(&pos) {
                retire(chunk, &*self.defer, &mut self.slots);
            }
            if let Some(chunk) = self.steady.remove(&pos) {
                retire(chunk, &*self.defer, &mut self.slots);
            }
        }

        let mut count = 0;
        for (pos, (mesh, stamp)) in self.front.drain() {
            let chunk = upload(&self.factory, mesh, stamp);
            if let Some(old) = self.uploaded.insert(pos, chunk) {
                retire(old, &*self.defer, &mut self.slots);
            }
            count += 1;
        }
        if count > 0 {
            tracing::trace!(count, "uploaded chunk meshes");
        }
        count
    }

    /// Records draw commands for every visible chunk. A steady chunk with a
    /// fresh upload is drawn once, from the upload.
    pub fn draw<R>(&mut self, camera: &Camera, recorder: &mut R, queries: &dyn QueryPool) -> DrawStats
    where
        R: CommandRecorder<F::Buffer>,
    {
        let mut pass = DrawPass {
            frustum: Frustum::from_view_projection(&camera.view_projection()),
            eye: camera.position,
            eye_chunk: ChunkPos::from_world(camera.position),
            settings: &self.settings,
            queries,
            slots: &mut self.slots,
            stats: DrawStats::default(),
        };

        for (pos, chunk) in &mut self.steady {
            if !self.uploaded.contains_key(pos) {
                pass.draw_chunk(chunk, recorder);
            }
        }

        for (pos, mut chunk) in self.uploaded.drain() {
            if let Some(old) = self.steady.remove(&pos) {
                chunk.query_slot = old.query_slot;
                chunk.queried = old.queried;
                let ChunkBuffer { buffer, .. } = old;
                if let Some(buffer) = buffer {
                    defer_destroy(buffer, &*self.defer);
                }
            }
            pass.draw_chunk(&mut chunk, recorder);
            pass.stats.promoted += 1;
            self.steady.insert(pos, chunk);
        }

        pass.stats
    }

    /// Schedules erasure of every chunk farther than `radius` chunks from
    /// `origin`, the same spherical test `World::update` evicts with. Takes
    /// effect at the next `prepare`. Returns the count.
    pub fn erase_outside(&mut self, origin: ChunkPos, radius: u32) -> usize {
        let limit = i64::from(radius) * i64::from(radius);
        let far: Vec<ChunkPos> = self
            .steady
            .keys()
            .chain(self.uploaded.keys())
            .copied()
            .filter(|pos| pos.distance_sq(origin) > limit)
            .collect();
        if !far.is_empty() {
            tracing::debug!(count = far.len(), ?origin, radius, "erasing distant chunks");
            self.submitter.schedule_erase(&far);
        }
        far.len()
    }

    /// Defers destruction of every buffer and forgets all chunks.
    pub fn close(&mut self) {
        let chunks: Vec<_> = self
            .steady
            .drain()
            .chain(self.uploaded.drain())
            .map(|(_, chunk)| chunk)
            .collect();
        let count = chunks.len();
        for chunk in chunks {
            retire(chunk, &*self.defer, &mut self.slots);
        }
        self.front.clear();
        lock(&self.submitter.mailbox).pending.clear();
        tracing::debug!(count, "world renderer closed");
    }

    /// Chunk buffer in the steady map.
    pub fn chunk(&self, pos: ChunkPos) -> Option<&ChunkBuffer<F::Buffer>> {
        self.steady.get(&pos)
    }

    pub fn steady_len(&self) -> usize {
        self.steady.len()
    }

    /// Uploads waiting to be promoted by the next `draw`.
    pub fn uploaded_len(&self) -> usize {
        self.uploaded.len()
    }
}

impl<F: BufferFactory> Drop for WorldRenderer<F> {
    fn drop(&mut self) {
        if !self.steady.is_empty() || !self.uploaded.is_empty() {
            self.close();
        }
    }
}

struct DrawPass<'a> {
    frustum: Frustum,
    eye: Vec3,
    eye_chunk: ChunkPos,
    settings: &'a RendererSettings,
    queries: &'a dyn QueryPool,
    slots: &'a mut QuerySlots,
    stats: DrawStats,
}

impl DrawPass<'_> {
    fn draw_chunk<B, R>(&mut self, chunk: &mut ChunkBuffer<B>, recorder: &mut R)
    where
        R: CommandRecorder<B>,
    {
        let Some(buffer) = &chunk.buffer else {
            self.stats.empty += 1;
            return;
        };
        let aabb = chunk.aabb();
        if !self.frustum.test_box_3d(&aabb) {
            self.stats.frustum_culled += 1;
            return;
        }

        let query = if self.settings.occlusion_culling {
            let slot = *chunk.query_slot.get_or_insert_with(|| self.slots.acquire());
            let visible = !chunk.queried || self.queries.is_visible(slot);
            chunk.queried = true;
            recorder.begin_query(slot);
            if !visible {
                recorder.draw_bounds(&aabb);
                recorder.end_query(slot);
                self.stats.occluded += 1;
                return;
            }
            Some(slot)
        } else {
            None
        };

        let lod = self.settings.lod_distance;
        let use_lod = lod > 0
            && chunk.pos.distance_sq(self.eye_chunk) > i64::from(lod) * i64::from(lod)
            && !chunk.ranges[GENERIC_STREAM].is_empty();
        if use_lod {
            self.issue(recorder, chunk.pos, buffer, chunk.lod_range());
            self.stats.lod += 1;
        } else {
            for face in Face::ALL {
                let range = chunk.face_range(face);
                if !range.is_empty() && faces_camera(face, &aabb, self.eye) {
                    self.issue(recorder, chunk.pos, buffer, range);
                }
            }
        }
        self.stats.drawn += 1;

        if let Some(slot) = query {
            recorder.end_query(slot);
        }
    }

    fn issue<B, R>(&mut self, recorder: &mut R, pos: ChunkPos, buffer: &B, range: Range<u32>)
    where
        R: CommandRecorder<B>,
    {
        self.stats.draw_calls += 1;
        self.stats.vertices += u64::from(range.len() as u32);
        recorder.draw(pos, buffer, range);
    }
}

/// `false` when every face of direction `face` in `aabb` points away from `eye`.
fn faces_camera(face: Face, aabb: &Aabb, eye: Vec3) -> bool {
    let axis = face.axis();
    if face.is_positive() {
        eye[axis] > aabb.min[axis]
    } else {
        eye[axis] < aabb.max[axis]
    }
}

fn upload<F: BufferFactory>(factory: &F, mesh: ChunkMesh, stamp: u64) -> ChunkBuffer<F::Buffer> {
    let buffer = (!mesh.is_empty()).then(|| {
        let bytes: &[u8] = bytemuck::cast_slice(&mesh.vertices);
        let mut buffer = factory.create_buffer("chunk_vertices");
        buffer.reserve_to_fit(bytes.len() as u64);
        buffer.write(0, bytes);
        buffer.upload();
        buffer
    });
    ChunkBuffer {
        pos: mesh.pos,
        stamp,
        vertex_count: mesh.vertex_count(),
        ranges: mesh.ranges,
        buffer,
        query_slot: None,
        queried: false,
    }
}

fn retire<B: BasicBuffer>(chunk: ChunkBuffer<B>, defer: &dyn DeferQueue, slots: &mut QuerySlots) {
    if let Some(slot) = chunk.query_slot {
        slots.release(slot);
    }
    if let Some(buffer) = chunk.buffer {
        defer_destroy(buffer, defer);
    }
}

fn defer_destroy<B: BasicBuffer>(mut buffer: B, defer: &dyn DeferQueue) {
    defer.defer(Box::new(move || buffer.destroy()));
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
