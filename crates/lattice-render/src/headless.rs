//! In-memory backend: buffers are byte vectors and the recorder keeps a
//! command list. Used by tests and by the headless driver.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lattice_voxel::ChunkPos;
use rustc_hash::FxHashSet;

use crate::frustum::Aabb;
use crate::gpu::{BasicBuffer, BufferFactory, CommandRecorder, QueryPool};

#[derive(Debug, Default)]
struct Counters {
    created: AtomicUsize,
    destroyed: AtomicUsize,
    uploads: AtomicUsize,
    bytes_uploaded: AtomicUsize,
}

/// A vertex buffer held in host memory.
#[derive(Debug)]
pub struct HeadlessBuffer {
    label: String,
    staged: Vec<u8>,
    contents: Vec<u8>,
    capacity: u64,
    destroyed: bool,
    counters: Arc<Counters>,
}

impl HeadlessBuffer {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Bytes visible to the "GPU" after the last upload.
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl BasicBuffer for HeadlessBuffer {
    fn reserve_to_fit(&mut self, bytes: u64) {
        if bytes > self.capacity {
            self.capacity = bytes.next_power_of_two();
            self.staged.clear();
        }
        self.staged.resize(bytes as usize, 0);
    }

    fn write(&mut self, offset: u64, data: &[u8]) {
        let start = offset as usize;
        let end = start + data.len();
        if end > self.staged.len() {
            self.staged.resize(end, 0);
        }
        self.staged[start..end].copy_from_slice(data);
    }

    fn upload(&mut self) {
        self.contents.clone_from(&self.staged);
        self.counters.uploads.fetch_add(1, Ordering::Relaxed);
        self.counters
            .bytes_uploaded
            .fetch_add(self.contents.len(), Ordering::Relaxed);
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.contents = Vec::new();
            self.staged = Vec::new();
            self.counters.destroyed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Creates [`HeadlessBuffer`]s and counts their lifecycle events.
#[derive(Clone, Debug, Default)]
pub struct HeadlessFactory {
    counters: Arc<Counters>,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> usize {
        self.counters.created.load(Ordering::Relaxed)
    }

    pub fn destroyed(&self) -> usize {
        self.counters.destroyed.load(Ordering::Relaxed)
    }

    /// Buffers created and not yet destroyed.
    pub fn live(&self) -> usize {
        self.created() - self.destroyed()
    }

    pub fn uploads(&self) -> usize {
        self.counters.uploads.load(Ordering::Relaxed)
    }

    pub fn bytes_uploaded(&self) -> usize {
        self.counters.bytes_uploaded.load(Ordering::Relaxed)
    }
}

impl BufferFactory for HeadlessFactory {
    type Buffer = HeadlessBuffer;

    fn create_buffer(&self, label: &str) -> HeadlessBuffer {
        self.counters.created.fetch_add(1, Ordering::Relaxed);
        HeadlessBuffer {
            label: label.to_owned(),
            staged: Vec::new(),
            contents: Vec::new(),
            capacity: 0,
            destroyed: false,
            counters: Arc::clone(&self.counters),
        }
    }
}

/// One recorded command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Draw { pos: ChunkPos, vertices: Range<u32> },
    DrawBounds(Aabb),
    BeginQuery(u32),
    EndQuery(u32),
}

/// Records commands into a list.
#[derive(Debug, Default)]
pub struct HeadlessRecorder {
    pub commands: Vec<Command>,
}

impl HeadlessRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Draw commands issued for `pos`.
    pub fn draws_of(&self, pos: ChunkPos) -> Vec<Range<u32>> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                Command::Draw { pos: p, vertices } if *p == pos => Some(vertices.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, Command::Draw { .. }))
            .count()
    }

    /// Vertices drawn across all draw commands.
    pub fn vertex_count(&self) -> u32 {
        self.commands
            .iter()
            .map(|command| match command {
                Command::Draw { vertices, .. } => vertices.len() as u32,
                _ => 0,
            })
            .sum()
    }
}

impl CommandRecorder<HeadlessBuffer> for HeadlessRecorder {
    fn draw(&mut self, pos: ChunkPos, _buffer: &HeadlessBuffer, vertices: Range<u32>) {
        self.commands.push(Command::Draw { pos, vertices });
    }

    fn draw_bounds(&mut self, aabb: &Aabb) {
        self.commands.push(Command::DrawBounds(*aabb));
    }

    fn begin_query(&mut self, slot: u32) {
        self.commands.push(Command::BeginQuery(slot));
    }

    fn end_query(&mut self, slot: u32) {
        self.commands.push(Command::EndQuery(slot));
    }
}

/// Query results set by hand: every slot is visible unless hidden.
#[derive(Debug, Default)]
pub struct HeadlessQueries {
    hidden: FxHashSet<u32>,
}

impl HeadlessQueries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_visible(&mut self, slot: u32, visible: bool) {
        if visible {
            self.hidden.remove(&slot);
        } else {
            self.hidden.insert(slot);
        }
    }
}

impl QueryPool for HeadlessQueries {
    fn is_visible(&self, slot: u32) -> bool {
        !self.hidden.contains(&slot)
    }
}
