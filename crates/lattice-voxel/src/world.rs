//! Concurrent voxel world: chunk storage, streaming and dirty tracking.
//!
//! The chunk map and the dirty-update map sit behind separate mutexes. Chunks
//! are shared through `Arc`, so edits go through `Arc::make_mut` and never
//! disturb a [`WorldView`] captured earlier.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashSet;
use glam::{IVec3, Vec3};
use rustc_hash::FxHashMap;

use crate::block::Block;
use crate::chunk::{CHUNK_SIZE, Chunk};
use crate::column::ChunkColumn;
use crate::direction::{Direction, Face};
use crate::error::AccessError;
use crate::generation::{GenerationJob, GenerationPool};
use crate::generator::WorldGenerator;
use crate::pos::{ChunkPos, local_coord};
use crate::raycast::{Raycast, raycast};
use crate::view::WorldView;

/// Dirty-update bit marking a remesh that should jump the queue.
pub const IMPORTANT: u8 = 1 << 6;

/// Dirty-update bit widening the remesh to all 26 surrounding chunks.
const NEIGHBOURHOOD: u8 = 1 << 7;

/// Streaming parameters for a [`World`].
#[derive(Clone, Debug, PartialEq)]
pub struct WorldSettings {
    /// Lowest chunk-y considered for streaming.
    pub min_chunk_y: i32,
    /// Highest chunk-y considered for streaming.
    pub max_chunk_y: i32,
    /// Cap on outstanding generation requests.
    pub max_generation_in_flight: usize,
    /// Generation thread count; 0 picks half the logical CPUs.
    pub generation_threads: usize,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            min_chunk_y: -4,
            max_chunk_y: 8,
            max_generation_in_flight: 8,
            generation_threads: 0,
        }
    }
}

/// Outcome of one [`World::update`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Chunks dropped for being out of range.
    pub evicted: usize,
    /// Generation requests dispatched.
    pub dispatched: usize,
}

type ColumnMap = FxHashMap<(i32, i32), ChunkColumn>;

/// State shared between the world handle and its generation workers.
pub(crate) struct Storage {
    columns: Mutex<ColumnMap>,
    updates: Mutex<FxHashMap<ChunkPos, u8>>,
    in_flight: DashSet<ChunkPos>,
}

impl Storage {
    fn new() -> Self {
        Self {
            columns: Mutex::new(FxHashMap::default()),
            updates: Mutex::new(FxHashMap::default()),
            in_flight: DashSet::new(),
        }
    }

    /// Inserts a chunk and marks it for a full-neighbourhood remesh.
    ///
    /// Edge and corner neighbours are flagged too: any of them may have been
    /// waiting on this chunk to complete its view.
    pub(crate) fn insert_chunk(&self, chunk: Chunk) {
        let pos = chunk.pos();
        lock(&self.columns)
            .entry((pos.x, pos.z))
            .or_default()
            .insert(pos.y, Arc::new(chunk));
        *lock(&self.updates).entry(pos).or_insert(0) |= Direction::ALL.0 | NEIGHBOURHOOD;
    }

    pub(crate) fn release_in_flight(&self, pos: ChunkPos) {
        self.in_flight.remove(&pos);
    }

    fn push_update(&self, pos: ChunkPos, directions: Direction, important: bool) {
        let bits = (directions.0 & Direction::ALL.0) | if important { IMPORTANT } else { 0 };
        *lock(&self.updates).entry(pos).or_insert(0) |= bits;
    }
}

/// The voxel world.
pub struct World {
    storage: Arc<Storage>,
    settings: WorldSettings,
    generation: GenerationPool,
}

impl World {
    /// Creates an empty world and starts its generation pool.
    pub fn new(settings: WorldSettings) -> Self {
        let storage = Arc::new(Storage::new());
        let threads = match settings.generation_threads {
            0 => (num_cpus::get() / 2).max(1),
            n => n,
        };
        let generation = GenerationPool::new(threads, Arc::clone(&storage));
        Self {
            storage,
            settings,
            generation,
        }
    }

    /// The streaming parameters this world was created with.
    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    /// Reads a block at world coordinates.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Result<Block, AccessError> {
        let pos = ChunkPos::from_block(x, y, z);
        let columns = lock(&self.storage.columns);
        let chunk = lookup(&columns, pos).ok_or(AccessError::NotLoaded(pos))?;
        Ok(chunk.get(local_coord(x), local_coord(y), local_coord(z)))
    }

    /// Writes a block and schedules an important remesh.
    ///
    /// Writing air on a chunk border also flags the chunks sharing that border.
    pub fn set_block(&self, x: i32, y: i32, z: i32, block: Block) -> Result<(), AccessError> {
        let pos = ChunkPos::from_block(x, y, z);
        let (lx, ly, lz) = (local_coord(x), local_coord(y), local_coord(z));
        {
            let mut columns = lock(&self.storage.columns);
            let chunk = columns
                .get_mut(&(pos.x, pos.z))
                .and_then(|column| column.get_mut(pos.y))
                .ok_or(AccessError::NotLoaded(pos))?;
            Arc::make_mut(chunk).set(lx, ly, lz, block);
        }

        let mut directions = Direction::NONE;
        if block.is_air() {
            let last = CHUNK_SIZE - 1;
            for (local, neg, pos_face) in [
                (lx, Face::West, Face::East),
                (ly, Face::Down, Face::Up),
                (lz, Face::North, Face::South),
            ] {
                if local == 0 {
                    directions.insert(neg);
                }
                if local == last {
                    directions.insert(pos_face);
                }
            }
        }
        self.storage.push_update(pos, directions, true);
        Ok(())
    }

    /// Inserts a fully built chunk, replacing any chunk at the same position.
    pub fn insert_chunk(&self, chunk: Chunk) {
        self.storage.insert_chunk(chunk);
    }

    /// Flags `pos` (and the neighbours named by `directions`) for remeshing.
    pub fn mark_dirty(&self, pos: ChunkPos, directions: Direction, important: bool) {
        self.storage.push_update(pos, directions, important);
    }

    /// Streaming step around `origin` with a spherical `radius` in chunks.
    ///
    /// Evicts out-of-range chunks, then dispatches generation for missing
    /// chunks ring by ring, nearest first, until the in-flight cap is reached.
    pub fn update(
        &self,
        generator: &Arc<dyn WorldGenerator>,
        origin: ChunkPos,
        radius: i32,
    ) -> StreamStats {
        let radius = radius.max(0);
        let r2 = i64::from(radius) * i64::from(radius);
        let mut stats = StreamStats::default();
        let mut jobs = Vec::new();
        {
            let mut columns = lock(&self.storage.columns);
            columns.retain(|&(x, z), column| {
                let dx = i64::from(x - origin.x);
                let dz = i64::from(z - origin.z);
                let horizontal = dx * dx + dz * dz;
                if horizontal > r2 {
                    stats.evicted += column.len();
                    return false;
                }
                let max_dy = (r2 - horizontal).isqrt() as i32;
                stats.evicted += column.update(max_dy, origin.y);
                !column.is_empty()
            });

            let budget = self
                .settings
                .max_generation_in_flight
                .saturating_sub(self.storage.in_flight.len());
            if budget > 0 {
                let mut ys: Vec<i32> = (self.settings.min_chunk_y..=self.settings.max_chunk_y).collect();
                ys.sort_by_key(|y| (y - origin.y).abs());

                'rings: for ring in 0..=radius {
                    for (dx, dz) in ring_offsets(ring) {
                        let horizontal = i64::from(dx * dx + dz * dz);
                        if horizontal > r2 {
                            continue;
                        }
                        for &y in &ys {
                            let dy = i64::from(y - origin.y);
                            if horizontal + dy * dy > r2 {
                                continue;
                            }
                            let pos = ChunkPos::new(origin.x + dx, y, origin.z + dz);
                            if lookup(&columns, pos).is_some() {
                                continue;
                            }
                            if jobs.len() >= budget {
                                break 'rings;
                            }
                            if self.storage.in_flight.insert(pos) {
                                jobs.push(pos);
                            }
                        }
                    }
                }
            }
        }

        stats.dispatched = jobs.len();
        for pos in jobs {
            self.generation.submit(GenerationJob {
                pos,
                generator: Arc::clone(generator),
            });
        }
        if stats.evicted > 0 || stats.dispatched > 0 {
            tracing::trace!(
                evicted = stats.evicted,
                dispatched = stats.dispatched,
                "world streaming step"
            );
        }
        stats
    }

    /// Drains pending dirty updates and hands a view of every affected chunk
    /// to `callback` together with its importance flag.
    ///
    /// Views are captured while the chunk map is locked and require every
    /// neighbour, except above the top and below the bottom streamed layer
    /// where none will ever load. Chunks whose neighbourhood is incomplete
    /// are skipped. Returns the number of views delivered.
    pub fn consume_updates<F>(&self, mut callback: F) -> usize
    where
        F: FnMut(WorldView, bool),
    {
        let drained = std::mem::take(&mut *lock(&self.storage.updates));
        if drained.is_empty() {
            return 0;
        }

        let mut expanded: FxHashMap<ChunkPos, bool> = FxHashMap::default();
        for (pos, bits) in drained {
            let important = bits & IMPORTANT != 0;
            *expanded.entry(pos).or_default() |= important;
            if bits & NEIGHBOURHOOD != 0 {
                for dz in -1..=1 {
                    for dy in -1..=1 {
                        for dx in -1..=1 {
                            *expanded.entry(pos.offset(dx, dy, dz)).or_default() |= important;
                        }
                    }
                }
                continue;
            }
            for face in Direction(bits).faces() {
                *expanded.entry(pos.neighbor(face)).or_default() |= important;
            }
        }
        let mut ordered: Vec<(ChunkPos, bool)> = expanded.into_iter().collect();
        ordered.sort_unstable_by_key(|&(pos, important)| (!important, pos));

        let columns = lock(&self.storage.columns);
        let mut delivered = 0;
        for (pos, important) in ordered {
            let view = capture(&columns, pos, self.required_neighbours(pos));
            if view.failed() {
                tracing::trace!(?pos, "skipping remesh, neighbourhood incomplete");
                continue;
            }
            callback(view, important);
            delivered += 1;
        }
        delivered
    }

    fn required_neighbours(&self, pos: ChunkPos) -> Direction {
        let mut mask = Direction::ALL.0;
        if pos.y == self.settings.min_chunk_y {
            mask &= !Direction::DOWN.0;
        }
        if pos.y == self.settings.max_chunk_y {
            mask &= !Direction::UP.0;
        }
        Direction(mask)
    }

    /// Captures a view of `pos` requiring the neighbours covered by `mask`.
    pub fn view(&self, pos: ChunkPos, mask: Direction) -> WorldView {
        let columns = lock(&self.storage.columns);
        capture(&columns, pos, mask)
    }

    /// Casts a ray through loaded chunks.
    pub fn raycast(&self, from: Vec3, direction: Vec3, max_distance: f32) -> Option<Raycast> {
        let columns = lock(&self.storage.columns);
        raycast(from, direction, max_distance, |p: IVec3| {
            let pos = ChunkPos::from_block(p.x, p.y, p.z);
            lookup(&columns, pos).map(|c| c.get(local_coord(p.x), local_coord(p.y), local_coord(p.z)))
        })
    }

    /// Shared handle to a loaded chunk.
    pub fn chunk(&self, pos: ChunkPos) -> Option<Arc<Chunk>> {
        lookup(&lock(&self.storage.columns), pos).cloned()
    }

    /// Number of loaded chunks.
    pub fn loaded_count(&self) -> usize {
        lock(&self.storage.columns).values().map(ChunkColumn::len).sum()
    }

    /// Returns `true` if the chunk at `pos` is loaded.
    pub fn is_loaded(&self, pos: ChunkPos) -> bool {
        lookup(&lock(&self.storage.columns), pos).is_some()
    }

    /// Number of chunks with an undrained dirty update.
    pub fn pending_updates(&self) -> usize {
        lock(&self.storage.updates).len()
    }

    /// The undrained update for `pos`: direction bits and importance.
    pub fn pending_update(&self, pos: ChunkPos) -> Option<(Direction, bool)> {
        lock(&self.storage.updates)
            .get(&pos)
            .map(|&bits| (Direction(bits & Direction::ALL.0), bits & IMPORTANT != 0))
    }

    /// Number of generation requests not yet inserted.
    pub fn generation_in_flight(&self) -> usize {
        self.storage.in_flight.len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn lookup(columns: &ColumnMap, pos: ChunkPos) -> Option<&Arc<Chunk>> {
    columns.get(&(pos.x, pos.z)).and_then(|c| c.get(pos.y))
}

fn capture(columns: &ColumnMap, pos: ChunkPos, mask: Direction) -> WorldView {
    WorldView::capture(pos, mask, |p| lookup(columns, p).cloned())
}

/// Offsets on the square ring at Chebyshev distance `ring`.
fn ring_offsets(ring: i32) -> Vec<(i32, i32)> {
    if ring == 0 {
        return vec![(0, 0)];
    }
    let mut out = Vec::with_capacity((ring * 8) as usize);
    for i in -ring..=ring {
        out.push((i, -ring));
        out.push((i, ring));
    }
    for i in (-ring + 1)..ring {
        out.push((-ring, i));
        out.push((ring, i));
    }
    out
}
