//! Two-lane mesh worker pool.
//!
//! Callers enqueue [`WorldView`]s on a high or low priority lane. Workers
//! drain the high lane first, mesh the view's centre chunk with
//! [`GreedyMesher`] into thread-local scratch buffers, and forward the packed
//! result to a [`MeshSink`] tagged with the stamp taken at enqueue time.
//!
//! A set of queued coordinates rejects a second request for a chunk that is
//! already waiting; the coordinate leaves the set when a worker picks the job
//! up.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use lattice_voxel::{CHUNK_SIZE, ChunkPos, WorldView};
use rustc_hash::FxHashSet;

use crate::emitter::{ChunkMesh, MeshEmitterSet};
use crate::face_buffer::ChunkFaceBuffer;
use crate::greedy::{GreedyMesher, MesherSettings};
use crate::sprites::BlockSprites;

/// Receives finished meshes. Implemented by the renderer's submission side.
pub trait MeshSink: Send + Sync {
    /// Accepts a mesh; a higher `stamp` supersedes a lower one for the same chunk.
    fn submit(&self, mesh: ChunkMesh, stamp: u64);
}

/// Pool configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct PoolSettings {
    /// Worker threads; 0 uses the number of logical CPUs.
    pub workers: usize,
    /// Capacity of each lane.
    pub queue_capacity: usize,
    /// Jobs that waited longer than this are logged.
    pub starvation_warning: Duration,
    /// Merge policy handed to every worker's mesher.
    pub mesher: MesherSettings,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: 4096,
            starvation_warning: Duration::from_millis(100),
            mesher: MesherSettings::default(),
        }
    }
}

struct Job {
    view: WorldView,
    stamp: u64,
    queued_at: Instant,
}

/// State shared by the pool handle and its workers.
struct Shared {
    queued: Mutex<FxHashSet<ChunkPos>>,
    stop: AtomicBool,
    sprites: Arc<BlockSprites>,
    sink: Arc<dyn MeshSink>,
    mesher: GreedyMesher,
    starvation_warning: Duration,
}

/// Fixed pool of mesh workers fed by two bounded lanes.
pub struct ChunkRenderPool {
    high: Option<Sender<Job>>,
    low: Option<Sender<Job>>,
    shared: Arc<Shared>,
    next_stamp: AtomicU64,
    workers: Vec<JoinHandle<()>>,
}

impl ChunkRenderPool {
    /// Starts the workers.
    pub fn new(settings: PoolSettings, sprites: Arc<BlockSprites>, sink: Arc<dyn MeshSink>) -> Self {
        let capacity = settings.queue_capacity.max(1);
        let (high_tx, high_rx) = crossbeam_channel::bounded::<Job>(capacity);
        let (low_tx, low_rx) = crossbeam_channel::bounded::<Job>(capacity);
        let shared = Arc::new(Shared {
            queued: Mutex::new(FxHashSet::default()),
            stop: AtomicBool::new(false),
            sprites,
            sink,
            mesher: GreedyMesher::new(settings.mesher),
            starvation_warning: settings.starvation_warning,
        });

        let count = match settings.workers {
            0 => num_cpus::get().max(1),
            n => n,
        };
        let mut workers = Vec::with_capacity(count);
        for index in 0..count {
            let (high, low) = (high_rx.clone(), low_rx.clone());
            let shared = Arc::clone(&shared);
            let spawned = std::thread::Builder::new()
                .name(format!("mesh-worker-{index}"))
                .spawn(move || worker_loop(&shared, &high, &low));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => tracing::warn!("failed to spawn mesh-worker-{index}: {e}"),
            }
        }
        if workers.is_empty() {
            tracing::error!("no mesh workers could be started, chunks will not be meshed");
        } else {
            tracing::info!(workers = workers.len(), capacity, "chunk render pool started");
        }

        Self {
            high: Some(high_tx),
            low: Some(low_tx),
            shared,
            next_stamp: AtomicU64::new(1),
            workers,
        }
    }

    /// Queues `view` for meshing on the high lane when `important`.
    ///
    /// Returns `false` if the chunk is already queued, the lane is full, or
    /// the pool is closed.
    pub fn enqueue(&self, view: WorldView, important: bool) -> bool {
        let (Some(high), Some(low)) = (&self.high, &self.low) else {
            return false;
        };
        if self.shared.stop.load(Ordering::Acquire) {
            return false;
        }
        let pos = view.center();
        if !lock(&self.shared.queued).insert(pos) {
            tracing::debug!(?pos, "chunk already queued for meshing");
            return false;
        }

        let job = Job {
            view,
            stamp: self.next_stamp.fetch_add(1, Ordering::Relaxed),
            queued_at: Instant::now(),
        };
        let lane = if important { high } else { low };
        match lane.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                lock(&self.shared.queued).remove(&pos);
                tracing::warn!(?pos, important, "mesh lane full, dropping request");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                lock(&self.shared.queued).remove(&pos);
                false
            }
        }
    }

    /// Number of coordinates waiting for a worker.
    pub fn queued_len(&self) -> usize {
        lock(&self.shared.queued).len()
    }

    /// Returns `true` if `pos` is waiting for a worker.
    pub fn is_queued(&self, pos: ChunkPos) -> bool {
        lock(&self.shared.queued).contains(&pos)
    }

    /// Number of running workers.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops the workers and waits for them. Queued jobs are dropped.
    pub fn close(&mut self) {
        if self.high.is_none() && self.workers.is_empty() {
            return;
        }
        self.shared.stop.store(true, Ordering::Release);
        self.high.take();
        self.low.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("mesh worker panicked");
            }
        }
        lock(&self.shared.queued).clear();
        tracing::debug!("chunk render pool closed");
    }
}

impl Drop for ChunkRenderPool {
    fn drop(&mut self) {
        self.close();
    }
}

fn worker_loop(shared: &Shared, high: &Receiver<Job>, low: &Receiver<Job>) {
    let mut faces = ChunkFaceBuffer::new(CHUNK_SIZE);
    let mut emitter = MeshEmitterSet::new();

    loop {
        if shared.stop.load(Ordering::Acquire) {
            break;
        }
        let next = match high.try_recv() {
            Ok(job) => Ok(job),
            Err(_) => crossbeam_channel::select! {
                recv(high) -> msg => msg,
                recv(low) -> msg => msg,
            },
        };
        let Ok(job) = next else {
            break;
        };
        if shared.stop.load(Ordering::Acquire) {
            break;
        }

        let pos = job.view.center();
        lock(&shared.queued).remove(&pos);

        report_starvation(pos, job.queued_at.elapsed(), shared.starvation_warning);
        if job.view.is_empty() {
            tracing::trace!(?pos, "skipping empty chunk");
            continue;
        }

        shared
            .mesher
            .emit_chunk(&job.view, &shared.sprites, &mut faces, &mut emitter);
        shared.sink.submit(emitter.to_mesh(pos), job.stamp);
    }
}

/// Warns when a job sat in its lane longer than `limit`.
fn report_starvation(pos: ChunkPos, waited: Duration, limit: Duration) -> bool {
    if waited <= limit {
        return false;
    }
    tracing::warn!(?pos, waited_ms = waited.as_millis() as u64, "mesh job starved");
    true
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
