//! Background chunk generation pool.
//!
//! A fixed set of named OS threads pulls [`GenerationJob`]s from an unbounded
//! `crossbeam-channel`, runs the generator, and inserts the result into the
//! shared storage. The in-flight guard set in storage is cleared by the worker
//! once the chunk is inserted (or discarded).

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::generator::WorldGenerator;
use crate::pos::ChunkPos;
use crate::world::Storage;

/// One chunk to generate.
pub(crate) struct GenerationJob {
    pub pos: ChunkPos,
    pub generator: Arc<dyn WorldGenerator>,
}

/// Worker threads feeding generated chunks into storage.
pub(crate) struct GenerationPool {
    sender: Option<Sender<GenerationJob>>,
    workers: Vec<JoinHandle<()>>,
    storage: Arc<Storage>,
}

impl GenerationPool {
    /// Spawns `threads` workers (at least one is attempted).
    ///
    /// Threads that fail to spawn are logged and skipped. With no workers at
    /// all, jobs run on the submitting thread.
    pub fn new(threads: usize, storage: Arc<Storage>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded::<GenerationJob>();
        let mut workers = Vec::with_capacity(threads.max(1));
        for index in 0..threads.max(1) {
            let rx: Receiver<GenerationJob> = rx.clone();
            let storage = Arc::clone(&storage);
            let spawned = std::thread::Builder::new()
                .name(format!("chunk-gen-{index}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        run_job(&storage, job);
                    }
                });
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => tracing::warn!("failed to spawn chunk-gen-{index}: {e}"),
            }
        }
        tracing::debug!(workers = workers.len(), "generation pool started");
        Self {
            sender: Some(tx),
            workers,
            storage,
        }
    }

    /// Queues a job. The caller has already claimed `job.pos` in the in-flight set.
    pub fn submit(&self, job: GenerationJob) {
        if self.workers.is_empty() {
            run_job(&self.storage, job);
            return;
        }
        let Some(sender) = &self.sender else {
            self.storage.release_in_flight(job.pos);
            return;
        };
        if let Err(e) = sender.send(job) {
            self.storage.release_in_flight(e.0.pos);
        }
    }

    /// Disconnects the job channel and joins every worker. Queued jobs still run.
    pub fn shutdown(&mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("chunk generation worker panicked");
            }
        }
    }
}

impl Drop for GenerationPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_job(storage: &Storage, job: GenerationJob) {
    let chunk = job.generator.generate(job.pos);
    if chunk.pos() == job.pos {
        storage.insert_chunk(chunk);
    } else {
        tracing::warn!(
            requested = ?job.pos,
            produced = ?chunk.pos(),
            "generator returned a chunk for the wrong position, discarding"
        );
    }
    storage.release_in_flight(job.pos);
}
