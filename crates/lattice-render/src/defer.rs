//! Frame-delayed destruction.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::gpu::DeferQueue;

type Task = Box<dyn FnOnce() + Send>;

struct State {
    frame: u64,
    tasks: VecDeque<(u64, Task)>,
}

/// Holds deferred closures until `frames_in_flight` frames have ended.
pub struct FrameDeferQueue {
    frames_in_flight: u64,
    state: Mutex<State>,
}

impl FrameDeferQueue {
    pub fn new(frames_in_flight: u32) -> Self {
        Self {
            frames_in_flight: u64::from(frames_in_flight),
            state: Mutex::new(State {
                frame: 0,
                tasks: VecDeque::new(),
            }),
        }
    }

    /// Marks the end of a frame and runs every task whose frame has retired.
    /// Returns the number of tasks run.
    pub fn end_frame(&self) -> usize {
        let ready: Vec<Task> = {
            let mut state = lock(&self.state);
            state.frame += 1;
            let frame = state.frame;
            let mut ready = Vec::new();
            while let Some(queued) = state.tasks.front().map(|(queued, _)| *queued)
                && frame - queued >= self.frames_in_flight
            {
                if let Some((_, task)) = state.tasks.pop_front() {
                    ready.push(task);
                }
            }
            ready
        };
        let count = ready.len();
        for task in ready {
            task();
        }
        count
    }

    /// Runs every pending task now. Used at shutdown once the device is idle.
    pub fn flush(&self) -> usize {
        let tasks: Vec<(u64, Task)> = lock(&self.state).tasks.drain(..).collect();
        let count = tasks.len();
        for (_, task) in tasks {
            task();
        }
        count
    }

    pub fn pending(&self) -> usize {
        lock(&self.state).tasks.len()
    }
}

impl DeferQueue for FrameDeferQueue {
    fn defer(&self, task: Task) {
        let mut state = lock(&self.state);
        let frame = state.frame;
        state.tasks.push_back((frame, task));
    }
}

impl Drop for FrameDeferQueue {
    fn drop(&mut self) {
        let flushed = self.flush();
        if flushed > 0 {
            tracing::debug!(flushed, "ran deferred tasks on drop");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
