//! Bounded worker pool.
//!
//! A fixed set of [`Worker`]s pull [`Task`]s from a shared [`TaskQueue`]
//! and hand them to a [`TaskHandler`]. The producer is throttled by the
//! queue's capacity; workers back off while the queue is empty.

mod queue;
mod worker;

pub use queue::{QueueError, Task, TaskQueue};
pub use worker::{Backoff, Worker, WorkerState};

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Executes tasks on a worker thread.
///
/// Implementations must not panic; errors are handled inside `handle`.
pub trait TaskHandler: Send + Sync {
    fn handle(&self, task: Task);
}

/// A fixed set of workers sharing one queue.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Spawn `size` workers, numbered from zero.
    pub fn spawn<H: TaskHandler + 'static>(
        size: usize,
        queue: &TaskQueue,
        handler: Arc<H>,
        quiet: bool,
    ) -> io::Result<Self> {
        let mut pool = Self {
            workers: Vec::with_capacity(size),
        };
        for id in 0..size {
            // On failure the partially built pool is dropped, which stops
            // the workers already running.
            let worker = Worker::spawn(id, queue.clone(), handler.clone(), quiet)?;
            pool.workers.push(worker);
        }
        Ok(pool)
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Block until every worker is Idle or Terminated.
    pub fn wait_idle(&self) {
        for worker in &self.workers {
            worker.wait();
        }
    }

    /// Like [`wait_idle`](Self::wait_idle), giving up at the timeout.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.workers.iter().all(|worker| {
            let left = deadline.saturating_duration_since(Instant::now());
            worker.wait_timeout(left)
        })
    }

    pub fn request_exit(&self) {
        for worker in &self.workers {
            worker.request_exit();
        }
    }

    /// Wait for every worker to terminate. Call after [`request_exit`](Self::request_exit).
    pub fn join(&mut self) {
        for worker in &mut self.workers {
            worker.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.request_exit();
        self.join();
    }
}
