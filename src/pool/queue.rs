//! Bounded FIFO of pending tasks with drain accounting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select_biased, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::probe::ProbeRequest;

/// A unit of work for the pool.
///
/// Probing is the only kind of work today; new kinds become new variants
/// handled by [`super::TaskHandler`].
#[derive(Debug, Clone)]
pub enum Task {
    Probe(Arc<ProbeRequest>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The cancel channel fired while waiting for space.
    #[error("enqueue interrupted")]
    Interrupted,
    /// Every receiving end is gone.
    #[error("task queue disconnected")]
    Disconnected,
}

/// Count of tasks enqueued but not yet marked done.
#[derive(Debug, Default)]
struct Unfinished {
    count: Mutex<usize>,
    drained: Condvar,
}

impl Unfinished {
    fn add(&self) {
        *self.count.lock() += 1;
    }

    fn finish(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }
}

/// Bounded multi-producer multi-consumer task queue.
///
/// `enqueue` blocks while the queue is full; `try_dequeue` never blocks so
/// workers can keep an eye on their exit flag.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    tx: Sender<Task>,
    rx: Receiver<Task>,
    unfinished: Arc<Unfinished>,
}

impl TaskQueue {
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            unfinished: Arc::new(Unfinished::default()),
        }
    }

    /// Tasks currently waiting in the queue.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Tasks enqueued but not yet marked [`done`](Self::done), including ones being executed.
    pub fn unfinished(&self) -> usize {
        *self.unfinished.count.lock()
    }

    /// Enqueue, blocking while the queue is full.
    pub fn enqueue(&self, task: Task) -> Result<(), QueueError> {
        self.unfinished.add();
        self.tx.send(task).map_err(|_| {
            self.unfinished.finish();
            QueueError::Disconnected
        })
    }

    /// Enqueue, blocking while the queue is full, unless `cancel` receives
    /// a message or disconnects first.
    ///
    /// A ready `cancel` always wins, even when there is room in the queue.
    pub fn enqueue_until(&self, task: Task, cancel: &Receiver<()>) -> Result<(), QueueError> {
        self.unfinished.add();
        let result = select_biased! {
            recv(cancel) -> _ => Err(QueueError::Interrupted),
            send(self.tx, task) -> sent => sent.map_err(|_| QueueError::Disconnected),
        };
        if result.is_err() {
            self.unfinished.finish();
        }
        result
    }

    /// Take the next task without blocking.
    pub fn try_dequeue(&self) -> Option<Task> {
        self.rx.try_recv().ok()
    }

    /// Mark one dequeued task as finished.
    pub fn done(&self) {
        self.unfinished.finish();
    }

    /// Block until every enqueued task has been marked done, or `timeout` passes.
    ///
    /// Returns whether the queue is drained.
    pub fn wait_drained(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.unfinished.count.lock();
        while *count > 0 {
            if self
                .unfinished
                .drained
                .wait_until(&mut count, deadline)
                .timed_out()
            {
                return *count == 0;
            }
        }
        true
    }
}
