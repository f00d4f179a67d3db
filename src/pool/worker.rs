//! Long-lived worker threads.
//!
//! Each worker moves through
//!
//! ```text
//! Spawned ──▶ Idle ◀──▶ Busy
//!               │
//!               ▼ (exit requested, seen between tasks)
//!            Exiting ──▶ Terminated
//! ```
//!
//! The exit flag is only checked between tasks, so a worker always finishes
//! the task it is running.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::queue::TaskQueue;
use super::TaskHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Spawned,
    Idle,
    Busy,
    Exiting,
    Terminated,
}

impl WorkerState {
    /// States in which the worker holds no task.
    pub fn is_settled(self) -> bool {
        matches!(self, WorkerState::Idle | WorkerState::Terminated)
    }
}

/// Adaptive idle delay.
///
/// The n-th consecutive empty poll sleeps `n / 20` seconds, clamped to
/// `[100ms, 1s]`. Finding work resets the count.
#[derive(Debug, Clone, Default)]
pub struct Backoff {
    idle_iterations: u32,
}

impl Backoff {
    pub const MIN: Duration = Duration::from_millis(100);
    pub const MAX: Duration = Duration::from_secs(1);
    /// Delay added per consecutive empty poll (1/20 s).
    const STEP: Duration = Duration::from_millis(50);

    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more empty poll and return how long to sleep.
    pub fn next_delay(&mut self) -> Duration {
        self.idle_iterations = self.idle_iterations.saturating_add(1);
        (Self::STEP * self.idle_iterations).clamp(Self::MIN, Self::MAX)
    }

    pub fn reset(&mut self) {
        self.idle_iterations = 0;
    }

    pub fn idle_iterations(&self) -> u32 {
        self.idle_iterations
    }
}

#[derive(Debug)]
struct Status {
    state: WorkerState,
    exit: bool,
}

/// State shared between a worker thread and its handle.
#[derive(Debug)]
struct Control {
    status: Mutex<Status>,
    changed: Condvar,
}

impl Control {
    fn new() -> Self {
        Self {
            status: Mutex::new(Status {
                state: WorkerState::Spawned,
                exit: false,
            }),
            changed: Condvar::new(),
        }
    }

    fn state(&self) -> WorkerState {
        self.status.lock().state
    }

    fn set_state(&self, state: WorkerState) {
        let mut status = self.status.lock();
        if status.state != state {
            status.state = state;
            self.changed.notify_all();
        }
    }

    fn exit_requested(&self) -> bool {
        self.status.lock().exit
    }

    fn request_exit(&self) {
        self.status.lock().exit = true;
        self.changed.notify_all();
    }

    /// Sleep for `delay`, returning early if exit is requested.
    fn idle_sleep(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        let mut status = self.status.lock();
        while !status.exit {
            if self.changed.wait_until(&mut status, deadline).timed_out() {
                break;
            }
        }
    }

    /// Wait until `done(state)` holds or the deadline passes.
    fn wait_for(&self, deadline: Option<Instant>, done: impl Fn(WorkerState) -> bool) -> bool {
        let mut status = self.status.lock();
        while !done(status.state) {
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut status, deadline).timed_out() {
                        return done(status.state);
                    }
                }
                None => self.changed.wait(&mut status),
            }
        }
        true
    }
}

/// Marks the worker terminated however its thread ends, including by panic.
struct TerminateOnDrop(Arc<Control>);

impl Drop for TerminateOnDrop {
    fn drop(&mut self) {
        self.0.set_state(WorkerState::Terminated);
    }
}

/// The body of a worker thread.
struct WorkerLoop<H> {
    id: usize,
    queue: TaskQueue,
    handler: Arc<H>,
    control: Arc<Control>,
    backoff: Backoff,
    quiet: bool,
}

impl<H: TaskHandler> WorkerLoop<H> {
    fn run(mut self) {
        let _terminate = TerminateOnDrop(self.control.clone());
        self.on_spawn();

        while !self.control.exit_requested() {
            match self.queue.try_dequeue() {
                None => {
                    if self.control.state() != WorkerState::Idle {
                        self.log("No work, sleeping...");
                        self.backoff.reset();
                        self.control.set_state(WorkerState::Idle);
                    }
                    let delay = self.backoff.next_delay();
                    self.control.idle_sleep(delay);
                }
                Some(task) => {
                    self.control.set_state(WorkerState::Busy);
                    self.backoff.reset();
                    self.handler.handle(task);
                    self.queue.done();
                }
            }
        }

        self.on_exit();
    }

    fn on_spawn(&self) {
        self.log("Spawned!");
        self.control.set_state(WorkerState::Idle);
    }

    fn on_exit(&self) {
        self.control.set_state(WorkerState::Exiting);
        self.log("Exited");
    }

    fn log(&self, message: &str) {
        if !self.quiet {
            tracing::info!(worker = self.id, "{}", message);
        }
    }
}

/// Handle to one worker thread.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    control: Arc<Control>,
    handle: Option<JoinHandle<()>>,
    quiet: bool,
}

impl Worker {
    /// Start a worker pulling from `queue`.
    pub fn spawn<H: TaskHandler + 'static>(
        id: usize,
        queue: TaskQueue,
        handler: Arc<H>,
        quiet: bool,
    ) -> io::Result<Self> {
        let control = Arc::new(Control::new());
        let body = WorkerLoop {
            id,
            queue,
            handler,
            control: control.clone(),
            backoff: Backoff::new(),
            quiet,
        };
        let handle = thread::Builder::new()
            .name(format!("worker-{:02}", id))
            .spawn(move || body.run())?;

        Ok(Self {
            id,
            control,
            handle: Some(handle),
            quiet,
        })
    }

    pub fn state(&self) -> WorkerState {
        self.control.state()
    }

    /// Block until the worker is Idle or Terminated.
    pub fn wait(&self) {
        self.control.wait_for(None, WorkerState::is_settled);
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`. Returns whether it settled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.control
            .wait_for(Some(Instant::now() + timeout), WorkerState::is_settled)
    }

    /// Ask the worker to stop after its current task.
    pub fn request_exit(&self) {
        if self.handle.is_none() {
            return;
        }
        if !self.quiet {
            tracing::info!(worker = self.id, "Stopping...");
        }
        self.control.request_exit();
    }

    /// Wait for the thread to terminate and reap it.
    pub fn join(&mut self) {
        self.control
            .wait_for(None, |state| state == WorkerState::Terminated);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!(worker = self.id, "worker thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::pool::Task;
    use crate::probe::ProbeRequest;

    #[test]
    fn test_backoff_bounds_and_monotonic() {
        let mut backoff = Backoff::new();
        let mut last = Duration::ZERO;
        for _ in 0..100 {
            let delay = backoff.next_delay();
            assert!(delay >= Backoff::MIN && delay <= Backoff::MAX);
            assert!(delay >= last);
            last = delay;
        }
        assert_eq!(last, Backoff::MAX);

        backoff.reset();
        assert_eq!(backoff.idle_iterations(), 0);
        assert_eq!(backoff.next_delay(), Backoff::MIN);
    }

    #[test]
    fn test_backoff_curve() {
        let mut backoff = Backoff::new();
        let delays: Vec<u128> = (0..22).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(&delays[..4], &[100, 100, 150, 200]);
        assert_eq!(delays[9], 500);
        assert_eq!(delays[19], 1000);
        assert_eq!(delays[21], 1000);
    }

    struct Slow {
        ran: AtomicUsize,
    }

    impl TaskHandler for Slow {
        fn handle(&self, _task: Task) {
            thread::sleep(Duration::from_millis(200));
            self.ran.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn task() -> Task {
        Task::Probe(Arc::new(ProbeRequest {
            url: reqwest::Url::parse("http://lb.local/").unwrap(),
            method: reqwest::Method::GET,
            header: reqwest::header::HeaderName::from_static("x-node-id"),
        }))
    }

    #[test]
    fn test_worker_finishes_current_task_before_exit() {
        let queue = TaskQueue::bounded(4);
        let handler = Arc::new(Slow {
            ran: AtomicUsize::new(0),
        });
        let mut worker = Worker::spawn(0, queue.clone(), handler.clone(), true).unwrap();

        queue.enqueue(task()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while worker.state() != WorkerState::Busy && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(worker.state(), WorkerState::Busy);
        assert!(!worker.wait_timeout(Duration::from_millis(10)));

        worker.request_exit();
        worker.join();
        assert_eq!(worker.state(), WorkerState::Terminated);
        assert_eq!(handler.ran.load(Ordering::SeqCst), 1);
        assert_eq!(queue.unfinished(), 0);
    }

    #[test]
    fn test_idle_worker_exits_promptly() {
        let queue = TaskQueue::bounded(1);
        let handler = Arc::new(Slow {
            ran: AtomicUsize::new(0),
        });
        let mut worker = Worker::spawn(1, queue, handler, true).unwrap();

        // Let it back off to the ceiling
        thread::sleep(Duration::from_millis(1500));
        worker.wait();
        assert_eq!(worker.state(), WorkerState::Idle);

        let started = Instant::now();
        worker.request_exit();
        worker.join();
        assert!(started.elapsed() < Backoff::MAX);
        assert_eq!(worker.state(), WorkerState::Terminated);
    }
}
