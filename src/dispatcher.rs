//! The main control loop: spawn workers, produce probes, shut down.
//!
//! ```text
//!  Dispatcher ──enqueue──▶ TaskQueue ──▶ Worker × N ──▶ ProbeExecutor
//!                (blocks when full)                         │
//!                                                           ▼ (one lock)
//!                                              Aggregator + GridRenderer
//! ```
//!
//! Shutdown runs in one of two modes. A clean shutdown waits for the queue
//! to drain and every worker to go idle before asking them to exit. An
//! interrupted one asks them to exit straight away; in-flight probes still
//! finish but nothing else is dequeued.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{RequestBudget, Settings};
use crate::error::Result;
use crate::events::{self, InputWatcher, Interrupt};
use crate::pool::{QueueError, Task, TaskHandler, TaskQueue, WorkerPool};
use crate::probe::{ProbeExecutor, ProbeRequest, ReqwestTransport};
use crate::ui::terminal::{stdout_terminal, StdoutBackend};
use crate::ui::{GridRenderer, LiveTable, TerminalCanvas, TerminalSession, Theme};

/// How often drain and idle waits look for a late interrupt.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Every enqueued probe completes before workers are stopped.
    Clean,
    /// Workers stop after their current probe; queued probes are abandoned.
    Interrupted,
}

/// Owns the queue and the worker pool for one run.
#[derive(Debug)]
pub struct Dispatcher {
    queue: TaskQueue,
    pool: WorkerPool,
}

impl Dispatcher {
    /// Spawn `threads` workers feeding `handler` from a queue of `capacity`.
    pub fn start<H: TaskHandler + 'static>(
        threads: usize,
        capacity: usize,
        handler: Arc<H>,
        quiet: bool,
    ) -> io::Result<Self> {
        let queue = TaskQueue::bounded(capacity);
        let pool = WorkerPool::spawn(threads, &queue, handler, quiet)?;
        Ok(Self { queue, pool })
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Enqueue probes until the budget runs out or `interrupt` is raised.
    ///
    /// Blocks while the queue is full.
    pub fn produce(
        &self,
        request: &Arc<ProbeRequest>,
        mut budget: RequestBudget,
        interrupt: &Interrupt,
    ) -> ShutdownMode {
        while budget.take() {
            let task = Task::Probe(request.clone());
            match self.queue.enqueue_until(task, interrupt.receiver()) {
                Ok(()) => {}
                Err(QueueError::Interrupted) => return ShutdownMode::Interrupted,
                Err(QueueError::Disconnected) => {
                    tracing::warn!("task queue closed early");
                    return ShutdownMode::Interrupted;
                }
            }
        }
        ShutdownMode::Clean
    }

    /// Stop every worker and return the mode actually used.
    ///
    /// A clean shutdown turns into an interrupted one if `interrupt` is
    /// raised while waiting for the drain.
    pub fn shutdown(mut self, mode: ShutdownMode, interrupt: &Interrupt) -> ShutdownMode {
        let mut mode = mode;

        if mode == ShutdownMode::Clean {
            tracing::info!(pending = self.queue.unfinished(), "waiting for pending probes");
            while !self.queue.wait_drained(SHUTDOWN_POLL) {
                if interrupt.is_raised() {
                    mode = ShutdownMode::Interrupted;
                    break;
                }
            }
        }
        if mode == ShutdownMode::Clean {
            while !self.pool.wait_idle_timeout(SHUTDOWN_POLL) {
                if interrupt.is_raised() {
                    mode = ShutdownMode::Interrupted;
                    break;
                }
            }
        }

        self.pool.request_exit();
        self.pool.join();
        mode
    }
}

/// Run a whole session against the real terminal and network.
pub fn run(settings: &Settings) -> Result<()> {
    let request = Arc::new(ProbeRequest {
        url: settings.target_url()?,
        method: settings.http_method()?,
        header: settings.header_name()?,
    });
    let transport = ReqwestTransport::new(settings.request_timeout())?;

    let grid = GridRenderer::new(
        request.method.as_str(),
        request.url.as_str(),
        Theme::auto_detect(),
    );
    let canvas = TerminalCanvas::new(stdout_terminal()?);
    let table = Arc::new(Mutex::new(LiveTable::new(grid, canvas)));
    let executor = Arc::new(ProbeExecutor::new(transport, table.clone()));

    tracing::info!(threads = settings.threads, "Awaking threads...");
    let dispatcher = Dispatcher::start(
        settings.threads,
        settings.queue_capacity,
        executor,
        settings.quiet,
    )?;

    let interrupt = Interrupt::new();
    events::watch_sigint(interrupt.clone())?;

    tracing::info!("Starting display");
    let mut session = TerminalSession::enter()?;
    open_display(&table)?;

    let mut input = {
        let table = table.clone();
        InputWatcher::spawn(interrupt.clone(), move || refresh_display(&table))?
    };

    let produced = dispatcher.produce(&request, settings.budget(), &interrupt);
    let mode = dispatcher.shutdown(produced, &interrupt);

    input.stop();
    close_display(&table);
    session.restore();

    tracing::info!(?mode, "workers stopped");
    let table = table.lock();
    let totals: Vec<String> = table
        .aggregator()
        .totals()
        .iter()
        .map(|(code, total)| format!("{}={}", code, total))
        .collect();
    tracing::info!(
        nodes = table.aggregator().node_count(),
        totals = %totals.join(" "),
        "Shutting down..."
    );
    Ok(())
}

type StdoutTable = Mutex<LiveTable<TerminalCanvas<StdoutBackend>>>;

fn open_display(table: &StdoutTable) -> io::Result<()> {
    let mut table = table.lock();
    table.canvas_mut().clear()?;
    table.open()
}

/// Re-present the whole table, e.g. after a resize.
fn refresh_display(table: &StdoutTable) {
    if let Err(e) = table.lock().refresh() {
        tracing::debug!(error = %e, "failed to refresh display");
    }
}

/// Show the prompt and wait for a key. Best effort.
fn close_display(table: &StdoutTable) {
    if table.lock().close().is_ok() {
        let _ = events::wait_for_key(|| refresh_display(table));
    }
}
