//! Terminal input and SIGINT: interrupts and resize repaints.
//!
//! Raw mode stops the terminal from turning Ctrl-C into SIGINT, so keys are
//! watched directly. A SIGINT delivered from outside (e.g. `kill -INT`) is
//! caught separately. Both raise the same [`Interrupt`].

use std::future::{poll_fn, Future};
use std::io;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::Poll;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use parking_lot::Mutex;

/// How often the keyboard watcher checks whether it should stop.
const INPUT_POLL: Duration = Duration::from_millis(100);

/// A one-shot, broadcast interrupt flag.
///
/// Raising it closes a channel nobody sends on, so every clone of
/// [`receiver`](Self::receiver) becomes ready at once and stays ready. That
/// lets it sit in a `select!` next to a blocking enqueue.
#[derive(Debug, Clone)]
pub struct Interrupt {
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    signal: Receiver<()>,
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupt {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            trigger: Arc::new(Mutex::new(Some(tx))),
            signal: rx,
        }
    }

    pub fn raise(&self) {
        if self.trigger.lock().take().is_some() {
            tracing::info!("interrupt requested");
        }
    }

    pub fn is_raised(&self) -> bool {
        matches!(self.signal.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Becomes ready (disconnected) once raised.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.signal
    }
}

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> io::Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Keys that stop the run: Ctrl-C, `q` and Esc.
pub fn is_interrupt_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        KeyCode::Char('q') | KeyCode::Esc => true,
        _ => false,
    }
}

/// Block until any key is pressed, calling `on_resize` whenever the terminal is resized.
pub fn wait_for_key(mut on_resize: impl FnMut()) -> io::Result<()> {
    loop {
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => return Ok(()),
            Event::Resize(_, _) => on_resize(),
            _ => {}
        }
    }
}

/// React to one terminal event while the run is in progress.
pub fn handle_event(event: &Event, interrupt: &Interrupt, on_resize: &mut impl FnMut()) {
    match event {
        Event::Key(key) if is_interrupt_key(key) => interrupt.raise(),
        Event::Resize(_, _) => on_resize(),
        _ => {}
    }
}

/// Background thread turning interrupt keys into an [`Interrupt`] and
/// resizes into repaints.
#[derive(Debug)]
pub struct InputWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InputWatcher {
    pub fn spawn<F>(interrupt: Interrupt, on_resize: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = stop.clone();
            thread::Builder::new()
                .name("input".into())
                .spawn(move || watch_input(&interrupt, &stop, on_resize))?
        };
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop reading input so someone else can.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InputWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn watch_input(interrupt: &Interrupt, stop: &AtomicBool, mut on_resize: impl FnMut()) {
    while !stop.load(Ordering::SeqCst) {
        match poll_event(INPUT_POLL) {
            Ok(Some(event)) => handle_event(&event, interrupt, &mut on_resize),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "stopped reading terminal input");
                return;
            }
        }
    }
}

/// Raise `interrupt` when the process receives SIGINT.
///
/// Returns once the handler is installed, so a SIGINT arriving afterwards
/// never takes the default action. The listener thread lives for the rest
/// of the process.
pub fn watch_sigint(interrupt: Interrupt) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let (armed_tx, armed_rx) = crossbeam_channel::bounded(1);

    thread::Builder::new().name("sigint".into()).spawn(move || {
        runtime.block_on(async move {
            let mut ctrl_c = pin!(tokio::signal::ctrl_c());
            // The handler is registered on the first poll
            let first = poll_fn(|cx| Poll::Ready(ctrl_c.as_mut().poll(cx))).await;
            let received = match first {
                Poll::Ready(result) => {
                    let _ = armed_tx.send(result.is_ok());
                    result.is_ok()
                }
                Poll::Pending => {
                    let _ = armed_tx.send(true);
                    ctrl_c.await.is_ok()
                }
            };
            if received {
                interrupt.raise();
            }
        })
    })?;

    match armed_rx.recv() {
        Ok(true) => Ok(()),
        _ => Err(io::Error::other("failed to install SIGINT handler")),
    }
}
