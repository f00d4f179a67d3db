//! Log output that stays off the live table.
//!
//! While the table is on screen, stderr shares the tty with it. A
//! [`LogGate`] sits between the `tracing` formatter and stderr: once
//! [`hold`](LogGate::hold) is called, formatted lines are kept in memory,
//! and [`release`](LogGate::release) writes them out after the terminal has
//! been restored.

use std::io::{self, Write};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;

struct GateState {
    held: Option<Vec<u8>>,
    target: Box<dyn Write + Send>,
}

/// A `tracing` writer that can be paused.
#[derive(Clone)]
pub struct LogGate {
    state: Arc<Mutex<GateState>>,
}

impl std::fmt::Debug for LogGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogGate")
            .field("held", &self.is_held())
            .finish()
    }
}

impl LogGate {
    pub fn new(target: impl Write + Send + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState {
                held: None,
                target: Box::new(target),
            })),
        }
    }

    /// Start keeping output in memory instead of writing it.
    pub fn hold(&self) {
        let mut state = self.state.lock();
        if state.held.is_none() {
            state.held = Some(Vec::new());
        }
    }

    /// Write everything held so far and pass later output straight through.
    pub fn release(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        if let Some(held) = state.held.take() {
            state.target.write_all(&held)?;
            state.target.flush()?;
        }
        Ok(())
    }

    pub fn is_held(&self) -> bool {
        self.state.lock().held.is_some()
    }
}

/// The process-wide gate in front of stderr.
pub fn stderr_gate() -> &'static LogGate {
    static STDERR: OnceLock<LogGate> = OnceLock::new();
    STDERR.get_or_init(|| LogGate::new(io::stderr()))
}

/// Handle returned to the formatter for each event.
#[derive(Debug)]
pub struct GateWriter {
    gate: LogGate,
}

impl Write for GateWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.gate.state.lock();
        match state.held.as_mut() {
            Some(held) => {
                held.extend_from_slice(buf);
                Ok(buf.len())
            }
            None => state.target.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.gate.state.lock();
        if state.held.is_some() {
            return Ok(());
        }
        state.target.flush()
    }
}

impl<'a> MakeWriter<'a> for LogGate {
    type Writer = GateWriter;

    fn make_writer(&'a self) -> Self::Writer {
        GateWriter { gate: self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::events::Interrupt;
    use crate::pool::{Task, TaskHandler};
    use crate::{Dispatcher, ShutdownMode};

    /// Shared in-memory stand-in for stderr.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Noop;

    impl TaskHandler for Noop {
        fn handle(&self, _task: Task) {}
    }

    fn subscriber(gate: &LogGate) -> impl tracing::Subscriber {
        tracing_subscriber::fmt()
            .with_writer(gate.clone())
            .with_ansi(false)
            .with_target(false)
            .finish()
    }

    #[test]
    fn test_passes_through_when_not_held() {
        let captured = Captured::default();
        let gate = LogGate::new(captured.clone());

        tracing::subscriber::with_default(subscriber(&gate), || {
            tracing::info!("Starting display");
        });
        assert!(captured.text().contains("Starting display"));
    }

    #[test]
    fn test_held_output_is_written_on_release() {
        let captured = Captured::default();
        let gate = LogGate::new(captured.clone());

        tracing::subscriber::with_default(subscriber(&gate), || {
            gate.hold();
            tracing::info!("interrupt requested");
            tracing::warn!("stopped reading terminal input");
            assert!(gate.is_held());
            assert_eq!(captured.text(), "");

            gate.release().unwrap();
            let text = captured.text();
            assert!(text.contains("interrupt requested"));
            assert!(text.contains("stopped reading terminal input"));

            tracing::info!("Shutting down...");
        });
        assert!(captured.text().contains("Shutting down..."));
        assert!(!gate.is_held());
    }

    #[test]
    fn test_quiet_run_writes_nothing_while_held() {
        let captured = Captured::default();
        let gate = LogGate::new(captured.clone());

        tracing::subscriber::with_default(subscriber(&gate), || {
            gate.hold();
            let dispatcher = Dispatcher::start(2, 4, Arc::new(Noop), true).unwrap();
            let interrupt = Interrupt::new();
            interrupt.raise();
            let mode = dispatcher.shutdown(ShutdownMode::Clean, &interrupt);
            assert_eq!(mode, ShutdownMode::Clean);
            assert_eq!(captured.text(), "");

            gate.release().unwrap();
        });
        assert!(captured.text().contains("interrupt requested"));
    }
}
