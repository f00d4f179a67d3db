//! Terminal mode management.

use std::io::{self, Stdout};

use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::logging;

pub type StdoutBackend = CrosstermBackend<Stdout>;

/// Create a ratatui terminal on stdout without changing any terminal modes.
pub fn stdout_terminal() -> io::Result<Terminal<StdoutBackend>> {
    Terminal::new(CrosstermBackend::new(io::stdout()))
}

/// Raw mode, alternate screen and hidden cursor for as long as it lives.
///
/// The previous terminal mode is restored on [`restore`](Self::restore),
/// on drop, and from the panic hook, whichever comes first. Restore
/// failures are ignored.
///
/// Log lines bound for stderr are held back while the session is active
/// and written once the terminal is restored.
#[derive(Debug)]
pub struct TerminalSession {
    active: bool,
}

impl TerminalSession {
    pub fn enter() -> io::Result<Self> {
        logging::stderr_gate().hold();
        if let Err(e) = enable_raw_mode() {
            let _ = logging::stderr_gate().release();
            return Err(e);
        }
        let session = Self { active: true };
        execute!(io::stdout(), EnterAlternateScreen, Hide)?;

        // Setup panic hook to restore terminal
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic| {
            leave();
            original_hook(panic);
        }));

        Ok(session)
    }

    pub fn restore(&mut self) {
        if self.active {
            leave();
            self.active = false;
        }
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.restore();
    }
}

fn leave() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
    let _ = logging::stderr_gate().release();
}
