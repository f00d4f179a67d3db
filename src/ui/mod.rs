//! Terminal rendering of the live table.
//!
//! - [`canvas`]: cell-addressed drawing surfaces over ratatui buffers
//! - [`grid`]: row/column placement and incremental redraws
//! - [`table`]: the [`LiveTable`] shared between workers under one lock
//! - [`terminal`]: entering and restoring the terminal mode
//! - [`theme`]: light and dark styles

pub mod canvas;
pub mod grid;
pub mod table;
pub mod terminal;
pub mod theme;

pub use canvas::{BufferCanvas, Canvas, TerminalCanvas};
pub use grid::GridRenderer;
pub use table::LiveTable;
pub use terminal::TerminalSession;
pub use theme::Theme;
