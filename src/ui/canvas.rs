//! Cell-addressed drawing surfaces.
//!
//! The grid renderer never clears the screen; it writes individual strings
//! at fixed positions. A [`TerminalCanvas`] keeps everything written so far
//! in a persistent buffer and, on [`Canvas::present`], lets ratatui diff it
//! against what is on screen so only changed cells reach the terminal.

use std::io;

use ratatui::backend::Backend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::Terminal;

/// Size of the persistent canvas behind a terminal. Anything drawn beyond
/// it, or beyond the visible terminal, is clipped.
pub const VIRTUAL_WIDTH: u16 = 320;
pub const VIRTUAL_HEIGHT: u16 = 200;

/// A surface that accepts positioned text.
pub trait Canvas {
    /// The visible area, used for centering.
    fn area(&self) -> Rect;

    /// Write `text` starting at `(x, y)`, clipping at the edges.
    fn put(&mut self, x: u16, y: u16, text: &str, style: Style);

    /// Blank an entire row.
    fn clear_row(&mut self, y: u16);

    /// Make everything written so far visible.
    fn present(&mut self) -> io::Result<()>;
}

/// An in-memory canvas over a ratatui [`Buffer`].
#[derive(Debug, Clone)]
pub struct BufferCanvas {
    buffer: Buffer,
}

impl BufferCanvas {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            buffer: Buffer::empty(Rect::new(0, 0, width, height)),
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// The text of row `y` with trailing blanks removed.
    pub fn row_text(&self, y: u16) -> String {
        let area = self.buffer.area;
        if y >= area.bottom() {
            return String::new();
        }
        let line: String = (area.left()..area.right())
            .filter_map(|x| self.buffer.cell((x, y)).map(|c| c.symbol().to_string()))
            .collect();
        line.trim_end().to_string()
    }

    /// `len` cells of row `y` starting at column `x`.
    pub fn text_at(&self, x: u16, y: u16, len: u16) -> String {
        (x..x.saturating_add(len))
            .filter_map(|x| self.buffer.cell((x, y)).map(|c| c.symbol().to_string()))
            .collect()
    }
}

impl Canvas for BufferCanvas {
    fn area(&self) -> Rect {
        self.buffer.area
    }

    fn put(&mut self, x: u16, y: u16, text: &str, style: Style) {
        let area = self.buffer.area;
        if y >= area.bottom() || x >= area.right() {
            return;
        }
        let room = usize::from(area.right() - x);
        self.buffer.set_stringn(x, y, text, room, style);
    }

    fn clear_row(&mut self, y: u16) {
        let area = self.buffer.area;
        for x in area.left()..area.right() {
            if let Some(cell) = self.buffer.cell_mut((x, y)) {
                cell.reset();
            }
        }
    }

    fn present(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A canvas that presents to a ratatui [`Terminal`].
pub struct TerminalCanvas<B: Backend> {
    terminal: Terminal<B>,
    canvas: BufferCanvas,
}

impl<B: Backend> TerminalCanvas<B> {
    pub fn new(terminal: Terminal<B>) -> Self {
        Self {
            terminal,
            canvas: BufferCanvas::new(VIRTUAL_WIDTH, VIRTUAL_HEIGHT),
        }
    }

    /// Clear the physical screen; the next present redraws everything.
    pub fn clear(&mut self) -> io::Result<()> {
        self.terminal.clear()
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<B> {
        &mut self.terminal
    }
}

impl<B: Backend> Canvas for TerminalCanvas<B> {
    fn area(&self) -> Rect {
        match self.terminal.size() {
            Ok(size) => Rect::new(0, 0, size.width, size.height).intersection(self.canvas.area()),
            Err(_) => self.canvas.area(),
        }
    }

    fn put(&mut self, x: u16, y: u16, text: &str, style: Style) {
        self.canvas.put(x, y, text, style);
    }

    fn clear_row(&mut self, y: u16) {
        self.canvas.clear_row(y);
    }

    fn present(&mut self) -> io::Result<()> {
        let Self { terminal, canvas } = self;
        terminal.draw(|frame| {
            let visible = frame.area().intersection(canvas.area());
            let target = frame.buffer_mut();
            for y in visible.top()..visible.bottom() {
                for x in visible.left()..visible.right() {
                    if let (Some(src), Some(dst)) =
                        (canvas.buffer().cell((x, y)), target.cell_mut((x, y)))
                    {
                        *dst = src.clone();
                    }
                }
            }
        })?;
        Ok(())
    }
}
