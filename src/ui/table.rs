//! The live table: aggregation state and its display behind one lock.

use std::io;

use parking_lot::Mutex;

use super::canvas::Canvas;
use super::grid::GridRenderer;
use crate::data::Aggregator;
use crate::probe::{Observation, ObservationSink};

/// Aggregator, renderer and canvas, always updated together.
///
/// Shared between workers as `Arc<Mutex<LiveTable<C>>>`; holding that lock
/// is the only way to touch the counters or the screen, so index assignment
/// and drawing for one observation are never interleaved with another.
#[derive(Debug)]
pub struct LiveTable<C> {
    aggregator: Aggregator,
    grid: GridRenderer,
    canvas: C,
}

impl<C: Canvas> LiveTable<C> {
    pub fn new(grid: GridRenderer, canvas: C) -> Self {
        Self {
            aggregator: Aggregator::new(),
            grid,
            canvas,
        }
    }

    /// Draw the static parts and show them.
    pub fn open(&mut self) -> io::Result<()> {
        self.grid.draw_static(&mut self.canvas);
        self.canvas.present()
    }

    /// Record one observation and redraw the cells it touched.
    pub fn observe(&mut self, observation: &Observation) -> io::Result<()> {
        let update = self
            .aggregator
            .record(&observation.node_id, observation.status_code);
        self.grid
            .render(&mut self.canvas, &self.aggregator, &observation.node_id, &update);
        self.canvas.present()
    }

    /// Present the whole table again, e.g. after the terminal was resized.
    pub fn refresh(&mut self) -> io::Result<()> {
        self.canvas.present()
    }

    /// Show the closing prompt.
    pub fn close(&mut self) -> io::Result<()> {
        self.grid.draw_close_prompt(&mut self.canvas);
        self.canvas.present()
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }
}

impl<C: Canvas + Send> ObservationSink for Mutex<LiveTable<C>> {
    fn observe(&self, observation: &Observation) {
        if let Err(e) = self.lock().observe(observation) {
            tracing::debug!(error = %e, "failed to present update");
        }
    }
}
