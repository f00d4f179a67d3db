//! Grid placement and incremental drawing of the live table.
//!
//! ```text
//! row 0                 HAnalyzer - High-Availability & Load-Balancing analyzer
//! row 2  Method: GET
//! row 3     URL: http://lb.local/
//! row 5  Node ID:                                             Status code:    200      503
//! row 7  web-1:                                                                12        1
//! row 8  web-2:                                                                 9
//! row 10                                                         Totals:       21        1
//! ```
//!
//! Node `i` sits on row `7 + i`; status code `j` starts at column `69 + 9·j`.
//! The totals row sits one blank row below the last node, so it moves down
//! whenever a new node appears.

use super::canvas::Canvas;
use super::theme::Theme;
use crate::data::{Aggregator, Update};

pub const TITLE: &str = "HAnalyzer - High-Availability & Load-Balancing analyzer";
pub const CLOSE_PROMPT: &str = "Press any key to exit...";

const METHOD_ROW: u16 = 2;
const HEADER_ROW: u16 = 5;
const FIRST_NODE_ROW: u16 = HEADER_ROW + 2;
const STATUS_LABEL_COLUMN: u16 = 53;
const FIRST_STATUS_COLUMN: u16 = 69;
const TOTALS_LABEL_COLUMN: u16 = 58;
/// Wide enough for a 3-digit code plus padding.
pub const COLUMN_WIDTH: u16 = 9;
/// Node labels (including the trailing colon) are cut to fit left of the codes.
const NODE_LABEL_WIDTH: usize = 56;

/// Row of the node at `row_index`.
pub fn node_y(row_index: usize) -> u16 {
    to_u16(usize::from(FIRST_NODE_ROW) + row_index)
}

/// Starting column of the status code at `column_index`.
pub fn column_x(column_index: usize) -> u16 {
    to_u16(usize::from(FIRST_STATUS_COLUMN) + column_index * usize::from(COLUMN_WIDTH))
}

/// Row of the totals line when `node_count` nodes are shown.
pub fn totals_y(node_count: usize) -> u16 {
    to_u16(usize::from(FIRST_NODE_ROW) + node_count + 1)
}

/// Where a value starts so that it is centred on `column_start + 1`.
pub fn value_x(column_start: u16, value: &str) -> u16 {
    let half = to_u16(value.chars().count() / 2);
    (column_start + 1).saturating_sub(half)
}

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn node_label(node_id: &str) -> String {
    let name: String = node_id.chars().take(NODE_LABEL_WIDTH - 1).collect();
    format!("{}:", name)
}

/// Draws the table onto a [`Canvas`] one observation at a time.
#[derive(Debug, Clone)]
pub struct GridRenderer {
    method: String,
    url: String,
    theme: Theme,
}

impl GridRenderer {
    pub fn new(method: impl Into<String>, url: impl Into<String>, theme: Theme) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            theme,
        }
    }

    /// Title, target and column header. Drawn once when the display opens.
    pub fn draw_static<C: Canvas>(&self, canvas: &mut C) {
        let width = canvas.area().width;
        let title_x = (width / 2).saturating_sub(to_u16(TITLE.len() / 2));
        canvas.put(title_x, 0, TITLE, self.theme.title);
        canvas.put(0, METHOD_ROW, &format!("Method: {}", self.method), self.theme.target);
        canvas.put(0, METHOD_ROW + 1, &format!("   URL: {}", self.url), self.theme.target);
        self.draw_header(canvas);
    }

    fn draw_header<C: Canvas>(&self, canvas: &mut C) {
        canvas.put(0, HEADER_ROW, "Node ID:", self.theme.header);
        canvas.put(STATUS_LABEL_COLUMN, HEADER_ROW, "Status code:", self.theme.header);
    }

    /// Redraw only what `update` changed.
    pub fn render<C: Canvas>(
        &self,
        canvas: &mut C,
        aggregator: &Aggregator,
        node_id: &str,
        update: &Update,
    ) {
        self.draw_header(canvas);

        let x = column_x(update.column);
        let y = node_y(update.row);

        if update.new_status {
            canvas.put(
                x,
                HEADER_ROW,
                &update.status_code.to_string(),
                self.theme.status_style(update.status_code),
            );
        }
        if update.new_node {
            canvas.put(0, y, &node_label(node_id), self.theme.node);
        }

        let count = update.count.to_string();
        canvas.put(value_x(x, &count), y, &count, self.theme.value);

        let totals_row = totals_y(aggregator.node_count());
        if update.new_node {
            // The totals row moved down onto a fresh line; blank its old place.
            canvas.clear_row(totals_row - 1);
            self.draw_totals(canvas, aggregator, totals_row);
        } else {
            let total = update.total.to_string();
            canvas.put(value_x(x, &total), totals_row, &total, self.theme.totals);
        }
    }

    fn draw_totals<C: Canvas>(&self, canvas: &mut C, aggregator: &Aggregator, y: u16) {
        canvas.put(TOTALS_LABEL_COLUMN, y, "Totals:", self.theme.totals);
        for (column, (_, total)) in aggregator.totals().iter().enumerate() {
            let total = total.to_string();
            canvas.put(value_x(column_x(column), &total), y, &total, self.theme.totals);
        }
    }

    /// Blinking prompt centred on the last visible row.
    pub fn draw_close_prompt<C: Canvas>(&self, canvas: &mut C) {
        let area = canvas.area();
        let x = (area.width / 2).saturating_sub(to_u16(CLOSE_PROMPT.len() / 2));
        let y = area.height.saturating_sub(1);
        canvas.put(x, y, CLOSE_PROMPT, self.theme.prompt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::canvas::BufferCanvas;

    fn renderer() -> GridRenderer {
        GridRenderer::new("GET", "http://lb.local/", Theme::dark())
    }

    fn observe(
        grid: &GridRenderer,
        canvas: &mut BufferCanvas,
        agg: &mut Aggregator,
        node: &str,
        code: u16,
    ) {
        let update = agg.record(node, code);
        grid.render(canvas, agg, node, &update);
    }

    #[test]
    fn test_layout_formulas() {
        assert_eq!(node_y(0), 7);
        assert_eq!(node_y(3), 10);
        assert_eq!(column_x(0), 69);
        assert_eq!(column_x(2), 87);
        assert_eq!(totals_y(1), 9);
        assert_eq!(value_x(69, "7"), 70);
        assert_eq!(value_x(69, "42"), 69);
        assert_eq!(value_x(69, "123"), 69);
        assert_eq!(value_x(69, "1234"), 68);
    }

    #[test]
    fn test_static_header() {
        let mut canvas = BufferCanvas::new(120, 20);
        renderer().draw_static(&mut canvas);
        assert!(canvas.row_text(0).trim_start().starts_with("HAnalyzer"));
        assert_eq!(canvas.row_text(2), "Method: GET");
        assert_eq!(canvas.row_text(3), "   URL: http://lb.local/");
        assert_eq!(canvas.text_at(53, 5, 12), "Status code:");
    }

    #[test]
    fn test_cells_land_in_first_seen_positions() {
        let grid = renderer();
        let mut canvas = BufferCanvas::new(120, 20);
        let mut agg = Aggregator::new();

        observe(&grid, &mut canvas, &mut agg, "web-2", 503);
        observe(&grid, &mut canvas, &mut agg, "web-1", 200);
        observe(&grid, &mut canvas, &mut agg, "web-1", 200);

        assert_eq!(canvas.text_at(69, 5, 3), "503");
        assert_eq!(canvas.text_at(78, 5, 3), "200");
        assert_eq!(canvas.row_text(7).split_whitespace().collect::<Vec<_>>(), ["web-2:", "1"]);
        assert_eq!(canvas.text_at(70, 7, 1), "1");
        assert_eq!(canvas.text_at(79, 8, 1), "2");
        assert_eq!(canvas.row_text(8).split_whitespace().collect::<Vec<_>>(), ["web-1:", "2"]);
    }

    #[test]
    fn test_totals_row_moves_with_new_nodes() {
        let grid = renderer();
        let mut canvas = BufferCanvas::new(120, 20);
        let mut agg = Aggregator::new();

        observe(&grid, &mut canvas, &mut agg, "A", 200);
        assert_eq!(
            canvas.row_text(9).split_whitespace().collect::<Vec<_>>(),
            ["Totals:", "1"]
        );

        observe(&grid, &mut canvas, &mut agg, "B", 500);
        assert_eq!(canvas.row_text(9), "", "old totals row is cleared");
        assert_eq!(
            canvas.row_text(10).split_whitespace().collect::<Vec<_>>(),
            ["Totals:", "1", "1"]
        );

        observe(&grid, &mut canvas, &mut agg, "A", 500);
        assert_eq!(
            canvas.row_text(10).split_whitespace().collect::<Vec<_>>(),
            ["Totals:", "1", "2"]
        );
        assert_eq!(
            canvas.row_text(7).split_whitespace().collect::<Vec<_>>(),
            ["A:", "1", "1"]
        );
    }

    #[test]
    fn test_growing_count_overwrites_cleanly() {
        let grid = renderer();
        let mut canvas = BufferCanvas::new(120, 20);
        let mut agg = Aggregator::new();
        for _ in 0..1234 {
            observe(&grid, &mut canvas, &mut agg, "A", 200);
        }
        assert_eq!(canvas.text_at(66, 7, 8).trim(), "1234");
        assert_eq!(canvas.text_at(66, 9, 8).trim(), "1234");
    }

    #[test]
    fn test_long_node_names_are_cut() {
        let grid = renderer();
        let mut canvas = BufferCanvas::new(120, 20);
        let mut agg = Aggregator::new();
        let name = "n".repeat(200);
        observe(&grid, &mut canvas, &mut agg, &name, 200);
        let label = canvas.text_at(0, 7, 60);
        assert!(label.starts_with(&"n".repeat(55)));
        assert_eq!(&label[55..56], ":");
    }

    #[test]
    fn test_overflow_is_clipped() {
        let grid = renderer();
        let mut canvas = BufferCanvas::new(80, 10);
        let mut agg = Aggregator::new();
        for i in 0..30 {
            observe(&grid, &mut canvas, &mut agg, &format!("node-{}", i), 200 + i as u16);
        }
        assert_eq!(agg.node_count(), 30);
        assert_eq!(canvas.text_at(69, 5, 3), "200");
    }

    #[test]
    fn test_close_prompt_on_last_row() {
        let mut canvas = BufferCanvas::new(100, 30);
        renderer().draw_close_prompt(&mut canvas);
        assert_eq!(canvas.row_text(29).trim(), CLOSE_PROMPT);
    }
}
