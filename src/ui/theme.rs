//! Theme configuration for the live table.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};

/// Color and style theme for the live table.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Title line at the top of the screen.
    pub title: Style,
    /// `Method:`/`URL:` summary lines.
    pub target: Style,
    /// Column header labels (`Node ID:`, `Status code:`).
    pub header: Style,
    /// Node row labels.
    pub node: Style,
    /// Per-node counts.
    pub value: Style,
    /// The totals row.
    pub totals: Style,
    /// Closing prompt.
    pub prompt: Style,
    /// 1xx and 3xx status codes.
    pub neutral: Color,
    /// 2xx status codes.
    pub success: Color,
    /// 4xx status codes.
    pub client_error: Color,
    /// 5xx status codes.
    pub server_error: Color,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            title: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            target: Style::default().fg(Color::Gray),
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            node: Style::default().add_modifier(Modifier::BOLD),
            value: Style::default(),
            totals: Style::default().add_modifier(Modifier::BOLD),
            prompt: Style::default().add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK),
            neutral: Color::Cyan,
            success: Color::Green,
            client_error: Color::Yellow,
            server_error: Color::Red,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            title: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            target: Style::default().fg(Color::DarkGray),
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            node: Style::default().add_modifier(Modifier::BOLD),
            value: Style::default(),
            totals: Style::default().add_modifier(Modifier::BOLD),
            prompt: Style::default().add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK),
            neutral: Color::Blue,
            success: Color::Green,
            client_error: Color::Magenta,
            server_error: Color::Red,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Get style for a status code header
    pub fn status_style(&self, status_code: u16) -> Style {
        match status_code / 100 {
            2 => Style::default().fg(self.success).add_modifier(Modifier::BOLD),
            4 => Style::default().fg(self.client_error).add_modifier(Modifier::BOLD),
            5 => Style::default().fg(self.server_error).add_modifier(Modifier::BOLD),
            _ => Style::default().fg(self.neutral).add_modifier(Modifier::BOLD),
        }
    }
}
