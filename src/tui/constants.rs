//! Dashboard constants

use std::time::Duration;

// ============================================================================
// Timing
// ============================================================================

/// Minimum gap between two redraws
pub const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// How often the keyboard is polled
pub const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How often process CPU and memory are sampled
pub const SYSTEM_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

// ============================================================================
// Layout
// ============================================================================

pub mod layout {
    use ratatui::layout::Constraint;

    pub const HEADER_HEIGHT: u16 = 4;
    pub const STATS_HEIGHT: u16 = 6;
    pub const FOOTER_HEIGHT: u16 = 3;
    pub const MIN_LOG_HEIGHT: u16 = 5;

    pub fn main_sections() -> [Constraint; 4] {
        [
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Length(STATS_HEIGHT),
            Constraint::Min(MIN_LOG_HEIGHT),
            Constraint::Length(FOOTER_HEIGHT),
        ]
    }

    pub fn fullscreen_log_sections() -> [Constraint; 3] {
        [
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(MIN_LOG_HEIGHT),
            Constraint::Length(FOOTER_HEIGHT),
        ]
    }

    pub fn stats_columns() -> [Constraint; 3] {
        [
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ]
    }
}

// ============================================================================
// Color Palette
// ============================================================================

pub mod colors {
    use ratatui::style::Color;

    pub const TITLE: Color = Color::Cyan;
    pub const LABEL: Color = Color::Gray;
    pub const VALUE: Color = Color::White;
    pub const CONNECTED: Color = Color::Green;
    pub const FAILED: Color = Color::Red;
    pub const SENT: Color = Color::Green;
    pub const RECEIVED: Color = Color::Blue;
    pub const CPU: Color = Color::Magenta;
    pub const MEMORY: Color = Color::Yellow;
    pub const INFO: Color = Color::Gray;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;
}
