//! Toast notification component
//!
//! A short-lived overlay in the bottom-right corner, drawn above the status
//! bar. Longer messages stay up longer, within fixed bounds.

use crate::tui::theme::Theme;
use crate::util::fit_width;
use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthStr;

const MIN_VISIBLE: Duration = Duration::from_secs(3);
const MAX_VISIBLE: Duration = Duration::from_secs(8);
/// Characters an operator reads per second of extra display time
const CHARS_PER_SECOND: usize = 25;

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    shown_at: Instant,
    visible_for: Duration,
}

fn visible_for(message: &str) -> Duration {
    let extra = Duration::from_secs((message.chars().count() / CHARS_PER_SECOND) as u64);
    (MIN_VISIBLE + extra).min(MAX_VISIBLE)
}

impl Toast {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            visible_for: visible_for(&message),
            message,
            shown_at: Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= self.visible_for
    }

    /// Draw over whatever is below; `Clear` blanks the cells first
    pub fn render(&self, f: &mut Frame, area: Rect, theme: &Theme) {
        let text = fit_width(&self.message, area.width.saturating_sub(8) as usize);
        let width = (text.width() as u16 + 4).min(area.width);
        let height = 3;

        // Keep the status bar readable underneath
        let x = area.right().saturating_sub(width + 1);
        let y = area.bottom().saturating_sub(height + 2);
        let toast_area = Rect::new(x, y, width, height).intersection(area);

        let paragraph = Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme.foreground))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(theme.border_type)
                    .border_style(Style::default().fg(theme.highlight))
                    .style(Style::default().bg(theme.background)),
            );

        f.render_widget(Clear, toast_area);
        f.render_widget(paragraph, toast_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longer_messages_stay_longer_within_bounds() {
        assert_eq!(visible_for("Logged out"), MIN_VISIBLE);
        assert_eq!(visible_for(&"x".repeat(50)), MIN_VISIBLE + Duration::from_secs(2));
        assert_eq!(visible_for(&"x".repeat(10_000)), MAX_VISIBLE);
    }

    #[test]
    fn test_fresh_toast_is_not_expired() {
        assert!(!Toast::new("Loaded 12 frames").is_expired());
    }
}
