// Feedback line shared by every form

use crate::resources::Notice;
use crate::tui::theme::Theme;
use ratatui::{style::Style, text::Line};

pub fn line<'a>(notice: Option<&Notice>, theme: &Theme) -> Line<'a> {
    match notice {
        Some(Notice::Success(message)) => {
            Line::styled(format!("✓ {}", message), Style::default().fg(theme.success))
        }
        Some(Notice::Error(message)) => {
            Line::styled(format!("✗ {}", message), Style::default().fg(theme.error))
        }
        None => Line::default(),
    }
}
