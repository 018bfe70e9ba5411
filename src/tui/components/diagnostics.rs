//! Diagnostics panel component
//!
//! Shows the tail of the captured tracing output. Swallowed read failures
//! land here as warnings and nowhere else.

use crate::logging::{LogEntry, LogLevel};
use crate::tui::app::App;
use crate::tui::theme::Theme;
use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

fn level_style(level: &LogLevel, theme: &Theme) -> Style {
    match level {
        LogLevel::Error => Style::default().fg(theme.error),
        LogLevel::Warn => Style::default().fg(theme.warning),
        LogLevel::Info => Style::default().fg(theme.foreground),
        LogLevel::Debug | LogLevel::Trace => Style::default().fg(theme.muted),
    }
}

/// `HH:MM:SS LEVEL target: message`, with the crate prefix dropped
fn format_entry(entry: &LogEntry) -> String {
    let target = entry
        .target
        .strip_prefix("streamwatch::")
        .unwrap_or(&entry.target);
    format!(
        "{} {:<5} {}: {}",
        entry.timestamp.format("%H:%M:%S"),
        entry.level.as_str(),
        target,
        entry.message
    )
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let visible = area.height.saturating_sub(2) as usize;
    let entries = app.log_buffer.tail(visible);

    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| ListItem::new(format_entry(entry)).style(level_style(&entry.level, theme)))
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(theme.border_type)
            .border_style(Style::default().fg(theme.border))
            .title(format!(" Diagnostics ({}) ", app.log_buffer.len())),
    );

    f.render_widget(list, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format_entry_drops_crate_prefix() {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Warn,
            target: "streamwatch::poller".to_string(),
            message: "Poll failed".to_string(),
        };
        let line = format_entry(&entry);
        assert!(line.ends_with("WARN  poller: Poll failed"));
    }
}
