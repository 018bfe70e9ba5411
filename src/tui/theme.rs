// Theme for the TUI
//
// Uses the terminal's own ANSI palette so the console matches whatever
// colors the operator already has configured.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::BorderType;

/// Color palette for the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    pub foreground: Color,
    pub background: Color,
    pub border: Color,
    pub border_type: BorderType,
    pub title: Color,
    pub highlight: Color,
    pub muted: Color,
    pub success: Color,
    pub error: Color,
    pub warning: Color,
    pub selection: Color,
    pub selection_fg: Color,
    pub status_bar: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            foreground: Color::Reset,
            background: Color::Reset,
            border: Color::DarkGray,
            border_type: BorderType::Rounded,
            title: Color::Cyan,
            highlight: Color::Yellow,
            muted: Color::DarkGray,
            success: Color::Green,
            error: Color::Red,
            warning: Color::Yellow,
            selection: Color::Blue,
            selection_fg: Color::White,
            status_bar: Color::Gray,
        }
    }
}

impl Theme {
    pub fn selected(&self) -> Style {
        Style::default()
            .fg(self.selection_fg)
            .bg(self.selection)
            .add_modifier(Modifier::BOLD)
    }

    pub fn header(&self) -> Style {
        Style::default()
            .fg(self.title)
            .add_modifier(Modifier::BOLD)
    }
}
