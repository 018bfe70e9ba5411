// Tab bar component
//
// Renders the console name, the role's tabs with their number keys, and the
// logged-in role.

use crate::tui::app::App;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Tabs},
    Frame,
};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let tabs = app.tabs();

    let titles: Vec<Line> = tabs
        .iter()
        .enumerate()
        .map(|(i, view)| Line::from(format!("{} {}", (i + 1) % 10, view.name())))
        .collect();
    let selected = tabs.iter().position(|v| *v == app.view).unwrap_or(0);

    let role = match app.session.role() {
        Some(role) if app.logging_out => format!(" {} · logging out… ", role),
        Some(role) => format!(" {} · L logout ", role),
        None => String::new(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(theme.title))
        .title(Span::styled(
            " 📡 streamwatch ",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        ))
        .title_top(Line::from(role).right_aligned());

    let widget = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(theme.muted))
        .highlight_style(
            Style::default()
                .fg(theme.highlight)
                .add_modifier(Modifier::BOLD),
        )
        .divider("│")
        .block(block);

    f.render_widget(widget, area);
}
