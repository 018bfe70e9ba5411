// Status bar component
//
// Renders what is running right now: the visible tab's pollers, harness
// tasks, the number of buffered warnings, and the API address.

use crate::tui::app::App;
use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let tasks = app.active_tasks();
    let pollers = if tasks.is_empty() {
        "idle".to_string()
    } else {
        tasks.join(", ")
    };

    let problems = app.log_buffer.problem_count();
    let diagnostics = if problems > 0 {
        format!("⚠ {} (F2)", problems)
    } else {
        "F2 diagnostics".to_string()
    };

    let text = format!(
        " ⟳ {} │ {} │ {} │ q quit",
        pollers,
        diagnostics,
        app.api_url()
    );

    let status = Paragraph::new(text)
        .style(Style::default().fg(app.theme.status_bar))
        .block(Block::default().borders(Borders::TOP));

    f.render_widget(status, area);
}
