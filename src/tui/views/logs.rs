// Logs view: the event log filtered by the `/` query, in server order

use super::{panel, placeholder};
use crate::log_viewer::{local_timestamp, LogListing};
use crate::tui::app::App;
use crate::util::fit_width;
use ratatui::{
    layout::{Constraint, Rect},
    widgets::{Row, Table, TableState},
    Frame,
};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let Some(console) = &app.console else {
        return;
    };
    let filter = &app.inputs.log_filter;
    let title = if filter.is_empty() {
        " Logs ".to_string()
    } else {
        format!(" Logs · filter: {} ", filter)
    };
    let url_width = area.width.saturating_sub(52) as usize;

    console.logs.with_listing(filter, |listing| {
        let block = panel(title, app);
        let entries = match listing {
            LogListing::Entries(entries) => entries,
            other => {
                let text = other.placeholder().unwrap_or_default();
                placeholder(f, area, block, text, app);
                return;
            }
        };

        let rows = entries.iter().map(|entry| {
            Row::new(vec![
                entry.id.to_string(),
                local_timestamp(&entry.timestamp),
                fit_width(&entry.stream_url, url_width),
                entry.event_type.clone(),
            ])
        });
        let widths = [
            Constraint::Length(6),
            Constraint::Length(19),
            Constraint::Fill(1),
            Constraint::Length(20),
        ];

        let table = Table::new(rows, widths)
            .header(Row::new(["ID", "Time", "Stream", "Event"]).style(app.theme.header()))
            .row_highlight_style(app.theme.selected())
            .block(block);
        let mut state = TableState::default().with_selected(Some(app.selected));
        f.render_stateful_widget(table, area, &mut state);
    });
}
