// Dashboard view
//
// Ongoing streams on the left, the selected row's details on the right.
// Agents see only their own rows and no agent column.

use super::{panel, placeholder};
use crate::api::models::Dashboard;
use crate::dashboard::{stream_details, DashboardScope};
use crate::tui::app::App;
use crate::util::fit_width;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Row, Table, TableState},
    Frame,
};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let Some(console) = &app.console else {
        return;
    };
    let poller = &console.dashboard;
    let scope = poller.scope();

    let [table_area, detail_area] =
        Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(area);

    poller.snapshot().with(|dashboard| match dashboard {
        None => placeholder(
            f,
            table_area,
            panel(" Ongoing streams ", app),
            "Loading dashboard...",
            app,
        ),
        Some(dashboard) => {
            render_table(f, table_area, app, dashboard, scope);
            render_details(f, detail_area, app, dashboard, scope);
        }
    });
}

fn render_table(f: &mut Frame, area: Rect, app: &App, dashboard: &Dashboard, scope: DashboardScope) {
    let title = format!(" Ongoing streams: {} ", dashboard.ongoing_streams);
    let block = panel(title, app);
    if dashboard.assignments.is_empty() {
        placeholder(f, area, block, "No ongoing streams.", app);
        return;
    }

    let url_width = area.width.saturating_sub(48) as usize;
    let admin = scope == DashboardScope::Admin;

    let mut header = vec!["Stream", "Platform", "Streamer"];
    if admin {
        header.push("Agent");
    }
    header.push("URL");

    let rows = dashboard.assignments.iter().map(|row| {
        let mut cells = vec![
            row.stream_id.to_string(),
            row.platform().as_str().to_string(),
            row.streamer_username.clone().unwrap_or_else(|| "-".to_string()),
        ];
        if admin {
            cells.push(row.agent_username.clone().unwrap_or_else(|| "-".to_string()));
        }
        cells.push(fit_width(row.room_url.as_deref().unwrap_or_default(), url_width));
        Row::new(cells)
    });

    let mut widths = vec![
        Constraint::Length(7),
        Constraint::Length(11),
        Constraint::Length(16),
    ];
    if admin {
        widths.push(Constraint::Length(12));
    }
    widths.push(Constraint::Min(10));

    let table = Table::new(rows, widths)
        .header(Row::new(header).style(app.theme.header()))
        .row_highlight_style(app.theme.selected())
        .block(block);

    let mut state = TableState::default().with_selected(Some(app.selected));
    f.render_stateful_widget(table, area, &mut state);
}

fn render_details(f: &mut Frame, area: Rect, app: &App, dashboard: &Dashboard, scope: DashboardScope) {
    let block = panel(" Details ", app);
    let Some(row) = dashboard.assignments.get(app.selected) else {
        f.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let value_width = area.width.saturating_sub(16) as usize;
    let lines: Vec<Line> = stream_details(row, scope)
        .into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{:<11}", label), Style::default().fg(app.theme.muted)),
                Span::styled(
                    fit_width(&value, value_width),
                    Style::default().fg(app.theme.foreground),
                ),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}
