// Scraper view
//
// Step one scrapes a room URL, step two registers the scraped room with a
// buffer URL. The second step is refused until the first has a result.

use super::{labeled, panel};
use crate::tui::app::App;
use crate::tui::components::notice;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::Line,
    widgets::Paragraph,
    Frame,
};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let Some(console) = &app.console else {
        return;
    };
    let Some(admin) = &console.admin else {
        return;
    };
    let scraper = &admin.scraper;

    let [inputs_area, result_area] =
        Layout::vertical([Constraint::Length(6), Constraint::Min(5)]).areas(area);

    let inputs = vec![
        labeled("Room URL", app.inputs.room_url.clone(), app),
        labeled("Buffer URL", app.inputs.buffer_url.clone(), app),
        Line::default(),
        notice::line(scraper.notice().as_ref(), &app.theme),
    ];
    f.render_widget(Paragraph::new(inputs).block(panel(" Scrape ", app)), inputs_area);

    let lines = match scraper.result() {
        Some(result) => vec![
            labeled("Room", result.room_url, app),
            labeled("Streamer", result.streamer_username, app),
            labeled("Title", result.page_title, app),
        ],
        None => vec![Line::styled(
            "Press u to scrape a room.",
            Style::default().fg(app.theme.muted),
        )],
    };
    f.render_widget(
        Paragraph::new(lines).block(panel(" Scraped room ", app)),
        result_area,
    );
}
