// Views module - screen-level rendering logic
//
// Each tab of the console is one view:
// - Dashboard: ongoing streams with a detail pane
// - Assign / Agents / Streams / Keywords / Objects: admin management forms
// - Logs: filterable event log
// - Scraper, Upload, Capture: admin tools
//
// Before a session exists the login screen replaces the whole shell.

mod assign;
mod dashboard;
mod detection;
mod login;
mod logs;
mod resources;
mod scraper;

use super::app::{App, View};
use crate::tui::components;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;

/// Main UI render function - called on every frame
pub fn draw(f: &mut Frame, app: &App) {
    let bg_block = Block::default().style(Style::default().bg(app.theme.background));
    f.render_widget(bg_block, f.area());

    if app.console.is_none() {
        login::render(f, f.area(), app);
    } else {
        draw_console(f, app);
    }

    if let Some(toast) = &app.toast {
        toast.render(f, f.area(), &app.theme);
    }
}

fn draw_console(f: &mut Frame, app: &App) {
    let diagnostics = if app.show_diagnostics { 10 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(diagnostics),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(f.area());

    components::render_tabs(f, chunks[0], app);

    let body = chunks[1];
    match app.view {
        View::Dashboard => dashboard::render(f, body, app),
        View::Assign => assign::render(f, body, app),
        View::Agents | View::Streams | View::Keywords | View::Objects => {
            resources::render(f, body, app)
        }
        View::Logs => logs::render(f, body, app),
        View::Scraper => scraper::render(f, body, app),
        View::Upload => detection::render_upload(f, body, app),
        View::Capture => detection::render_capture(f, body, app),
    }

    if app.show_diagnostics {
        components::render_diagnostics(f, chunks[2], app);
    }
    render_prompt(f, chunks[3], app);
    components::render_status(f, chunks[4], app);
}

/// The editor when one is open, otherwise the key hints of the tab
fn render_prompt(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let line = match &app.editor {
        Some(editor) => Line::from(vec![
            Span::styled(
                format!(" {}: ", editor.target.label()),
                Style::default().fg(theme.highlight).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                editor.input.display(editor.secret),
                Style::default().fg(theme.foreground),
            ),
            Span::styled("▏", Style::default().fg(theme.highlight)),
            Span::styled(
                "  Enter submit  Esc cancel",
                Style::default().fg(theme.muted),
            ),
        ]),
        None => Line::styled(
            format!(" {}", app.view.hints()),
            Style::default().fg(theme.muted),
        ),
    };
    f.render_widget(Paragraph::new(line), area);
}

/// Bordered block with the theme's frame styling
pub(super) fn panel<'a>(title: impl Into<Line<'a>>, app: &App) -> Block<'a> {
    Block::bordered()
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border))
        .title(title)
}

/// `label value` with the label right-aligned in a fixed column
pub(super) fn labeled<'a>(label: &'a str, value: String, app: &App) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{:>12} ", label), Style::default().fg(app.theme.muted)),
        Span::styled(value, Style::default().fg(app.theme.foreground)),
    ])
}

/// Centered placeholder text inside a panel
pub(super) fn placeholder(f: &mut Frame, area: Rect, block: Block, text: &str, app: &App) {
    let widget = Paragraph::new(text.to_string())
        .style(Style::default().fg(app.theme.muted))
        .alignment(ratatui::layout::Alignment::Center)
        .block(block);
    f.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Role;
    use crate::api::ApiClient;
    use crate::config::Config;
    use crate::console::Console;
    use crate::demo::DemoBackend;
    use crate::events;
    use crate::logging::LogBuffer;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn app(api: ApiClient) -> App {
        let (tx, _rx) = events::channel();
        App::new(api, Config::default(), LogBuffer::new(), tx)
    }

    #[tokio::test]
    async fn test_login_screen_renders_before_session() {
        let api = ApiClient::new("http://127.0.0.1:9").unwrap();
        let mut app = app(api);
        app.resolving = false;

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Username"));
        assert!(text.contains("Password"));
    }

    #[tokio::test]
    async fn test_admin_shell_lists_all_tabs() {
        let demo = DemoBackend::start("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let api = ApiClient::new(&demo.url()).unwrap();
        let mut app = app(api.clone());
        app.resolving = false;
        app.session = app.session.authenticate(Role::Admin);
        app.console = Some(Console::new(&api, Role::Admin, &Config::default().polling));

        let mut terminal = Terminal::new(TestBackend::new(160, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();

        let text = buffer_text(&terminal);
        for view in View::tabs(Role::Admin) {
            assert!(text.contains(view.name()), "missing tab {}", view.name());
        }
        assert!(text.contains("Ongoing streams"));
    }

    #[tokio::test]
    async fn test_logs_table_shows_ids_and_empty_filter_message() {
        use crate::api::models::LogEntry;

        let api = ApiClient::new("http://127.0.0.1:9").unwrap();
        let mut app = app(api.clone());
        app.resolving = false;
        app.session = app.session.authenticate(Role::Agent);
        let console = Console::new(&api, Role::Agent, &Config::default().polling);
        let snapshot = console.logs.snapshot();
        let ticket = snapshot.ticket();
        snapshot.apply(
            ticket,
            vec![LogEntry {
                id: 4217,
                timestamp: "2024-05-01T12:00:00Z".to_string(),
                stream_url: "https://stripchat.com/nova/".to_string(),
                event_type: "visual".to_string(),
            }],
        );
        app.console = Some(console);
        app.view = View::Logs;

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("ID"));
        assert!(text.contains("4217"));

        app.inputs.log_filter = "zzz".to_string();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains(crate::log_viewer::MSG_EMPTY));
        assert!(!text.contains("4217"));
    }
}
