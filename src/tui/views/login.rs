// Login screen
//
// Shown until the session resolves to a role. While the startup status
// check is in flight only a waiting line is drawn.

use super::panel;
use crate::tui::app::{App, LoginField};
use crate::tui::input::TextInput;
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

fn field_line<'a>(label: &'a str, input: &TextInput, secret: bool, focused: bool, app: &App) -> Line<'a> {
    let theme = &app.theme;
    let label_style = if focused {
        Style::default().fg(theme.highlight).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.muted)
    };
    let mut spans = vec![
        Span::styled(format!("{:>10} ", label), label_style),
        Span::styled(input.display(secret), Style::default().fg(theme.foreground)),
    ];
    if focused {
        spans.push(Span::styled("▏", Style::default().fg(theme.highlight)));
    }
    Line::from(spans)
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let [area] = Layout::horizontal([Constraint::Length(56)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([Constraint::Length(10)])
        .flex(Flex::Center)
        .areas(area);

    let theme = &app.theme;
    let block = panel(format!(" streamwatch · {} ", app.api_url()), app);

    if app.resolving {
        super::placeholder(f, area, block, "Checking session...", app);
        return;
    }

    let form = &app.login;
    let status = match (form.pending, form.error) {
        (true, _) => Line::styled("Logging in...", Style::default().fg(theme.muted)),
        (false, Some(message)) => Line::styled(message, Style::default().fg(theme.error)),
        (false, None) => Line::default(),
    };

    let lines = vec![
        Line::default(),
        field_line(
            "Username",
            &form.username,
            false,
            form.focus == LoginField::Username,
            app,
        ),
        field_line(
            "Password",
            &form.password,
            true,
            form.focus == LoginField::Password,
            app,
        ),
        Line::default(),
        status,
        Line::default(),
        Line::styled(
            "Tab switch field  Enter log in  Esc quit",
            Style::default().fg(theme.muted),
        ),
    ];

    f.render_widget(Paragraph::new(lines).block(block), area);
}
