// Assignment view: pick one agent and one stream, Enter assigns

use super::{panel, placeholder};
use crate::tui::app::App;
use crate::tui::components::notice;
use crate::util::fit_width;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};

fn render_choices(
    f: &mut Frame,
    area: Rect,
    app: &App,
    title: &str,
    choices: Option<Vec<(i64, String)>>,
    selected: Option<i64>,
) {
    let block = panel(format!(" {} ", title), app);
    let Some(choices) = choices else {
        placeholder(f, area, block, "Loading...", app);
        return;
    };
    if choices.is_empty() {
        placeholder(f, area, block, "None registered.", app);
        return;
    }

    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = choices
        .iter()
        .map(|(id, name)| ListItem::new(fit_width(&format!("#{} {}", id, name), width)))
        .collect();
    let index = selected.and_then(|id| choices.iter().position(|(c, _)| *c == id));

    let list = List::new(items)
        .highlight_style(app.theme.selected())
        .highlight_symbol("▸ ")
        .block(block);
    let mut state = ListState::default().with_selected(index);
    f.render_stateful_widget(list, area, &mut state);
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let Some(console) = &app.console else {
        return;
    };
    let Some(admin) = &console.admin else {
        return;
    };
    let assignment = &admin.assignment;
    let selection = assignment.selection();

    let agents = assignment.agents().items().with(|agents| {
        agents.map(|agents| {
            agents
                .iter()
                .map(|a| (a.id, a.username.clone()))
                .collect::<Vec<_>>()
        })
    });
    let streams = assignment.streams().items().with(|streams| {
        streams.map(|streams| {
            streams
                .iter()
                .map(|s| (s.id, s.location().to_string()))
                .collect::<Vec<_>>()
        })
    });

    let [lists, feedback] = Layout::vertical([Constraint::Min(5), Constraint::Length(3)]).areas(area);
    let [agent_area, stream_area] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(lists);

    render_choices(f, agent_area, app, "Agent", agents, selection.agent_id);
    render_choices(f, stream_area, app, "Stream", streams, selection.stream_id);

    let line = notice::line(assignment.notice().as_ref(), &app.theme);
    f.render_widget(Paragraph::new(line).block(panel(" Assign ", app)), feedback);
}
