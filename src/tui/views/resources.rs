// Resource management view
//
// One renderer for every CRUD tab: the list, the create form, the active
// row edit and the feedback line.

use super::{panel, placeholder};
use crate::resources::CrudView;
use crate::tui::app::{App, InputTarget};
use crate::tui::components::notice;
use crate::util::fit_width;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Row, Table, TableState},
    Frame,
};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let Some(crud) = app.crud() else {
        return;
    };

    let form_height = crud.draft_fields().len() as u16 + 4;
    let [list_area, form_area] =
        Layout::vertical([Constraint::Min(5), Constraint::Length(form_height)]).areas(area);

    render_list(f, list_area, app, crud);
    render_form(f, form_area, app, crud);
}

fn render_list(f: &mut Frame, area: Rect, app: &App, crud: &dyn CrudView) {
    let block = panel(format!(" {} ", crud.title()), app);
    let Some(rows) = crud.rows() else {
        placeholder(f, area, block, "Loading...", app);
        return;
    };
    if rows.is_empty() {
        placeholder(f, area, block, "Nothing here yet. Press n to add one.", app);
        return;
    }

    let columns = crud.columns();
    let cell_width = (area.width.saturating_sub(10) as usize / columns.len().max(1)).max(4);
    let editing = crud.editing();

    let table_rows = rows.iter().map(|(id, cells)| {
        let mut row_cells = vec![id.to_string()];
        row_cells.extend(cells.iter().map(|cell| fit_width(cell, cell_width)));
        let row = Row::new(row_cells);
        if app.pending_delete == Some(*id) {
            row.style(Style::default().fg(app.theme.error))
        } else if editing.as_ref().is_some_and(|e| e.editing_id == *id) {
            row.style(Style::default().fg(app.theme.highlight))
        } else {
            row
        }
    });

    let mut header = vec!["ID"];
    header.extend_from_slice(columns);
    let mut widths = vec![Constraint::Length(6)];
    widths.extend(columns.iter().map(|_| Constraint::Fill(1)));

    let table = Table::new(table_rows, widths)
        .header(Row::new(header).style(app.theme.header()))
        .row_highlight_style(app.theme.selected())
        .block(block);

    let mut state = TableState::default().with_selected(Some(app.selected));
    f.render_stateful_widget(table, area, &mut state);
}

fn render_form(f: &mut Frame, area: Rect, app: &App, crud: &dyn CrudView) {
    let theme = &app.theme;
    let active = app.editor.as_ref().map(|e| e.target);
    let mut lines = Vec::new();

    for field in crud.draft_fields() {
        let value = crud.draft_value(*field);
        let shown = if field.is_secret() {
            "•".repeat(value.chars().count())
        } else {
            value
        };
        let label_style = if active == Some(InputTarget::Draft(*field)) {
            Style::default().fg(theme.highlight).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.muted)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:>12} ", field.label()), label_style),
            Span::styled(shown, Style::default().fg(theme.foreground)),
        ]));
    }

    let status = if let Some(id) = app.pending_delete {
        Line::styled(
            format!("Press x again to delete #{}", id),
            Style::default().fg(theme.warning),
        )
    } else if let Some(edit) = crud.editing() {
        Line::styled(
            format!("Editing {} of #{}", edit.field.label(), edit.editing_id),
            Style::default().fg(theme.highlight),
        )
    } else {
        notice::line(crud.notice().as_ref(), theme)
    };
    lines.push(Line::default());
    lines.push(status);

    let block = panel(" New ", app);
    f.render_widget(Paragraph::new(lines).block(block), area);
}
