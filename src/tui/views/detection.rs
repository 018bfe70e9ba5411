//! Detection test views
//!
//! Upload sends a video file and follows the gallery and audio flags the
//! server accumulates for it. Capture plays a frame directory and shows the
//! classification of the last frame sent.

use super::{labeled, panel, placeholder};
use crate::detection::PlaybackState;
use crate::tui::app::App;
use crate::tui::components::notice;
use crate::util::fit_width;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::Line,
    widgets::{List, ListItem, Paragraph, Row, Table},
    Frame,
};

pub fn render_upload(f: &mut Frame, area: Rect, app: &App) {
    let Some(admin) = app.console.as_ref().and_then(|c| c.admin.as_ref()) else {
        return;
    };
    let upload = &admin.upload;

    let [header, results] = Layout::vertical([Constraint::Length(6), Constraint::Min(5)]).areas(area);
    let [gallery_area, flags_area] =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(results);

    let status = if upload.is_uploading() {
        Line::styled("Uploading...", Style::default().fg(app.theme.highlight))
    } else {
        notice::line(upload.notice().as_ref(), &app.theme)
    };
    let value_width = header.width.saturating_sub(18) as usize;
    let lines = vec![
        labeled("File", fit_width(&app.inputs.video_path, value_width), app),
        labeled(
            "Playback",
            fit_width(&upload.video_url().unwrap_or_default(), value_width),
            app,
        ),
        Line::default(),
        status,
    ];
    f.render_widget(Paragraph::new(lines).block(panel(" Video upload ", app)), header);

    upload.thumbnails().with(|thumbnails| {
        let block = panel(" Gallery ", app);
        match thumbnails {
            None => placeholder(f, gallery_area, block, "No upload yet.", app),
            Some(thumbnails) if thumbnails.is_empty() => {
                placeholder(f, gallery_area, block, "No detections yet.", app)
            }
            Some(thumbnails) => {
                let rows = thumbnails.iter().map(|t| {
                    Row::new(vec![
                        t.class.clone(),
                        format!("{:.1}s", t.video_timestamp),
                        t.realworld_timestamp.clone(),
                    ])
                });
                let widths = [
                    Constraint::Fill(1),
                    Constraint::Length(8),
                    Constraint::Length(20),
                ];
                let table = Table::new(rows, widths)
                    .header(Row::new(["Class", "At", "Seen"]).style(app.theme.header()))
                    .block(block);
                f.render_widget(table, gallery_area);
            }
        }
    });

    upload.audio_flags().with(|flags| {
        let block = panel(" Audio flags ", app);
        match flags {
            None => placeholder(f, flags_area, block, "No upload yet.", app),
            Some(flags) if flags.is_empty() => {
                placeholder(f, flags_area, block, "No flagged phrases.", app)
            }
            Some(flags) => {
                let width = flags_area.width.saturating_sub(4) as usize;
                let items: Vec<ListItem> = flags
                    .iter()
                    .map(|(keyword, flag)| {
                        ListItem::new(fit_width(
                            &format!("{} @{:.1}s: {}", keyword, flag.audio_timestamp, flag.phrase),
                            width,
                        ))
                    })
                    .collect();
                f.render_widget(List::new(items).block(block), flags_area);
            }
        }
    });
}

fn playback_label(state: PlaybackState) -> &'static str {
    match state {
        PlaybackState::Idle => "idle",
        PlaybackState::Playing => "▶ playing",
        PlaybackState::Paused => "⏸ paused",
        PlaybackState::Ended => "■ ended",
    }
}

pub fn render_capture(f: &mut Frame, area: Rect, app: &App) {
    let Some(admin) = app.console.as_ref().and_then(|c| c.admin.as_ref()) else {
        return;
    };
    let capture = &admin.capture;

    let [header, results] = Layout::vertical([Constraint::Length(6), Constraint::Min(5)]).areas(area);

    let source = match capture.source_info() {
        Some((name, position, len)) => format!("{} ({}/{})", name, position, len),
        None => "none".to_string(),
    };
    let lines = vec![
        labeled("Source", fit_width(&source, header.width.saturating_sub(18) as usize), app),
        labeled("Playback", playback_label(capture.playback()).to_string(), app),
        labeled("Frames sent", capture.frames_sent().to_string(), app),
    ];
    f.render_widget(Paragraph::new(lines).block(panel(" Frame capture ", app)), header);

    capture.detections().with(|detections| {
        let block = panel(" Last frame ", app);
        match detections {
            None => placeholder(f, results, block, "No frame sent yet.", app),
            Some(detections) if detections.is_empty() => {
                placeholder(f, results, block, "Nothing detected.", app)
            }
            Some(detections) => {
                let rows = detections
                    .iter()
                    .map(|d| Row::new(vec![d.class.clone(), format!("{:.0}%", d.confidence * 100.0)]));
                let widths = [Constraint::Fill(1), Constraint::Length(10)];
                let table = Table::new(rows, widths)
                    .header(Row::new(["Class", "Confidence"]).style(app.theme.header()))
                    .block(block);
                f.render_widget(table, results);
            }
        }
    });
}

