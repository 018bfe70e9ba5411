// TUI module - Terminal User Interface
//
// This module manages the terminal UI using ratatui. It handles:
// - Terminal initialization and cleanup
// - Event loop (keyboard input, timer ticks, console events)
// - Layered key dispatch

pub mod app;
pub mod components;
pub mod input;
pub mod theme;
pub mod views;

use crate::api::ApiClient;
use crate::config::Config;
use crate::events::{self, EventReceiver};
use crate::logging::LogBuffer;
use crate::resources::Field;
use anyhow::{Context, Result};
use app::{App, InputTarget, View};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;

/// Run the TUI
///
/// Sets up the terminal, resolves the session, runs the event loop, and
/// restores the terminal when done.
pub async fn run_tui(api: ApiClient, log_buffer: LogBuffer, config: Config) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let (events_tx, mut events_rx) = events::channel();
    let mut app = App::new(api, config, log_buffer, events_tx);
    app.start();

    let result = run_event_loop(&mut terminal, &mut app, &mut events_rx).await;

    // Pollers and harness tasks stop before the terminal is handed back
    drop(app);

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

/// Main event loop
///
/// Waits on three sources and redraws after whichever fires:
/// 1. Keyboard input
/// 2. Timer ticks (toast expiry, redraw of snapshot changes)
/// 3. Console events from background tasks (session transitions, toasts)
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events_rx: &mut EventReceiver,
) -> Result<()> {
    let mut tick_interval = tokio::time::interval(Duration::from_millis(200));

    loop {
        terminal
            .draw(|f| views::draw(f, app))
            .context("Failed to draw terminal")?;

        tokio::select! {
            _ = async {
                if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                    if let Ok(Event::Key(key_event)) = event::read() {
                        handle_key_event(app, key_event);
                    }
                }
            } => {}

            _ = tick_interval.tick() => {
                app.tick();
            }

            Some(console_event) = events_rx.recv() => {
                app.handle_event(console_event);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle keyboard input
/// Layered dispatch: Login → Editor → Global → View-specific
fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Layer 1: login form owns every key until a console exists
    if app.console.is_none() {
        handle_login_keys(app, &key);
        return;
    }

    // Layer 2: an open editor captures text input
    if app.editor.is_some() {
        handle_editor_keys(app, &key);
        return;
    }

    // Layer 3: global keys
    if handle_global_keys(app, &key) {
        return;
    }

    // Layer 4: keys of the visible tab
    handle_view_keys(app, &key);
}

fn handle_login_keys(app: &mut App, key: &KeyEvent) {
    if app.resolving {
        if key.code == KeyCode::Esc {
            app.should_quit = true;
        }
        return;
    }
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => app.login.toggle_focus(),
        KeyCode::Enter => app.submit_login(),
        _ => {
            if !app.login.pending {
                app.login.focused_input().handle(key);
            }
        }
    }
}

fn handle_editor_keys(app: &mut App, key: &KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_editor(),
        KeyCode::Esc => app.cancel_editor(),
        KeyCode::Tab => app.editor_next_field(),
        _ => {
            let changed = app
                .editor
                .as_mut()
                .is_some_and(|editor| editor.input.handle(key));
            if changed {
                app.write_through();
            }
        }
    }
}

/// Handle global keys that work in every tab
/// Returns true if the key was handled
fn handle_global_keys(app: &mut App, key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('L') => app.logout(),
        KeyCode::Tab => app.next_tab(),
        KeyCode::BackTab => app.prev_tab(),
        KeyCode::F(2) => app.show_diagnostics = !app.show_diagnostics,
        KeyCode::Char(c @ '0'..='9') => {
            let digit = c as usize - '0' as usize;
            app.select_tab(if digit == 0 { 9 } else { digit - 1 });
        }
        _ => return false,
    }
    true
}

fn handle_view_keys(app: &mut App, key: &KeyEvent) {
    match key.code {
        KeyCode::Up => {
            if app.view == View::Assign {
                app.cycle_assignment(-1, 0);
            } else {
                app.move_selection(-1);
            }
            return;
        }
        KeyCode::Down => {
            if app.view == View::Assign {
                app.cycle_assignment(1, 0);
            } else {
                app.move_selection(1);
            }
            return;
        }
        _ => {}
    }

    match (app.view, key.code) {
        (View::Assign, KeyCode::Left) => app.cycle_assignment(0, -1),
        (View::Assign, KeyCode::Right) => app.cycle_assignment(0, 1),
        (View::Assign, KeyCode::Enter) => app.submit_assignment(),

        (View::Agents, KeyCode::Char('e')) => app.begin_row_edit(Some(Field::Username)),
        (View::Agents, KeyCode::Char('p')) => app.begin_row_edit(Some(Field::Password)),
        (View::Streams | View::Keywords | View::Objects, KeyCode::Char('e')) => {
            app.begin_row_edit(None)
        }
        (View::Agents | View::Streams | View::Keywords | View::Objects, KeyCode::Char('n')) => {
            app.begin_create()
        }
        (View::Agents | View::Streams | View::Keywords | View::Objects, KeyCode::Char('x')) => {
            app.request_delete()
        }
        (_, KeyCode::Esc) if app.pending_delete.is_some() => app.pending_delete = None,

        (View::Logs, KeyCode::Char('/')) => app.open_editor(InputTarget::LogFilter),
        (View::Logs, KeyCode::Esc) => {
            app.inputs.log_filter.clear();
            app.selected = 0;
        }

        (View::Scraper, KeyCode::Char('u')) => app.open_editor(InputTarget::RoomUrl),
        (View::Scraper, KeyCode::Char('b')) => app.open_editor(InputTarget::BufferUrl),

        (View::Upload, KeyCode::Char('o')) => app.open_editor(InputTarget::VideoPath),

        (View::Capture, KeyCode::Char('o')) => app.open_editor(InputTarget::FramesDir),
        (View::Capture, KeyCode::Char(' ')) => app.toggle_playback(),
        (View::Capture, KeyCode::Char('s')) => app.stop_playback(),

        (View::Dashboard | View::Assign, KeyCode::Char('r')) => app.reload(),
        (View::Agents | View::Streams | View::Keywords | View::Objects, KeyCode::Char('r')) => {
            app.reload()
        }
        _ => {}
    }
}
