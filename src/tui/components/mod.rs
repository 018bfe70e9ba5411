// Components module - reusable UI building blocks
//
// Shell components are rendered around every view:
// - Tab bar: role, tabs, session state
// - Status bar: active pollers, diagnostics count, API address
// - Diagnostics panel: captured tracing output (toggle with F2)
// - Toast: short-lived notification overlay
//
// Feedback lines under forms are shared by every view through `notice`.

pub mod diagnostics;
pub mod notice;
pub mod status_bar;
pub mod tab_bar;
pub mod toast;

pub use toast::Toast;

use crate::tui::app::App;
use ratatui::{layout::Rect, Frame};

/// Render the tab bar (convenience wrapper)
pub fn render_tabs(f: &mut Frame, area: Rect, app: &App) {
    tab_bar::render(f, area, app);
}

/// Render the status bar (convenience wrapper)
pub fn render_status(f: &mut Frame, area: Rect, app: &App) {
    status_bar::render(f, area, app);
}

/// Render the diagnostics panel (convenience wrapper)
pub fn render_diagnostics(f: &mut Frame, area: Rect, app: &App) {
    diagnostics::render(f, area, app);
}
