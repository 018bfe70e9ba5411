// TUI application state
//
// The App holds the session state machine, the per-role Console and the
// ViewTasks of whichever tab is visible. Switching tabs replaces the
// ViewTasks, which cancels every poller the previous tab started. Ending the
// session drops the Console along with everything it owns.

use super::components::Toast;
use super::input::TextInput;
use super::theme::Theme;
use crate::api::models::Role;
use crate::api::ApiClient;
use crate::config::Config;
use crate::console::{AdminTools, Console};
use crate::detection::{FrameDirectory, FrameSource, PlaybackState};
use crate::events::{publish, ConsoleEvent, EventSender};
use crate::logging::LogBuffer;
use crate::poller::{PollHandle, ViewTasks};
use crate::resources::{CrudView, Field};
use crate::session::{SessionController, SessionState};

/// One tab of the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Dashboard,
    Assign,
    Agents,
    Streams,
    Keywords,
    Objects,
    Logs,
    Scraper,
    Upload,
    Capture,
}

const ADMIN_TABS: &[View] = &[
    View::Dashboard,
    View::Assign,
    View::Agents,
    View::Streams,
    View::Keywords,
    View::Objects,
    View::Logs,
    View::Scraper,
    View::Upload,
    View::Capture,
];

const AGENT_TABS: &[View] = &[View::Dashboard, View::Logs];

impl View {
    /// Tabs available to a role, in display order
    pub fn tabs(role: Role) -> &'static [View] {
        match role {
            Role::Admin => ADMIN_TABS,
            Role::Agent => AGENT_TABS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            View::Dashboard => "Dashboard",
            View::Assign => "Assign",
            View::Agents => "Agents",
            View::Streams => "Streams",
            View::Keywords => "Keywords",
            View::Objects => "Objects",
            View::Logs => "Logs",
            View::Scraper => "Scraper",
            View::Upload => "Upload Test",
            View::Capture => "Live Test",
        }
    }

    /// Key hints shown under the view
    pub fn hints(&self) -> &'static str {
        match self {
            View::Dashboard => "↑/↓ select  r refresh",
            View::Assign => "↑/↓ agent  ←/→ stream  Enter assign  r reload",
            View::Agents => "n new  e rename  p password  x delete  r reload",
            View::Streams => "n new  e edit URL  x delete  r reload",
            View::Keywords | View::Objects => "n new  e edit  x delete  r reload",
            View::Logs => "/ filter  Esc clear filter  ↑/↓ select",
            View::Scraper => "u room URL  b buffer URL",
            View::Upload => "o choose video file",
            View::Capture => "o open frame directory  Space play/pause  s stop",
        }
    }
}

/// Which text value the editor is writing to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    /// A field of the current tab's create form
    Draft(Field),
    /// The active row edit of the current tab
    Edit,
    LogFilter,
    RoomUrl,
    BufferUrl,
    VideoPath,
    FramesDir,
}

impl InputTarget {
    pub fn label(&self) -> &'static str {
        match self {
            InputTarget::Draft(field) => field.label(),
            InputTarget::Edit => "Edit",
            InputTarget::LogFilter => "Filter",
            InputTarget::RoomUrl => "Room URL",
            InputTarget::BufferUrl => "Buffer URL",
            InputTarget::VideoPath => "Video file",
            InputTarget::FramesDir => "Frame directory",
        }
    }
}

/// An open text editor bound to one target
#[derive(Debug, Clone)]
pub struct Editor {
    pub target: InputTarget,
    pub input: TextInput,
    pub secret: bool,
}

/// Free-text values that belong to the TUI rather than to a component
#[derive(Debug, Clone, Default)]
pub struct ViewInputs {
    pub log_filter: String,
    pub room_url: String,
    pub buffer_url: String,
    pub video_path: String,
    pub frames_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Username,
    Password,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: TextInput,
    pub password: TextInput,
    pub focus: LoginField,
    pub error: Option<&'static str>,
    pub pending: bool,
}

impl LoginForm {
    pub fn focused_input(&mut self) -> &mut TextInput {
        match self.focus {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }
}

/// Main application state for the TUI
pub struct App {
    api: ApiClient,
    config: Config,
    session_ctl: SessionController,
    events_tx: EventSender,

    /// The single source of truth for which screen is shown
    pub session: SessionState,

    /// Startup session check still running
    pub resolving: bool,

    /// Logout request in flight
    pub logging_out: bool,

    /// Live components for the current role; `None` while anonymous
    pub console: Option<Console>,

    /// Visible tab
    pub view: View,

    /// Pollers and loads owned by the visible tab
    tasks: ViewTasks,

    /// Selected row in the visible tab
    pub selected: usize,

    /// Row id waiting for a second `x` to confirm deletion
    pub pending_delete: Option<i64>,

    pub editor: Option<Editor>,
    pub inputs: ViewInputs,
    pub login: LoginForm,

    pub toast: Option<Toast>,
    pub show_diagnostics: bool,
    pub log_buffer: LogBuffer,
    pub theme: Theme,

    /// Whether the app should quit
    pub should_quit: bool,
}

impl App {
    pub fn new(api: ApiClient, config: Config, log_buffer: LogBuffer, events_tx: EventSender) -> Self {
        Self {
            session_ctl: SessionController::new(api.clone()),
            api,
            config,
            events_tx,
            session: SessionState::Anonymous,
            resolving: false,
            logging_out: false,
            console: None,
            view: View::Dashboard,
            tasks: ViewTasks::new(),
            selected: 0,
            pending_delete: None,
            editor: None,
            inputs: ViewInputs::default(),
            login: LoginForm::default(),
            toast: None,
            show_diagnostics: false,
            log_buffer,
            theme: Theme::default(),
            should_quit: false,
        }
    }

    pub fn api_url(&self) -> &str {
        self.api.base_url()
    }

    /// Kick off the one startup session query
    pub fn start(&mut self) {
        self.resolving = true;
        let ctl = self.session_ctl.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let state = ctl.resolve().await;
            publish(&tx, ConsoleEvent::SessionResolved(state)).await;
        });
    }

    pub fn show_toast(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast::new(message));
    }

    /// Drop the toast once it has been on screen long enough
    pub fn tick(&mut self) {
        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
        }
    }

    pub fn handle_event(&mut self, event: ConsoleEvent) {
        match event {
            ConsoleEvent::SessionResolved(state) => {
                self.resolving = false;
                if self.console.is_some() {
                    return;
                }
                if let SessionState::Authenticated(role) = state {
                    self.show_toast(format!("Resumed session as {}", role));
                    self.enter_console(role);
                }
            }
            ConsoleEvent::LoggedIn(role) => {
                self.login = LoginForm::default();
                self.enter_console(role);
            }
            ConsoleEvent::LoginFailed(message) => {
                self.login.pending = false;
                self.login.error = Some(message);
            }
            ConsoleEvent::LoggedOut => {
                self.logging_out = false;
                self.leave_console();
                self.show_toast("Logged out");
            }
            ConsoleEvent::Toast(message) => self.show_toast(message),
        }
    }

    fn enter_console(&mut self, role: Role) {
        self.session = self.session.authenticate(role);
        self.console = Some(Console::new(&self.api, role, &self.config.polling));
        self.inputs = ViewInputs::default();
        self.set_view(View::Dashboard);
    }

    fn leave_console(&mut self) {
        self.tasks.cancel_all();
        self.editor = None;
        self.pending_delete = None;
        if let Some(console) = self.console.take() {
            console.teardown();
        }
        self.session = self.session.end();
        self.view = View::Dashboard;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session actions
    // ─────────────────────────────────────────────────────────────────────

    pub fn submit_login(&mut self) {
        if self.login.pending {
            return;
        }
        self.login.pending = true;
        self.login.error = None;
        let username = self.login.username.value().to_string();
        let password = self.login.password.value().to_string();
        let ctl = self.session_ctl.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match ctl.login(&username, &password).await {
                Ok(role) => ConsoleEvent::LoggedIn(role),
                Err(e) => ConsoleEvent::LoginFailed(e.user_message()),
            };
            publish(&tx, event).await;
        });
    }

    /// Fire the logout request; local state is cleared when it completes,
    /// whatever the outcome
    pub fn logout(&mut self) {
        if self.logging_out || self.console.is_none() {
            return;
        }
        self.logging_out = true;
        let ctl = self.session_ctl.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            ctl.logout().await;
            publish(&tx, ConsoleEvent::LoggedOut).await;
        });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tabs
    // ─────────────────────────────────────────────────────────────────────

    pub fn tabs(&self) -> &'static [View] {
        self.session.role().map(View::tabs).unwrap_or(&[])
    }

    fn admin(&self) -> Option<&AdminTools> {
        self.console.as_ref()?.admin.as_ref()
    }

    /// Switch tabs: the old tab's tasks stop before the new tab's start
    pub fn set_view(&mut self, view: View) {
        if !self.tabs().contains(&view) {
            return;
        }
        self.tasks.cancel_all();
        if let Some(crud) = self.crud() {
            crud.cancel_edit();
        }
        if let Some(admin) = self.admin() {
            match self.view {
                View::Upload if view != View::Upload => admin.upload.teardown(),
                View::Capture if view != View::Capture => admin.capture.teardown(),
                _ => {}
            }
        }

        self.view = view;
        self.selected = 0;
        self.pending_delete = None;
        self.editor = None;
        self.tasks = self.start_view_tasks(view);
        tracing::debug!(view = view.name(), tasks = ?self.tasks.names(), "View activated");
    }

    fn start_view_tasks(&self, view: View) -> ViewTasks {
        let mut tasks = ViewTasks::new();
        let Some(console) = &self.console else {
            return tasks;
        };
        match view {
            View::Dashboard => tasks.push(console.dashboard.activate()),
            View::Logs => tasks.push(console.logs.activate()),
            View::Assign => {
                if let Some(admin) = &console.admin {
                    let assignment = admin.assignment.clone();
                    let load = tokio::spawn(async move { assignment.load().await });
                    tasks.push(PollHandle::from_task("assign-load", load));
                }
            }
            View::Agents | View::Streams | View::Keywords | View::Objects => {
                if let Some(crud) = self.crud_for(view) {
                    tasks.push(PollHandle::from_task(list_task_name(view), crud.spawn_list()));
                }
            }
            View::Scraper | View::Upload | View::Capture => {}
        }
        tasks
    }

    pub fn next_tab(&mut self) {
        self.step_tab(1);
    }

    pub fn prev_tab(&mut self) {
        self.step_tab(-1);
    }

    fn step_tab(&mut self, step: isize) {
        let tabs = self.tabs();
        if tabs.is_empty() {
            return;
        }
        let current = tabs.iter().position(|v| *v == self.view).unwrap_or(0) as isize;
        let next = (current + step).rem_euclid(tabs.len() as isize) as usize;
        self.set_view(tabs[next]);
    }

    pub fn select_tab(&mut self, index: usize) {
        if let Some(view) = self.tabs().get(index) {
            self.set_view(*view);
        }
    }

    /// Names of everything currently running on behalf of the console
    pub fn active_tasks(&self) -> Vec<&'static str> {
        let mut names = self.tasks.names();
        if let Some(admin) = self.admin() {
            names.extend(admin.upload.active_pollers());
            if admin.capture.is_capturing() {
                names.push("frame-capture");
            }
        }
        names
    }

    // ─────────────────────────────────────────────────────────────────────
    // Resource tabs
    // ─────────────────────────────────────────────────────────────────────

    fn crud_for(&self, view: View) -> Option<&dyn CrudView> {
        let admin = self.admin()?;
        match view {
            View::Agents => Some(&admin.agents),
            View::Streams => Some(&admin.streams),
            View::Keywords => Some(&admin.keywords),
            View::Objects => Some(&admin.objects),
            _ => None,
        }
    }

    /// The CRUD manager behind the visible tab, if it is a resource tab
    pub fn crud(&self) -> Option<&dyn CrudView> {
        self.crud_for(self.view)
    }

    fn selected_row_id(&self) -> Option<i64> {
        let rows = self.crud()?.rows()?;
        rows.get(self.selected).map(|(id, _)| *id)
    }

    pub fn begin_create(&mut self) {
        let Some(field) = self.crud().and_then(|crud| crud.draft_fields().first().copied()) else {
            return;
        };
        self.open_editor(InputTarget::Draft(field));
    }

    /// Start editing `field` of the selected row, if this tab allows it
    pub fn begin_row_edit(&mut self, field: Option<Field>) {
        let Some(id) = self.selected_row_id() else {
            return;
        };
        let Some(crud) = self.crud() else {
            return;
        };
        let field = match field {
            Some(field) if crud.edit_fields().contains(&field) => field,
            Some(_) => return,
            None => match crud.edit_fields().first() {
                Some(field) => *field,
                None => return,
            },
        };
        crud.begin_edit(id, field);
        self.open_editor(InputTarget::Edit);
    }

    /// First `x` arms, second `x` on the same row deletes
    pub fn request_delete(&mut self) {
        let Some(id) = self.selected_row_id() else {
            return;
        };
        if self.pending_delete == Some(id) {
            self.pending_delete = None;
            if let Some(crud) = self.crud() {
                crud.spawn_delete(id);
            }
        } else {
            self.pending_delete = Some(id);
        }
    }

    pub fn reload(&mut self) {
        match self.view {
            View::Dashboard => {
                if let Some(console) = &self.console {
                    let dashboard = console.dashboard.clone();
                    tokio::spawn(async move { dashboard.refresh().await });
                }
            }
            View::Assign => {
                if let Some(admin) = self.admin() {
                    let assignment = admin.assignment.clone();
                    tokio::spawn(async move { assignment.load().await });
                }
            }
            _ => {
                if let Some(crud) = self.crud() {
                    // Detached; the list lands in the snapshot
                    drop(crud.spawn_list());
                }
            }
        }
    }

    /// Rows in the visible tab, for clamping the selection
    pub fn row_count(&self) -> usize {
        let Some(console) = &self.console else {
            return 0;
        };
        match self.view {
            View::Dashboard => console
                .dashboard
                .snapshot()
                .with(|d| d.map_or(0, |d| d.assignments.len())),
            View::Logs => console
                .logs
                .with_listing(&self.inputs.log_filter, |listing| match listing {
                    crate::log_viewer::LogListing::Entries(entries) => entries.len(),
                    _ => 0,
                }),
            _ => self
                .crud()
                .and_then(|crud| crud.rows())
                .map_or(0, |rows| rows.len()),
        }
    }

    pub fn move_selection(&mut self, step: isize) {
        let count = self.row_count();
        self.pending_delete = None;
        if count == 0 {
            self.selected = 0;
            return;
        }
        let next = (self.selected as isize + step).clamp(0, count as isize - 1);
        self.selected = next as usize;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Assignment, detection
    // ─────────────────────────────────────────────────────────────────────

    pub fn cycle_assignment(&mut self, agent_step: isize, stream_step: isize) {
        if let Some(admin) = self.admin() {
            if agent_step != 0 {
                admin.assignment.cycle_agent(agent_step);
            }
            if stream_step != 0 {
                admin.assignment.cycle_stream(stream_step);
            }
        }
    }

    pub fn submit_assignment(&mut self) {
        if let Some(admin) = self.admin() {
            let assignment = admin.assignment.clone();
            tokio::spawn(async move {
                let _ = assignment.assign().await;
            });
        }
    }

    pub fn toggle_playback(&mut self) {
        let Some(capture) = self.admin().map(|admin| admin.capture.clone()) else {
            return;
        };
        if capture.source_info().is_none() {
            self.show_toast("Open a frame directory first");
            return;
        }
        capture.toggle();
    }

    pub fn stop_playback(&mut self) {
        if let Some(admin) = self.admin() {
            if admin.capture.playback() != PlaybackState::Idle {
                admin.capture.end();
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Editor
    // ─────────────────────────────────────────────────────────────────────

    /// Open the editor on `target`, starting from its current value
    pub fn open_editor(&mut self, target: InputTarget) {
        let (value, secret) = match target {
            InputTarget::Draft(field) => (
                self.crud().map(|c| c.draft_value(field)).unwrap_or_default(),
                field.is_secret(),
            ),
            InputTarget::Edit => match self.crud().and_then(|c| c.editing()) {
                Some(edit) => (edit.draft_value, edit.field.is_secret()),
                None => return,
            },
            InputTarget::LogFilter => (self.inputs.log_filter.clone(), false),
            InputTarget::RoomUrl => (self.inputs.room_url.clone(), false),
            InputTarget::BufferUrl => (self.inputs.buffer_url.clone(), false),
            InputTarget::VideoPath => (self.inputs.video_path.clone(), false),
            InputTarget::FramesDir => (self.inputs.frames_dir.clone(), false),
        };
        self.editor = Some(Editor {
            target,
            input: TextInput::with_value(value),
            secret,
        });
    }

    /// Push the editor's value into the value it is bound to
    pub fn write_through(&mut self) {
        let Some(editor) = &self.editor else {
            return;
        };
        let target = editor.target;
        let value = editor.input.value().to_string();
        match target {
            InputTarget::Draft(field) => {
                if let Some(crud) = self.crud() {
                    crud.set_draft_value(field, value);
                }
            }
            InputTarget::Edit => {
                if let Some(crud) = self.crud() {
                    crud.set_edit_draft(value);
                }
            }
            InputTarget::LogFilter => {
                self.inputs.log_filter = value;
                self.selected = 0;
            }
            InputTarget::RoomUrl => self.inputs.room_url = value,
            InputTarget::BufferUrl => self.inputs.buffer_url = value,
            InputTarget::VideoPath => self.inputs.video_path = value,
            InputTarget::FramesDir => self.inputs.frames_dir = value,
        }
    }

    /// Tab inside a create form moves to the next field
    pub fn editor_next_field(&mut self) {
        let Some(InputTarget::Draft(current)) = self.editor.as_ref().map(|e| e.target) else {
            return;
        };
        let Some(fields) = self.crud().map(|c| c.draft_fields()) else {
            return;
        };
        let index = fields.iter().position(|f| *f == current).unwrap_or(0);
        let next = fields[(index + 1) % fields.len()];
        self.open_editor(InputTarget::Draft(next));
    }

    pub fn cancel_editor(&mut self) {
        if let Some(editor) = self.editor.take() {
            if editor.target == InputTarget::Edit {
                if let Some(crud) = self.crud() {
                    crud.cancel_edit();
                }
            }
        }
    }

    /// Enter in the editor: run the operation the target feeds
    pub fn submit_editor(&mut self) {
        let Some(editor) = self.editor.take() else {
            return;
        };
        match editor.target {
            InputTarget::Draft(_) => {
                if let Some(crud) = self.crud() {
                    crud.spawn_create();
                }
            }
            InputTarget::Edit => {
                if let Some(crud) = self.crud() {
                    crud.spawn_commit_edit();
                }
            }
            InputTarget::LogFilter => {}
            InputTarget::RoomUrl => {
                if let Some(admin) = self.admin() {
                    let scraper = admin.scraper.clone();
                    let room_url = self.inputs.room_url.clone();
                    tokio::spawn(async move {
                        let _ = scraper.scrape(&room_url).await;
                    });
                }
            }
            InputTarget::BufferUrl => {
                if let Some(admin) = self.admin() {
                    let scraper = admin.scraper.clone();
                    let buffer_url = self.inputs.buffer_url.clone();
                    tokio::spawn(async move {
                        let _ = scraper.register(&buffer_url).await;
                    });
                }
            }
            InputTarget::VideoPath => {
                if let Some(admin) = self.admin() {
                    let upload = admin.upload.clone();
                    let path = self.inputs.video_path.clone();
                    tokio::spawn(async move {
                        let _ = upload.upload(&path).await;
                    });
                }
            }
            InputTarget::FramesDir => self.open_frames(),
        }
    }

    fn open_frames(&mut self) {
        let Some(capture) = self.admin().map(|admin| admin.capture.clone()) else {
            return;
        };
        let dir = self.inputs.frames_dir.trim().to_string();
        if dir.is_empty() {
            self.show_toast("Please choose a frame directory.");
            return;
        }
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let opened = {
                let dir = dir.clone();
                tokio::task::spawn_blocking(move || FrameDirectory::open(dir)).await
            };
            let message = match opened {
                Ok(Ok(source)) if source.is_empty() => format!("No image frames in {}", dir),
                Ok(Ok(source)) => {
                    let frames = source.len();
                    capture.load(Box::new(source));
                    format!("Loaded {} frames", frames)
                }
                Ok(Err(e)) => format!("Could not open {}: {}", dir, e),
                Err(e) => format!("Could not open {}: {}", dir, e),
            };
            publish(&tx, ConsoleEvent::Toast(message)).await;
        });
    }
}

fn list_task_name(view: View) -> &'static str {
    match view {
        View::Agents => "agents-list",
        View::Streams => "streams-list",
        View::Keywords => "keywords-list",
        View::Objects => "objects-list",
        _ => "list",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::DemoBackend;
    use crate::events::{self, EventReceiver};
    use std::time::Duration;

    async fn app() -> (DemoBackend, App, EventReceiver) {
        let demo = DemoBackend::start("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let api = ApiClient::new(&demo.url()).unwrap();
        let (tx, rx) = events::channel();
        let app = App::new(api, Config::default(), LogBuffer::new(), tx);
        (demo, app, rx)
    }

    async fn login(app: &mut App, rx: &mut EventReceiver, username: &str, password: &str) {
        app.login.username = TextInput::with_value(username);
        app.login.password = TextInput::with_value(password);
        app.submit_login();
        let event = rx.recv().await.unwrap();
        app.handle_event(event);
    }

    #[test]
    fn test_tabs_per_role() {
        assert_eq!(View::tabs(Role::Agent), &[View::Dashboard, View::Logs]);
        assert!(View::tabs(Role::Admin).contains(&View::Capture));
        assert_eq!(View::tabs(Role::Admin)[0], View::Dashboard);
    }

    #[tokio::test]
    async fn test_startup_without_session_stays_anonymous() {
        let (demo, mut app, mut rx) = app().await;
        app.start();
        let event = rx.recv().await.unwrap();
        assert_eq!(event, ConsoleEvent::SessionResolved(SessionState::Anonymous));
        app.handle_event(event);

        assert!(!app.resolving);
        assert!(app.console.is_none());
        assert_eq!(demo.count("GET", "/api/session"), 1);
    }

    #[tokio::test]
    async fn test_resumed_session_shows_toast_until_expiry() {
        let (_demo, mut app, _rx) = app().await;
        app.handle_event(ConsoleEvent::SessionResolved(SessionState::Authenticated(
            Role::Admin,
        )));

        assert!(app.console.is_some());
        app.tick();
        let toast = app.toast.as_ref().unwrap();
        assert!(toast.message.starts_with("Resumed session as"));
        assert!(!toast.is_expired());
    }

    #[tokio::test]
    async fn test_failed_login_shows_generic_message() {
        let (_demo, mut app, mut rx) = app().await;
        login(&mut app, &mut rx, "admin", "wrong").await;
        assert_eq!(app.session, SessionState::Anonymous);
        assert_eq!(
            app.login.error,
            Some("Login failed. Please check your credentials.")
        );
        assert!(!app.login.pending);
    }

    #[tokio::test]
    async fn test_tab_switch_cancels_previous_pollers() {
        let (demo, mut app, mut rx) = app().await;
        login(&mut app, &mut rx, "admin", "admin").await;
        assert_eq!(app.session, SessionState::Authenticated(Role::Admin));
        assert_eq!(app.view, View::Dashboard);
        assert_eq!(app.active_tasks(), vec!["admin-dashboard"]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        app.set_view(View::Logs);
        assert_eq!(app.active_tasks(), vec!["logs"]);

        // Dashboard interval is 10s; nothing more may arrive from it
        let dashboard_calls = demo.count("GET", "/api/dashboard");
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(demo.count("GET", "/api/dashboard"), dashboard_calls);
        assert!(demo.count("GET", "/api/logs") >= 1);
    }

    #[tokio::test]
    async fn test_agent_cannot_open_admin_tabs() {
        let (_demo, mut app, mut rx) = app().await;
        login(&mut app, &mut rx, "agent", "agent").await;
        app.set_view(View::Agents);
        assert_eq!(app.view, View::Dashboard);
        app.next_tab();
        assert_eq!(app.view, View::Logs);
        app.next_tab();
        assert_eq!(app.view, View::Dashboard);
    }

    #[tokio::test]
    async fn test_logout_drops_console_and_tasks() {
        let (demo, mut app, mut rx) = app().await;
        login(&mut app, &mut rx, "admin", "admin").await;
        app.logout();
        let event = rx.recv().await.unwrap();
        assert_eq!(event, ConsoleEvent::LoggedOut);
        app.handle_event(event);

        assert_eq!(app.session, SessionState::Anonymous);
        assert!(app.console.is_none());
        assert!(app.active_tasks().is_empty());
        assert_eq!(demo.count("POST", "/api/logout"), 1);
    }

    #[tokio::test]
    async fn test_create_through_editor_writes_draft() {
        let (demo, mut app, mut rx) = app().await;
        login(&mut app, &mut rx, "admin", "admin").await;
        app.set_view(View::Keywords);
        for _ in 0..50 {
            if app.row_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        app.begin_create();
        let editor = app.editor.as_mut().unwrap();
        assert_eq!(editor.target, InputTarget::Draft(Field::Keyword));
        editor.input = TextInput::with_value("scam");
        app.write_through();
        assert_eq!(app.crud().unwrap().draft_value(Field::Keyword), "scam");

        demo.clear_requests();
        app.submit_editor();
        assert!(app.editor.is_none());

        for _ in 0..50 {
            if demo.count("GET", "/api/keywords") == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(demo.count("POST", "/api/keywords"), 1);
        assert_eq!(demo.count("GET", "/api/keywords"), 1);
    }

    #[tokio::test]
    async fn test_delete_needs_confirmation() {
        let (demo, mut app, mut rx) = app().await;
        login(&mut app, &mut rx, "admin", "admin").await;
        app.set_view(View::Objects);
        for _ in 0..50 {
            if app.row_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(app.row_count() > 0);

        app.request_delete();
        assert!(app.pending_delete.is_some());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(demo.requests().iter().filter(|r| r.method == "DELETE").count(), 0);

        app.move_selection(1);
        assert!(app.pending_delete.is_none());
    }
}
