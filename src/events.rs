// Events that flow from background tasks to the TUI
//
// Pollers and form submissions publish into snapshots the TUI reads on every
// frame. The only things that need to reach the event loop itself are
// session transitions and one-off toasts, which travel over this channel.

use crate::api::models::Role;
use crate::session::SessionState;
use tokio::sync::mpsc;

/// Capacity of the event channel between background tasks and the TUI
pub const EVENT_CHANNEL_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// Startup session check finished
    SessionResolved(SessionState),

    /// The login form produced a session
    LoggedIn(Role),

    /// The login form was rejected; the message is shown under the form
    LoginFailed(&'static str),

    /// Logout finished (whatever the server said)
    LoggedOut,

    /// Short-lived notification in the corner of the screen
    Toast(String),
}

pub type EventSender = mpsc::Sender<ConsoleEvent>;
pub type EventReceiver = mpsc::Receiver<ConsoleEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_SIZE)
}

/// Send from a background task; a closed channel means the TUI is gone
pub async fn publish(tx: &EventSender, event: ConsoleEvent) {
    if tx.send(event).await.is_err() {
        tracing::debug!("Event receiver dropped");
    }
}
