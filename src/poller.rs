//! Snapshots and view-scoped polling tasks
//!
//! Every list the console shows is a [`Snapshot`]: the latest complete value
//! returned by the server, replaced wholesale, never patched. Periodic
//! refreshes are [`PollHandle`]s whose lifetime is bound to the view that
//! started them; [`ViewTasks`] owns all of a view's handles so they start and
//! stop together.
//!
//! # Ordering
//!
//! Ticks are scheduled independently, so a slow request never delays the next
//! tick and two requests can be in flight at once. Each request takes a
//! ticket before it is sent and its result is applied only if that ticket is
//! newer than the last applied one. The latest-issued request therefore wins
//! even when responses arrive out of order.

use crate::api::ApiError;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

/// Issue order of a fetch against one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

struct Slot<T> {
    value: Option<T>,
    issued: u64,
    applied: u64,
    /// Bumped on every accepted value (render/headless change detection)
    version: u64,
}

/// Shared holder of the latest full value of something the server owns
pub struct Snapshot<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Shows the bookkeeping only; values can be large
impl<T> fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.lock();
        f.debug_struct("Snapshot")
            .field("version", &slot.version)
            .field("has_value", &slot.value.is_some())
            .finish()
    }
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Snapshot<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                value: None,
                issued: 0,
                applied: 0,
                version: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a ticket for a fetch that is about to be issued
    pub fn ticket(&self) -> Ticket {
        let mut slot = self.lock();
        slot.issued += 1;
        Ticket(slot.issued)
    }

    /// Replace the value if `ticket` is newer than the last applied one.
    /// Returns false when the result was stale and discarded.
    pub fn apply(&self, ticket: Ticket, value: T) -> bool {
        let mut slot = self.lock();
        if ticket.0 <= slot.applied {
            return false;
        }
        slot.applied = ticket.0;
        slot.value = Some(value);
        slot.version += 1;
        true
    }

    /// Drop the current value and invalidate every ticket issued so far
    pub fn clear(&self) {
        let mut slot = self.lock();
        slot.applied = slot.issued;
        slot.value = None;
        slot.version += 1;
    }

    pub fn has_value(&self) -> bool {
        self.lock().value.is_some()
    }

    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Borrow the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.lock().value.as_ref())
    }
}

impl<T: Clone> Snapshot<T> {
    pub fn get(&self) -> Option<T> {
        self.lock().value.clone()
    }
}

/// Run one fetch against a snapshot, applying its result under the ticket rule
///
/// Returns `Ok(false)` if a newer fetch already landed.
pub async fn refresh_into<T, Fut>(target: &Snapshot<T>, fetch: Fut) -> Result<bool, ApiError>
where
    Fut: Future<Output = Result<T, ApiError>>,
{
    let ticket = target.ticket();
    let value = fetch.await?;
    Ok(target.apply(ticket, value))
}

/// A running periodic fetch. Dropping the handle cancels it.
pub struct PollHandle {
    name: &'static str,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Start polling: one fetch immediately, then one per `every`
    ///
    /// Failures are read-path failures: they are logged and the previous
    /// snapshot stays on screen until a later tick succeeds.
    pub fn spawn<T, F, Fut>(
        name: &'static str,
        every: Duration,
        target: Snapshot<T>,
        fetch: F,
    ) -> Self
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Owned by this task: aborting the poller aborts every in-flight fetch
            let mut in_flight = JoinSet::new();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let ticket = target.ticket();
                        let request = fetch();
                        in_flight.spawn(async move { (ticket, request.await) });
                    }
                    Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                        match joined {
                            Ok((ticket, Ok(value))) => {
                                if !target.apply(ticket, value) {
                                    tracing::trace!(poller = name, "Discarded out-of-order response");
                                }
                            }
                            Ok((_, Err(e))) => {
                                tracing::warn!(poller = name, "Poll failed, keeping previous snapshot: {}", e);
                            }
                            Err(e) if e.is_cancelled() => {}
                            Err(e) => {
                                tracing::error!(poller = name, "Poll task panicked: {}", e);
                            }
                        }
                    }
                }
            }
        });

        tracing::debug!(poller = name, "Poller started ({:?})", every);
        Self {
            name,
            task: Some(task),
        }
    }

    /// Put an already running loop under the same cancellation contract
    pub fn from_task(name: &'static str, task: JoinHandle<()>) -> Self {
        Self {
            name,
            task: Some(task),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the poller. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(poller = self.name, "Poller cancelled");
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// All periodic tasks owned by one view
#[derive(Default)]
pub struct ViewTasks {
    handles: Vec<PollHandle>,
}

impl ViewTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: PollHandle) {
        self.handles.push(handle);
    }

    pub fn extend(&mut self, handles: impl IntoIterator<Item = PollHandle>) {
        self.handles.extend(handles);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.handles.iter().map(PollHandle::name).collect()
    }

    /// Cancel every task at once (view exit)
    pub fn cancel_all(&mut self) {
        for handle in &mut self.handles {
            handle.cancel();
        }
        self.handles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetch(
        calls: Arc<AtomicUsize>,
    ) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = Result<usize, ApiError>> + Send>>
    {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move { Ok(n) })
        }
    }

    #[test]
    fn test_ticket_rule_discards_older_results() {
        let snapshot = Snapshot::new();
        let first = snapshot.ticket();
        let second = snapshot.ticket();

        assert!(snapshot.apply(second, "second"));
        assert!(!snapshot.apply(first, "first"));
        assert_eq!(snapshot.get(), Some("second"));
        assert_eq!(snapshot.version(), 1);
    }

    #[test]
    fn test_debug_shows_version_without_value() {
        let snapshot = Snapshot::new();
        assert_eq!(
            format!("{:?}", snapshot),
            "Snapshot { version: 0, has_value: false }"
        );
        let ticket = snapshot.ticket();
        snapshot.apply(ticket, String::from("secret payload"));
        let shown = format!("{:?}", snapshot);
        assert_eq!(shown, "Snapshot { version: 1, has_value: true }");
    }

    #[test]
    fn test_clear_invalidates_outstanding_tickets() {
        let snapshot = Snapshot::new();
        let ticket = snapshot.ticket();
        snapshot.clear();

        assert!(!snapshot.apply(ticket, vec![1, 2, 3]));
        assert!(!snapshot.has_value());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_immediately_then_on_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let snapshot = Snapshot::new();
        let _handle = PollHandle::spawn(
            "test",
            Duration::from_secs(10),
            snapshot.clone(),
            counting_fetch(calls.clone()),
        );

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(snapshot.get(), Some(1));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(snapshot.get(), Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_all_further_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut tasks = ViewTasks::new();
        tasks.push(PollHandle::spawn(
            "dashboard",
            Duration::from_secs(10),
            Snapshot::new(),
            counting_fetch(calls.clone()),
        ));
        tasks.push(PollHandle::spawn(
            "logs",
            Duration::from_secs(10),
            Snapshot::new(),
            counting_fetch(calls.clone()),
        ));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tasks.cancel_all();
        assert!(tasks.is_empty());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = PollHandle::spawn(
            "test",
            Duration::from_secs(2),
            Snapshot::new(),
            counting_fetch(calls.clone()),
        );
        tokio::time::sleep(Duration::from_millis(1)).await;
        drop(handle);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_tick_wins_when_earlier_resolves_last() {
        // Tick 1 takes 15s, tick 2 takes 1s, tick 3 never finishes in the test window
        let delays = [15u64, 1, 600];
        let calls = Arc::new(AtomicUsize::new(0));
        let snapshot = Snapshot::new();
        let counter = calls.clone();
        let _handle = PollHandle::spawn(
            "dashboard",
            Duration::from_secs(10),
            snapshot.clone(),
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let delay = delays.get(n).copied().unwrap_or(600);
                async move {
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    Ok::<_, ApiError>(format!("tick-{}", n + 1))
                }
            },
        );

        // t=12: tick 2 landed while tick 1 is still in flight
        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(snapshot.get().as_deref(), Some("tick-2"));

        // t=17: tick 1 resolved late and was discarded
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(snapshot.get().as_deref(), Some("tick-2"));
        assert_eq!(snapshot.version(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_in_flight_result() {
        let snapshot = Snapshot::new();
        let mut handle = PollHandle::spawn(
            "gallery",
            Duration::from_secs(2),
            snapshot.clone(),
            || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ApiError>(42)
            },
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();
        assert!(!handle.is_active());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(snapshot.get(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_poll_keeps_previous_snapshot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let snapshot = Snapshot::new();
        let counter = calls.clone();
        let _handle = PollHandle::spawn(
            "logs",
            Duration::from_secs(10),
            snapshot.clone(),
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Ok(vec!["entry"])
                    } else {
                        Err(ApiError::Network("connection reset".to_string()))
                    }
                }
            },
        );

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(snapshot.get(), Some(vec!["entry"]));
    }
}
