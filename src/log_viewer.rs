//! Event log: polled snapshot + client-side substring filter

use crate::api::models::LogEntry;
use crate::api::{ApiClient, OpPolicy};
use crate::poller::{PollHandle, Snapshot};
use chrono::{DateTime, Local, NaiveDateTime};
use std::time::Duration;

pub const MSG_LOADING: &str = "Loading logs...";
pub const MSG_EMPTY: &str = "No logs found.";

/// Entries whose `stream_url` or `event_type` contains `filter`, ignoring case.
/// An empty filter keeps everything.
pub fn filter_logs<'a>(entries: &'a [LogEntry], filter: &str) -> Vec<&'a LogEntry> {
    let needle = filter.to_lowercase();
    entries
        .iter()
        .filter(|entry| {
            needle.is_empty()
                || entry.stream_url.to_lowercase().contains(&needle)
                || entry.event_type.to_lowercase().contains(&needle)
        })
        .collect()
}

/// What the log table should show right now
#[derive(Debug, Clone, PartialEq)]
pub enum LogListing<'a> {
    Loading,
    Empty,
    Entries(Vec<&'a LogEntry>),
}

impl LogListing<'_> {
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Loading => Some(MSG_LOADING),
            Self::Empty => Some(MSG_EMPTY),
            Self::Entries(_) => None,
        }
    }
}

/// Derive the listing from the two inputs; holds no state of its own.
/// A filter that matches nothing reads the same as an empty log.
pub fn listing<'a>(snapshot: Option<&'a Vec<LogEntry>>, filter: &str) -> LogListing<'a> {
    let Some(entries) = snapshot else {
        return LogListing::Loading;
    };
    let shown = filter_logs(entries, filter);
    if shown.is_empty() {
        LogListing::Empty
    } else {
        LogListing::Entries(shown)
    }
}

/// Server timestamps shown in local time. RFC 3339 and naive
/// `YYYY-MM-DD HH:MM:SS` (assumed UTC) are understood; anything else is shown as sent.
pub fn local_timestamp(raw: &str) -> String {
    const DISPLAY: &str = "%Y-%m-%d %H:%M:%S";
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Local).format(DISPLAY).to_string();
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| {
            naive
                .and_utc()
                .with_timezone(&Local)
                .format(DISPLAY)
                .to_string()
        })
        .unwrap_or_else(|| raw.to_string())
}

#[derive(Debug, Clone)]
pub struct LogViewer {
    api: ApiClient,
    every: Duration,
    snapshot: Snapshot<Vec<LogEntry>>,
}

impl LogViewer {
    pub const POLICY: OpPolicy = OpPolicy::READ;

    pub fn new(api: ApiClient, every: Duration) -> Self {
        Self {
            api,
            every,
            snapshot: Snapshot::new(),
        }
    }

    pub fn snapshot(&self) -> &Snapshot<Vec<LogEntry>> {
        &self.snapshot
    }

    pub fn activate(&self) -> PollHandle {
        let api = self.api.clone();
        PollHandle::spawn("logs", self.every, self.snapshot.clone(), move || {
            let api = api.clone();
            async move { api.get::<Vec<LogEntry>>("/api/logs").await }
        })
    }

    /// Current listing under `filter`, read straight from the snapshot
    pub fn with_listing<R>(&self, filter: &str, f: impl FnOnce(LogListing<'_>) -> R) -> R {
        self.snapshot.with(|entries| f(listing(entries, filter)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, url: &str, event: &str) -> LogEntry {
        LogEntry {
            id,
            timestamp: "2024-05-01T12:00:00Z".to_string(),
            stream_url: url.to_string(),
            event_type: event.to_string(),
        }
    }

    fn sample() -> Vec<LogEntry> {
        vec![
            entry(1, "https://chaturbate.com/Caylin/", "visual"),
            entry(2, "https://stripchat.com/nova/", "CHAT"),
            entry(3, "https://stripchat.com/nova/", "audio"),
        ]
    }

    #[test]
    fn test_filter_is_case_insensitive_on_both_fields() {
        let logs = sample();
        let ids = |v: Vec<&LogEntry>| v.iter().map(|e| e.id).collect::<Vec<_>>();

        assert_eq!(ids(filter_logs(&logs, "caylin")), vec![1]);
        assert_eq!(ids(filter_logs(&logs, "chat")), vec![1, 2]);
        assert_eq!(ids(filter_logs(&logs, "Chat")), ids(filter_logs(&logs, "CHAT")));
        assert_eq!(ids(filter_logs(&logs, "STRIPCHAT")), vec![2, 3]);
        assert!(filter_logs(&logs, "knife").is_empty());
    }

    #[test]
    fn test_filter_keeps_exactly_matching_entries() {
        let logs = sample();
        for filter in ["", "a", "nova", "visual", "https", "/", "zzz"] {
            let shown = filter_logs(&logs, filter);
            for e in &logs {
                let matches = e.stream_url.to_lowercase().contains(&filter.to_lowercase())
                    || e.event_type.to_lowercase().contains(&filter.to_lowercase());
                assert_eq!(shown.iter().any(|s| s.id == e.id), matches, "filter {:?}", filter);
            }
        }
        assert_eq!(filter_logs(&logs, "").len(), logs.len());
    }

    #[test]
    fn test_listing_states() {
        assert_eq!(listing(None, "").placeholder(), Some(MSG_LOADING));

        let empty = Vec::new();
        assert_eq!(listing(Some(&empty), "").placeholder(), Some(MSG_EMPTY));

        let logs = sample();
        let filtered = listing(Some(&logs), "zzz");
        assert_eq!(filtered, LogListing::Empty);
        assert_eq!(filtered.placeholder(), Some(MSG_EMPTY));

        let shown = listing(Some(&logs), "visual");
        assert_eq!(shown, LogListing::Entries(vec![&logs[0]]));
        assert_eq!(shown.placeholder(), None);
    }

    #[test]
    fn test_local_timestamp_falls_back_to_raw() {
        assert_eq!(local_timestamp("yesterday"), "yesterday");
        assert_eq!(local_timestamp("2024-05-01 12:00:00").len(), 19);
        assert_eq!(local_timestamp("2024-05-01T12:00:00+00:00").len(), 19);
    }
}
