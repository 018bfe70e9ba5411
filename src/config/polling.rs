//! Poll and capture intervals

use serde::Deserialize;
use std::time::Duration;

/// Fixed intervals for every periodic task in the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Admin and agent dashboards
    pub dashboard_secs: u64,
    /// Event log
    pub logs_secs: u64,
    /// Gallery and audio-flag pollers after an upload
    pub gallery_ms: u64,
    /// Live frame capture
    pub capture_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            dashboard_secs: 10,
            logs_secs: 10,
            gallery_ms: 2000,
            capture_ms: 1000,
        }
    }
}

/// Polling settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FilePolling {
    pub dashboard_secs: Option<u64>,
    pub logs_secs: Option<u64>,
    pub gallery_ms: Option<u64>,
    pub capture_ms: Option<u64>,
}

/// A zero interval would spin; fall back to the default
fn nonzero(name: &str, value: Option<u64>, default: u64) -> u64 {
    match value {
        Some(0) => {
            eprintln!("[polling] {} = 0 is not allowed, using {}", name, default);
            default
        }
        Some(v) => v,
        None => default,
    }
}

impl PollingConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FilePolling>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            dashboard_secs: nonzero("dashboard_secs", file.dashboard_secs, defaults.dashboard_secs),
            logs_secs: nonzero("logs_secs", file.logs_secs, defaults.logs_secs),
            gallery_ms: nonzero("gallery_ms", file.gallery_ms, defaults.gallery_ms),
            capture_ms: nonzero("capture_ms", file.capture_ms, defaults.capture_ms),
        }
    }

    pub fn dashboard(&self) -> Duration {
        Duration::from_secs(self.dashboard_secs)
    }

    pub fn logs(&self) -> Duration {
        Duration::from_secs(self.logs_secs)
    }

    pub fn gallery(&self) -> Duration {
        Duration::from_millis(self.gallery_ms)
    }

    pub fn capture(&self) -> Duration {
        Duration::from_millis(self.capture_ms)
    }
}
