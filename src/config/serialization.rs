//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

/// Escape a value for a TOML basic string
fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl Config {
    /// Render this config as a commented TOML file
    ///
    /// Runtime-only settings (TUI toggle, demo mode, credentials) are env or
    /// CLI flags and never written here.
    pub fn to_toml(&self) -> String {
        format!(
            r#"# streamwatch configuration

# Monitoring API base URL (STREAMWATCH_API_URL overrides)
api_url = {api_url}

# Demo backend address, used with --demo or STREAMWATCH_DEMO=1
demo_bind = {demo_bind}

# Poll and capture intervals (zero is rejected)
[polling]
dashboard_secs = {dashboard}
logs_secs = {logs}
gallery_ms = {gallery}     # gallery and audio-flag pollers
capture_ms = {capture}     # live frame capture

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = {log_level}
# File logging (in addition to the diagnostics panel or stdout)
file_enabled = {log_file_enabled}
file_dir = {log_file_dir}
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = {log_file_prefix}
"#,
            api_url = quoted(&self.api_url),
            demo_bind = quoted(&self.demo_bind.to_string()),
            dashboard = self.polling.dashboard_secs,
            logs = self.polling.logs_secs,
            gallery = self.polling.gallery_ms,
            capture = self.polling.capture_ms,
            log_level = quoted(&self.logging.level),
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = quoted(&self.logging.file_dir.to_string_lossy()),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = quoted(&self.logging.file_prefix),
        )
    }
}
