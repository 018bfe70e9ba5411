//! Configuration for the console
//!
//! Configuration is loaded in order of precedence:
//! 1. Command-line flags (runtime overrides, see `cli`)
//! 2. Environment variables
//! 3. Config file (~/.config/streamwatch/config.toml)
//! 4. Built-in defaults (lowest priority)

use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod observability;
mod polling;
mod serialization;

#[cfg(test)]
mod tests;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (maintain public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use observability::{FileLogging, LogRotation, LoggingConfig};
pub use polling::{FilePolling, PollingConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

const DEFAULT_DEMO_BIND: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), 5055);

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Credentials for headless login. Environment only, never written to disk.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the monitoring API
    pub api_url: String,

    /// Whether to enable the TUI (can be disabled for headless mode)
    pub enable_tui: bool,

    /// Demo mode: serve an in-memory API and point the console at it
    pub demo_mode: bool,

    /// Where the demo backend listens
    pub demo_bind: SocketAddr,

    /// Poll and capture intervals
    pub polling: PollingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Headless login (STREAMWATCH_USERNAME / STREAMWATCH_PASSWORD)
    pub credentials: Option<Credentials>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            enable_tui: true,
            demo_mode: false,
            demo_bind: DEFAULT_DEMO_BIND,
            polling: PollingConfig::default(),
            logging: LoggingConfig::default(),
            credentials: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure (subset of Config that makes sense to persist)
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub api_url: Option<String>,
    pub demo_bind: Option<String>,

    /// Optional [polling] section
    pub polling: Option<FilePolling>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl Config {
    /// Get the config file path: ~/.config/streamwatch/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("streamwatch").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        // Don't overwrite existing config
        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Config is optional
            }
        }

        let template = Self::default().to_toml();
        let _ = std::fs::write(&path, template);
    }

    /// Load file config if it exists
    ///
    /// A config file that exists but cannot be parsed or read terminates the
    /// process with an actionable message instead of silently using defaults.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match Self::parse_file_config(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                    eprintln!("║  CONFIG ERROR - Failed to parse configuration file          ║");
                    eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                    eprintln!("  File: {}\n", path.display());
                    eprintln!("  Error: {}\n", e);
                    eprintln!("  Tip: Check for:\n");
                    eprintln!("    - Missing quotes around string values");
                    eprintln!("    - Negative or non-numeric intervals");
                    eprintln!("    - Typos in section names\n");
                    eprintln!("  To reset, run `streamwatch config --reset`.\n");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                eprintln!("║  CONFIG ERROR - Cannot read configuration file              ║");
                eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                eprintln!("  File: {}\n", path.display());
                eprintln!("  Error: {}\n", e);
                std::process::exit(1);
            }
        }
    }

    pub(crate) fn parse_file_config(contents: &str) -> Result<FileConfig, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Load configuration: file -> env vars -> defaults
    pub fn from_env() -> Self {
        Self::from_file_config(Self::load_file_config())
    }

    pub(crate) fn from_file_config(file: FileConfig) -> Self {
        // API URL: env > file > default
        let api_url = std::env::var("STREAMWATCH_API_URL")
            .ok()
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        // TUI toggle: env only (runtime flag)
        let enable_tui = !env_flag("STREAMWATCH_NO_TUI").unwrap_or(false);

        // Demo mode: env only (runtime flag)
        let demo_mode = env_flag("STREAMWATCH_DEMO").unwrap_or(false);

        // Demo bind address: env > file > default
        let demo_bind = std::env::var("STREAMWATCH_DEMO_BIND")
            .ok()
            .or(file.demo_bind)
            .map(|raw| {
                raw.parse().unwrap_or_else(|_| {
                    eprintln!(
                        "Invalid demo bind address {:?}, using {}",
                        raw, DEFAULT_DEMO_BIND
                    );
                    DEFAULT_DEMO_BIND
                })
            })
            .unwrap_or(DEFAULT_DEMO_BIND);

        let polling = PollingConfig::from_file(file.polling);
        let logging = LoggingConfig::from_file(file.logging);

        // Headless credentials: env only
        let credentials = match (
            std::env::var("STREAMWATCH_USERNAME"),
            std::env::var("STREAMWATCH_PASSWORD"),
        ) {
            (Ok(username), Ok(password)) => Some(Credentials { username, password }),
            _ => None,
        };

        Self {
            api_url,
            enable_tui,
            demo_mode,
            demo_bind,
            polling,
            logging,
            credentials,
        }
    }
}
