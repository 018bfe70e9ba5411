//! Configuration tests
//!
//! `to_toml` output must parse back into the same settings; when a field is
//! added, the round-trip test fails until serialization learns about it.

use super::*;
use std::time::Duration;

/// Verify that serialized config can be parsed back.
#[test]
fn test_config_roundtrip_default() {
    let config = Config::default();
    let toml_str = config.to_toml();

    let parsed = Config::parse_file_config(&toml_str);
    assert!(
        parsed.is_ok(),
        "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
        toml_str,
        parsed.err()
    );

    let file = parsed.unwrap();
    assert_eq!(file.api_url.as_deref(), Some(DEFAULT_API_URL));
    assert_eq!(file.demo_bind.as_deref(), Some("127.0.0.1:5055"));
    let polling = PollingConfig::from_file(file.polling);
    assert_eq!(polling, PollingConfig::default());
    let logging = LoggingConfig::from_file(file.logging);
    assert_eq!(logging.file_prefix, "streamwatch");
    assert_eq!(logging.file_rotation, LogRotation::Daily);
}

#[test]
fn test_config_roundtrip_custom_values() {
    let mut config = Config::default();
    config.api_url = "https://monitor.example/api \"prod\"".to_string();
    config.polling.dashboard_secs = 30;
    config.polling.capture_ms = 250;
    config.logging.file_enabled = true;
    config.logging.file_rotation = LogRotation::Hourly;

    let file = Config::parse_file_config(&config.to_toml()).unwrap();
    assert_eq!(file.api_url.as_deref(), Some(config.api_url.as_str()));

    let polling = PollingConfig::from_file(file.polling);
    assert_eq!(polling.dashboard(), Duration::from_secs(30));
    assert_eq!(polling.capture(), Duration::from_millis(250));
    assert_eq!(polling.gallery(), Duration::from_millis(2000));

    let logging = LoggingConfig::from_file(file.logging);
    assert!(logging.file_enabled);
    assert_eq!(logging.file_rotation, LogRotation::Hourly);
}

#[test]
fn test_partial_file_uses_defaults() {
    let file = Config::parse_file_config(
        r#"
            [polling]
            logs_secs = 5
        "#,
    )
    .unwrap();
    assert!(file.api_url.is_none());
    assert!(file.logging.is_none());

    let polling = PollingConfig::from_file(file.polling);
    assert_eq!(polling.logs_secs, 5);
    assert_eq!(polling.dashboard_secs, 10);
}

#[test]
fn test_zero_interval_rejected() {
    let polling = PollingConfig::from_file(Some(FilePolling {
        dashboard_secs: Some(0),
        logs_secs: None,
        gallery_ms: Some(0),
        capture_ms: Some(500),
    }));
    assert_eq!(polling.dashboard_secs, 10);
    assert_eq!(polling.gallery_ms, 2000);
    assert_eq!(polling.capture_ms, 500);
}

#[test]
fn test_invalid_toml_is_an_error() {
    assert!(Config::parse_file_config("api_url = ").is_err());
    assert!(Config::parse_file_config("[polling]\ndashboard_secs = -1").is_err());
}

#[test]
fn test_log_rotation_parsing() {
    assert_eq!("HOURLY".parse(), Ok(LogRotation::Hourly));
    assert_eq!(" never ".parse(), Ok(LogRotation::Never));
    assert!("weekly".parse::<LogRotation>().is_err());

    let logging = LoggingConfig::from_file(Some(FileLogging {
        file_rotation: Some("weekly".to_string()),
        ..Default::default()
    }));
    assert_eq!(logging.file_rotation, LogRotation::Daily);
}

#[test]
fn test_credentials_debug_redacts_password() {
    let creds = Credentials {
        username: "agent".to_string(),
        password: "hunter2".to_string(),
    };
    let debug = format!("{:?}", creds);
    assert!(debug.contains("agent"));
    assert!(!debug.contains("hunter2"));
}
