// Headless mode - the console without a terminal UI
//
// Resolves the session (logging in with env credentials if needed), starts
// the role's dashboard and log pollers and reports every new snapshot
// through tracing until shutdown.

use crate::api::ApiClient;
use crate::config::Config;
use crate::console::Console;
use crate::log_viewer::local_timestamp;
use crate::poller::ViewTasks;
use crate::session::{SessionController, SessionState};
use anyhow::{bail, Result};
use std::future::Future;
use std::time::Duration;

/// How often snapshot versions are checked for changes
const REPORT_INTERVAL: Duration = Duration::from_millis(250);

pub async fn run(config: &Config, api: ApiClient, shutdown: impl Future<Output = ()>) -> Result<()> {
    let session = SessionController::new(api.clone());

    let role = match session.resolve().await {
        SessionState::Authenticated(role) => role,
        SessionState::Anonymous => {
            let Some(creds) = &config.credentials else {
                bail!("No active session; set STREAMWATCH_USERNAME and STREAMWATCH_PASSWORD");
            };
            match session.login(&creds.username, &creds.password).await {
                Ok(role) => role,
                Err(e) => bail!("{}", e),
            }
        }
    };
    tracing::info!(%role, api = api.base_url(), "Headless console running");

    let console = Console::new(&api, role, &config.polling);
    let mut tasks = ViewTasks::new();
    tasks.push(console.dashboard.activate());
    tasks.push(console.logs.activate());
    tracing::debug!(pollers = ?tasks.names(), "Pollers started");

    let mut dashboard_seen = 0;
    let mut logs_seen = 0;
    let mut ticker = tokio::time::interval(REPORT_INTERVAL);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                dashboard_seen = report_dashboard(&console, dashboard_seen);
                logs_seen = report_logs(&console, logs_seen);
            }
        }
    }

    tasks.cancel_all();
    drop(console);
    session.logout().await;
    Ok(())
}

fn report_dashboard(console: &Console, seen: u64) -> u64 {
    let snapshot = console.dashboard.snapshot();
    let version = snapshot.version();
    if version != seen {
        snapshot.with(|dashboard| {
            if let Some(dashboard) = dashboard {
                tracing::info!(
                    ongoing = dashboard.ongoing_streams,
                    assignments = dashboard.assignments.len(),
                    "Dashboard updated"
                );
            }
        });
    }
    version
}

/// Logs new entries only, assuming ids grow with time
fn report_logs(console: &Console, seen: u64) -> u64 {
    let snapshot = console.logs.snapshot();
    let version = snapshot.version();
    if version != seen {
        snapshot.with(|entries| {
            let Some(entries) = entries else { return };
            tracing::info!(entries = entries.len(), "Event log updated");
            if let Some(latest) = entries.iter().max_by_key(|e| e.id) {
                tracing::info!(
                    "Latest event: {} {} at {}",
                    latest.event_type,
                    latest.stream_url,
                    local_timestamp(&latest.timestamp)
                );
            }
        });
    }
    version
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::demo::DemoBackend;

    #[tokio::test]
    async fn test_headless_logs_in_polls_and_logs_out() {
        let demo = DemoBackend::start("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let api = ApiClient::new(&demo.url()).unwrap();
        let mut config = Config::default();
        config.credentials = Some(Credentials {
            username: "agent".to_string(),
            password: "agent".to_string(),
        });

        run(&config, api, tokio::time::sleep(Duration::from_millis(400)))
            .await
            .unwrap();

        assert_eq!(demo.count("POST", "/api/login"), 1);
        assert!(demo.count("GET", "/api/agent/dashboard") >= 1);
        assert!(demo.count("GET", "/api/logs") >= 1);
        assert_eq!(demo.count("GET", "/api/dashboard"), 0);
        assert_eq!(demo.count("POST", "/api/logout"), 1);
    }

    #[tokio::test]
    async fn test_headless_without_session_or_credentials_fails() {
        let demo = DemoBackend::start("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let api = ApiClient::new(&demo.url()).unwrap();

        let result = run(&Config::default(), api, std::future::pending()).await;
        assert!(result.is_err());
        assert_eq!(demo.count("POST", "/api/login"), 0);
    }
}
