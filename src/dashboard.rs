//! Aggregate "ongoing streams" view, one instance per role

use crate::api::models::{Dashboard, OngoingStream};
use crate::api::{ApiClient, OpPolicy};
use crate::poller::{refresh_into, PollHandle, Snapshot};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardScope {
    /// Every assignment, with agent names
    Admin,
    /// Only the logged-in agent's assignments
    Agent,
}

impl DashboardScope {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Admin => "/api/dashboard",
            Self::Agent => "/api/agent/dashboard",
        }
    }

    fn poller_name(&self) -> &'static str {
        match self {
            Self::Admin => "admin-dashboard",
            Self::Agent => "agent-dashboard",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardPoller {
    api: ApiClient,
    scope: DashboardScope,
    every: Duration,
    snapshot: Snapshot<Dashboard>,
}

impl DashboardPoller {
    pub const POLICY: OpPolicy = OpPolicy::READ;

    pub fn new(api: ApiClient, scope: DashboardScope, every: Duration) -> Self {
        Self {
            api,
            scope,
            every,
            snapshot: Snapshot::new(),
        }
    }

    pub fn scope(&self) -> DashboardScope {
        self.scope
    }

    pub fn snapshot(&self) -> &Snapshot<Dashboard> {
        &self.snapshot
    }

    /// Start polling for as long as the returned handle lives
    pub fn activate(&self) -> PollHandle {
        let api = self.api.clone();
        let path = self.scope.path();
        PollHandle::spawn(
            self.scope.poller_name(),
            self.every,
            self.snapshot.clone(),
            move || {
                let api = api.clone();
                async move { api.get::<Dashboard>(path).await }
            },
        )
    }

    /// One out-of-band fetch (after an assignment)
    pub async fn refresh(&self) {
        let api = self.api.clone();
        let path = self.scope.path();
        let fetch = async move { api.get::<Dashboard>(path).await };
        if let Err(e) = refresh_into(&self.snapshot, fetch).await {
            tracing::warn!(poller = self.scope.poller_name(), "Refresh failed: {}", e);
        }
    }
}

/// Label/value pairs for the detail pane of one ongoing stream
pub fn stream_details(row: &OngoingStream, scope: DashboardScope) -> Vec<(&'static str, String)> {
    let mut details = vec![("Stream ID", row.stream_id.to_string())];
    if scope == DashboardScope::Admin {
        details.push((
            "Agent",
            row.agent_username.clone().unwrap_or_else(|| "-".to_string()),
        ));
    }
    details.push(("Platform", row.platform().as_str().to_string()));
    details.push((
        "Streamer",
        row.streamer_username
            .clone()
            .unwrap_or_else(|| "-".to_string()),
    ));
    details.push(("URL", row.room_url.clone().unwrap_or_default()));
    details
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Ack;
    use crate::demo::DemoBackend;
    use serde_json::json;

    async fn logged_in(username: &str) -> (DemoBackend, ApiClient) {
        let demo = DemoBackend::start("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let api = ApiClient::new(&demo.url()).unwrap();
        api.post_json::<_, Ack>(
            "/api/login",
            &json!({"username": username, "password": username}),
        )
        .await
        .unwrap();
        (demo, api)
    }

    #[test]
    fn test_details_hide_agent_for_agent_scope() {
        let row = OngoingStream {
            assignment_id: Some(1),
            stream_id: 7,
            room_url: Some("https://chaturbate.com/caylin/".into()),
            agent_username: Some("agent".into()),
            streamer_username: None,
            platform: None,
        };
        let admin = stream_details(&row, DashboardScope::Admin);
        assert_eq!(admin[1], ("Agent", "agent".to_string()));
        assert_eq!(admin[2], ("Platform", "Chaturbate".to_string()));

        let agent = stream_details(&row, DashboardScope::Agent);
        assert!(agent.iter().all(|(label, _)| *label != "Agent"));
    }

    #[tokio::test]
    async fn test_activation_fetches_immediately_and_teardown_stops() {
        let (demo, api) = logged_in("admin").await;
        let dashboard = DashboardPoller::new(api, DashboardScope::Admin, Duration::from_secs(10));

        let handle = dashboard.activate();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(demo.count("GET", "/api/dashboard"), 1);
        assert_eq!(dashboard.snapshot().get(), Some(Dashboard::default()));

        drop(handle);
        dashboard.refresh().await;
        assert_eq!(demo.count("GET", "/api/dashboard"), 2);
    }

    #[tokio::test]
    async fn test_wrong_role_keeps_empty_snapshot() {
        let (demo, api) = logged_in("admin").await;
        let dashboard = DashboardPoller::new(api, DashboardScope::Agent, Duration::from_secs(10));

        dashboard.refresh().await;
        assert_eq!(demo.count("GET", "/api/agent/dashboard"), 1);
        assert!(!dashboard.snapshot().has_value());
        assert!(!DashboardPoller::POLICY.report_errors);
    }
}
