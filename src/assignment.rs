//! Bind one agent to one stream
//!
//! The pickers are fed by the same list fetches as the agents and streams
//! tabs. The server is the only judge of conflicts: a rejected assignment
//! shows the server's message as-is.

use crate::api::models::Ack;
use crate::api::{ApiClient, OpError, ValidationError};
use crate::dashboard::DashboardPoller;
use crate::resources::{Agents, Notice, Resource, ResourceManager, Streams};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const MSG_SELECT_BOTH: &str = "Both Agent and Stream must be selected.";
pub const MSG_ASSIGN_FAILED: &str = "Assignment failed.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub agent_id: Option<i64>,
    pub stream_id: Option<i64>,
}

#[derive(Default)]
struct AssignState {
    selection: Selection,
    notice: Option<Notice>,
}

#[derive(Serialize)]
struct AssignRequest {
    agent_id: i64,
    stream_id: i64,
}

#[derive(Clone)]
pub struct AssignmentCoordinator {
    api: ApiClient,
    agents: ResourceManager<Agents>,
    streams: ResourceManager<Streams>,
    dashboard: DashboardPoller,
    state: Arc<Mutex<AssignState>>,
}

impl AssignmentCoordinator {
    pub fn new(
        api: ApiClient,
        agents: ResourceManager<Agents>,
        streams: ResourceManager<Streams>,
        dashboard: DashboardPoller,
    ) -> Self {
        Self {
            api,
            agents,
            streams,
            dashboard,
            state: Arc::new(Mutex::new(AssignState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, AssignState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ids<R: Resource>(manager: &ResourceManager<R>) -> Vec<i64> {
        manager
            .items()
            .with(|items| items.map(|items| items.iter().map(R::id).collect()))
            .unwrap_or_default()
    }

    /// Refresh both pickers, then default any empty (or vanished) choice to
    /// the first entry
    pub async fn load(&self) {
        tokio::join!(self.agents.list(), self.streams.list());
        let agent_ids = Self::ids(&self.agents);
        let stream_ids = Self::ids(&self.streams);

        let mut state = self.state();
        let selection = &mut state.selection;
        if !selection.agent_id.is_some_and(|id| agent_ids.contains(&id)) {
            selection.agent_id = agent_ids.first().copied();
        }
        if !selection.stream_id.is_some_and(|id| stream_ids.contains(&id)) {
            selection.stream_id = stream_ids.first().copied();
        }
    }

    pub fn agents(&self) -> &ResourceManager<Agents> {
        &self.agents
    }

    pub fn streams(&self) -> &ResourceManager<Streams> {
        &self.streams
    }

    pub fn selection(&self) -> Selection {
        self.state().selection
    }

    pub fn select(&self, selection: Selection) {
        self.state().selection = selection;
    }

    /// Move the agent choice by `step` within the current list
    pub fn cycle_agent(&self, step: isize) {
        let ids = Self::ids(&self.agents);
        let mut state = self.state();
        state.selection.agent_id = cycle(&ids, state.selection.agent_id, step);
    }

    pub fn cycle_stream(&self, step: isize) {
        let ids = Self::ids(&self.streams);
        let mut state = self.state();
        state.selection.stream_id = cycle(&ids, state.selection.stream_id, step);
    }

    pub fn notice(&self) -> Option<Notice> {
        self.state().notice.clone()
    }

    pub async fn assign(&self) -> Result<String, OpError> {
        let result = self.try_assign().await;
        let notice = match &result {
            Ok(message) => Notice::Success(message.clone()),
            Err(e) => {
                if let OpError::Request(e) = e {
                    tracing::warn!("Assignment rejected: {}", e);
                }
                Notice::Error(e.user_message(MSG_ASSIGN_FAILED))
            }
        };
        self.state().notice = Some(notice);
        if result.is_ok() {
            self.dashboard.refresh().await;
        }
        result
    }

    async fn try_assign(&self) -> Result<String, OpError> {
        let Selection {
            agent_id: Some(agent_id),
            stream_id: Some(stream_id),
        } = self.selection()
        else {
            return Err(ValidationError(MSG_SELECT_BOTH).into());
        };

        let body = AssignRequest {
            agent_id,
            stream_id,
        };
        let ack: Ack = self.api.post_json("/api/assign", &body).await?;
        tracing::info!(agent_id, stream_id, "Stream assigned");
        Ok(ack
            .message
            .unwrap_or_else(|| "Stream assigned.".to_string()))
    }
}

fn cycle(ids: &[i64], current: Option<i64>, step: isize) -> Option<i64> {
    if ids.is_empty() {
        return None;
    }
    let len = ids.len() as isize;
    let index = current
        .and_then(|id| ids.iter().position(|x| *x == id))
        .map_or(0, |i| (i as isize + step).rem_euclid(len));
    ids.get(index as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::DashboardScope;
    use crate::demo::DemoBackend;
    use crate::resources::kinds::StreamDraft;
    use serde_json::json;
    use std::time::Duration;

    async fn coordinator() -> (DemoBackend, AssignmentCoordinator) {
        let demo = DemoBackend::start("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let api = ApiClient::new(&demo.url()).unwrap();
        api.post_json::<_, Ack>(
            "/api/login",
            &json!({"username": "admin", "password": "admin"}),
        )
        .await
        .unwrap();
        let coordinator = AssignmentCoordinator::new(
            api.clone(),
            ResourceManager::new(api.clone()),
            ResourceManager::new(api.clone()),
            DashboardPoller::new(api, DashboardScope::Admin, Duration::from_secs(10)),
        );
        (demo, coordinator)
    }

    #[test]
    fn test_cycle_wraps() {
        let ids = [4, 9, 12];
        assert_eq!(cycle(&ids, Some(12), 1), Some(4));
        assert_eq!(cycle(&ids, Some(4), -1), Some(12));
        assert_eq!(cycle(&ids, None, 1), Some(4));
        assert_eq!(cycle(&[], Some(4), 1), None);
    }

    #[tokio::test]
    async fn test_missing_stream_blocks_locally() {
        let (demo, coordinator) = coordinator().await;
        coordinator.load().await;
        let selection = coordinator.selection();
        assert!(selection.agent_id.is_some());
        assert_eq!(selection.stream_id, None);

        let err = coordinator.assign().await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            coordinator.notice(),
            Some(Notice::Error(MSG_SELECT_BOTH.to_string()))
        );
        assert_eq!(demo.count("POST", "/api/assign"), 0);
    }

    #[tokio::test]
    async fn test_assign_refreshes_dashboard_and_server_rejects_duplicate() {
        let (demo, coordinator) = coordinator().await;
        coordinator
            .streams()
            .create(StreamDraft {
                url: "https://chaturbate.com/caylin/".into(),
                ..StreamDraft::default()
            })
            .await
            .unwrap();
        coordinator.load().await;

        coordinator.assign().await.unwrap();
        assert_eq!(demo.count("POST", "/api/assign"), 1);
        assert_eq!(demo.count("GET", "/api/dashboard"), 1);
        let dashboard = coordinator.dashboard.snapshot().get().unwrap();
        assert_eq!(dashboard.ongoing_streams, 1);
        assert_eq!(
            dashboard.assignments[0].agent_username.as_deref(),
            Some("agent")
        );

        // Same pair again: server decides, its message is shown verbatim
        let err = coordinator.assign().await.unwrap_err();
        assert_eq!(
            err.user_message(MSG_ASSIGN_FAILED),
            "This stream is already assigned to this agent"
        );
        assert_eq!(demo.count("GET", "/api/dashboard"), 1);
    }
}
