//! The set of live components for one authenticated role
//!
//! A `Console` exists only while the session is authenticated. Logging out
//! tears it down; nothing in it outlives the session.

use crate::api::models::Role;
use crate::api::ApiClient;
use crate::assignment::AssignmentCoordinator;
use crate::config::PollingConfig;
use crate::dashboard::{DashboardPoller, DashboardScope};
use crate::detection::{CaptureHarness, UploadHarness};
use crate::log_viewer::LogViewer;
use crate::resources::{Agents, Keywords, Objects, ResourceManager, Streams};
use crate::scraper::ScraperPanel;

/// Admin-only managers and harnesses
pub struct AdminTools {
    pub agents: ResourceManager<Agents>,
    pub streams: ResourceManager<Streams>,
    pub keywords: ResourceManager<Keywords>,
    pub objects: ResourceManager<Objects>,
    pub assignment: AssignmentCoordinator,
    pub scraper: ScraperPanel,
    pub upload: UploadHarness,
    pub capture: CaptureHarness,
}

pub struct Console {
    role: Role,
    pub dashboard: DashboardPoller,
    pub logs: LogViewer,
    pub admin: Option<AdminTools>,
}

impl Console {
    pub fn new(api: &ApiClient, role: Role, polling: &PollingConfig) -> Self {
        let scope = match role {
            Role::Admin => DashboardScope::Admin,
            Role::Agent => DashboardScope::Agent,
        };
        let dashboard = DashboardPoller::new(api.clone(), scope, polling.dashboard());
        let logs = LogViewer::new(api.clone(), polling.logs());

        let admin = (role == Role::Admin).then(|| {
            let agents = ResourceManager::new(api.clone());
            let streams = ResourceManager::new(api.clone());
            AdminTools {
                assignment: AssignmentCoordinator::new(
                    api.clone(),
                    agents.clone(),
                    streams.clone(),
                    dashboard.clone(),
                ),
                scraper: ScraperPanel::new(api.clone(), streams.clone()),
                agents,
                streams,
                keywords: ResourceManager::new(api.clone()),
                objects: ResourceManager::new(api.clone()),
                upload: UploadHarness::new(api.clone(), polling.gallery()),
                capture: CaptureHarness::new(api.clone(), polling.capture()),
            }
        });

        Self {
            role,
            dashboard,
            logs,
            admin,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Stop the harness tasks, which are owned by the harnesses rather
    /// than by a view
    pub fn teardown(&self) {
        if let Some(admin) = &self.admin {
            admin.upload.teardown();
            admin.capture.teardown();
        }
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        self.teardown();
    }
}
