//! Session state and the three session operations
//!
//! The console learns who it is from the server: the session cookie lives in
//! the HTTP client, and the role comes either from `/api/session` on startup
//! or from the login response. Any failure to resolve means anonymous.

use crate::api::models::{Ack, LoginResponse, Role, SessionStatus};
use crate::api::{require, ApiClient, ApiError, ValidationError};
use serde::Serialize;
use std::fmt;

pub const MSG_FIELDS_REQUIRED: &str = "Both fields are required!";
pub const MSG_LOGIN_FAILED: &str = "Login failed. Please check your credentials.";

/// Who the console is acting as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Role),
}

impl SessionState {
    pub fn authenticate(self, role: Role) -> Self {
        Self::Authenticated(role)
    }

    pub fn end(self) -> Self {
        Self::Anonymous
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(role) => Some(*role),
        }
    }
}

/// Why a login attempt did not produce a session
#[derive(Debug)]
pub enum LoginError {
    /// Rejected locally; no request was sent
    Invalid(ValidationError),
    /// Rejected by the server or the network
    Failed(ApiError),
}

impl LoginError {
    /// The one line shown under the login form
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Invalid(v) => v.0,
            Self::Failed(_) => MSG_LOGIN_FAILED,
        }
    }
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(v) => write!(f, "{}", v),
            Self::Failed(e) => write!(f, "Login failed: {}", e),
        }
    }
}

impl std::error::Error for LoginError {}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone)]
pub struct SessionController {
    api: ApiClient,
}

impl SessionController {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Ask the server whether the stored cookie is still a session
    pub async fn resolve(&self) -> SessionState {
        match self.api.get::<SessionStatus>("/api/session").await {
            Ok(SessionStatus {
                logged_in: true,
                user: Some(user),
            }) => {
                tracing::info!("Resumed session as {}", user.role);
                SessionState::Authenticated(user.role)
            }
            Ok(_) => SessionState::Anonymous,
            Err(e) if e.status() == Some(401) => {
                tracing::debug!("No active session");
                SessionState::Anonymous
            }
            Err(e) => {
                tracing::warn!("Session check failed, treating as anonymous: {}", e);
                SessionState::Anonymous
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Role, LoginError> {
        require(username, MSG_FIELDS_REQUIRED).map_err(LoginError::Invalid)?;
        require(password, MSG_FIELDS_REQUIRED).map_err(LoginError::Invalid)?;

        let body = Credentials {
            username: username.trim(),
            password,
        };
        match self
            .api
            .post_json::<_, LoginResponse>("/api/login", &body)
            .await
        {
            Ok(response) => {
                tracing::info!("Logged in as {}", response.role);
                Ok(response.role)
            }
            Err(e) => {
                tracing::warn!("Login rejected: {}", e);
                Err(LoginError::Failed(e))
            }
        }
    }

    /// End the session. The console returns to anonymous whatever the server says.
    pub async fn logout(&self) -> SessionState {
        if let Err(e) = self.api.post_empty::<Ack>("/api/logout").await {
            tracing::warn!("Logout request failed: {}", e);
        }
        SessionState::Anonymous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::DemoBackend;

    async fn backend() -> (DemoBackend, SessionController) {
        let demo = DemoBackend::start("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let api = ApiClient::new(&demo.url()).unwrap();
        (demo, SessionController::new(api))
    }

    #[test]
    fn test_state_edges() {
        let state = SessionState::default();
        assert_eq!(state.role(), None);

        let state = state.authenticate(Role::Agent);
        assert_eq!(state, SessionState::Authenticated(Role::Agent));
        assert_eq!(state.end(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_blank_fields_never_reach_network() {
        let (demo, session) = backend().await;

        let err = session.login("admin", "   ").await.unwrap_err();
        assert_eq!(err.user_message(), MSG_FIELDS_REQUIRED);
        let err = session.login("", "admin").await.unwrap_err();
        assert_eq!(err.user_message(), MSG_FIELDS_REQUIRED);

        assert_eq!(demo.count("POST", "/api/login"), 0);
    }

    #[tokio::test]
    async fn test_login_resolve_logout() {
        let (demo, session) = backend().await;

        assert_eq!(session.resolve().await, SessionState::Anonymous);

        let role = session.login("admin", "admin").await.unwrap();
        assert_eq!(role, Role::Admin);
        assert_eq!(
            session.resolve().await,
            SessionState::Authenticated(Role::Admin)
        );

        assert_eq!(session.logout().await, SessionState::Anonymous);
        assert_eq!(session.resolve().await, SessionState::Anonymous);
        assert_eq!(demo.count("POST", "/api/logout"), 1);
    }

    #[tokio::test]
    async fn test_wrong_password_gives_generic_message() {
        let (_demo, session) = backend().await;
        let err = session.login("agent", "nope").await.unwrap_err();
        assert_eq!(err.user_message(), MSG_LOGIN_FAILED);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_anonymous() {
        let api = ApiClient::new("http://127.0.0.1:1").unwrap();
        let session = SessionController::new(api);
        assert_eq!(session.resolve().await, SessionState::Anonymous);
        assert_eq!(session.logout().await, SessionState::Anonymous);
    }
}
