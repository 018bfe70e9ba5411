//! HTTP client for the monitoring API
//!
//! All console traffic is JSON over HTTP against a single origin. The client
//! keeps the session cookie in memory only, so a session never outlives the
//! process. No per-request timeout is set; a hung request delays one tick of
//! one view.

pub mod models;

use crate::util::truncate_utf8_safe;
use reqwest::{multipart::Form, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

/// Server messages longer than this are cut before they reach a notice
const MAX_SERVER_MESSAGE_BYTES: usize = 240;

/// Errors from a console API call
#[derive(Debug)]
pub enum ApiError {
    /// Base URL or a server-provided URL could not be parsed
    InvalidUrl(String),
    /// Connection failure, reset, DNS, ...
    Network(String),
    /// Non-success status; `message` is the server's `message` field if it sent one
    Status { status: u16, message: Option<String> },
    /// Response body was not the expected shape
    Decode(String),
    /// Local file could not be read (uploads)
    Io(String),
}

impl ApiError {
    /// The text shown to the user for a failed mutation: the server's own
    /// message when it provided one, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Status {
                status,
                message: Some(message),
            } => write!(f, "HTTP {}: {}", status, message),
            Self::Status {
                status,
                message: None,
            } => write!(f, "HTTP {}", status),
            Self::Decode(msg) => write!(f, "Unexpected response: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Local validation failure. Produced before any request is built, so it
/// never reaches the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationError(pub &'static str);

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for ValidationError {}

/// Outcome of a failed mutation: rejected locally or by the request
#[derive(Debug)]
pub enum OpError {
    Invalid(ValidationError),
    Request(ApiError),
}

impl OpError {
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Invalid(v) => v.0.to_string(),
            Self::Request(e) => e.user_message(fallback),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(v) => write!(f, "{}", v),
            Self::Request(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for OpError {}

impl From<ValidationError> for OpError {
    fn from(v: ValidationError) -> Self {
        Self::Invalid(v)
    }
}

impl From<ApiError> for OpError {
    fn from(e: ApiError) -> Self {
        Self::Request(e)
    }
}

/// Per-operation error policy
///
/// Reads (list, dashboard, logs, gallery, audio flags) swallow failures after
/// a diagnostic and keep the previous snapshot. Writes surface them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpPolicy {
    pub report_errors: bool,
}

impl OpPolicy {
    pub const READ: Self = Self {
        report_errors: false,
    };
    pub const WRITE: Self = Self {
        report_errors: true,
    };
}

/// Trim-aware "required field" check shared by every form
pub fn require(value: &str, message: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError(message))
    } else {
        Ok(())
    }
}

/// Cheap-to-clone API handle (reqwest pools connections internally)
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base.as_str())
            .finish()
    }
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Resolve an API path, or a server-provided relative/absolute URL
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", path, e)))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        self.send(self.client.get(url)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        self.send(self.client.post(url).json(body)).await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        self.send(self.client.post(url)).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        self.send(self.client.put(url).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        self.send(self.client.delete(url)).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        self.send(self.client.post(url).multipart(form)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<models::Ack>()
                .await
                .ok()
                .and_then(|ack| ack.message)
                .map(|m| truncate_utf8_safe(&m, MAX_SERVER_MESSAGE_BYTES).to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        // Some acks come back with an empty body
        let bytes: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
        serde_json::from_slice(bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = ApiError::Status {
            status: 400,
            message: Some("Username already exists".to_string()),
        };
        assert_eq!(
            err.user_message("Error creating agent."),
            "Username already exists"
        );
    }

    #[test]
    fn test_user_message_falls_back() {
        let err = ApiError::Network("connection refused".to_string());
        assert_eq!(err.user_message("Assignment failed."), "Assignment failed.");

        let err = ApiError::Status {
            status: 500,
            message: Some("   ".to_string()),
        };
        assert_eq!(err.user_message("Assignment failed."), "Assignment failed.");
    }

    #[test]
    fn test_require_rejects_whitespace() {
        assert_eq!(
            require("  \t", "Keyword is required."),
            Err(ValidationError("Keyword is required."))
        );
        assert!(require(" gun ", "Keyword is required.").is_ok());
    }

    #[test]
    fn test_url_resolves_relative_and_absolute() {
        let api = ApiClient::new("http://127.0.0.1:5000").unwrap();
        assert_eq!(
            api.url("/api/test/visual/gallery/7").unwrap().as_str(),
            "http://127.0.0.1:5000/api/test/visual/gallery/7"
        );
        assert_eq!(
            api.url("http://media.local/g/1").unwrap().as_str(),
            "http://media.local/g/1"
        );
    }

    #[test]
    fn test_op_error_messages() {
        let invalid = OpError::from(ValidationError("Stream URL is required."));
        assert!(invalid.is_validation());
        assert_eq!(
            invalid.user_message("Error creating stream."),
            "Stream URL is required."
        );

        let failed = OpError::from(ApiError::Status {
            status: 400,
            message: None,
        });
        assert_eq!(
            failed.user_message("Error creating stream."),
            "Error creating stream."
        );
    }

    #[test]
    fn test_policies() {
        assert!(!OpPolicy::READ.report_errors);
        assert!(OpPolicy::WRITE.report_errors);
    }
}
