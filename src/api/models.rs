//! Wire types for the console API
//!
//! Every list the console displays is decoded from these shapes and held as a
//! snapshot. Request bodies that only exist on the way out live next to the
//! operation that sends them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Console role resolved from the server session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Agent => write!(f, "agent"),
        }
    }
}

/// `GET /api/session`
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStatus {
    #[serde(default)]
    pub logged_in: bool,
    pub user: Option<SessionUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionUser {
    pub role: Role,
}

/// `POST /api/login` success body
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub role: Role,
}

/// Generic `{message}` acknowledgement returned by mutating endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub username: String,
}

/// Streaming platform of a monitored room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    Chaturbate,
    Stripchat,
    BongaCams,
    Cam4,
    #[serde(other)]
    Other,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chaturbate => "Chaturbate",
            Self::Stripchat => "Stripchat",
            Self::BongaCams => "BongaCams",
            Self::Cam4 => "Cam4",
            Self::Other => "Other",
        }
    }
}

/// A registered stream. Older servers only send `url`, newer ones `room_url`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Stream {
    pub id: i64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub room_url: Option<String>,
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub streamer_username: Option<String>,
}

impl Stream {
    /// The address shown and edited for this stream
    pub fn location(&self) -> &str {
        self.url
            .as_deref()
            .or(self.room_url.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatKeyword {
    pub id: i64,
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlaggedObject {
    pub id: i64,
    pub object_name: String,
}

/// One "ongoing stream" row of a dashboard: an assignment with its
/// denormalized display fields. The console never builds one itself.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OngoingStream {
    #[serde(default)]
    pub assignment_id: Option<i64>,
    pub stream_id: i64,
    #[serde(default, alias = "stream_url")]
    pub room_url: Option<String>,
    #[serde(default)]
    pub agent_username: Option<String>,
    #[serde(default)]
    pub streamer_username: Option<String>,
    #[serde(default)]
    pub platform: Option<Platform>,
}

impl OngoingStream {
    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_default()
    }
}

/// `GET /api/dashboard` and `GET /api/agent/dashboard`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Dashboard {
    #[serde(default)]
    pub ongoing_streams: u64,
    #[serde(default, alias = "streams")]
    pub assignments: Vec<OngoingStream>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: String,
    #[serde(default)]
    pub stream_url: String,
    #[serde(default)]
    pub event_type: String,
}

/// `POST /api/scrape`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub room_url: String,
    #[serde(default)]
    pub streamer_username: String,
    #[serde(default)]
    pub page_title: String,
}

/// `POST /api/test/visual/upload`: where to watch the accumulated results
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    pub video_url: String,
    pub gallery_url: String,
    pub audio_flags_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Thumbnail {
    pub class: String,
    #[serde(default)]
    pub thumb_url: String,
    #[serde(default)]
    pub video_timestamp: f64,
    #[serde(default)]
    pub realworld_timestamp: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GalleryResponse {
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AudioFlag {
    #[serde(default)]
    pub phrase: String,
    #[serde(default)]
    pub audio_timestamp: f64,
    #[serde(default)]
    pub realworld_timestamp: String,
}

/// Keyword → latest flagged phrase
pub type AudioFlags = BTreeMap<String, AudioFlag>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioFlagsResponse {
    #[serde(default)]
    pub audio_flags: AudioFlags,
}

/// One per-frame classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub class: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameResponse {
    #[serde(default)]
    pub results: Vec<DetectionResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_accepts_streams_alias() {
        let json = r#"{"ongoing_streams": 1, "streams": [
            {"stream_id": 4, "stream_url": "https://x/room", "agent_username": "bob"}
        ]}"#;
        let dashboard: Dashboard = serde_json::from_str(json).unwrap();
        assert_eq!(dashboard.assignments.len(), 1);
        assert_eq!(
            dashboard.assignments[0].room_url.as_deref(),
            Some("https://x/room")
        );
        assert_eq!(dashboard.assignments[0].platform(), Platform::Chaturbate);
    }

    #[test]
    fn test_stream_location_prefers_url() {
        let stream: Stream =
            serde_json::from_str(r#"{"id": 1, "room_url": "https://room", "url": "blob:buf"}"#)
                .unwrap();
        assert_eq!(stream.location(), "blob:buf");

        let stream: Stream = serde_json::from_str(r#"{"id": 2, "room_url": "https://room"}"#)
            .unwrap();
        assert_eq!(stream.location(), "https://room");
    }

    #[test]
    fn test_unknown_platform_decodes_as_other() {
        let stream: Stream =
            serde_json::from_str(r#"{"id": 1, "url": "u", "platform": "Flirt4Free"}"#).unwrap();
        assert_eq!(stream.platform, Some(Platform::Other));
    }
}
