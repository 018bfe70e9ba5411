//! Scrape a room page, then register it as a stream
//!
//! Scrape results are not cached: every submission replaces (or clears) the
//! last one.

use crate::api::models::{Platform, ScrapeResult};
use crate::api::{require, ApiClient, OpError, ValidationError};
use crate::resources::kinds::StreamDraft;
use crate::resources::{Notice, ResourceManager, Streams};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const MSG_ENTER_ROOM: &str = "Please enter a room URL.";
pub const MSG_ENTER_BUFFER: &str = "Please enter a buffer URL.";
pub const MSG_NO_SCRAPE: &str = "No scraped data available.";
pub const MSG_SCRAPE_FAILED: &str = "Error scraping the URL.";
pub const MSG_ADD_FAILED: &str = "Error adding stream.";

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    room_url: &'a str,
}

#[derive(Default)]
struct ScrapeState {
    result: Option<ScrapeResult>,
    notice: Option<Notice>,
}

#[derive(Clone)]
pub struct ScraperPanel {
    api: ApiClient,
    streams: ResourceManager<Streams>,
    state: Arc<Mutex<ScrapeState>>,
}

impl ScraperPanel {
    pub fn new(api: ApiClient, streams: ResourceManager<Streams>) -> Self {
        Self {
            api,
            streams,
            state: Arc::new(Mutex::new(ScrapeState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, ScrapeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn result(&self) -> Option<ScrapeResult> {
        self.state().result.clone()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.state().notice.clone()
    }

    fn finish<T>(&self, result: &Result<T, OpError>, success: impl FnOnce(&T) -> String, fallback: &str) {
        let notice = match result {
            Ok(value) => Notice::Success(success(value)),
            Err(e) => {
                if let OpError::Request(e) = e {
                    tracing::warn!("Scraper request failed: {}", e);
                }
                Notice::Error(e.user_message(fallback))
            }
        };
        self.state().notice = Some(notice);
    }

    pub async fn scrape(&self, room_url: &str) -> Result<ScrapeResult, OpError> {
        self.state().result = None;
        let result = self.try_scrape(room_url.trim()).await;
        if let Ok(scraped) = &result {
            self.state().result = Some(scraped.clone());
        }
        self.finish(
            &result,
            |s| format!("Scraped {}", s.streamer_username),
            MSG_SCRAPE_FAILED,
        );
        result
    }

    async fn try_scrape(&self, room_url: &str) -> Result<ScrapeResult, OpError> {
        require(room_url, MSG_ENTER_ROOM)?;
        let scraped = self
            .api
            .post_json("/api/scrape", &ScrapeRequest { room_url })
            .await?;
        Ok(scraped)
    }

    /// Register the scraped room with a manually found buffer URL
    pub async fn register(&self, buffer_url: &str) -> Result<String, OpError> {
        let result = self.try_register(buffer_url.trim()).await;
        if result.is_ok() {
            self.state().result = None;
        }
        self.finish(&result, String::clone, MSG_ADD_FAILED);
        result
    }

    async fn try_register(&self, buffer_url: &str) -> Result<String, OpError> {
        let scraped = self.result().ok_or(ValidationError(MSG_NO_SCRAPE))?;
        require(buffer_url, MSG_ENTER_BUFFER)?;

        let draft = StreamDraft {
            url: buffer_url.to_string(),
            room_url: Some(scraped.room_url),
            platform: Some(Platform::Chaturbate),
            streamer_username: Some(scraped.streamer_username),
        };
        self.streams.create(draft).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Ack;
    use crate::demo::DemoBackend;
    use serde_json::json;

    async fn panel() -> (DemoBackend, ScraperPanel) {
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
        let panel = ScraperPanel::new(api.clone(), ResourceManager::new(api));
        (demo, panel)
    }

    #[tokio::test]
    async fn test_validation_before_network() {
        let (demo, panel) = panel().await;

        let err = panel.scrape(" ").await.unwrap_err();
        assert_eq!(err.user_message(MSG_SCRAPE_FAILED), MSG_ENTER_ROOM);
        let err = panel.register("blob:https://x/1").await.unwrap_err();
        assert_eq!(err.user_message(MSG_ADD_FAILED), MSG_NO_SCRAPE);

        assert_eq!(demo.count("POST", "/api/scrape"), 0);
        assert_eq!(demo.count("POST", "/api/streams"), 0);
    }

    #[tokio::test]
    async fn test_scrape_then_register() {
        let (demo, panel) = panel().await;

        let scraped = panel.scrape("https://chaturbate.com/caylin/").await.unwrap();
        assert_eq!(scraped.streamer_username, "caylin");
        assert_eq!(
            panel.register("").await.unwrap_err().user_message(MSG_ADD_FAILED),
            MSG_ENTER_BUFFER
        );

        panel.register("https://edge.example/caylin/playlist.m3u8").await.unwrap();
        assert!(panel.result().is_none());
        assert_eq!(demo.count("POST", "/api/streams"), 1);

        let streams = panel.streams.items().get().unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].location(), "https://edge.example/caylin/playlist.m3u8");
        assert_eq!(
            streams[0].room_url.as_deref(),
            Some("https://chaturbate.com/caylin/")
        );
        assert_eq!(streams[0].platform, Some(Platform::Chaturbate));
        assert_eq!(streams[0].streamer_username.as_deref(), Some("caylin"));
    }

    #[tokio::test]
    async fn test_failed_scrape_clears_previous_result() {
        let (_demo, panel) = panel().await;
        panel.scrape("https://chaturbate.com/caylin/").await.unwrap();
        assert!(panel.result().is_some());

        let err = panel.scrape("https://chaturbate.com/").await.unwrap_err();
        assert!(!err.is_validation());
        assert!(panel.result().is_none());
        assert_eq!(
            panel.notice(),
            Some(Notice::Error("Could not parse streamer from room URL".to_string()))
        );
    }
}
