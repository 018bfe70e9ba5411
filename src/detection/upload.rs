//! Batch upload, then poll for accumulated results
//!
//! The server never signals completion, so the gallery and audio-flag
//! pollers run until the harness is torn down or a new upload replaces them.
//! Each tick replaces the accumulated snapshot wholesale.

use super::mime_for;
use crate::api::models::{AudioFlags, AudioFlagsResponse, GalleryResponse, Thumbnail, UploadReceipt};
use crate::api::{require, ApiClient, ApiError, OpError};
use crate::poller::{PollHandle, Snapshot, ViewTasks};
use crate::resources::Notice;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const MSG_SELECT_VIDEO: &str = "Please select a video file.";
pub const MSG_UPLOAD_FAILED: &str = "Error uploading file.";

#[derive(Default)]
struct UploadState {
    /// Bumped by every new upload and by teardown; a finishing upload that
    /// no longer matches must not start pollers
    generation: u64,
    tasks: ViewTasks,
    receipt: Option<UploadReceipt>,
    uploading: bool,
    notice: Option<Notice>,
}

#[derive(Clone)]
pub struct UploadHarness {
    api: ApiClient,
    every: Duration,
    thumbnails: Snapshot<Vec<Thumbnail>>,
    audio_flags: Snapshot<AudioFlags>,
    state: Arc<Mutex<UploadState>>,
}

impl UploadHarness {
    pub fn new(api: ApiClient, every: Duration) -> Self {
        Self {
            api,
            every,
            thumbnails: Snapshot::new(),
            audio_flags: Snapshot::new(),
            state: Arc::new(Mutex::new(UploadState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, UploadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn thumbnails(&self) -> &Snapshot<Vec<Thumbnail>> {
        &self.thumbnails
    }

    pub fn audio_flags(&self) -> &Snapshot<AudioFlags> {
        &self.audio_flags
    }

    pub fn receipt(&self) -> Option<UploadReceipt> {
        self.state().receipt.clone()
    }

    /// Playback address of the last upload, absolute
    pub fn video_url(&self) -> Option<String> {
        let receipt = self.receipt()?;
        self.api
            .url(&receipt.video_url)
            .ok()
            .map(|url| url.to_string())
    }

    pub fn is_uploading(&self) -> bool {
        self.state().uploading
    }

    pub fn notice(&self) -> Option<Notice> {
        self.state().notice.clone()
    }

    /// Names of the running pollers
    pub fn active_pollers(&self) -> Vec<&'static str> {
        self.state().tasks.names()
    }

    /// Upload `path` and start polling for its results
    ///
    /// Any previous upload's pollers are cancelled and its accumulated
    /// thumbnails and flags cleared before the new request is sent.
    pub async fn upload(&self, path: &str) -> Result<UploadReceipt, OpError> {
        require(path, MSG_SELECT_VIDEO).inspect_err(|v| {
            self.state().notice = Some(Notice::Error(v.0.to_string()));
        })?;

        let generation = {
            let mut state = self.state();
            state.generation += 1;
            state.tasks.cancel_all();
            state.receipt = None;
            state.uploading = true;
            state.notice = None;
            state.generation
        };
        self.thumbnails.clear();
        self.audio_flags.clear();

        let result = self.send(Path::new(path.trim())).await;

        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!("Upload finished after it was superseded, ignoring");
            return result.map_err(OpError::Request);
        }
        state.uploading = false;
        match result {
            Ok(receipt) => {
                tracing::info!(gallery = %receipt.gallery_url, "Upload accepted, polling for results");
                let pollers = self.start_pollers(&receipt);
                state.tasks.extend(pollers);
                state.receipt = Some(receipt.clone());
                state.notice = Some(Notice::Success("Upload complete. Processing...".to_string()));
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!("Upload failed: {}", e);
                state.notice = Some(Notice::Error(e.user_message(MSG_UPLOAD_FAILED)));
                Err(OpError::Request(e))
            }
        }
    }

    async fn send(&self, path: &Path) -> Result<UploadReceipt, ApiError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::Io(format!("{}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(path))?;
        let form = Form::new().part("video", part);
        self.api.post_multipart("/api/test/visual/upload", form).await
    }

    fn start_pollers(&self, receipt: &UploadReceipt) -> [PollHandle; 2] {
        let api = self.api.clone();
        let gallery_url = receipt.gallery_url.clone();
        let gallery = PollHandle::spawn("gallery", self.every, self.thumbnails.clone(), move || {
            let api = api.clone();
            let url = gallery_url.clone();
            async move {
                api.get::<GalleryResponse>(&url)
                    .await
                    .map(|r| r.thumbnails)
            }
        });

        let api = self.api.clone();
        let audio_url = receipt.audio_flags_url.clone();
        let audio = PollHandle::spawn("audio-flags", self.every, self.audio_flags.clone(), move || {
            let api = api.clone();
            let url = audio_url.clone();
            async move {
                api.get::<AudioFlagsResponse>(&url)
                    .await
                    .map(|r| r.audio_flags)
            }
        });

        [gallery, audio]
    }

    /// Stop every poller; an upload still in flight will not start new ones
    pub fn teardown(&self) {
        let mut state = self.state();
        state.generation += 1;
        state.uploading = false;
        state.tasks.cancel_all();
    }
}
