//! Live frame capture against the per-frame detection endpoint
//!
//! A frame source plays in order; while it is playing, one frame per tick is
//! posted and the returned detections replace the displayed list. Each tick
//! awaits its own request before the next capture, and the loop is cancelled
//! the moment playback pauses or ends. Sources only hand out references;
//! frame bytes are read after the harness state is released.

use super::mime_for;
use crate::api::models::{DetectionResult, FrameResponse};
use crate::api::{ApiClient, ApiError};
use crate::poller::{PollHandle, Snapshot};
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// One encoded frame ready to post
#[derive(Debug, Clone)]
pub struct Frame {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: &'static str,
}

/// The next frame as handed out by a source, not yet read from disk
#[derive(Debug, Clone)]
pub enum FrameRef {
    Loaded(Frame),
    File(PathBuf),
}

impl FrameRef {
    pub async fn load(self) -> std::io::Result<Frame> {
        match self {
            Self::Loaded(frame) => Ok(frame),
            Self::File(path) => {
                let bytes = tokio::fs::read(&path).await?;
                Ok(Frame {
                    bytes,
                    file_name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "frame".to_string()),
                    mime: mime_for(&path),
                })
            }
        }
    }
}

/// Something that yields frames in playback order. Implementations must not
/// block; any I/O belongs in [`FrameRef::load`].
pub trait FrameSource: Send {
    fn name(&self) -> &str;
    /// `None` once the source is exhausted
    fn next_frame(&mut self) -> Option<FrameRef>;
    /// Back to the first frame
    fn rewind(&mut self);
    fn position(&self) -> usize;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A directory of `.png`/`.jpg` frames played in file-name order
pub struct FrameDirectory {
    dir: PathBuf,
    frames: Vec<PathBuf>,
    cursor: usize,
}

impl FrameDirectory {
    pub fn open(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let mut frames: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && mime_for(path).starts_with("image/"))
            .collect();
        frames.sort();
        Ok(Self {
            dir,
            frames,
            cursor: 0,
        })
    }
}

impl FrameSource for FrameDirectory {
    fn name(&self) -> &str {
        self.dir.to_str().unwrap_or("frames")
    }

    fn next_frame(&mut self) -> Option<FrameRef> {
        let path = self.frames.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(FrameRef::File(path))
    }

    fn rewind(&mut self) {
        self.cursor = 0;
    }

    fn position(&self) -> usize {
        self.cursor
    }

    fn len(&self) -> usize {
        self.frames.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing loaded, or loaded and never started
    #[default]
    Idle,
    Playing,
    Paused,
    Ended,
}

#[derive(Default)]
struct CaptureState {
    source: Option<Box<dyn FrameSource>>,
    playback: PlaybackState,
    capture: Option<PollHandle>,
    frames_sent: u64,
}

impl CaptureState {
    fn stop_capture(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.cancel();
        }
    }
}

#[derive(Clone)]
pub struct CaptureHarness {
    api: ApiClient,
    every: Duration,
    detections: Snapshot<Vec<DetectionResult>>,
    state: Arc<Mutex<CaptureState>>,
}

impl CaptureHarness {
    pub fn new(api: ApiClient, every: Duration) -> Self {
        Self {
            api,
            every,
            detections: Snapshot::new(),
            state: Arc::new(Mutex::new(CaptureState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, CaptureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn detections(&self) -> &Snapshot<Vec<DetectionResult>> {
        &self.detections
    }

    pub fn playback(&self) -> PlaybackState {
        self.state().playback
    }

    pub fn frames_sent(&self) -> u64 {
        self.state().frames_sent
    }

    /// `(name, position, len)` of the loaded source
    pub fn source_info(&self) -> Option<(String, usize, usize)> {
        let state = self.state();
        let source = state.source.as_ref()?;
        Some((source.name().to_string(), source.position(), source.len()))
    }

    pub fn is_capturing(&self) -> bool {
        self.state()
            .capture
            .as_ref()
            .is_some_and(PollHandle::is_active)
    }

    /// Swap in a new source, releasing the previous one
    pub fn load(&self, source: Box<dyn FrameSource>) {
        let mut state = self.state();
        state.stop_capture();
        if let Some(old) = state.source.take() {
            tracing::debug!(source = old.name(), "Released frame source");
        }
        tracing::info!(source = source.name(), frames = source.len(), "Loaded frame source");
        state.source = Some(source);
        state.playback = PlaybackState::Idle;
        state.frames_sent = 0;
        drop(state);
        self.detections.clear();
    }

    /// Start (or resume) playback and the capture loop. From `Ended` the
    /// source is rewound first.
    pub fn play(&self) {
        let mut state = self.state();
        if state.playback == PlaybackState::Playing {
            return;
        }
        let ended = state.playback == PlaybackState::Ended;
        let Some(source) = state.source.as_mut() else {
            return;
        };
        if ended {
            source.rewind();
        }
        state.playback = PlaybackState::Playing;
        let task = tokio::spawn(capture_loop(self.clone()));
        state.capture = Some(PollHandle::from_task("frame-capture", task));
    }

    pub fn pause(&self) {
        let mut state = self.state();
        if state.playback == PlaybackState::Playing {
            state.stop_capture();
            state.playback = PlaybackState::Paused;
        }
    }

    /// Stop playback for good (until `play` rewinds)
    pub fn end(&self) {
        let mut state = self.state();
        state.stop_capture();
        if state.source.is_some() {
            state.playback = PlaybackState::Ended;
        }
    }

    pub fn toggle(&self) {
        if self.playback() == PlaybackState::Playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Stop capturing and release the source
    pub fn teardown(&self) {
        let mut state = self.state();
        state.stop_capture();
        if let Some(old) = state.source.take() {
            tracing::debug!(source = old.name(), "Released frame source");
        }
        state.playback = PlaybackState::Idle;
    }

    /// Take the next frame reference if still playing; marks the end of the source
    fn capture_frame(&self) -> Option<FrameRef> {
        let mut state = self.state();
        if state.playback != PlaybackState::Playing {
            return None;
        }
        let next = state.source.as_mut().and_then(|s| s.next_frame());
        if next.is_none() {
            tracing::info!("Frame source exhausted");
            state.playback = PlaybackState::Ended;
        }
        next
    }

    /// Ends playback from inside the capture loop, leaving its handle alone
    fn mark_ended(&self) {
        let mut state = self.state();
        if state.playback == PlaybackState::Playing {
            state.playback = PlaybackState::Ended;
        }
    }

    async fn detect(&self, frame: Frame) -> Result<Vec<DetectionResult>, ApiError> {
        let part = Part::bytes(frame.bytes)
            .file_name(frame.file_name)
            .mime_str(frame.mime)?;
        let form = Form::new().part("frame", part);
        let response: FrameResponse = self
            .api
            .post_multipart("/api/test/visual/frame", form)
            .await?;
        Ok(response.results)
    }
}

async fn capture_loop(harness: CaptureHarness) {
    let mut ticker = tokio::time::interval(harness.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(next) = harness.capture_frame() else {
            break;
        };
        let frame = match next.load().await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Could not read frame, ending playback: {}", e);
                harness.mark_ended();
                break;
            }
        };
        harness.state().frames_sent += 1;
        let ticket = harness.detections.ticket();
        match harness.detect(frame).await {
            Ok(results) => {
                harness.detections.apply(ticket, results);
            }
            Err(e) => {
                tracing::warn!(poller = "frame-capture", "Frame detection failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Ack;
    use crate::demo::DemoBackend;
    use serde_json::json;

    /// Frames held in memory
    struct MemoryFrames {
        frames: Vec<Vec<u8>>,
        cursor: usize,
    }

    impl MemoryFrames {
        fn boxed(count: usize) -> Box<dyn FrameSource> {
            Box::new(Self {
                frames: (0..count).map(|i| vec![0u8; 10 + i]).collect(),
                cursor: 0,
            })
        }
    }

    impl FrameSource for MemoryFrames {
        fn name(&self) -> &str {
            "memory"
        }

        fn next_frame(&mut self) -> Option<FrameRef> {
            let bytes = self.frames.get(self.cursor)?.clone();
            self.cursor += 1;
            Some(FrameRef::Loaded(Frame {
                bytes,
                file_name: "frame.png".to_string(),
                mime: "image/png",
            }))
        }

        fn rewind(&mut self) {
            self.cursor = 0;
        }

        fn position(&self) -> usize {
            self.cursor
        }

        fn len(&self) -> usize {
            self.frames.len()
        }
    }

    async fn harness() -> (DemoBackend, CaptureHarness) {
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
        (demo, CaptureHarness::new(api, Duration::from_millis(40)))
    }

    const FRAME_PATH: &str = "/api/test/visual/frame";

    fn frame_dir(tag: &str, names: &[&str]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "streamwatch-frames-{}-{}",
            tag,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        for name in names {
            std::fs::write(dir.join(name), name.as_bytes()).unwrap();
        }
        dir
    }

    async fn load_next(source: &mut FrameDirectory) -> Option<Frame> {
        Some(source.next_frame()?.load().await.unwrap())
    }

    #[tokio::test]
    async fn test_frame_directory_orders_images_by_name() {
        let dir = frame_dir("order", &["0002.jpg", "0001.png", "notes.txt"]);

        let mut source = FrameDirectory::open(&dir).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(load_next(&mut source).await.unwrap().file_name, "0001.png");
        let second = load_next(&mut source).await.unwrap();
        assert_eq!(second.file_name, "0002.jpg");
        assert_eq!(second.mime, "image/jpeg");
        assert_eq!(second.bytes, b"0002.jpg");
        assert!(source.next_frame().is_none());

        source.rewind();
        assert_eq!(source.position(), 0);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_frame_directory_defers_reads_to_load() {
        let dir = frame_dir("deferred", &["0001.png", "0002.png"]);
        let mut source = FrameDirectory::open(&dir).unwrap();
        std::fs::remove_file(dir.join("0001.png")).unwrap();

        // Advancing never touches the file; only loading does
        let first = source.next_frame().unwrap();
        assert!(matches!(&first, FrameRef::File(path) if path.ends_with("0001.png")));
        assert_eq!(source.position(), 1);
        assert!(first.load().await.is_err());
        assert!(load_next(&mut source).await.is_some());
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_unreadable_frame_ends_playback_without_sending() {
        let (demo, harness) = harness().await;
        let dir = frame_dir("unreadable", &["0001.png", "0002.png"]);
        let source = FrameDirectory::open(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        harness.load(Box::new(source));
        harness.play();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(harness.playback(), PlaybackState::Ended);
        assert_eq!(harness.frames_sent(), 0);
        assert_eq!(demo.count("POST", FRAME_PATH), 0);
        assert!(!harness.is_capturing());
    }

    #[tokio::test]
    async fn test_play_without_source_does_nothing() {
        let (demo, harness) = harness().await;
        harness.play();
        assert_eq!(harness.playback(), PlaybackState::Idle);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(demo.count("POST", FRAME_PATH), 0);
    }

    #[tokio::test]
    async fn test_plays_to_end_then_stops() {
        let (demo, harness) = harness().await;
        harness.load(MemoryFrames::boxed(3));
        harness.play();

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(harness.playback(), PlaybackState::Ended);
        assert_eq!(demo.count("POST", FRAME_PATH), 3);
        assert_eq!(harness.frames_sent(), 3);
        // Last frame is 12 bytes: demo reports a person and a knife
        let classes: Vec<String> = harness
            .detections()
            .get()
            .unwrap()
            .into_iter()
            .map(|d| d.class)
            .collect();
        assert_eq!(classes, vec!["person".to_string(), "knife".to_string()]);
        assert!(!harness.is_capturing());
    }

    #[tokio::test]
    async fn test_pause_stops_capture() {
        let (demo, harness) = harness().await;
        harness.load(MemoryFrames::boxed(1000));
        harness.play();
        tokio::time::sleep(Duration::from_millis(150)).await;

        harness.pause();
        assert_eq!(harness.playback(), PlaybackState::Paused);
        assert!(!harness.is_capturing());
        tokio::time::sleep(Duration::from_millis(50)).await;
        let sent = demo.count("POST", FRAME_PATH);
        assert!(sent >= 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(demo.count("POST", FRAME_PATH), sent);

        // Resume continues from the same position
        let position = harness.source_info().unwrap().1;
        harness.play();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(harness.source_info().unwrap().1 > position);
        harness.end();
        assert_eq!(harness.playback(), PlaybackState::Ended);
    }

    #[tokio::test]
    async fn test_load_releases_previous_source() {
        let (_demo, harness) = harness().await;
        harness.load(MemoryFrames::boxed(1000));
        harness.play();
        tokio::time::sleep(Duration::from_millis(100)).await;

        harness.load(MemoryFrames::boxed(2));
        assert_eq!(harness.playback(), PlaybackState::Idle);
        assert!(!harness.is_capturing());
        assert!(!harness.detections().has_value());
        assert_eq!(harness.source_info().unwrap().2, 2);

        harness.teardown();
        assert!(harness.source_info().is_none());
    }
}
