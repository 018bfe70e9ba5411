//! Detection test harness
//!
//! Two ways to exercise the inference backend against user-supplied video:
//!
//! - [`upload`]: upload a whole file once, then poll the gallery and
//!   audio-flag endpoints the server hands back.
//! - [`capture`]: play a local frame source and send one frame per tick to
//!   the per-frame endpoint.
//!
//! Both harnesses own their periodic tasks and cancel them on teardown.

pub mod capture;
pub mod upload;

pub use capture::{CaptureHarness, FrameDirectory, FrameSource, PlaybackState};
pub use upload::UploadHarness;

/// Content type guessed from a file extension
pub(crate) fn mime_for(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("clip.MP4")), "video/mp4");
        assert_eq!(mime_for(Path::new("frames/0001.jpeg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("noext")), "application/octet-stream");
    }
}
