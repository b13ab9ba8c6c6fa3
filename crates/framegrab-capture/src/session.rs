//! Capture sessions and the hooks that consume them.

use tracing::debug;

use framegrab_ipc::{format_timestamp, CaptureMetadata, SavedCapture, VideoInfo};

use crate::error::CaptureError;
use crate::frame::EncodedImage;
use crate::CaptureResult;

/// An extracted frame with its timestamp and source metadata, waiting for
/// descriptive metadata before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    image: EncodedImage,
    timestamp: f64,
    video_info: VideoInfo,
}

impl CaptureSession {
    /// Bundle a captured image with its playhead position and a snapshot
    /// of the source metadata.
    pub fn assemble(
        image: EncodedImage,
        timestamp: f64,
        video_info: VideoInfo,
    ) -> CaptureResult<Self> {
        if image.is_empty() {
            return Err(CaptureError::EmptyPayload);
        }

        Ok(Self {
            image,
            timestamp,
            video_info,
        })
    }

    /// The encoded frame.
    pub fn image(&self) -> &EncodedImage {
        &self.image
    }

    /// Playhead position of the frame in seconds.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// `HH:MM:SS.mmm` form of the timestamp.
    pub fn display_timestamp(&self) -> String {
        format_timestamp(self.timestamp)
    }

    /// Source metadata at capture time.
    pub fn video_info(&self) -> &VideoInfo {
        &self.video_info
    }

    /// Drop the session without persisting it.
    pub fn discard(self) {
        debug!(
            file = %self.video_info.file_name,
            timestamp = %self.display_timestamp(),
            "Capture discarded"
        );
    }
}

/// Receives finished capture sessions.
///
/// The editor calls `on_save` with the pending session and the user's
/// metadata; an error keeps the session pending so the save can be retried.
pub trait CaptureSink: Send {
    /// Persist the session with its metadata.
    fn on_save(
        &mut self,
        session: &CaptureSession,
        metadata: &CaptureMetadata,
    ) -> CaptureResult<SavedCapture>;

    /// The user abandoned the session.
    fn on_cancel(&mut self, _session: &CaptureSession) {}
}
