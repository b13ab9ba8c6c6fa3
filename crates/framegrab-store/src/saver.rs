//! Persisting finished capture sessions.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use framegrab_capture::{CaptureResult, CaptureSession, CaptureSink};
use framegrab_ipc::{CaptureMetadata, SavedCapture, VideoInfo};

use crate::error::StoreError;
use crate::identity::IdentityProvider;
use crate::metadata::validate_capture_metadata;
use crate::records::{CaptureRecord, VideoRecord};
use crate::storage::{discard_upload, ObjectStorage};
use crate::store::DocumentStore;
use crate::{epoch_millis, StoreResult};

/// Saves capture sessions for the signed-in editor.
///
/// The frame is uploaded to object storage and the capture record links to
/// the uploaded file; no image data is stored inline.
pub struct CaptureSaver {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStorage>,
    identity: Arc<dyn IdentityProvider>,
    clock: fn() -> u64,
}

impl CaptureSaver {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStorage>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            storage,
            identity,
            clock: epoch_millis,
        }
    }

    /// Use `clock` (epoch milliseconds) instead of the system time.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// Validate, upload and record a capture.
    #[instrument(name = "save_capture", skip_all, fields(file = %session.video_info().file_name))]
    pub fn save(
        &self,
        session: &CaptureSession,
        metadata: &CaptureMetadata,
    ) -> StoreResult<CaptureRecord> {
        let user = self
            .identity
            .current_user()
            .ok_or(StoreError::NotSignedIn)?;
        validate_capture_metadata(metadata)?;

        let now = (self.clock)();
        let video = self.find_or_create_video(session.video_info(), now)?;

        let path = format!("{}/captures/{}.png", user.id, now);
        let file = self.storage.upload(&path, session.image().bytes.clone())?;
        debug!(path = %file.path, "Frame uploaded");

        let notes = metadata
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
            .map(str::to_string);
        let tags = metadata
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();

        let record = CaptureRecord {
            id: Uuid::new_v4(),
            movie_name: metadata.movie_name.trim().to_string(),
            reference_link: metadata.reference_link.trim().to_string(),
            timestamp: session.display_timestamp(),
            frame_url: file.url.clone(),
            notes,
            tags,
            captured_at: now,
            published: metadata.published,
            video_file_name: Some(video.file_name.clone()),
            video: Some(video.id),
            editor: Some(user.id),
            frame_file: Some(file.id),
        };
        if let Err(e) = self.store.save_capture(record.clone()) {
            discard_upload(self.storage.as_ref(), &file.path);
            return Err(e);
        }

        info!(id = %record.id, timestamp = %record.timestamp, "Capture recorded");
        Ok(record)
    }

    fn find_or_create_video(&self, info: &VideoInfo, now: u64) -> StoreResult<VideoRecord> {
        if let Some(video) = self.store.find_video(&info.file_name)? {
            return Ok(video);
        }

        let video = VideoRecord {
            id: Uuid::new_v4(),
            file_name: info.file_name.clone(),
            uploaded_at: now,
            duration: info.duration,
            width: info.width,
            height: info.height,
            frame_rate: info.frame_rate,
        };
        self.store.save_video(video.clone())?;
        debug!(id = %video.id, "Video recorded");
        Ok(video)
    }
}

impl CaptureSink for CaptureSaver {
    fn on_save(
        &mut self,
        session: &CaptureSession,
        metadata: &CaptureMetadata,
    ) -> CaptureResult<SavedCapture> {
        let record = self.save(session, metadata)?;
        Ok(SavedCapture {
            id: record.id.to_string(),
            movie_name: record.movie_name,
            timestamp: record.timestamp,
            frame_url: record.frame_url,
        })
    }

    fn on_cancel(&mut self, session: &CaptureSession) {
        debug!(timestamp = %session.display_timestamp(), "Capture not saved");
    }
}
