//! Durable record types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A saved frame capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub id: Uuid,
    pub movie_name: String,

    /// IMDb title page. Empty for manual uploads that did not give one.
    pub reference_link: String,

    /// Display timestamp (`HH:MM:SS.mmm`, or `HH:MM:SS` for manual uploads).
    pub timestamp: String,

    /// Retrieval URL of the uploaded frame.
    pub frame_url: String,

    pub notes: Option<String>,
    pub tags: Vec<String>,

    /// Milliseconds since the Unix epoch.
    pub captured_at: u64,

    pub published: bool,
    pub video_file_name: Option<String>,

    /// Link to the source video record.
    pub video: Option<Uuid>,

    /// Link to the editor who made the capture.
    pub editor: Option<Uuid>,

    /// Link to the uploaded frame file.
    pub frame_file: Option<Uuid>,
}

impl CaptureRecord {
    /// Returns true if `user` made this capture.
    pub fn is_owned_by(&self, user: Uuid) -> bool {
        self.editor == Some(user)
    }
}

/// A source video, unique by file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: Uuid,
    pub file_name: String,
    pub uploaded_at: u64,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f64>,
}

/// An object in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub path: String,
    pub url: String,
}

/// A signed-in editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
}

/// Every record in a document store, for export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub captures: Vec<CaptureRecord>,
    pub videos: Vec<VideoRecord>,
}
