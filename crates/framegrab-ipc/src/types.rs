//! Common types shared by commands, events and the editor core.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A reference to a local video source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Display file name (e.g. "heat_1995.mp4").
    pub file_name: String,

    /// Location of the source on disk.
    pub path: PathBuf,
}

impl SourceRef {
    /// Build a source reference from a path, deriving the display name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Self { file_name, path }
    }
}

/// Descriptive metadata for the loaded video.
///
/// Duration and dimensions are zero until the render surface resolves them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Source file name.
    pub file_name: String,

    /// Duration in seconds.
    pub duration: f64,

    /// Native width in pixels.
    pub width: u32,

    /// Native height in pixels.
    pub height: u32,

    /// Native frame rate, when the source exposes timing metadata.
    pub frame_rate: Option<f64>,
}

impl VideoInfo {
    /// Info for a freshly loaded source whose metadata is still pending.
    pub fn pending(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            duration: 0.0,
            width: 0,
            height: 0,
            frame_rate: None,
        }
    }

    /// Returns true once both native dimensions are known.
    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Playhead state owned by the transport controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayheadState {
    /// Current position in seconds.
    pub current_time: f64,

    /// Timeline length in seconds.
    pub duration: f64,

    /// Whether playback is running.
    pub is_playing: bool,

    /// Playback speed multiplier (always > 0).
    pub playback_rate: f64,
}

impl Default for PlayheadState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: 0.0,
            is_playing: false,
            playback_rate: 1.0,
        }
    }
}

/// A physical key the keyboard router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Space,
    ArrowLeft,
    ArrowRight,
    Char(char),
}

/// A key-press event from the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPress {
    pub key: Key,
    pub shift: bool,
}

impl KeyPress {
    /// A key press without modifiers.
    pub fn plain(key: Key) -> Self {
        Self { key, shift: false }
    }

    /// A key press with shift held.
    pub fn shifted(key: Key) -> Self {
        Self { key, shift: true }
    }
}

/// User-entered descriptive metadata for a capture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    /// Movie title.
    pub movie_name: String,

    /// External reference link (an IMDb title page).
    pub reference_link: String,

    /// Free-form notes.
    pub notes: Option<String>,

    /// Tags, already split and trimmed.
    pub tags: Vec<String>,

    /// Whether the capture shows up in the public gallery.
    pub published: bool,
}

/// Summary of a capture that was persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCapture {
    /// Record identifier assigned by the store.
    pub id: String,

    /// Movie title as saved.
    pub movie_name: String,

    /// Display timestamp (`HH:MM:SS.mmm`).
    pub timestamp: String,

    /// Retrieval URL of the stored frame.
    pub frame_url: String,
}

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Frame rate assumed when the source exposes none.
    pub default_frame_rate: f64,

    /// Seconds jumped by skip forward/backward.
    pub skip_interval_secs: f64,

    /// Playback rate while fast-forward is held.
    pub fast_forward_rate: f64,

    /// Playback rate while rewind is held.
    pub rewind_rate: f64,

    /// Interval between surface clock ticks in milliseconds.
    pub tick_interval_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_frame_rate: 24.0,
            skip_interval_secs: 10.0,
            fast_forward_rate: 2.0,
            rewind_rate: 0.5,
            tick_interval_ms: 40,
        }
    }
}
