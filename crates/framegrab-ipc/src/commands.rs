//! Commands sent from the front end to the editor.

use serde::{Deserialize, Serialize};

use crate::types::{CaptureMetadata, KeyPress, SourceRef};

/// Commands that a front end can send to the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditorCommand {
    /// Load a video source, replacing any loaded one.
    LoadSource { source: SourceRef },

    /// Unload the current source and release it.
    Eject,

    /// Start playback.
    Play,

    /// Pause playback.
    Pause,

    /// Toggle between playing and paused.
    TogglePlayPause,

    /// Move the playhead to an absolute time in seconds (clamped).
    Seek(f64),

    /// Advance one frame.
    StepForward,

    /// Go back one frame.
    StepBackward,

    /// Jump forward by the skip interval.
    SkipForward,

    /// Jump backward by the skip interval.
    SkipBackward,

    /// Set an explicit playback rate (> 0).
    SetPlaybackRate(f64),

    /// Hold-to-scan fast forward; released with `ResetPlaybackRate`.
    FastForward,

    /// Hold-to-scan slow rewind; released with `ResetPlaybackRate`.
    Rewind,

    /// Restore normal playback speed.
    ResetPlaybackRate,

    /// Capture the frame under the playhead.
    Capture,

    /// Route a key press through the keyboard shortcuts.
    KeyPress(KeyPress),

    /// Persist the pending capture with the given metadata.
    SaveCapture { metadata: CaptureMetadata },

    /// Discard the pending capture.
    CancelCapture,

    /// Request the current transport state and playhead.
    GetState,

    /// Shut the editor down.
    Shutdown,
}
