//! Events sent from the editor to the front end.

use serde::{Deserialize, Serialize};

use crate::state::TransportState;
use crate::types::{PlayheadState, SavedCapture, VideoInfo};

/// Events that the editor can send to the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditorEvent {
    /// Transport state has changed.
    StateChanged {
        /// Previous state.
        previous: TransportState,

        /// Current state.
        current: TransportState,
    },

    /// Playhead moved or playback settings changed.
    Playhead(PlayheadState),

    /// The loaded source resolved its metadata.
    MetadataResolved(VideoInfo),

    /// A frame was captured and awaits metadata.
    CaptureReady {
        /// Playhead position of the frame in seconds.
        timestamp: f64,

        /// Snapshot of the source metadata.
        video_info: VideoInfo,

        /// Size of the encoded image in bytes.
        image_len: usize,
    },

    /// The pending capture was persisted.
    CaptureSaved(SavedCapture),

    /// The pending capture was discarded.
    CaptureDiscarded,

    /// Error occurred.
    Error {
        /// Whether the editor is still usable.
        recoverable: bool,

        /// Error message.
        message: String,
    },

    /// Editor is ready.
    Ready,

    /// Editor has shut down.
    Shutdown,
}
