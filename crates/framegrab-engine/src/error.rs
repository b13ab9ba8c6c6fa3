//! Error types for the engine.

use thiserror::Error;

use framegrab_capture::CaptureError;

/// Errors that can occur while editing.
///
/// None of these end the editing session; the editor reports them and
/// keeps running.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Operation needs a loaded source.
    #[error("No video source loaded")]
    NoSource,

    /// Playback rate must be finite and positive.
    #[error("Invalid playback rate: {0}")]
    InvalidPlaybackRate(f64),

    /// A capture is already waiting for metadata.
    #[error("A capture is already pending")]
    CapturePending,

    /// Save or cancel without a pending capture.
    #[error("No capture pending")]
    NoPendingCapture,

    /// Capture, surface or persistence error.
    #[error(transparent)]
    Capture(#[from] CaptureError),
}
