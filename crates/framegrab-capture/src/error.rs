//! Error types for the capture module.

use thiserror::Error;

/// Errors that can occur during surface and capture operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Native dimensions are not known yet.
    #[error("Video metadata unavailable (dimensions {width}x{height})")]
    MetadataUnavailable { width: u32, height: u32 },

    /// Source could not be found or opened.
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// Image-sequence directory contains no frames.
    #[error("No frames found in {0}")]
    EmptySequence(String),

    /// Surface was already released.
    #[error("Render surface released")]
    SurfaceReleased,

    /// Surface notifications were already claimed.
    #[error("Render surface already subscribed")]
    AlreadySubscribed,

    /// Raster data does not match its declared geometry.
    #[error("Frame conversion error: {0}")]
    FrameConversion(String),

    /// Captured image payload is empty.
    #[error("Captured image payload is empty")]
    EmptyPayload,

    /// Metadata rejected before persistence.
    #[error("Invalid capture metadata: {0}")]
    InvalidMetadata(String),

    /// Persistence collaborator reported a failure.
    #[error("Failed to persist capture: {0}")]
    Persistence(String),

    /// Image decode/encode error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
