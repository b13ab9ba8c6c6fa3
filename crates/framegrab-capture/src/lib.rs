//! Render surfaces and still-frame extraction.
//!
//! This crate abstracts a video decode/render surface behind the
//! [`RenderSurface`] trait and turns whatever the surface currently shows
//! into a lossless PNG payload.

mod error;
mod extract;
mod frame;
mod session;
mod surface;
mod surfaces;

pub use error::CaptureError;
pub use extract::capture_frame;
pub use frame::{EncodedImage, RasterFrame, PNG_MIME_TYPE};
pub use session::{CaptureSession, CaptureSink};
pub use surface::{RenderSurface, SurfaceEvent, SurfaceFactory};
pub use surfaces::pattern::{PatternSpec, PatternSurface, PatternSurfaceFactory};
pub use surfaces::sequence::{SequenceSurface, SequenceSurfaceFactory};

/// Channel capacity for surface notifications.
pub const NOTIFICATION_CHANNEL_CAPACITY: usize = 256;

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;
