//! The render surface capability.

use std::time::Duration;

use crossbeam_channel::Receiver;
use framegrab_ipc::SourceRef;

use crate::frame::RasterFrame;
use crate::CaptureResult;

/// Asynchronous notifications from a render surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    /// Native metadata became available.
    MetadataResolved {
        duration: f64,
        width: u32,
        height: u32,
        frame_rate: Option<f64>,
    },

    /// Playback advanced the surface clock.
    TimeAdvanced(f64),

    /// Playback reached the end of the timeline and stopped.
    Ended,
}

/// A video decode/render surface.
///
/// Commands are applied in the order they are issued. Notifications are
/// delivered in order on the channel returned by [`RenderSurface::subscribe`].
pub trait RenderSurface: Send {
    /// Start delivering notifications. Can be called once per surface.
    fn subscribe(&mut self) -> CaptureResult<Receiver<SurfaceEvent>>;

    /// Start playback.
    fn play(&mut self);

    /// Stop playback, freezing the current frame.
    fn pause(&mut self);

    /// Move to an absolute position in seconds.
    fn seek(&mut self, seconds: f64);

    /// Change the playback speed multiplier.
    fn set_playback_rate(&mut self, rate: f64);

    /// Let the surface advance its clock. Surfaces with their own clock
    /// ignore this.
    fn tick(&mut self, _elapsed: Duration) {}

    /// Native frame dimensions, `(0, 0)` while unknown.
    fn native_dimensions(&self) -> (u32, u32);

    /// The frame currently shown at the surface's position.
    fn current_visual_frame(&mut self) -> CaptureResult<RasterFrame>;

    /// Stop notifications and free the underlying media resource.
    fn release(&mut self);

    /// Returns true once [`RenderSurface::release`] has run.
    fn is_released(&self) -> bool;
}

/// Opens render surfaces for sources.
pub trait SurfaceFactory: Send {
    /// Open a surface for the given source.
    fn open(&self, source: &SourceRef) -> CaptureResult<Box<dyn RenderSurface>>;
}
