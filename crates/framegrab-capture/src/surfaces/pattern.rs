//! Synthetic test-pattern surface.
//!
//! Renders a deterministic pattern that changes on every frame boundary, so
//! frame stepping and capture can be exercised without a decoder.

use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::Receiver;
use tracing::{debug, instrument};

use framegrab_ipc::SourceRef;

use super::{frame_index, is_usable_rate, PlaybackClock, FALLBACK_FRAME_RATE};
use crate::error::CaptureError;
use crate::frame::RasterFrame;
use crate::surface::{RenderSurface, SurfaceEvent, SurfaceFactory};
use crate::CaptureResult;

/// Geometry and timing of a synthetic source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternSpec {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    /// Reported frame rate; `None` mimics a source without timing metadata.
    pub frame_rate: Option<f64>,
}

impl Default for PatternSpec {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            duration: 60.0,
            frame_rate: None,
        }
    }
}

/// A render surface that draws a per-frame test pattern.
#[derive(Debug)]
pub struct PatternSurface {
    spec: PatternSpec,
    clock: PlaybackClock,
}

impl PatternSurface {
    /// Create a surface for the given spec.
    pub fn new(spec: PatternSpec) -> Self {
        Self {
            clock: PlaybackClock::new(spec.duration),
            spec,
        }
    }

    /// Current surface position in seconds.
    pub fn position(&self) -> f64 {
        self.clock.position()
    }

    /// Frame index under the current position.
    pub fn current_frame_index(&self) -> u64 {
        let rate = self
            .spec
            .frame_rate
            .filter(|r| is_usable_rate(*r))
            .unwrap_or(FALLBACK_FRAME_RATE);
        frame_index(self.clock.position(), rate)
    }

    fn render(&self, index: u64) -> Bytes {
        let PatternSpec { width, height, .. } = self.spec;
        let shift = index as u32;
        let mut data = Vec::with_capacity(RasterFrame::rgba_buffer_size(width, height));

        for y in 0..height {
            for x in 0..width {
                data.push(x.wrapping_add(shift.wrapping_mul(7)) as u8);
                data.push(y.wrapping_add(shift.wrapping_mul(3)) as u8);
                data.push((x ^ y).wrapping_add(shift.wrapping_mul(16)) as u8);
                data.push(u8::MAX);
            }
        }

        Bytes::from(data)
    }
}

impl RenderSurface for PatternSurface {
    fn subscribe(&mut self) -> CaptureResult<Receiver<SurfaceEvent>> {
        let PatternSpec {
            width,
            height,
            duration,
            frame_rate,
        } = self.spec;

        self.clock.subscribe(SurfaceEvent::MetadataResolved {
            duration,
            width,
            height,
            frame_rate,
        })
    }

    fn play(&mut self) {
        self.clock.play();
    }

    fn pause(&mut self) {
        self.clock.pause();
    }

    fn seek(&mut self, seconds: f64) {
        self.clock.seek(seconds);
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.clock.set_rate(rate);
    }

    fn tick(&mut self, elapsed: Duration) {
        self.clock.tick(elapsed);
    }

    fn native_dimensions(&self) -> (u32, u32) {
        (self.spec.width, self.spec.height)
    }

    fn current_visual_frame(&mut self) -> CaptureResult<RasterFrame> {
        if self.clock.is_released() {
            return Err(CaptureError::SurfaceReleased);
        }

        let index = self.current_frame_index();
        Ok(RasterFrame::new(
            self.render(index),
            self.spec.width,
            self.spec.height,
        ))
    }

    fn release(&mut self) {
        if !self.clock.is_released() {
            debug!("Releasing pattern surface");
        }
        self.clock.release();
    }

    fn is_released(&self) -> bool {
        self.clock.is_released()
    }
}

/// Opens [`PatternSurface`]s with a fixed spec, whatever the source.
#[derive(Debug, Clone, Default)]
pub struct PatternSurfaceFactory {
    spec: PatternSpec,
}

impl PatternSurfaceFactory {
    /// Create a factory producing surfaces with the given spec.
    pub fn new(spec: PatternSpec) -> Self {
        Self { spec }
    }
}

impl SurfaceFactory for PatternSurfaceFactory {
    #[instrument(name = "pattern_open", skip_all, fields(file = %source.file_name))]
    fn open(&self, source: &SourceRef) -> CaptureResult<Box<dyn RenderSurface>> {
        debug!(spec = ?self.spec, "Opening pattern surface");
        Ok(Box::new(PatternSurface::new(self.spec)))
    }
}
