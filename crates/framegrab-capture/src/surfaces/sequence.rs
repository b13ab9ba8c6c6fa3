//! Image-sequence surface: a directory of still frames played back at a
//! fixed rate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::Receiver;
use tracing::{debug, info, instrument, warn};

use framegrab_ipc::SourceRef;

use super::{frame_index, is_usable_rate, PlaybackClock, FALLBACK_FRAME_RATE};
use crate::error::CaptureError;
use crate::frame::RasterFrame;
use crate::surface::{RenderSurface, SurfaceEvent, SurfaceFactory};
use crate::CaptureResult;

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// A render surface backed by numbered still images in one directory.
#[derive(Debug)]
pub struct SequenceSurface {
    frames: Vec<PathBuf>,
    width: u32,
    height: u32,
    frame_rate: Option<f64>,
    clock: PlaybackClock,
    cached: Option<(usize, RasterFrame)>,
}

impl SequenceSurface {
    /// Open the frames in `dir`, sorted by file name.
    ///
    /// `frame_rate` is the playback rate of the sequence; `None` plays at the
    /// fallback rate and reports no native rate.
    #[instrument(name = "sequence_open", skip_all, fields(dir = %dir.display()))]
    pub fn open(dir: &Path, frame_rate: Option<f64>) -> CaptureResult<Self> {
        if !dir.is_dir() {
            return Err(CaptureError::SourceNotFound(dir.display().to_string()));
        }

        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if is_frame_file(&path) {
                frames.push(path);
            }
        }
        frames.sort();

        let first = frames
            .first()
            .ok_or_else(|| CaptureError::EmptySequence(dir.display().to_string()))?;
        let (width, height) = image::image_dimensions(first)?;

        let frame_rate = match frame_rate {
            Some(rate) if !is_usable_rate(rate) => {
                warn!(rate, "Ignoring unusable sequence frame rate");
                None
            }
            other => other,
        };
        let rate = frame_rate.unwrap_or(FALLBACK_FRAME_RATE);
        let duration = frames.len() as f64 / rate;

        info!(
            frames = frames.len(),
            width, height, duration, "Opened image sequence"
        );

        Ok(Self {
            frames,
            width,
            height,
            frame_rate,
            clock: PlaybackClock::new(duration),
            cached: None,
        })
    }

    /// Number of frames in the sequence.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn decode(&self, index: usize) -> CaptureResult<RasterFrame> {
        let path = &self.frames[index];
        debug!(path = %path.display(), "Decoding sequence frame");

        let rgba = image::open(path)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(RasterFrame::new(Bytes::from(rgba.into_raw()), width, height))
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

impl RenderSurface for SequenceSurface {
    fn subscribe(&mut self) -> CaptureResult<Receiver<SurfaceEvent>> {
        self.clock.subscribe(SurfaceEvent::MetadataResolved {
            duration: self.clock.duration(),
            width: self.width,
            height: self.height,
            frame_rate: self.frame_rate,
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
        (self.width, self.height)
    }

    fn current_visual_frame(&mut self) -> CaptureResult<RasterFrame> {
        if self.clock.is_released() {
            return Err(CaptureError::SurfaceReleased);
        }

        let rate = self.frame_rate.unwrap_or(FALLBACK_FRAME_RATE);
        let last = self.frames.len() - 1;
        let index = (frame_index(self.clock.position(), rate) as usize).min(last);

        if let Some((cached_index, frame)) = &self.cached {
            if *cached_index == index {
                return Ok(frame.clone());
            }
        }

        let frame = self.decode(index)?;
        self.cached = Some((index, frame.clone()));
        Ok(frame)
    }

    fn release(&mut self) {
        if !self.clock.is_released() {
            debug!(frames = self.frames.len(), "Releasing image sequence");
        }
        self.cached = None;
        self.clock.release();
    }

    fn is_released(&self) -> bool {
        self.clock.is_released()
    }
}

/// Opens [`SequenceSurface`]s from source directories.
#[derive(Debug, Clone, Default)]
pub struct SequenceSurfaceFactory {
    frame_rate: Option<f64>,
}

impl SequenceSurfaceFactory {
    /// Create a factory playing sequences at `frame_rate`.
    pub fn new(frame_rate: Option<f64>) -> Self {
        Self { frame_rate }
    }
}

impl SurfaceFactory for SequenceSurfaceFactory {
    fn open(&self, source: &SourceRef) -> CaptureResult<Box<dyn RenderSurface>> {
        Ok(Box::new(SequenceSurface::open(&source.path, self.frame_rate)?))
    }
}
