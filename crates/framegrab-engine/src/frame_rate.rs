//! Frame rate resolution.

use framegrab_ipc::VideoInfo;

/// Frame rate assumed when neither the source nor the configuration
/// provides a usable one.
pub const DEFAULT_FRAME_RATE: f64 = 24.0;

/// The effective frame rate of the loaded source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRate {
    fps: f64,
    native: bool,
}

impl FrameRate {
    /// Resolve the rate from the source metadata, falling back to `default`.
    pub fn resolve(video_info: Option<&VideoInfo>, default: f64) -> Self {
        match video_info.and_then(|info| info.frame_rate).filter(|r| is_usable(*r)) {
            Some(fps) => Self { fps, native: true },
            None => Self {
                fps: if is_usable(default) {
                    default
                } else {
                    DEFAULT_FRAME_RATE
                },
                native: false,
            },
        }
    }

    /// Frames per second.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Returns true if the rate came from the source itself.
    pub fn is_native(&self) -> bool {
        self.native
    }

    /// Duration of one frame in seconds.
    pub fn frame_step_duration(&self) -> f64 {
        1.0 / self.fps
    }
}

fn is_usable(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}
