//! Playhead ownership and transport commands.

use std::time::Duration;

use crossbeam_channel::Receiver;
use tracing::{debug, info, instrument, warn};

use framegrab_capture::{
    capture_frame, CaptureSession, EncodedImage, RenderSurface, SurfaceEvent,
};
use framegrab_ipc::{EditorConfig, PlayheadState, SourceRef, TransportState, VideoInfo};

use crate::error::EngineError;
use crate::frame_rate::FrameRate;
use crate::EngineResult;

/// Drives one render surface and owns its playhead.
///
/// Every seek clamps to `[0, duration]`; the playback rate is always
/// positive. Ejecting releases the surface exactly once.
pub struct TransportController {
    config: EditorConfig,
    state: TransportState,
    playhead: PlayheadState,
    source: Option<SourceRef>,
    video_info: Option<VideoInfo>,
    surface: Option<Box<dyn RenderSurface>>,
    notifications: Option<Receiver<SurfaceEvent>>,
}

impl TransportController {
    /// Create an idle controller.
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            state: TransportState::Idle,
            playhead: PlayheadState::default(),
            source: None,
            video_info: None,
            surface: None,
            notifications: None,
        }
    }

    /// Current transport state.
    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Current playhead.
    pub fn playhead(&self) -> PlayheadState {
        self.playhead
    }

    /// Metadata of the loaded source.
    pub fn video_info(&self) -> Option<&VideoInfo> {
        self.video_info.as_ref()
    }

    /// The loaded source.
    pub fn source(&self) -> Option<&SourceRef> {
        self.source.as_ref()
    }

    /// Effective frame rate, recomputed from the current metadata.
    pub fn frame_rate(&self) -> FrameRate {
        FrameRate::resolve(self.video_info.as_ref(), self.config.default_frame_rate)
    }

    /// Notification channel of the loaded surface.
    pub fn notifications(&self) -> Option<Receiver<SurfaceEvent>> {
        self.notifications.clone()
    }

    /// Load a source on a freshly opened surface, replacing any loaded one.
    #[instrument(name = "load_source", skip_all, fields(file = %source.file_name))]
    pub fn load_source(
        &mut self,
        source: SourceRef,
        mut surface: Box<dyn RenderSurface>,
    ) -> EngineResult<()> {
        if self.state.is_loaded() {
            self.eject();
        }

        let notifications = match surface.subscribe() {
            Ok(rx) => rx,
            Err(e) => {
                surface.release();
                return Err(e.into());
            }
        };

        info!("Source loaded");
        self.video_info = Some(VideoInfo::pending(source.file_name.clone()));
        self.source = Some(source);
        self.surface = Some(surface);
        self.notifications = Some(notifications);
        self.playhead = PlayheadState::default();
        self.state = TransportState::Paused;
        Ok(())
    }

    /// Record native metadata reported by the surface.
    pub fn metadata_resolved(
        &mut self,
        duration: f64,
        width: u32,
        height: u32,
        frame_rate: Option<f64>,
    ) {
        let Some(info) = self.video_info.as_mut() else {
            return;
        };

        let duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };

        info.duration = duration;
        info.width = width;
        info.height = height;
        info.frame_rate = frame_rate.filter(|r| r.is_finite() && *r > 0.0);

        self.playhead.duration = duration;
        self.playhead.current_time = self.playhead.current_time.clamp(0.0, duration);

        debug!(duration, width, height, ?frame_rate, "Metadata resolved");
    }

    /// Apply one notification from the surface.
    pub fn apply_surface_event(&mut self, event: SurfaceEvent) {
        if self.state.is_idle() {
            return;
        }

        match event {
            SurfaceEvent::MetadataResolved {
                duration,
                width,
                height,
                frame_rate,
            } => self.metadata_resolved(duration, width, height, frame_rate),
            SurfaceEvent::TimeAdvanced(seconds) => {
                if seconds.is_finite() {
                    self.playhead.current_time = seconds.clamp(0.0, self.playhead.duration);
                }
            }
            SurfaceEvent::Ended => {
                if self.state.is_playing() {
                    debug!("Playback reached the end");
                    self.state = TransportState::Paused;
                    self.playhead.is_playing = false;
                }
            }
        }
    }

    /// Apply every notification already queued by the surface.
    pub fn pump(&mut self) -> usize {
        let Some(rx) = self.notifications.clone() else {
            return 0;
        };

        let mut applied = 0;
        for event in rx.try_iter() {
            self.apply_surface_event(event);
            applied += 1;
        }
        applied
    }

    /// Forget a notification channel whose sender has gone away.
    pub fn notifications_closed(&mut self) {
        if self.notifications.take().is_some() {
            warn!("Surface stopped sending notifications");
        }
    }

    /// Let the surface advance its clock.
    pub fn tick(&mut self, elapsed: Duration) {
        if let Some(surface) = self.surface.as_mut() {
            surface.tick(elapsed);
        }
    }

    /// Start playback. No-op unless loaded and paused.
    pub fn play(&mut self) {
        if !self.state.is_paused() {
            return;
        }

        // Playing from the very end restarts from the beginning
        if self.playhead.duration > 0.0 && self.playhead.current_time >= self.playhead.duration {
            self.seek(0.0);
        }

        if let Some(surface) = self.surface.as_mut() {
            surface.play();
        }
        self.state = TransportState::Playing;
        self.playhead.is_playing = true;
    }

    /// Pause playback. No-op unless playing.
    pub fn pause(&mut self) {
        if !self.state.is_playing() {
            return;
        }

        if let Some(surface) = self.surface.as_mut() {
            surface.pause();
        }
        self.state = TransportState::Paused;
        self.playhead.is_playing = false;
    }

    /// Play if paused, pause if playing.
    pub fn toggle_play_pause(&mut self) {
        if self.state.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move the playhead to `target`, clamped to `[0, duration]`.
    pub fn seek(&mut self, target: f64) {
        if self.state.is_idle() || target.is_nan() {
            return;
        }

        let clamped = target.clamp(0.0, self.playhead.duration);
        if let Some(surface) = self.surface.as_mut() {
            surface.seek(clamped);
        }
        self.playhead.current_time = clamped;
    }

    /// Advance exactly one frame.
    pub fn step_forward(&mut self) {
        let step = self.frame_rate().frame_step_duration();
        self.seek(self.playhead.current_time + step);
    }

    /// Go back exactly one frame.
    pub fn step_backward(&mut self) {
        let step = self.frame_rate().frame_step_duration();
        self.seek(self.playhead.current_time - step);
    }

    /// Jump forward by the skip interval.
    pub fn skip_forward(&mut self) {
        self.seek(self.playhead.current_time + self.config.skip_interval_secs);
    }

    /// Jump backward by the skip interval.
    pub fn skip_backward(&mut self) {
        self.seek(self.playhead.current_time - self.config.skip_interval_secs);
    }

    /// Change the playback speed. Play state and position are untouched.
    pub fn set_playback_rate(&mut self, rate: f64) -> EngineResult<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(EngineError::InvalidPlaybackRate(rate));
        }
        if self.state.is_idle() {
            return Ok(());
        }

        if let Some(surface) = self.surface.as_mut() {
            surface.set_playback_rate(rate);
        }
        self.playhead.playback_rate = rate;
        Ok(())
    }

    /// Hold-to-scan fast forward.
    pub fn fast_forward(&mut self) -> EngineResult<()> {
        self.set_playback_rate(self.config.fast_forward_rate)
    }

    /// Hold-to-scan slow rewind.
    pub fn rewind(&mut self) -> EngineResult<()> {
        self.set_playback_rate(self.config.rewind_rate)
    }

    /// Restore normal speed.
    pub fn reset_playback_rate(&mut self) {
        // 1.0 always passes validation
        let _ = self.set_playback_rate(1.0);
    }

    /// Encode the frame under the playhead, pausing first if playing.
    pub fn capture_frame(&mut self) -> EngineResult<EncodedImage> {
        if self.state.is_idle() {
            return Err(EngineError::NoSource);
        }
        if self.state.is_playing() {
            debug!("Pausing before capture");
            self.pause();
        }
        self.pump();

        let (Some(surface), Some(info)) = (self.surface.as_mut(), self.video_info.as_ref()) else {
            return Err(EngineError::NoSource);
        };
        Ok(capture_frame(&mut **surface, info)?)
    }

    /// Capture the frozen frame and bundle it into a session.
    pub fn capture_session(&mut self) -> EngineResult<CaptureSession> {
        let image = self.capture_frame()?;
        let info = self.video_info.clone().ok_or(EngineError::NoSource)?;
        Ok(CaptureSession::assemble(
            image,
            self.playhead.current_time,
            info,
        )?)
    }

    /// Unload the source and release its surface.
    #[instrument(name = "eject", skip(self))]
    pub fn eject(&mut self) {
        // Stop listening before the surface goes away
        self.notifications = None;

        if let Some(mut surface) = self.surface.take() {
            surface.release();
            info!("Source ejected");
        }

        self.source = None;
        self.video_info = None;
        self.playhead = PlayheadState::default();
        self.state = TransportState::Idle;
    }
}

impl Drop for TransportController {
    fn drop(&mut self) {
        self.eject();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use framegrab_capture::{CaptureError, PatternSpec, PatternSurface, RasterFrame};

    const EPS: f64 = 1e-9;

    fn spec(frame_rate: Option<f64>) -> PatternSpec {
        PatternSpec {
            width: 16,
            height: 9,
            duration: 100.0,
            frame_rate,
        }
    }

    fn loaded(frame_rate: Option<f64>) -> TransportController {
        let mut controller = TransportController::new(EditorConfig::default());
        controller
            .load_source(
                SourceRef::from_path("/videos/heat.mp4"),
                Box::new(PatternSurface::new(spec(frame_rate))),
            )
            .unwrap();
        controller.pump();
        controller
    }

    /// Counts releases so leaks and double releases show up.
    struct CountingSurface {
        inner: PatternSurface,
        releases: Arc<AtomicUsize>,
    }

    impl RenderSurface for CountingSurface {
        fn subscribe(&mut self) -> framegrab_capture::CaptureResult<Receiver<SurfaceEvent>> {
            self.inner.subscribe()
        }
        fn play(&mut self) {
            self.inner.play()
        }
        fn pause(&mut self) {
            self.inner.pause()
        }
        fn seek(&mut self, seconds: f64) {
            self.inner.seek(seconds)
        }
        fn set_playback_rate(&mut self, rate: f64) {
            self.inner.set_playback_rate(rate)
        }
        fn tick(&mut self, elapsed: Duration) {
            self.inner.tick(elapsed)
        }
        fn native_dimensions(&self) -> (u32, u32) {
            self.inner.native_dimensions()
        }
        fn current_visual_frame(&mut self) -> framegrab_capture::CaptureResult<RasterFrame> {
            self.inner.current_visual_frame()
        }
        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
            self.inner.release()
        }
        fn is_released(&self) -> bool {
            self.inner.is_released()
        }
    }

    #[test]
    fn test_load_starts_paused_with_pending_metadata() {
        let mut controller = TransportController::new(EditorConfig::default());
        controller
            .load_source(
                SourceRef::from_path("/videos/heat.mp4"),
                Box::new(PatternSurface::new(spec(None))),
            )
            .unwrap();

        assert_eq!(controller.state(), TransportState::Paused);
        assert_eq!(controller.playhead(), PlayheadState::default());
        assert!(!controller.video_info().unwrap().has_dimensions());

        assert_eq!(controller.pump(), 1);
        let info = controller.video_info().unwrap();
        assert_eq!((info.width, info.height), (16, 9));
        assert_eq!(controller.playhead().duration, 100.0);
        assert!(!controller.playhead().is_playing);
    }

    #[test]
    fn test_seek_clamps() {
        let mut controller = loaded(None);

        controller.seek(150.0);
        assert_eq!(controller.playhead().current_time, 100.0);

        controller.seek(-5.0);
        assert_eq!(controller.playhead().current_time, 0.0);

        controller.seek(42.5);
        assert_eq!(controller.playhead().current_time, 42.5);
    }

    #[test]
    fn test_seek_before_metadata_clamps_to_zero() {
        let mut controller = TransportController::new(EditorConfig::default());
        controller
            .load_source(
                SourceRef::from_path("/videos/heat.mp4"),
                Box::new(PatternSurface::new(spec(None))),
            )
            .unwrap();

        controller.seek(10.0);
        assert_eq!(controller.playhead().current_time, 0.0);
    }

    #[test]
    fn test_idle_ignores_transport_commands() {
        let mut controller = TransportController::new(EditorConfig::default());
        controller.seek(10.0);
        controller.play();
        controller.step_forward();
        controller.set_playback_rate(2.0).unwrap();

        assert_eq!(controller.state(), TransportState::Idle);
        assert_eq!(controller.playhead(), PlayheadState::default());
        assert!(matches!(controller.capture_frame(), Err(EngineError::NoSource)));
    }

    #[test]
    fn test_step_forward_accumulates_frames() {
        let mut controller = loaded(Some(30.0));
        controller.seek(10.0);

        for _ in 0..45 {
            controller.step_forward();
        }
        let expected = 10.0 + 45.0 / 30.0;
        assert!((controller.playhead().current_time - expected).abs() < 1e-6);
    }

    #[test]
    fn test_step_clamps_at_bounds() {
        let mut controller = loaded(Some(30.0));
        controller.step_backward();
        assert_eq!(controller.playhead().current_time, 0.0);

        controller.seek(100.0);
        controller.step_forward();
        assert_eq!(controller.playhead().current_time, 100.0);
    }

    #[test]
    fn test_default_step_then_native_rate() {
        let mut controller = TransportController::new(EditorConfig::default());
        controller
            .load_source(
                SourceRef::from_path("/videos/heat.mp4"),
                Box::new(PatternSurface::new(spec(None))),
            )
            .unwrap();

        controller.metadata_resolved(100.0, 16, 9, None);
        assert!((controller.frame_rate().frame_step_duration() - 1.0 / 24.0).abs() < EPS);
        controller.step_forward();
        assert!((controller.playhead().current_time - 1.0 / 24.0).abs() < EPS);

        controller.metadata_resolved(100.0, 16, 9, Some(30.0));
        controller.step_forward();
        let expected = 1.0 / 24.0 + 1.0 / 30.0;
        assert!((controller.playhead().current_time - expected).abs() < EPS);
    }

    #[test]
    fn test_skip_uses_ten_seconds() {
        let mut controller = loaded(None);
        controller.seek(50.0);
        controller.skip_forward();
        assert_eq!(controller.playhead().current_time, 60.0);
        controller.skip_backward();
        controller.skip_backward();
        assert_eq!(controller.playhead().current_time, 40.0);

        controller.seek(5.0);
        controller.skip_backward();
        assert_eq!(controller.playhead().current_time, 0.0);
    }

    #[test]
    fn test_play_pause_transitions() {
        let mut controller = loaded(None);

        controller.pause();
        assert_eq!(controller.state(), TransportState::Paused);

        controller.play();
        assert_eq!(controller.state(), TransportState::Playing);
        assert!(controller.playhead().is_playing);

        controller.play();
        assert_eq!(controller.state(), TransportState::Playing);

        controller.toggle_play_pause();
        assert_eq!(controller.state(), TransportState::Paused);
        assert!(!controller.playhead().is_playing);
    }

    #[test]
    fn test_playback_rate_does_not_touch_play_state() {
        let mut controller = loaded(None);
        controller.seek(12.0);

        controller.fast_forward().unwrap();
        assert_eq!(controller.playhead().playback_rate, 2.0);
        assert_eq!(controller.state(), TransportState::Paused);
        assert_eq!(controller.playhead().current_time, 12.0);

        controller.rewind().unwrap();
        assert_eq!(controller.playhead().playback_rate, 0.5);

        controller.reset_playback_rate();
        assert_eq!(controller.playhead().playback_rate, 1.0);

        assert!(matches!(
            controller.set_playback_rate(0.0),
            Err(EngineError::InvalidPlaybackRate(_))
        ));
        assert!(controller.set_playback_rate(f64::NAN).is_err());
        assert_eq!(controller.playhead().playback_rate, 1.0);
    }

    #[test]
    fn test_time_advances_while_playing() {
        let mut controller = loaded(None);
        controller.set_playback_rate(2.0).unwrap();
        controller.play();
        controller.tick(Duration::from_millis(500));
        controller.pump();
        assert!((controller.playhead().current_time - 1.0).abs() < EPS);

        controller.pause();
        controller.tick(Duration::from_millis(500));
        controller.pump();
        assert!((controller.playhead().current_time - 1.0).abs() < EPS);
    }

    #[test]
    fn test_late_notification_is_clamped() {
        let mut controller = loaded(None);
        controller.apply_surface_event(SurfaceEvent::TimeAdvanced(250.0));
        assert_eq!(controller.playhead().current_time, 100.0);
    }

    #[test]
    fn test_end_of_playback_pauses() {
        let mut controller = loaded(None);
        controller.seek(99.5);
        controller.play();
        controller.tick(Duration::from_secs(1));
        controller.pump();

        assert_eq!(controller.state(), TransportState::Paused);
        assert_eq!(controller.playhead().current_time, 100.0);

        // Playing again restarts from the top
        controller.play();
        assert_eq!(controller.playhead().current_time, 0.0);
        assert_eq!(controller.state(), TransportState::Playing);
    }

    #[test]
    fn test_capture_pauses_and_is_deterministic() {
        let mut controller = loaded(None);
        controller.seek(3.0);
        controller.play();

        let first = controller.capture_frame().unwrap();
        assert_eq!(controller.state(), TransportState::Paused);

        let second = controller.capture_frame().unwrap();
        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn test_capture_before_metadata_fails() {
        let mut controller = TransportController::new(EditorConfig::default());
        controller
            .load_source(
                SourceRef::from_path("/videos/heat.mp4"),
                Box::new(PatternSurface::new(PatternSpec {
                    width: 0,
                    height: 0,
                    ..spec(None)
                })),
            )
            .unwrap();
        controller.pump();

        let err = controller.capture_frame().unwrap_err();
        assert!(matches!(
            err,
            EngineError::Capture(CaptureError::MetadataUnavailable { .. })
        ));
    }

    #[test]
    fn test_capture_session_snapshots_playhead() {
        let mut controller = loaded(Some(25.0));
        controller.seek(3725.0);
        controller.seek(61.2);

        let session = controller.capture_session().unwrap();
        assert_eq!(session.timestamp(), 61.2);
        assert_eq!(session.video_info().file_name, "heat.mp4");
        assert_eq!(session.video_info().frame_rate, Some(25.0));
    }

    #[test]
    fn test_eject_then_load_resets() {
        let mut controller = loaded(None);
        controller.seek(40.0);
        controller.set_playback_rate(2.0).unwrap();
        controller.play();

        controller.eject();
        assert_eq!(controller.state(), TransportState::Idle);
        assert!(controller.video_info().is_none());
        assert!(controller.notifications().is_none());

        controller
            .load_source(
                SourceRef::from_path("/videos/ronin.mp4"),
                Box::new(PatternSurface::new(spec(None))),
            )
            .unwrap();
        assert_eq!(controller.playhead(), PlayheadState::default());
        assert_eq!(controller.video_info().unwrap().file_name, "ronin.mp4");
    }

    #[test]
    fn test_surface_released_exactly_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut controller = TransportController::new(EditorConfig::default());
        controller
            .load_source(
                SourceRef::from_path("/videos/heat.mp4"),
                Box::new(CountingSurface {
                    inner: PatternSurface::new(spec(None)),
                    releases: Arc::clone(&releases),
                }),
            )
            .unwrap();

        // Replacing the source releases the old surface
        controller
            .load_source(
                SourceRef::from_path("/videos/ronin.mp4"),
                Box::new(PatternSurface::new(spec(None))),
            )
            .unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        controller.eject();
        controller.eject();
        drop(controller);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_notifications_ignored_after_eject() {
        let mut controller = loaded(None);
        controller.eject();
        controller.apply_surface_event(SurfaceEvent::TimeAdvanced(5.0));
        assert_eq!(controller.playhead(), PlayheadState::default());
    }
}
