//! Built-in render surfaces.

pub mod pattern;
pub mod sequence;

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use crate::error::CaptureError;
use crate::surface::SurfaceEvent;
use crate::{CaptureResult, NOTIFICATION_CHANNEL_CAPACITY};

/// Frame rate used to map time to frames when a source has none.
pub(crate) const FALLBACK_FRAME_RATE: f64 = 24.0;

/// Guards against `n * (1/fps)` landing just below frame `n`.
const FRAME_EPSILON: f64 = 1e-6;

/// Returns true if `rate` can be used as frames per second.
pub(crate) fn is_usable_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// Map a position in seconds to a frame index.
pub(crate) fn frame_index(position: f64, frame_rate: f64) -> u64 {
    (position.max(0.0) * frame_rate + FRAME_EPSILON).floor() as u64
}

/// Software playback clock shared by the built-in surfaces.
#[derive(Debug)]
pub(crate) struct PlaybackClock {
    position: f64,
    duration: f64,
    playing: bool,
    rate: f64,
    events_tx: Option<Sender<SurfaceEvent>>,
    subscribed: bool,
    released: bool,
}

impl PlaybackClock {
    /// Create a paused clock. A negative or non-finite duration becomes 0.
    pub(crate) fn new(duration: f64) -> Self {
        let duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };

        Self {
            position: 0.0,
            duration,
            playing: false,
            rate: 1.0,
            events_tx: None,
            subscribed: false,
            released: false,
        }
    }

    pub(crate) fn position(&self) -> f64 {
        self.position
    }

    pub(crate) fn duration(&self) -> f64 {
        self.duration
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released
    }

    /// Open the notification channel, queueing `initial` first.
    pub(crate) fn subscribe(
        &mut self,
        initial: SurfaceEvent,
    ) -> CaptureResult<Receiver<SurfaceEvent>> {
        if self.released {
            return Err(CaptureError::SurfaceReleased);
        }
        if self.subscribed {
            return Err(CaptureError::AlreadySubscribed);
        }

        let (tx, rx) = crossbeam_channel::bounded(NOTIFICATION_CHANNEL_CAPACITY);
        self.events_tx = Some(tx);
        self.subscribed = true;
        self.emit(initial);
        Ok(rx)
    }

    pub(crate) fn play(&mut self) {
        if !self.released && self.position < self.duration {
            self.playing = true;
        }
    }

    pub(crate) fn pause(&mut self) {
        self.playing = false;
    }

    pub(crate) fn seek(&mut self, seconds: f64) {
        self.position = seconds.clamp(0.0, self.duration);
    }

    pub(crate) fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    pub(crate) fn tick(&mut self, elapsed: Duration) {
        if !self.playing || self.released {
            return;
        }

        self.position += elapsed.as_secs_f64() * self.rate;
        if self.position >= self.duration {
            self.position = self.duration;
            self.playing = false;
            self.emit(SurfaceEvent::TimeAdvanced(self.position));
            self.emit(SurfaceEvent::Ended);
        } else {
            self.emit(SurfaceEvent::TimeAdvanced(self.position));
        }
    }

    pub(crate) fn release(&mut self) {
        if self.released {
            return;
        }
        self.playing = false;
        self.events_tx = None;
        self.released = true;
    }

    fn emit(&self, event: SurfaceEvent) {
        let Some(tx) = &self.events_tx else {
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!(?event, "Surface notification dropped"),
            Err(TrySendError::Disconnected(_)) => debug!("Surface notification receiver gone"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_index_survives_accumulated_steps() {
        let step = 1.0 / 30.0;
        let mut position = 0.0;
        for n in 1..=90u64 {
            position += step;
            assert_eq!(frame_index(position, 30.0), n);
        }
    }

    #[test]
    fn test_clock_tick_reaches_end() {
        let mut clock = PlaybackClock::new(1.0);
        let rx = clock
            .subscribe(SurfaceEvent::TimeAdvanced(0.0))
            .unwrap();
        clock.play();
        clock.tick(Duration::from_millis(600));
        clock.tick(Duration::from_millis(600));

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                SurfaceEvent::TimeAdvanced(0.0),
                SurfaceEvent::TimeAdvanced(0.6),
                SurfaceEvent::TimeAdvanced(1.0),
                SurfaceEvent::Ended,
            ]
        );
        assert_eq!(clock.position(), 1.0);
    }

    #[test]
    fn test_clock_rate_scales_ticks() {
        let mut clock = PlaybackClock::new(10.0);
        clock.set_rate(2.0);
        clock.play();
        clock.tick(Duration::from_millis(500));
        assert!((clock.position() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_clock_paused_does_not_advance() {
        let mut clock = PlaybackClock::new(10.0);
        clock.tick(Duration::from_secs(1));
        assert_eq!(clock.position(), 0.0);
    }

    #[test]
    fn test_clock_release_disconnects() {
        let mut clock = PlaybackClock::new(10.0);
        let rx = clock.subscribe(SurfaceEvent::Ended).unwrap();
        clock.release();
        assert_eq!(rx.try_recv(), Ok(SurfaceEvent::Ended));
        assert!(rx.recv().is_err());
        assert!(matches!(
            clock.subscribe(SurfaceEvent::Ended),
            Err(CaptureError::SurfaceReleased)
        ));
    }

    #[test]
    fn test_clock_keeps_duration_usable() {
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let mut clock = PlaybackClock::new(bad);
            assert_eq!(clock.duration(), 0.0);
            clock.seek(5.0);
            assert_eq!(clock.position(), 0.0);
        }
    }
}
