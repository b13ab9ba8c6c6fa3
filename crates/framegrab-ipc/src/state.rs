//! Transport state machine types.

use serde::{Deserialize, Serialize};

/// The state of the transport controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    /// No source loaded.
    #[default]
    Idle,

    /// Source loaded, playhead frozen.
    Paused,

    /// Source loaded and playing.
    Playing,
}

impl TransportState {
    /// Returns true if no source is loaded.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true if a source is loaded, playing or not.
    pub fn is_loaded(&self) -> bool {
        !self.is_idle()
    }

    /// Returns true if playback is running.
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Returns true if a source is loaded and paused.
    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Paused => "Paused",
            Self::Playing => "Playing",
        }
    }
}
