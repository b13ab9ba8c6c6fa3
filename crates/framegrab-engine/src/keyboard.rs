//! Keyboard shortcuts.

use framegrab_ipc::{EditorCommand, Key, KeyPress, PlayheadState};

/// What a claimed key asks the editor to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    TogglePlayPause,
    StepBackward,
    SkipBackward,
    StepForward,
    SkipForward,
    Capture,
}

impl KeyAction {
    /// The editor command carrying out this action.
    pub fn to_command(self) -> EditorCommand {
        match self {
            Self::TogglePlayPause => EditorCommand::TogglePlayPause,
            Self::StepBackward => EditorCommand::StepBackward,
            Self::SkipBackward => EditorCommand::SkipBackward,
            Self::StepForward => EditorCommand::StepForward,
            Self::SkipForward => EditorCommand::SkipForward,
            Self::Capture => EditorCommand::Capture,
        }
    }
}

/// Result of routing a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyOutcome {
    /// Action to dispatch, if any.
    pub action: Option<KeyAction>,

    /// Whether the front end should suppress its own handling of the key.
    pub prevent_default: bool,
}

impl KeyOutcome {
    fn claimed(action: Option<KeyAction>) -> Self {
        Self {
            action,
            prevent_default: true,
        }
    }

    fn unclaimed() -> Self {
        Self {
            action: None,
            prevent_default: false,
        }
    }
}

/// Map a key press to an editor action.
///
/// Capture is only dispatched while paused; the key stays claimed either way.
pub fn route_key(press: KeyPress, playhead: &PlayheadState) -> KeyOutcome {
    match press.key {
        Key::Space => KeyOutcome::claimed(Some(KeyAction::TogglePlayPause)),
        Key::ArrowLeft if press.shift => KeyOutcome::claimed(Some(KeyAction::SkipBackward)),
        Key::ArrowLeft => KeyOutcome::claimed(Some(KeyAction::StepBackward)),
        Key::ArrowRight if press.shift => KeyOutcome::claimed(Some(KeyAction::SkipForward)),
        Key::ArrowRight => KeyOutcome::claimed(Some(KeyAction::StepForward)),
        Key::Char('c' | 'C') => {
            let action = (!playhead.is_playing).then_some(KeyAction::Capture);
            KeyOutcome::claimed(action)
        }
        Key::Char(_) => KeyOutcome::unclaimed(),
    }
}
