//! Typed front end <-> editor messages for framegrab.
//!
//! This crate defines the message types exchanged between a front end
//! (the command-line app, or any UI) and the editor core, plus the small
//! value types both sides share.

mod commands;
mod events;
mod state;
mod timecode;
mod types;

pub use commands::EditorCommand;
pub use events::EditorEvent;
pub use state::TransportState;
pub use timecode::{format_timestamp, parse_timestamp, TimecodeError};
pub use types::{
    CaptureMetadata, EditorConfig, Key, KeyPress, PlayheadState, SavedCapture, SourceRef,
    VideoInfo,
};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for commands (front end → editor).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Channel capacity for events (editor → front end).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<EditorCommand>, Receiver<EditorCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<EditorEvent>, Receiver<EditorEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
