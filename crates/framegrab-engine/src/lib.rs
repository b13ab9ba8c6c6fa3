//! Transport control and capture orchestration for framegrab.
//!
//! This crate owns the playhead: it drives a render surface through seeks,
//! frame steps and rate changes, and turns the frozen frame into a capture
//! session for the persistence stage.

mod editor;
mod error;
mod frame_rate;
mod keyboard;
mod transport;

pub use editor::Editor;
pub use error::EngineError;
pub use frame_rate::{FrameRate, DEFAULT_FRAME_RATE};
pub use keyboard::{route_key, KeyAction, KeyOutcome};
pub use transport::TransportController;

use crossbeam_channel::{Receiver, Sender};
use framegrab_capture::{CaptureSink, SurfaceFactory};
use framegrab_ipc::{EditorCommand, EditorConfig, EditorEvent};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Create an editor instance wired to IPC channels.
pub fn create_editor(
    command_rx: Receiver<EditorCommand>,
    event_tx: Sender<EditorEvent>,
    factory: Box<dyn SurfaceFactory>,
    sink: Box<dyn CaptureSink>,
    config: EditorConfig,
) -> Editor {
    Editor::new(command_rx, event_tx, factory, sink, config)
}
