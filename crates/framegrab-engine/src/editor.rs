//! Main editor loop.

use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};
use tracing::{debug, info, instrument, warn};

use framegrab_capture::{CaptureSession, CaptureSink, SurfaceEvent, SurfaceFactory};
use framegrab_ipc::{
    CaptureMetadata, EditorCommand, EditorConfig, EditorEvent, PlayheadState, SourceRef,
    TransportState,
};

use crate::error::EngineError;
use crate::keyboard::route_key;
use crate::transport::TransportController;
use crate::EngineResult;

/// One editing session: a transport controller, the pending capture and
/// the hooks that persist it.
///
/// Everything runs on the thread calling [`Editor::run`]; commands and
/// surface notifications are applied one at a time in arrival order.
pub struct Editor {
    command_rx: Receiver<EditorCommand>,
    event_tx: Sender<EditorEvent>,
    config: EditorConfig,
    transport: TransportController,
    factory: Box<dyn SurfaceFactory>,
    sink: Box<dyn CaptureSink>,
    pending: Option<CaptureSession>,
    last_tick: Instant,
}

impl Editor {
    /// Create a new editor.
    pub fn new(
        command_rx: Receiver<EditorCommand>,
        event_tx: Sender<EditorEvent>,
        factory: Box<dyn SurfaceFactory>,
        sink: Box<dyn CaptureSink>,
        config: EditorConfig,
    ) -> Self {
        Self {
            command_rx,
            event_tx,
            transport: TransportController::new(config.clone()),
            config,
            factory,
            sink,
            pending: None,
            last_tick: Instant::now(),
        }
    }

    /// The transport controller.
    pub fn transport(&self) -> &TransportController {
        &self.transport
    }

    /// The capture waiting for metadata, if any.
    pub fn pending_capture(&self) -> Option<&CaptureSession> {
        self.pending.as_ref()
    }

    /// Run the editor (blocking) until shutdown or until the command
    /// channel closes.
    #[instrument(name = "editor_run", skip(self))]
    pub fn run(&mut self) {
        info!("Editor starting");
        self.send_event(EditorEvent::Ready);

        let ticker = crossbeam_channel::tick(Duration::from_millis(
            self.config.tick_interval_ms.max(1),
        ));
        self.last_tick = Instant::now();

        loop {
            let notifications = self
                .transport
                .notifications()
                .unwrap_or_else(crossbeam_channel::never);

            select! {
                recv(self.command_rx) -> command => match command {
                    Ok(command) => {
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    Err(_) => {
                        info!("Command channel disconnected, shutting down");
                        self.transport.eject();
                        break;
                    }
                },
                recv(notifications) -> event => match event {
                    Ok(event) => self.handle_surface_event(event),
                    Err(_) => self.transport.notifications_closed(),
                },
                recv(ticker) -> _ => self.tick(),
            }
        }

        info!("Editor stopped");
    }

    /// Handle a command. Returns false if the editor should stop.
    fn handle_command(&mut self, command: EditorCommand) -> bool {
        debug!(?command, "Handling command");
        self.drain_notifications();

        let before = (self.transport.state(), self.transport.playhead());

        let result = match command {
            EditorCommand::LoadSource { source } => self.load_source(source),
            EditorCommand::Eject => {
                self.transport.eject();
                Ok(())
            }
            EditorCommand::Play => {
                self.transport.play();
                Ok(())
            }
            EditorCommand::Pause => {
                self.transport.pause();
                Ok(())
            }
            EditorCommand::TogglePlayPause => {
                self.transport.toggle_play_pause();
                Ok(())
            }
            EditorCommand::Seek(seconds) => {
                self.transport.seek(seconds);
                Ok(())
            }
            EditorCommand::StepForward => {
                self.transport.step_forward();
                Ok(())
            }
            EditorCommand::StepBackward => {
                self.transport.step_backward();
                Ok(())
            }
            EditorCommand::SkipForward => {
                self.transport.skip_forward();
                Ok(())
            }
            EditorCommand::SkipBackward => {
                self.transport.skip_backward();
                Ok(())
            }
            EditorCommand::SetPlaybackRate(rate) => self.transport.set_playback_rate(rate),
            EditorCommand::FastForward => self.transport.fast_forward(),
            EditorCommand::Rewind => self.transport.rewind(),
            EditorCommand::ResetPlaybackRate => {
                self.transport.reset_playback_rate();
                Ok(())
            }
            EditorCommand::Capture => self.capture(),
            EditorCommand::KeyPress(press) => {
                let outcome = route_key(press, &self.transport.playhead());
                match outcome.action {
                    Some(action) => return self.handle_command(action.to_command()),
                    None => Ok(()),
                }
            }
            EditorCommand::SaveCapture { metadata } => self.save_capture(metadata),
            EditorCommand::CancelCapture => self.cancel_capture(),
            EditorCommand::GetState => {
                self.send_state();
                Ok(())
            }
            EditorCommand::Shutdown => {
                self.transport.eject();
                self.publish_changes(before);
                self.send_event(EditorEvent::Shutdown);
                return false;
            }
        };

        if let Err(e) = result {
            self.report(e);
        }
        self.publish_changes(before);

        // Surfaces report metadata as soon as they are subscribed
        self.drain_notifications();
        true
    }

    fn drain_notifications(&mut self) {
        let Some(notifications) = self.transport.notifications() else {
            return;
        };
        while let Ok(event) = notifications.try_recv() {
            self.handle_surface_event(event);
        }
    }

    fn handle_surface_event(&mut self, event: SurfaceEvent) {
        let before = (self.transport.state(), self.transport.playhead());
        self.transport.apply_surface_event(event);

        if matches!(event, SurfaceEvent::MetadataResolved { .. }) {
            if let Some(info) = self.transport.video_info() {
                self.send_event(EditorEvent::MetadataResolved(info.clone()));
            }
        }
        self.publish_changes(before);
    }

    fn tick(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;

        if self.transport.state().is_playing() {
            self.transport.tick(elapsed);
        }
    }

    fn load_source(&mut self, source: SourceRef) -> EngineResult<()> {
        let surface = self.factory.open(&source)?;
        self.transport.load_source(source, surface)
    }

    #[instrument(name = "capture", skip(self))]
    fn capture(&mut self) -> EngineResult<()> {
        if self.pending.is_some() {
            return Err(EngineError::CapturePending);
        }

        let session = self.transport.capture_session()?;
        info!(
            timestamp = %session.display_timestamp(),
            bytes = session.image().len(),
            "Frame captured"
        );

        self.send_event(EditorEvent::CaptureReady {
            timestamp: session.timestamp(),
            video_info: session.video_info().clone(),
            image_len: session.image().len(),
        });
        self.pending = Some(session);
        Ok(())
    }

    #[instrument(name = "save_capture", skip_all)]
    fn save_capture(&mut self, metadata: CaptureMetadata) -> EngineResult<()> {
        let session = self.pending.as_ref().ok_or(EngineError::NoPendingCapture)?;

        // On failure the session stays pending for a retry
        let saved = self.sink.on_save(session, &metadata)?;
        info!(id = %saved.id, movie = %saved.movie_name, "Capture saved");

        self.pending = None;
        self.send_event(EditorEvent::CaptureSaved(saved));
        Ok(())
    }

    fn cancel_capture(&mut self) -> EngineResult<()> {
        let session = self.pending.take().ok_or(EngineError::NoPendingCapture)?;
        self.sink.on_cancel(&session);
        session.discard();
        self.send_event(EditorEvent::CaptureDiscarded);
        Ok(())
    }

    fn send_state(&self) {
        let state = self.transport.state();
        self.send_event(EditorEvent::StateChanged {
            previous: state,
            current: state,
        });
        self.send_event(EditorEvent::Playhead(self.transport.playhead()));
    }

    fn publish_changes(&self, before: (TransportState, PlayheadState)) {
        let (previous_state, previous_playhead) = before;
        let current_state = self.transport.state();

        if previous_state != current_state {
            debug!(
                previous = %previous_state.name(),
                current = %current_state.name(),
                "State transition"
            );
            self.send_event(EditorEvent::StateChanged {
                previous: previous_state,
                current: current_state,
            });
        }

        let playhead = self.transport.playhead();
        if playhead != previous_playhead {
            self.send_event(EditorEvent::Playhead(playhead));
        }
    }

    fn report(&self, error: EngineError) {
        warn!(%error, "Command failed");
        self.send_event(EditorEvent::Error {
            recoverable: true,
            message: error.to_string(),
        });
    }

    fn send_event(&self, event: EditorEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("Failed to send event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use framegrab_capture::{CaptureError, CaptureResult, PatternSpec, PatternSurfaceFactory};
    use framegrab_ipc::{event_channel, Key, KeyPress, SavedCapture};

    #[derive(Default)]
    struct SharedLog(Mutex<Vec<String>>);

    impl SharedLog {
        fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct RecordingSink {
        log: Arc<SharedLog>,
        fail_next: bool,
    }

    impl CaptureSink for RecordingSink {
        fn on_save(
            &mut self,
            session: &CaptureSession,
            metadata: &CaptureMetadata,
        ) -> CaptureResult<SavedCapture> {
            if std::mem::take(&mut self.fail_next) {
                return Err(CaptureError::Persistence("store offline".to_string()));
            }
            self.log
                .push(format!("save {} {}", metadata.movie_name, session.display_timestamp()));
            Ok(SavedCapture {
                id: "capture-1".to_string(),
                movie_name: metadata.movie_name.clone(),
                timestamp: session.display_timestamp(),
                frame_url: "mem://frames/1.png".to_string(),
            })
        }

        fn on_cancel(&mut self, session: &CaptureSession) {
            self.log.push(format!("cancel {}", session.display_timestamp()));
        }
    }

    fn editor(fail_next: bool) -> (Editor, Receiver<EditorEvent>, Arc<SharedLog>) {
        let (_command_tx, command_rx) = crossbeam_channel::bounded(1);
        let (event_tx, event_rx) = event_channel();
        let log = Arc::new(SharedLog::default());

        let editor = Editor::new(
            command_rx,
            event_tx,
            Box::new(PatternSurfaceFactory::new(PatternSpec {
                width: 16,
                height: 9,
                duration: 120.0,
                frame_rate: None,
            })),
            Box::new(RecordingSink {
                log: Arc::clone(&log),
                fail_next,
            }),
            EditorConfig::default(),
        );
        (editor, event_rx, log)
    }

    fn load(editor: &mut Editor) {
        assert!(editor.handle_command(EditorCommand::LoadSource {
            source: SourceRef::from_path("/videos/the_thing.mp4"),
        }));
    }

    fn metadata(movie: &str) -> CaptureMetadata {
        CaptureMetadata {
            movie_name: movie.to_string(),
            reference_link: "https://www.imdb.com/title/tt0084787/".to_string(),
            ..CaptureMetadata::default()
        }
    }

    fn errors(events: &Receiver<EditorEvent>) -> Vec<String> {
        events
            .try_iter()
            .filter_map(|event| match event {
                EditorEvent::Error { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_load_emits_state_change() {
        let (mut editor, events, _) = editor(false);
        load(&mut editor);

        let events: Vec<_> = events.try_iter().collect();
        assert!(events.iter().any(|e| matches!(
            e,
            EditorEvent::StateChanged {
                previous: TransportState::Idle,
                current: TransportState::Paused,
            }
        )));
    }

    #[test]
    fn test_surface_metadata_is_forwarded() {
        let (mut editor, events, _) = editor(false);
        editor.handle_command(EditorCommand::LoadSource {
            source: SourceRef::from_path("/videos/the_thing.mp4"),
        });
        assert_eq!(editor.transport().playhead().duration, 120.0);

        let resolved = events.try_iter().find_map(|e| match e {
            EditorEvent::MetadataResolved(info) => Some(info),
            _ => None,
        });
        let info = resolved.unwrap();
        assert_eq!((info.width, info.height), (16, 9));
        assert_eq!(info.duration, 120.0);
    }

    #[test]
    fn test_keyboard_capture_guard() {
        let (mut editor, events, _) = editor(false);
        load(&mut editor);

        editor.handle_command(EditorCommand::KeyPress(KeyPress::plain(Key::Space)));
        assert!(editor.transport().state().is_playing());

        editor.handle_command(EditorCommand::KeyPress(KeyPress::plain(Key::Char('c'))));
        assert!(editor.pending_capture().is_none());

        editor.handle_command(EditorCommand::KeyPress(KeyPress::plain(Key::Space)));
        editor.handle_command(EditorCommand::KeyPress(KeyPress::plain(Key::Char('c'))));
        assert!(editor.pending_capture().is_some());
        assert!(events
            .try_iter()
            .any(|e| matches!(e, EditorEvent::CaptureReady { .. })));
    }

    #[test]
    fn test_keyboard_steps_frames() {
        let (mut editor, _, _) = editor(false);
        load(&mut editor);

        editor.handle_command(EditorCommand::Seek(30.0));
        editor.handle_command(EditorCommand::KeyPress(KeyPress::plain(Key::ArrowRight)));
        let time = editor.transport().playhead().current_time;
        assert!((time - (30.0 + 1.0 / 24.0)).abs() < 1e-9);

        editor.handle_command(EditorCommand::KeyPress(KeyPress::shifted(Key::ArrowLeft)));
        let time = editor.transport().playhead().current_time;
        assert!((time - (20.0 + 1.0 / 24.0)).abs() < 1e-9);
    }

    #[test]
    fn test_seek_wins_over_queued_time_update() {
        let (mut editor, _, _) = editor(false);
        load(&mut editor);
        editor.handle_command(EditorCommand::Play);

        // Leaves a TimeAdvanced(0.5) waiting in the notification channel
        editor.transport.tick(Duration::from_millis(500));

        editor.handle_command(EditorCommand::Seek(30.0));
        assert_eq!(editor.transport().playhead().current_time, 30.0);
    }

    #[test]
    fn test_second_capture_refused_while_pending() {
        let (mut editor, events, _) = editor(false);
        load(&mut editor);

        editor.handle_command(EditorCommand::Capture);
        let first = editor.pending_capture().cloned().unwrap();

        editor.handle_command(EditorCommand::Seek(10.0));
        editor.handle_command(EditorCommand::Capture);
        assert_eq!(editor.pending_capture(), Some(&first));
        assert!(errors(&events)
            .iter()
            .any(|m| m.contains("already pending")));
    }

    #[test]
    fn test_save_clears_pending() {
        let (mut editor, events, log) = editor(false);
        load(&mut editor);

        editor.handle_command(EditorCommand::Seek(65.5));
        editor.handle_command(EditorCommand::Capture);
        editor.handle_command(EditorCommand::SaveCapture {
            metadata: metadata("The Thing"),
        });

        assert!(editor.pending_capture().is_none());
        assert_eq!(log.entries(), vec!["save The Thing 00:01:05.500".to_string()]);

        let saved = events.try_iter().find_map(|e| match e {
            EditorEvent::CaptureSaved(saved) => Some(saved),
            _ => None,
        });
        assert_eq!(saved.unwrap().timestamp, "00:01:05.500");
    }

    #[test]
    fn test_failed_save_keeps_session_for_retry() {
        let (mut editor, events, log) = editor(true);
        load(&mut editor);

        editor.handle_command(EditorCommand::Capture);
        editor.handle_command(EditorCommand::SaveCapture {
            metadata: metadata("The Thing"),
        });
        assert!(editor.pending_capture().is_some());
        assert!(errors(&events).iter().any(|m| m.contains("store offline")));

        editor.handle_command(EditorCommand::SaveCapture {
            metadata: metadata("The Thing"),
        });
        assert!(editor.pending_capture().is_none());
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn test_cancel_discards_without_saving() {
        let (mut editor, events, log) = editor(false);
        load(&mut editor);

        editor.handle_command(EditorCommand::Capture);
        editor.handle_command(EditorCommand::CancelCapture);

        assert!(editor.pending_capture().is_none());
        assert_eq!(log.entries(), vec!["cancel 00:00:00.000".to_string()]);
        assert!(events
            .try_iter()
            .any(|e| matches!(e, EditorEvent::CaptureDiscarded)));

        editor.handle_command(EditorCommand::CancelCapture);
        assert!(errors(&events).iter().any(|m| m.contains("No capture pending")));
    }

    #[test]
    fn test_capture_without_source_reports_error() {
        let (mut editor, events, _) = editor(false);
        editor.handle_command(EditorCommand::Capture);
        assert!(errors(&events).iter().any(|m| m.contains("No video source")));
    }

    #[test]
    fn test_shutdown_stops_loop() {
        let (mut editor, events, _) = editor(false);
        load(&mut editor);

        assert!(!editor.handle_command(EditorCommand::Shutdown));
        assert!(editor.transport().state().is_idle());
        assert!(events.try_iter().any(|e| matches!(e, EditorEvent::Shutdown)));
    }

    #[test]
    fn test_run_processes_commands_until_shutdown() {
        let (command_tx, command_rx) = crossbeam_channel::bounded(8);
        let (event_tx, event_rx) = event_channel();
        let log = Arc::new(SharedLog::default());

        let handle = std::thread::spawn(move || {
            let mut editor = Editor::new(
                command_rx,
                event_tx,
                Box::new(PatternSurfaceFactory::default()),
                Box::new(RecordingSink {
                    log,
                    fail_next: false,
                }),
                EditorConfig::default(),
            );
            editor.run();
        });

        command_tx
            .send(EditorCommand::LoadSource {
                source: SourceRef::from_path("/videos/alien.mp4"),
            })
            .unwrap();
        command_tx.send(EditorCommand::Shutdown).unwrap();
        handle.join().unwrap();

        let events: Vec<_> = event_rx.try_iter().collect();
        assert!(matches!(events.first(), Some(EditorEvent::Ready)));
        assert!(matches!(events.last(), Some(EditorEvent::Shutdown)));
    }
}
