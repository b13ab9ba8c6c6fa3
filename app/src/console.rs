//! Interactive front end driving the editor from script lines.

use std::fs;
use std::io::BufRead;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use framegrab_ipc::{
    format_timestamp, CaptureMetadata, EditorCommand, EditorEvent, PlayheadState, SourceRef,
    TransportState,
};
use framegrab_store::{
    filter_captures, movie_names, parse_tags, suggest_movie_name, CaptureRecord, CodeDelivery,
    Dashboard, DashboardStats, IdentityProvider, InMemoryIdentity, ManualUpload, UserRecord,
};

use crate::script::{parse_line, SaveFields, ScriptAction, UploadFields, HELP};

/// How long to wait for the editor to catch up with a command.
const SYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// Print editor events until the editor goes away.
///
/// The reply to a `GetState` command is printed as a status line and then
/// acknowledged on `synced_tx`.
pub fn spawn_printer(
    event_rx: Receiver<EditorEvent>,
    synced_tx: Sender<()>,
    follow: bool,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("printer".to_string())
        .spawn(move || {
            let mut status: Option<TransportState> = None;
            for event in event_rx.iter() {
                match event {
                    EditorEvent::StateChanged { previous, current } if previous == current => {
                        status = Some(current);
                    }
                    EditorEvent::Playhead(playhead) if status.is_some() => {
                        if let Some(state) = status.take() {
                            println!("{}", status_line(state, &playhead));
                        }
                        if synced_tx.send(()).is_err() {
                            debug!("Console no longer waiting");
                        }
                    }
                    event => {
                        if let Some(line) = describe_event(&event, follow) {
                            println!("{}", line);
                        }
                    }
                }
            }
            debug!("Printer stopped");
        })
}

/// `[paused] 00:01:05.500 / 00:02:00.000 x1`
pub fn status_line(state: TransportState, playhead: &PlayheadState) -> String {
    format!(
        "[{}] {} / {} x{}",
        state.name(),
        format_timestamp(playhead.current_time),
        format_timestamp(playhead.duration),
        playhead.playback_rate
    )
}

/// One line for an editor event, or `None` if it is not worth printing.
pub fn describe_event(event: &EditorEvent, follow: bool) -> Option<String> {
    match event {
        EditorEvent::StateChanged { previous, current } => {
            Some(format!("{} -> {}", previous.name(), current.name()))
        }
        EditorEvent::Playhead(playhead) if follow => {
            Some(format!("  {}", format_timestamp(playhead.current_time)))
        }
        EditorEvent::Playhead(_) => None,
        EditorEvent::MetadataResolved(info) => {
            let rate = info
                .frame_rate
                .map(|fps| format!("{} fps", fps))
                .unwrap_or_else(|| "unknown frame rate".to_string());
            Some(format!(
                "{}: {}x{}, {}, {}",
                info.file_name,
                info.width,
                info.height,
                format_timestamp(info.duration),
                rate
            ))
        }
        EditorEvent::CaptureReady {
            timestamp,
            image_len,
            ..
        } => Some(format!(
            "Captured frame at {} ({} bytes), waiting for `save` or `cancel`",
            format_timestamp(*timestamp),
            image_len
        )),
        EditorEvent::CaptureSaved(saved) => Some(format!(
            "Saved {} \"{}\" at {} -> {}",
            saved.id, saved.movie_name, saved.timestamp, saved.frame_url
        )),
        EditorEvent::CaptureDiscarded => Some("Capture discarded".to_string()),
        EditorEvent::Error { message, .. } => Some(format!("error: {}", message)),
        EditorEvent::Ready | EditorEvent::Shutdown => None,
    }
}

fn capture_line(capture: &CaptureRecord) -> String {
    let mut line = format!(
        "{} {} \"{}\" {}",
        capture.id,
        if capture.published { "public" } else { "draft " },
        capture.movie_name,
        capture.timestamp
    );
    if !capture.tags.is_empty() {
        line.push_str(&format!(" [{}]", capture.tags.join(", ")));
    }
    line.push_str(&format!(" {}", capture.frame_url));
    line
}

/// Runs script actions against the editor and the capture dashboard.
pub struct Console {
    command_tx: Sender<EditorCommand>,
    synced_rx: Receiver<()>,
    dashboard: Dashboard,
    identity: Arc<InMemoryIdentity>,
    deliveries: Receiver<CodeDelivery>,
    pending_email: Option<String>,
    loaded: Option<SourceRef>,
}

impl Console {
    pub fn new(
        command_tx: Sender<EditorCommand>,
        synced_rx: Receiver<()>,
        dashboard: Dashboard,
        identity: Arc<InMemoryIdentity>,
        deliveries: Receiver<CodeDelivery>,
    ) -> Self {
        Self {
            command_tx,
            synced_rx,
            dashboard,
            identity,
            deliveries,
            pending_email: None,
            loaded: None,
        }
    }

    /// Execute every line of `input` until `quit` or end of input.
    ///
    /// A bad line is reported and skipped.
    pub fn run(&mut self, input: impl BufRead) -> Result<()> {
        for line in input.lines() {
            let line = line.context("Failed to read command")?;
            let action = match parse_line(&line) {
                Ok(Some(action)) => action,
                Ok(None) => continue,
                Err(e) => {
                    println!("error: {:#}", e);
                    continue;
                }
            };

            match self.execute(action) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => println!("error: {:#}", e),
            }
        }
        Ok(())
    }

    /// Execute one action. Returns false on `quit`.
    pub fn execute(&mut self, action: ScriptAction) -> Result<bool> {
        debug!(?action, "Executing");

        match action {
            ScriptAction::Editor(command) => self.send(command)?,
            ScriptAction::Load(path) => {
                let source = SourceRef::from_path(path);
                self.loaded = Some(source.clone());
                self.send(EditorCommand::LoadSource { source })?;
            }
            ScriptAction::Save(fields) => self.save(fields)?,
            ScriptAction::Wait(duration) => thread::sleep(duration),
            ScriptAction::Login(email) => {
                let delivery = self.request_code(&email)?;
                println!("Sign-in code for {}: {}", delivery.email, delivery.code);
                self.pending_email = Some(delivery.email);
            }
            ScriptAction::Code(code) => {
                let email = self
                    .pending_email
                    .take()
                    .ok_or_else(|| anyhow!("Run `login EMAIL` first"))?;
                let user = self.identity.sign_in_with_code(&email, &code)?;
                println!("Signed in as {}", user.email);
            }
            ScriptAction::Logout => {
                self.identity.sign_out();
                println!("Signed out");
            }
            ScriptAction::List(filter) => {
                let captures = self.dashboard.captures()?;
                let stats = DashboardStats::count(&captures);
                for capture in filter_captures(&captures, &filter) {
                    println!("{}", capture_line(capture));
                }
                println!(
                    "{} captures, {} published, {} drafts",
                    stats.total, stats.published, stats.drafts
                );
            }
            ScriptAction::Movies => {
                for name in movie_names(&self.dashboard.captures()?) {
                    println!("{}", name);
                }
            }
            ScriptAction::Gallery => {
                for capture in self.dashboard.gallery()? {
                    println!("{}", capture_line(&capture));
                }
            }
            ScriptAction::Publish(id) => {
                let capture = self.dashboard.toggle_publish(id)?;
                println!("{}", capture_line(&capture));
            }
            ScriptAction::Delete(id) => {
                self.dashboard.delete(id)?;
                println!("Deleted {}", id);
            }
            ScriptAction::Upload(fields) => self.upload(fields)?,
            ScriptAction::Help => println!("{}", HELP),
            ScriptAction::Quit => return Ok(false),
        }

        Ok(true)
    }

    /// Sign in without printing the code.
    pub fn sign_in(&mut self, email: &str) -> Result<UserRecord> {
        let delivery = self.request_code(email)?;
        let user = self
            .identity
            .sign_in_with_code(&delivery.email, &delivery.code)?;
        info!(email = %user.email, "Signed in");
        Ok(user)
    }

    /// Stop the editor.
    pub fn shutdown(&self) {
        if self.command_tx.send(EditorCommand::Shutdown).is_err() {
            warn!("Editor already stopped");
        }
    }

    fn request_code(&self, email: &str) -> Result<CodeDelivery> {
        self.identity.send_code(email)?;
        self.deliveries
            .try_recv()
            .map_err(|_| anyhow!("No sign-in code delivered"))
    }

    /// Send a command and wait until the editor has handled it.
    fn send(&self, command: EditorCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| anyhow!("Failed to send command: {}", e))?;
        self.command_tx
            .send(EditorCommand::GetState)
            .map_err(|e| anyhow!("Failed to send command: {}", e))?;
        self.synced_rx
            .recv_timeout(SYNC_TIMEOUT)
            .map_err(|e| anyhow!("Timeout waiting for the editor: {}", e))
    }

    fn save(&self, fields: SaveFields) -> Result<()> {
        let movie_name = match fields.movie_name {
            Some(name) => name,
            None => self
                .loaded
                .as_ref()
                .map(|source| suggest_movie_name(&source.file_name))
                .unwrap_or_default(),
        };
        let notes = fields.notes.trim();

        let metadata = CaptureMetadata {
            movie_name,
            reference_link: fields.reference_link,
            notes: (!notes.is_empty()).then(|| notes.to_string()),
            tags: parse_tags(&fields.tags),
            published: fields.published,
        };
        self.send(EditorCommand::SaveCapture { metadata })
    }

    fn upload(&self, fields: UploadFields) -> Result<()> {
        let data = fs::read(&fields.path)
            .with_context(|| format!("Failed to read {}", fields.path.display()))?;
        let file_name = fields
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let capture = self.dashboard.upload_still(ManualUpload {
            file_name,
            bytes: Bytes::from(data),
            movie_name: fields.movie_name,
            timestamp: fields.timestamp,
            reference_link: fields.reference_link,
            tags: fields.tags,
            ..ManualUpload::default()
        })?;
        println!("{}", capture_line(&capture));
        Ok(())
    }
}
