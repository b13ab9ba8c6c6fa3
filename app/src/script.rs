//! Line-oriented command scripts.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use uuid::Uuid;

use framegrab_ipc::{parse_timestamp, EditorCommand, Key, KeyPress};
use framegrab_store::SearchFilter;

/// Descriptive fields for saving the pending capture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveFields {
    pub reference_link: String,

    /// Suggested from the loaded file name when missing.
    pub movie_name: Option<String>,

    /// Comma-separated.
    pub tags: String,
    pub notes: String,
    pub published: bool,
}

/// Fields for a manual still upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadFields {
    pub path: PathBuf,
    pub movie_name: String,
    pub timestamp: String,
    pub reference_link: String,
    pub tags: String,
}

/// One parsed script line.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptAction {
    /// Sent to the editor as is.
    Editor(EditorCommand),
    Load(PathBuf),
    Save(SaveFields),
    Wait(Duration),
    Login(String),
    Code(String),
    Logout,
    List(SearchFilter),
    Movies,
    Gallery,
    Publish(Uuid),
    Delete(Uuid),
    Upload(UploadFields),
    Help,
    Quit,
}

pub const HELP: &str = "\
load PATH                    open a frame directory or a test pattern
play | pause | space         transport
left | right                 step one frame (shift+left / shift+right skip)
seek TIME                    seconds or HH:MM:SS[.mmm]
ff | rw | release | rate X   playback rate
c | capture                  capture the current frame
save LINK | MOVIE | TAGS | NOTES | publish
cancel                       discard the pending capture
wait MS                      let playback run
state | eject
login EMAIL | code CODE | logout
list [TEXT] [| MOVIE]        your captures
movies | gallery
publish ID | delete ID
upload PATH | MOVIE | TIME | LINK | TAGS
quit";

/// Split `text` on `|`, trimming each field.
fn fields(text: &str) -> Vec<String> {
    text.split('|').map(|f| f.trim().to_string()).collect()
}

fn field(fields: &[String], index: usize) -> String {
    fields.get(index).cloned().unwrap_or_default()
}

fn parse_seconds(text: &str) -> Result<f64> {
    if text.contains(':') {
        return parse_timestamp(text).map_err(|e| anyhow!(e));
    }
    text.parse::<f64>()
        .with_context(|| format!("Invalid time: {}", text))
}

fn parse_id(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).with_context(|| format!("Invalid capture id: {}", text))
}

fn key(key: Key, shift: bool) -> ScriptAction {
    ScriptAction::Editor(EditorCommand::KeyPress(KeyPress { key, shift }))
}

/// Parse one script line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ScriptAction>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let action = match word.to_lowercase().as_str() {
        "load" if !rest.is_empty() => ScriptAction::Load(PathBuf::from(rest)),
        "play" => ScriptAction::Editor(EditorCommand::Play),
        "pause" => ScriptAction::Editor(EditorCommand::Pause),
        "space" | "toggle" => key(Key::Space, false),
        "left" => key(Key::ArrowLeft, false),
        "right" => key(Key::ArrowRight, false),
        "shift+left" => key(Key::ArrowLeft, true),
        "shift+right" => key(Key::ArrowRight, true),
        "c" => key(Key::Char('c'), false),
        "capture" => ScriptAction::Editor(EditorCommand::Capture),
        "seek" => ScriptAction::Editor(EditorCommand::Seek(parse_seconds(rest)?)),
        "ff" => ScriptAction::Editor(EditorCommand::FastForward),
        "rw" => ScriptAction::Editor(EditorCommand::Rewind),
        "release" => ScriptAction::Editor(EditorCommand::ResetPlaybackRate),
        "rate" => {
            let rate = rest
                .parse::<f64>()
                .with_context(|| format!("Invalid rate: {}", rest))?;
            ScriptAction::Editor(EditorCommand::SetPlaybackRate(rate))
        }
        "cancel" => ScriptAction::Editor(EditorCommand::CancelCapture),
        "state" => ScriptAction::Editor(EditorCommand::GetState),
        "eject" => ScriptAction::Editor(EditorCommand::Eject),
        "save" => {
            let f = fields(rest);
            let movie_name = field(&f, 1);
            ScriptAction::Save(SaveFields {
                reference_link: field(&f, 0),
                movie_name: (!movie_name.is_empty()).then_some(movie_name),
                tags: field(&f, 2),
                notes: field(&f, 3),
                published: matches!(field(&f, 4).to_lowercase().as_str(), "publish" | "yes"),
            })
        }
        "wait" => {
            let ms = rest
                .parse::<u64>()
                .with_context(|| format!("Invalid wait: {}", rest))?;
            ScriptAction::Wait(Duration::from_millis(ms))
        }
        "login" if !rest.is_empty() => ScriptAction::Login(rest.to_string()),
        "code" if !rest.is_empty() => ScriptAction::Code(rest.to_string()),
        "logout" => ScriptAction::Logout,
        "list" => {
            let f = fields(rest);
            let movie = field(&f, 1);
            ScriptAction::List(SearchFilter {
                search: field(&f, 0),
                movie: (!movie.is_empty()).then_some(movie),
            })
        }
        "movies" => ScriptAction::Movies,
        "gallery" => ScriptAction::Gallery,
        "publish" => ScriptAction::Publish(parse_id(rest)?),
        "delete" => ScriptAction::Delete(parse_id(rest)?),
        "upload" => {
            let f = fields(rest);
            let path = field(&f, 0);
            if path.is_empty() {
                bail!("upload needs a file path");
            }
            ScriptAction::Upload(UploadFields {
                path: PathBuf::from(path),
                movie_name: field(&f, 1),
                timestamp: field(&f, 2),
                reference_link: field(&f, 3),
                tags: field(&f, 4),
            })
        }
        "help" | "?" => ScriptAction::Help,
        "quit" | "exit" => ScriptAction::Quit,
        other => bail!("Unknown command: {} (try `help`)", other),
    };

    Ok(Some(action))
}
