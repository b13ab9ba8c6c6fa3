use clap::Parser;
use std::path::PathBuf;

/// Frame-accurate video scrubbing and capture
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Source to load on startup (a directory of frames, or any other path for a test pattern)
    #[arg(value_name = "SOURCE")]
    pub source: Option<PathBuf>,

    /// Read commands from this file instead of stdin
    #[arg(short = 's', long = "script", value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Editor configuration JSON
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Frame rate assumed when the source has none
    #[arg(long = "fps", value_name = "FPS")]
    pub default_fps: Option<f64>,

    /// Native frame rate of image-sequence sources
    #[arg(long = "sequence-fps", value_name = "FPS")]
    pub sequence_fps: Option<f64>,

    /// Sign in as this editor on startup
    #[arg(short = 'e', long = "email", value_name = "EMAIL")]
    pub email: Option<String>,

    /// Directory for uploaded frames and the capture database (in memory when omitted)
    #[arg(short = 'o', long = "out", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Print every playhead update, including during playback
    #[arg(long = "follow")]
    pub follow: bool,
}
