//! Headless front end for the framegrab editor.
//!
//! Commands are read line by line from stdin or a script file; editor
//! events are printed as they arrive.

mod cli;
mod console;
mod script;
mod surfaces;

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use framegrab_engine::create_editor;
use framegrab_ipc::{command_channel, event_channel, EditorConfig};
use framegrab_store::{
    CaptureSaver, Dashboard, FsObjectStorage, InMemoryIdentity, InMemoryObjectStorage,
    InMemoryStore, ObjectStorage, StoreSnapshot,
};

use crate::cli::Args;
use crate::console::{spawn_printer, Console};
use crate::script::ScriptAction;
use crate::surfaces::SourceFactory;

/// Capture database file inside the output directory.
const DATABASE_FILE: &str = "captures.json";

/// Object storage directory inside the output directory.
const OBJECTS_DIR: &str = "objects";

/// Initialize logging.
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "framegrab=debug,framegrab_engine=debug,framegrab_capture=debug,framegrab_store=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_config(args: &Args) -> Result<EditorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => EditorConfig::default(),
    };

    if let Some(fps) = args.default_fps {
        config.default_frame_rate = fps;
    }
    Ok(config)
}

fn load_database(store: &InMemoryStore, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let snapshot: StoreSnapshot = serde_json::from_str(&text)
        .with_context(|| format!("Invalid capture database {}", path.display()))?;
    info!(captures = snapshot.captures.len(), "Capture database loaded");
    store.restore(snapshot);
    Ok(())
}

fn save_database(store: &InMemoryStore, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&store.snapshot())?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), "Capture database written");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();
    info!("framegrab starting");

    let config = load_config(&args)?;

    let store = Arc::new(InMemoryStore::new());
    let storage: Arc<dyn ObjectStorage> = match &args.out_dir {
        Some(dir) => {
            load_database(&store, &dir.join(DATABASE_FILE))?;
            Arc::new(FsObjectStorage::new(dir.join(OBJECTS_DIR))?)
        }
        None => Arc::new(InMemoryObjectStorage::new()),
    };
    let (identity, deliveries) = InMemoryIdentity::new();
    let identity = Arc::new(identity);

    let saver = CaptureSaver::new(store.clone(), storage.clone(), identity.clone());
    let dashboard = Dashboard::new(store.clone(), storage, identity.clone());

    // Create IPC channels
    let (command_tx, command_rx) = command_channel();
    let (event_tx, event_rx) = event_channel();
    let (synced_tx, synced_rx) = crossbeam_channel::unbounded();

    // Start editor in background thread
    let factory = SourceFactory::new(args.sequence_fps);
    let editor = thread::Builder::new()
        .name("editor".to_string())
        .spawn(move || {
            let mut editor = create_editor(
                command_rx,
                event_tx,
                Box::new(factory),
                Box::new(saver),
                config,
            );
            editor.run();
        })?;
    let printer = spawn_printer(event_rx, synced_tx, args.follow)?;

    let mut console = Console::new(command_tx, synced_rx, dashboard, identity, deliveries);
    if let Some(email) = &args.email {
        console.sign_in(email)?;
    }
    if let Some(source) = &args.source {
        console.execute(ScriptAction::Load(source.clone()))?;
    }

    let result = match &args.script {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open script {}", path.display()))?;
            console.run(BufReader::new(file))
        }
        None => console.run(io::stdin().lock()),
    };

    console.shutdown();
    editor
        .join()
        .map_err(|_| anyhow!("Editor thread panicked"))?;
    printer
        .join()
        .map_err(|_| anyhow!("Printer thread panicked"))?;

    if let Some(dir) = &args.out_dir {
        save_database(&store, &dir.join(DATABASE_FILE))?;
    }

    info!("framegrab stopped");
    result
}
