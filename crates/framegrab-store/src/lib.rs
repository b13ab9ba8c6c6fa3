//! Capture persistence.
//!
//! This crate stores finished captures: the document store holding capture
//! and video records, the object storage holding encoded frames, and the
//! identity provider deciding which editor owns a capture. In-memory and
//! filesystem implementations are provided.

mod dashboard;
mod error;
mod identity;
mod metadata;
mod query;
mod records;
mod saver;
mod storage;
mod store;

pub use dashboard::{
    filter_captures, movie_names, CaptureEdit, Dashboard, DashboardStats, ManualUpload,
    SearchFilter,
};
pub use error::StoreError;
pub use identity::{CodeDelivery, IdentityProvider, InMemoryIdentity};
pub use metadata::{
    is_reference_link, parse_tags, sanitize_file_name, suggest_movie_name,
    validate_capture_metadata,
};
pub use query::{CaptureFilter, CaptureOrder, LiveQuery, StoreChange};
pub use records::{CaptureRecord, FileRecord, StoreSnapshot, UserRecord, VideoRecord};
pub use saver::CaptureSaver;
pub use storage::{FsObjectStorage, InMemoryObjectStorage, ObjectStorage};
pub use store::{DocumentStore, InMemoryStore};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Channel capacity for store change notifications.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Current time as milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
