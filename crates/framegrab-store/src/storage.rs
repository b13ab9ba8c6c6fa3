//! Object storage for encoded frames.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::error::StoreError;
use crate::records::FileRecord;
use crate::StoreResult;

/// Stores uploaded files under slash-separated paths.
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` at `path`, replacing any object already there.
    fn upload(&self, path: &str, bytes: Bytes) -> StoreResult<FileRecord>;

    /// Read back the object at `path`.
    fn download(&self, path: &str) -> StoreResult<Option<Bytes>>;

    /// Remove the object at `path`. Removing a missing object is not an error.
    fn delete(&self, path: &str) -> StoreResult<()>;
}

/// Remove an upload whose record could not be written.
pub(crate) fn discard_upload(storage: &dyn ObjectStorage, path: &str) {
    match storage.delete(path) {
        Ok(()) => debug!(path, "Orphaned upload removed"),
        Err(e) => warn!(path, error = %e, "Failed to remove orphaned upload"),
    }
}

/// Reject empty, absolute and parent-relative paths.
fn check_path(path: &str) -> StoreResult<()> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if invalid {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Object storage kept in memory. URLs use the `mem://` scheme.
#[derive(Default)]
pub struct InMemoryObjectStorage {
    objects: RwLock<HashMap<String, (FileRecord, Bytes)>>,
}

impl InMemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl ObjectStorage for InMemoryObjectStorage {
    fn upload(&self, path: &str, bytes: Bytes) -> StoreResult<FileRecord> {
        check_path(path)?;
        if bytes.is_empty() {
            return Err(StoreError::EmptyUpload);
        }

        let record = FileRecord {
            id: Uuid::new_v4(),
            path: path.to_string(),
            url: format!("mem://{}", path),
        };
        debug!(path, bytes = bytes.len(), "Object stored");
        self.objects
            .write()
            .insert(path.to_string(), (record.clone(), bytes));
        Ok(record)
    }

    fn download(&self, path: &str) -> StoreResult<Option<Bytes>> {
        check_path(path)?;
        Ok(self
            .objects
            .read()
            .get(path)
            .map(|(_, bytes)| bytes.clone()))
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        check_path(path)?;
        self.objects.write().remove(path);
        Ok(())
    }
}

/// Object storage backed by a directory. URLs use the `file://` scheme.
pub struct FsObjectStorage {
    root: PathBuf,
}

impl FsObjectStorage {
    /// Store objects below `root`, creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    /// The storage root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StoreResult<PathBuf> {
        check_path(path)?;
        let mut resolved = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                _ => return Err(StoreError::InvalidPath(path.to_string())),
            }
        }
        Ok(resolved)
    }
}

impl ObjectStorage for FsObjectStorage {
    #[instrument(name = "fs_upload", skip(self, bytes), fields(len = bytes.len()))]
    fn upload(&self, path: &str, bytes: Bytes) -> StoreResult<FileRecord> {
        if bytes.is_empty() {
            return Err(StoreError::EmptyUpload);
        }

        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &bytes)?;

        let url = Url::from_file_path(&target)
            .map_err(|_| StoreError::InvalidPath(path.to_string()))?;
        debug!(target = %target.display(), "Object written");

        Ok(FileRecord {
            id: Uuid::new_v4(),
            path: path.to_string(),
            url: url.to_string(),
        })
    }

    fn download(&self, path: &str) -> StoreResult<Option<Bytes>> {
        let target = self.resolve(path)?;
        match fs::read(&target) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
