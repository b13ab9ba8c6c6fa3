//! Document store.

use std::collections::HashMap;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::query::{CaptureFilter, CaptureOrder, StoreChange};
use crate::records::{CaptureRecord, StoreSnapshot, VideoRecord};
use crate::{StoreResult, CHANGE_CHANNEL_CAPACITY};

/// Typed record storage with change notifications.
pub trait DocumentStore: Send + Sync {
    /// Insert a new capture.
    fn save_capture(&self, record: CaptureRecord) -> StoreResult<()>;

    /// Replace an existing capture.
    fn update_capture(&self, record: CaptureRecord) -> StoreResult<()>;

    /// Delete a capture.
    fn delete_capture(&self, id: Uuid) -> StoreResult<()>;

    /// Look up a capture by id.
    fn capture(&self, id: Uuid) -> StoreResult<Option<CaptureRecord>>;

    /// Captures matching `filter` in `order`.
    fn query_captures(
        &self,
        filter: &CaptureFilter,
        order: CaptureOrder,
    ) -> StoreResult<Vec<CaptureRecord>>;

    /// Insert or replace a video.
    fn save_video(&self, record: VideoRecord) -> StoreResult<()>;

    /// Look up a video by its unique file name.
    fn find_video(&self, file_name: &str) -> StoreResult<Option<VideoRecord>>;

    /// Receive a notification for every change applied after this call.
    fn subscribe(&self) -> Receiver<StoreChange>;
}

#[derive(Default)]
struct Tables {
    captures: HashMap<Uuid, CaptureRecord>,
    videos: HashMap<Uuid, VideoRecord>,
}

/// Document store kept in memory.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    subscribers: Mutex<Vec<Sender<StoreChange>>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record, captures newest first.
    pub fn snapshot(&self) -> StoreSnapshot {
        let tables = self.tables.read();
        let mut captures: Vec<_> = tables.captures.values().cloned().collect();
        CaptureOrder::NewestFirst.sort(&mut captures);

        let mut videos: Vec<_> = tables.videos.values().cloned().collect();
        videos.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        StoreSnapshot { captures, videos }
    }

    /// Load every record from a snapshot, replacing the current contents.
    pub fn restore(&self, snapshot: StoreSnapshot) {
        let mut tables = self.tables.write();
        tables.captures = snapshot
            .captures
            .into_iter()
            .map(|record| (record.id, record))
            .collect();
        tables.videos = snapshot
            .videos
            .into_iter()
            .map(|record| (record.id, record))
            .collect();
        debug!(
            captures = tables.captures.len(),
            videos = tables.videos.len(),
            "Store restored"
        );
    }

    fn notify(&self, change: StoreChange) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(change) {
            Ok(()) => true,
            // A full queue already guarantees a refresh
            Err(TrySendError::Full(_)) => {
                debug!(?change, "Subscriber queue full");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

impl DocumentStore for InMemoryStore {
    fn save_capture(&self, record: CaptureRecord) -> StoreResult<()> {
        let id = record.id;
        self.tables.write().captures.insert(id, record);
        debug!(%id, "Capture stored");
        self.notify(StoreChange::CaptureSaved(id));
        Ok(())
    }

    fn update_capture(&self, record: CaptureRecord) -> StoreResult<()> {
        let id = record.id;
        {
            let mut tables = self.tables.write();
            let existing = tables.captures.get_mut(&id).ok_or(StoreError::NotFound(id))?;
            *existing = record;
        }
        self.notify(StoreChange::CaptureUpdated(id));
        Ok(())
    }

    fn delete_capture(&self, id: Uuid) -> StoreResult<()> {
        if self.tables.write().captures.remove(&id).is_none() {
            warn!(%id, "Delete of unknown capture");
            return Err(StoreError::NotFound(id));
        }
        self.notify(StoreChange::CaptureDeleted(id));
        Ok(())
    }

    fn capture(&self, id: Uuid) -> StoreResult<Option<CaptureRecord>> {
        Ok(self.tables.read().captures.get(&id).cloned())
    }

    fn query_captures(
        &self,
        filter: &CaptureFilter,
        order: CaptureOrder,
    ) -> StoreResult<Vec<CaptureRecord>> {
        let mut records: Vec<_> = self
            .tables
            .read()
            .captures
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        order.sort(&mut records);
        Ok(records)
    }

    fn save_video(&self, record: VideoRecord) -> StoreResult<()> {
        let id = record.id;
        {
            let mut tables = self.tables.write();
            // File names are unique
            tables
                .videos
                .retain(|_, video| video.id == id || video.file_name != record.file_name);
            tables.videos.insert(id, record);
        }
        self.notify(StoreChange::VideoSaved(id));
        Ok(())
    }

    fn find_video(&self, file_name: &str) -> StoreResult<Option<VideoRecord>> {
        Ok(self
            .tables
            .read()
            .videos
            .values()
            .find(|video| video.file_name == file_name)
            .cloned())
    }

    fn subscribe(&self) -> Receiver<StoreChange> {
        let (tx, rx) = crossbeam_channel::bounded(CHANGE_CHANNEL_CAPACITY);
        self.subscribers.lock().push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::query::LiveQuery;

    fn capture(movie: &str, captured_at: u64, published: bool) -> CaptureRecord {
        CaptureRecord {
            id: Uuid::new_v4(),
            movie_name: movie.to_string(),
            reference_link: "https://www.imdb.com/title/tt0113277/".to_string(),
            timestamp: "00:42:10.000".to_string(),
            frame_url: format!("mem://captures/{}.png", captured_at),
            notes: None,
            tags: Vec::new(),
            captured_at,
            published,
            video_file_name: None,
            video: None,
            editor: None,
            frame_file: None,
        }
    }

    fn video(file_name: &str) -> VideoRecord {
        VideoRecord {
            id: Uuid::new_v4(),
            file_name: file_name.to_string(),
            uploaded_at: 1,
            duration: 10.0,
            width: 1920,
            height: 1080,
            frame_rate: None,
        }
    }

    #[test]
    fn test_save_update_delete() {
        let store = InMemoryStore::new();
        let mut record = capture("Heat", 10, false);
        store.save_capture(record.clone()).unwrap();

        record.published = true;
        store.update_capture(record.clone()).unwrap();
        assert_eq!(store.capture(record.id).unwrap(), Some(record.clone()));

        store.delete_capture(record.id).unwrap();
        assert_eq!(store.capture(record.id).unwrap(), None);
        assert!(matches!(
            store.delete_capture(record.id),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.update_capture(record),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_query_filters_and_orders() {
        let store = InMemoryStore::new();
        store.save_capture(capture("Heat", 10, true)).unwrap();
        store.save_capture(capture("Ronin", 30, true)).unwrap();
        store.save_capture(capture("Thief", 20, false)).unwrap();

        let gallery = store
            .query_captures(&CaptureFilter::published(), CaptureOrder::NewestFirst)
            .unwrap();
        let names: Vec<_> = gallery.iter().map(|r| r.movie_name.as_str()).collect();
        assert_eq!(names, vec!["Ronin", "Heat"]);
    }

    #[test]
    fn test_video_file_name_unique() {
        let store = InMemoryStore::new();
        let first = video("heat.mp4");
        let second = video("heat.mp4");
        store.save_video(first).unwrap();
        store.save_video(second.clone()).unwrap();

        assert_eq!(store.find_video("heat.mp4").unwrap(), Some(second));
        assert_eq!(store.snapshot().videos.len(), 1);
        assert_eq!(store.find_video("ronin.mp4").unwrap(), None);
    }

    #[test]
    fn test_live_query_refreshes_on_change() {
        let store = Arc::new(InMemoryStore::new());
        let mut live = LiveQuery::open(
            store.clone(),
            CaptureFilter::published(),
            CaptureOrder::NewestFirst,
        )
        .unwrap();
        assert!(live.results().is_empty());
        assert!(!live.refresh().unwrap());

        let record = capture("Heat", 10, true);
        store.save_capture(record.clone()).unwrap();
        assert!(live.refresh().unwrap());
        assert_eq!(live.results(), &[record.clone()]);

        store.delete_capture(record.id).unwrap();
        assert!(live.refresh().unwrap());
        assert!(live.results().is_empty());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let store = InMemoryStore::new();
        drop(store.subscribe());
        let rx = store.subscribe();

        store.save_capture(capture("Heat", 1, false)).unwrap();
        assert_eq!(store.subscribers.lock().len(), 1);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_snapshot_restore() {
        let store = InMemoryStore::new();
        store.save_capture(capture("Heat", 1, false)).unwrap();
        store.save_capture(capture("Ronin", 2, true)).unwrap();
        store.save_video(video("heat.mp4")).unwrap();

        let snapshot = store.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: StoreSnapshot = serde_json::from_str(&json).unwrap();

        let copy = InMemoryStore::new();
        copy.restore(restored);
        assert_eq!(copy.snapshot(), snapshot);
        assert_eq!(snapshot.captures[0].movie_name, "Ronin");
    }
}
