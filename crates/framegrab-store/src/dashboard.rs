//! Managing saved captures.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, instrument};
use uuid::Uuid;

use framegrab_ipc::parse_timestamp;

use crate::error::StoreError;
use crate::identity::IdentityProvider;
use crate::metadata::{is_reference_link, parse_tags, sanitize_file_name};
use crate::query::{CaptureFilter, CaptureOrder, LiveQuery};
use crate::records::{CaptureRecord, UserRecord};
use crate::storage::{discard_upload, ObjectStorage};
use crate::store::DocumentStore;
use crate::{epoch_millis, StoreResult};

/// Timestamp given to manual uploads that do not specify one.
const DEFAULT_STILL_TIMESTAMP: &str = "00:00:00";

/// File name used when sanitizing leaves nothing.
const FALLBACK_FILE_NAME: &str = "image.jpg";

/// Client-side narrowing of a capture list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Case-insensitive text matched against movie name, notes and tags.
    pub search: String,

    /// Exact movie name.
    pub movie: Option<String>,
}

/// Captures matching `filter`, in their original order.
pub fn filter_captures<'a>(
    captures: &'a [CaptureRecord],
    filter: &SearchFilter,
) -> Vec<&'a CaptureRecord> {
    let needle = filter.search.to_lowercase();
    captures
        .iter()
        .filter(|capture| {
            let matches_search = needle.is_empty()
                || capture.movie_name.to_lowercase().contains(&needle)
                || capture
                    .notes
                    .as_ref()
                    .is_some_and(|notes| notes.to_lowercase().contains(&needle))
                || capture
                    .tags
                    .iter()
                    .any(|tag| tag.to_lowercase().contains(&needle));
            let matches_movie = filter
                .movie
                .as_ref()
                .map_or(true, |movie| movie.is_empty() || capture.movie_name == *movie);
            matches_search && matches_movie
        })
        .collect()
}

/// Distinct movie names in order of first appearance.
pub fn movie_names(captures: &[CaptureRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    captures
        .iter()
        .filter(|capture| seen.insert(capture.movie_name.as_str()))
        .map(|capture| capture.movie_name.clone())
        .collect()
}

/// Publish counts for a capture list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    pub published: usize,
    pub drafts: usize,
}

impl DashboardStats {
    pub fn count(captures: &[CaptureRecord]) -> Self {
        let published = captures.iter().filter(|c| c.published).count();
        Self {
            total: captures.len(),
            published,
            drafts: captures.len() - published,
        }
    }
}

/// New values for an existing capture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureEdit {
    pub movie_name: String,
    pub reference_link: String,
    pub timestamp: String,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub published: bool,
}

/// A still image uploaded without going through the editor.
#[derive(Debug, Clone, Default)]
pub struct ManualUpload {
    pub file_name: String,
    pub bytes: Bytes,
    pub movie_name: String,

    /// `HH:MM:SS[.mmm]`; `00:00:00` when empty.
    pub timestamp: String,

    /// Optional IMDb link.
    pub reference_link: String,

    pub notes: String,

    /// Comma-separated.
    pub tags: String,

    pub published: bool,
}

/// The signed-in editor's view of their captures, plus the public gallery.
pub struct Dashboard {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStorage>,
    identity: Arc<dyn IdentityProvider>,
    clock: fn() -> u64,
}

impl Dashboard {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStorage>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            storage,
            identity,
            clock: epoch_millis,
        }
    }

    /// Use `clock` (epoch milliseconds) instead of the system time.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    fn user(&self) -> StoreResult<UserRecord> {
        self.identity.current_user().ok_or(StoreError::NotSignedIn)
    }

    fn owned_capture(&self, id: Uuid) -> StoreResult<CaptureRecord> {
        let user = self.user()?;
        let capture = self.store.capture(id)?.ok_or(StoreError::NotFound(id))?;
        if !capture.is_owned_by(user.id) {
            return Err(StoreError::Forbidden(id));
        }
        Ok(capture)
    }

    /// The editor's captures, newest first.
    pub fn captures(&self) -> StoreResult<Vec<CaptureRecord>> {
        let user = self.user()?;
        self.store
            .query_captures(&CaptureFilter::by_editor(user.id), CaptureOrder::NewestFirst)
    }

    /// Live version of [`Dashboard::captures`].
    pub fn watch_captures(&self) -> StoreResult<LiveQuery> {
        let user = self.user()?;
        LiveQuery::open(
            self.store.clone(),
            CaptureFilter::by_editor(user.id),
            CaptureOrder::NewestFirst,
        )
    }

    /// Published captures from every editor, newest first. No sign-in needed.
    pub fn gallery(&self) -> StoreResult<Vec<CaptureRecord>> {
        self.store
            .query_captures(&CaptureFilter::published(), CaptureOrder::NewestFirst)
    }

    /// Live version of [`Dashboard::gallery`].
    pub fn watch_gallery(&self) -> StoreResult<LiveQuery> {
        LiveQuery::open(
            self.store.clone(),
            CaptureFilter::published(),
            CaptureOrder::NewestFirst,
        )
    }

    /// Flip the publish flag.
    #[instrument(name = "toggle_publish", skip(self))]
    pub fn toggle_publish(&self, id: Uuid) -> StoreResult<CaptureRecord> {
        let mut capture = self.owned_capture(id)?;
        capture.published = !capture.published;
        self.store.update_capture(capture.clone())?;
        info!(published = capture.published, "Publish flag changed");
        Ok(capture)
    }

    #[instrument(name = "delete_capture", skip(self))]
    pub fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.owned_capture(id)?;
        self.store.delete_capture(id)?;
        info!("Capture deleted");
        Ok(())
    }

    /// Replace the editable fields of a capture.
    #[instrument(name = "edit_capture", skip(self, edit))]
    pub fn edit(&self, id: Uuid, edit: CaptureEdit) -> StoreResult<CaptureRecord> {
        let mut capture = self.owned_capture(id)?;

        let movie_name = edit.movie_name.trim();
        if movie_name.is_empty() {
            return Err(StoreError::MissingMovieName);
        }
        let reference_link = checked_link(&edit.reference_link)?;
        let timestamp = edit.timestamp.trim();
        parse_timestamp(timestamp)?;

        capture.movie_name = movie_name.to_string();
        capture.reference_link = reference_link;
        capture.timestamp = timestamp.to_string();
        capture.notes = edit
            .notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());
        capture.tags = edit
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();
        capture.published = edit.published;

        self.store.update_capture(capture.clone())?;
        info!("Capture edited");
        Ok(capture)
    }

    /// Upload a still image as a new capture.
    #[instrument(name = "upload_still", skip_all, fields(file = %upload.file_name))]
    pub fn upload_still(&self, upload: ManualUpload) -> StoreResult<CaptureRecord> {
        let user = self.user()?;

        let movie_name = upload.movie_name.trim();
        if movie_name.is_empty() {
            return Err(StoreError::MissingMovieName);
        }
        let reference_link = checked_link(&upload.reference_link)?;
        let timestamp = match upload.timestamp.trim() {
            "" => DEFAULT_STILL_TIMESTAMP,
            entered => {
                parse_timestamp(entered)?;
                entered
            }
        };

        let now = (self.clock)();
        let mut name = sanitize_file_name(&upload.file_name);
        if name.is_empty() {
            name = FALLBACK_FILE_NAME.to_string();
        }
        let path = format!("captures/{}_{}", now, name);
        let file = self.storage.upload(&path, upload.bytes)?;

        let notes = upload.notes.trim();
        let record = CaptureRecord {
            id: Uuid::new_v4(),
            movie_name: movie_name.to_string(),
            reference_link,
            timestamp: timestamp.to_string(),
            frame_url: file.url,
            notes: (!notes.is_empty()).then(|| notes.to_string()),
            tags: parse_tags(&upload.tags),
            captured_at: now,
            published: upload.published,
            video_file_name: None,
            video: None,
            editor: Some(user.id),
            frame_file: Some(file.id),
        };
        if let Err(e) = self.store.save_capture(record.clone()) {
            discard_upload(self.storage.as_ref(), &path);
            return Err(e);
        }

        info!(id = %record.id, path = %path, "Still uploaded");
        Ok(record)
    }
}

/// An empty link is allowed; anything else must be an IMDb title page.
fn checked_link(link: &str) -> StoreResult<String> {
    let link = link.trim();
    if !link.is_empty() && !is_reference_link(link) {
        return Err(StoreError::InvalidReferenceLink(link.to_string()));
    }
    Ok(link.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Receiver;

    use crate::identity::{CodeDelivery, InMemoryIdentity};
    use crate::storage::InMemoryObjectStorage;
    use crate::store::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        storage: Arc<InMemoryObjectStorage>,
        identity: Arc<InMemoryIdentity>,
        deliveries: Receiver<CodeDelivery>,
        dashboard: Dashboard,
    }

    fn fixed_clock() -> u64 {
        1_700_000_000_123
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let storage = Arc::new(InMemoryObjectStorage::new());
        let (identity, deliveries) = InMemoryIdentity::new();
        let identity = Arc::new(identity);
        let dashboard = Dashboard::new(store.clone(), storage.clone(), identity.clone())
            .with_clock(fixed_clock);

        let fx = Fixture {
            store,
            storage,
            identity,
            deliveries,
            dashboard,
        };
        fx.sign_in("editor@example.com");
        fx
    }

    impl Fixture {
        fn sign_in(&self, email: &str) -> UserRecord {
            self.identity.send_code(email).unwrap();
            let code = self.deliveries.try_recv().unwrap().code;
            self.identity.sign_in_with_code(email, &code).unwrap()
        }

        fn add(&self, movie: &str, captured_at: u64, published: bool) -> CaptureRecord {
            let record = capture(movie, captured_at, published, self.identity.current_user());
            self.store.save_capture(record.clone()).unwrap();
            record
        }
    }

    fn capture(
        movie: &str,
        captured_at: u64,
        published: bool,
        editor: Option<UserRecord>,
    ) -> CaptureRecord {
        CaptureRecord {
            id: Uuid::new_v4(),
            movie_name: movie.to_string(),
            reference_link: String::new(),
            timestamp: "00:10:00.000".to_string(),
            frame_url: String::new(),
            notes: None,
            tags: Vec::new(),
            captured_at,
            published,
            video_file_name: None,
            video: None,
            editor: editor.map(|user| user.id),
            frame_file: None,
        }
    }

    #[test]
    fn test_search_and_movie_filter() {
        let mut noir = capture("Heat", 1, false, None);
        noir.tags = vec!["Night".to_string()];
        let mut diner = capture("Heat", 2, false, None);
        diner.notes = Some("The diner scene".to_string());
        let other = capture("Ronin", 3, false, None);
        let captures = vec![noir, diner, other];

        let by_tag = filter_captures(
            &captures,
            &SearchFilter {
                search: "night".to_string(),
                movie: None,
            },
        );
        assert_eq!(by_tag.len(), 1);

        let by_notes = filter_captures(
            &captures,
            &SearchFilter {
                search: "DINER".to_string(),
                movie: None,
            },
        );
        assert_eq!(by_notes[0].captured_at, 2);

        let by_movie = filter_captures(
            &captures,
            &SearchFilter {
                search: String::new(),
                movie: Some("Heat".to_string()),
            },
        );
        assert_eq!(by_movie.len(), 2);
        assert_eq!(filter_captures(&captures, &SearchFilter::default()).len(), 3);

        assert_eq!(movie_names(&captures), vec!["Heat", "Ronin"]);
        assert_eq!(
            DashboardStats::count(&captures),
            DashboardStats {
                total: 3,
                published: 0,
                drafts: 3
            }
        );
    }

    #[test]
    fn test_lists_only_own_captures_newest_first() {
        let fx = fixture();
        fx.add("Heat", 1, false);
        fx.add("Ronin", 2, true);
        fx.store
            .save_capture(capture("Thief", 3, true, None))
            .unwrap();

        let names: Vec<_> = fx
            .dashboard
            .captures()
            .unwrap()
            .into_iter()
            .map(|c| c.movie_name)
            .collect();
        assert_eq!(names, vec!["Ronin", "Heat"]);

        let gallery: Vec<_> = fx
            .dashboard
            .gallery()
            .unwrap()
            .into_iter()
            .map(|c| c.movie_name)
            .collect();
        assert_eq!(gallery, vec!["Thief", "Ronin"]);
    }

    #[test]
    fn test_toggle_publish_and_delete() {
        let fx = fixture();
        let record = fx.add("Heat", 1, false);
        let mut live = fx.dashboard.watch_gallery().unwrap();

        let toggled = fx.dashboard.toggle_publish(record.id).unwrap();
        assert!(toggled.published);
        assert!(live.refresh().unwrap());
        assert_eq!(live.results().len(), 1);

        fx.dashboard.delete(record.id).unwrap();
        assert!(fx.store.capture(record.id).unwrap().is_none());
        assert!(matches!(
            fx.dashboard.delete(record.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_cannot_touch_other_editors_captures() {
        let fx = fixture();
        let record = fx.add("Heat", 1, false);

        fx.identity.sign_out();
        assert!(matches!(
            fx.dashboard.toggle_publish(record.id),
            Err(StoreError::NotSignedIn)
        ));

        fx.sign_in("someone@example.com");
        assert!(matches!(
            fx.dashboard.delete(record.id),
            Err(StoreError::Forbidden(_))
        ));
    }

    #[test]
    fn test_edit_validates_and_saves() {
        let fx = fixture();
        let record = fx.add("Heat", 1, false);

        let edit = CaptureEdit {
            movie_name: "Heat (1995)".to_string(),
            reference_link: "https://www.imdb.com/title/tt0113277/".to_string(),
            timestamp: "01:02:05.456".to_string(),
            notes: Some(" coffee shop ".to_string()),
            tags: vec!["two-shot".to_string()],
            published: true,
        };
        let edited = fx.dashboard.edit(record.id, edit.clone()).unwrap();
        assert_eq!(edited.movie_name, "Heat (1995)");
        assert_eq!(edited.notes.as_deref(), Some("coffee shop"));
        assert_eq!(fx.store.capture(record.id).unwrap(), Some(edited));

        let bad_time = CaptureEdit {
            timestamp: "1:99".to_string(),
            ..edit.clone()
        };
        assert!(matches!(
            fx.dashboard.edit(record.id, bad_time),
            Err(StoreError::InvalidTimestamp(_))
        ));

        let bad_link = CaptureEdit {
            reference_link: "https://example.com".to_string(),
            ..edit
        };
        assert!(matches!(
            fx.dashboard.edit(record.id, bad_link),
            Err(StoreError::InvalidReferenceLink(_))
        ));
    }

    #[test]
    fn test_manual_upload() {
        let fx = fixture();
        let user = fx.identity.current_user().unwrap();

        let record = fx
            .dashboard
            .upload_still(ManualUpload {
                file_name: "Heat still  #3.jpg".to_string(),
                bytes: Bytes::from_static(b"\xff\xd8\xff"),
                movie_name: "Heat".to_string(),
                tags: "diner, ,night".to_string(),
                ..ManualUpload::default()
            })
            .unwrap();

        assert_eq!(record.timestamp, "00:00:00");
        assert_eq!(record.tags, vec!["diner", "night"]);
        assert_eq!(record.notes, None);
        assert_eq!(record.editor, Some(user.id));
        assert_eq!(record.video, None);
        assert_eq!(
            record.frame_url,
            "mem://captures/1700000000123_Heat_still_3.jpg"
        );
        assert_eq!(fx.storage.len(), 1);
    }

    #[test]
    fn test_manual_upload_fallback_name_and_validation() {
        let fx = fixture();

        let record = fx
            .dashboard
            .upload_still(ManualUpload {
                file_name: "電影.jpg".to_string(),
                bytes: Bytes::from_static(b"\xff\xd8\xff"),
                movie_name: "Hero".to_string(),
                ..ManualUpload::default()
            })
            .unwrap();
        assert_eq!(record.frame_url, "mem://captures/1700000000123_.jpg");

        let record = fx
            .dashboard
            .upload_still(ManualUpload {
                file_name: "電影".to_string(),
                bytes: Bytes::from_static(b"\xff\xd8\xff"),
                movie_name: "Hero".to_string(),
                ..ManualUpload::default()
            })
            .unwrap();
        assert_eq!(record.frame_url, "mem://captures/1700000000123_image.jpg");

        assert!(matches!(
            fx.dashboard.upload_still(ManualUpload {
                file_name: "a.jpg".to_string(),
                bytes: Bytes::from_static(b"x"),
                ..ManualUpload::default()
            }),
            Err(StoreError::MissingMovieName)
        ));
    }
}
