//! Capture queries and live result sets.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use tracing::debug;
use uuid::Uuid;

use crate::records::CaptureRecord;
use crate::store::DocumentStore;
use crate::StoreResult;

/// A change applied to a document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    CaptureSaved(Uuid),
    CaptureUpdated(Uuid),
    CaptureDeleted(Uuid),
    VideoSaved(Uuid),
}

/// Which captures a query returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureFilter {
    /// Only captures made by this editor.
    pub editor: Option<Uuid>,

    /// Only captures with this publish flag.
    pub published: Option<bool>,

    /// Only captures taken at or after this epoch millisecond.
    pub captured_since: Option<u64>,

    /// Only captures taken at or before this epoch millisecond.
    pub captured_until: Option<u64>,
}

impl CaptureFilter {
    /// Captures made by `editor`.
    pub fn by_editor(editor: Uuid) -> Self {
        Self {
            editor: Some(editor),
            ..Self::default()
        }
    }

    /// Captures visible in the public gallery.
    pub fn published() -> Self {
        Self {
            published: Some(true),
            ..Self::default()
        }
    }

    /// Returns true if `record` passes the filter.
    pub fn matches(&self, record: &CaptureRecord) -> bool {
        if let Some(editor) = self.editor {
            if !record.is_owned_by(editor) {
                return false;
            }
        }
        if let Some(published) = self.published {
            if record.published != published {
                return false;
            }
        }
        if let Some(since) = self.captured_since {
            if record.captured_at < since {
                return false;
            }
        }
        if let Some(until) = self.captured_until {
            if record.captured_at > until {
                return false;
            }
        }
        true
    }
}

/// Result ordering by capture time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptureOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl CaptureOrder {
    /// Sort `records` in place.
    pub fn sort(self, records: &mut [CaptureRecord]) {
        match self {
            Self::NewestFirst => records.sort_by(|a, b| b.captured_at.cmp(&a.captured_at)),
            Self::OldestFirst => records.sort_by(|a, b| a.captured_at.cmp(&b.captured_at)),
        }
    }
}

/// A query result that re-runs whenever the store changes.
pub struct LiveQuery {
    store: Arc<dyn DocumentStore>,
    filter: CaptureFilter,
    order: CaptureOrder,
    changes: Receiver<StoreChange>,
    results: Vec<CaptureRecord>,
}

impl LiveQuery {
    /// Subscribe to `store` and run the query once.
    pub fn open(
        store: Arc<dyn DocumentStore>,
        filter: CaptureFilter,
        order: CaptureOrder,
    ) -> StoreResult<Self> {
        let changes = store.subscribe();
        let results = store.query_captures(&filter, order)?;
        Ok(Self {
            store,
            filter,
            order,
            changes,
            results,
        })
    }

    /// Current results.
    pub fn results(&self) -> &[CaptureRecord] {
        &self.results
    }

    /// Re-run the query if the store changed since the last refresh.
    ///
    /// Returns true if the results were refreshed.
    pub fn refresh(&mut self) -> StoreResult<bool> {
        let pending = self.changes.try_iter().count();
        if pending == 0 {
            return Ok(false);
        }

        self.results = self.store.query_captures(&self.filter, self.order)?;
        debug!(pending, results = self.results.len(), "Live query refreshed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(captured_at: u64, published: bool, editor: Option<Uuid>) -> CaptureRecord {
        CaptureRecord {
            id: Uuid::new_v4(),
            movie_name: "Heat".to_string(),
            reference_link: String::new(),
            timestamp: "00:00:00".to_string(),
            frame_url: String::new(),
            notes: None,
            tags: Vec::new(),
            captured_at,
            published,
            video_file_name: None,
            video: None,
            editor,
            frame_file: None,
        }
    }

    #[test]
    fn test_filter_fields() {
        let editor = Uuid::new_v4();
        let mine = record(100, false, Some(editor));
        let theirs = record(200, true, Some(Uuid::new_v4()));

        assert!(CaptureFilter::by_editor(editor).matches(&mine));
        assert!(!CaptureFilter::by_editor(editor).matches(&theirs));
        assert!(CaptureFilter::published().matches(&theirs));
        assert!(!CaptureFilter::published().matches(&mine));

        let window = CaptureFilter {
            captured_since: Some(150),
            captured_until: Some(250),
            ..CaptureFilter::default()
        };
        assert!(!window.matches(&mine));
        assert!(window.matches(&theirs));
    }

    #[test]
    fn test_order() {
        let mut records = vec![record(2, false, None), record(3, false, None), record(1, false, None)];

        CaptureOrder::NewestFirst.sort(&mut records);
        let times: Vec<_> = records.iter().map(|r| r.captured_at).collect();
        assert_eq!(times, vec![3, 2, 1]);

        CaptureOrder::OldestFirst.sort(&mut records);
        let times: Vec<_> = records.iter().map(|r| r.captured_at).collect();
        assert_eq!(times, vec![1, 2, 3]);
    }
}
