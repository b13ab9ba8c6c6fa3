//! Error types for the store.

use thiserror::Error;
use uuid::Uuid;

use framegrab_capture::CaptureError;
use framegrab_ipc::TimecodeError;

/// Errors that can occur while persisting captures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No editor is signed in.
    #[error("Not signed in")]
    NotSignedIn,

    /// Movie name is empty.
    #[error("Movie name is required")]
    MissingMovieName,

    /// Reference link is not an IMDb title page.
    #[error("Invalid IMDb link: {0}")]
    InvalidReferenceLink(String),

    /// Timestamp is not `HH:MM:SS[.mmm]`.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(#[from] TimecodeError),

    /// Email address is malformed.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Sign-in attempted without requesting a code first.
    #[error("No sign-in code pending for {0}")]
    NoPendingCode(String),

    /// Sign-in code does not match.
    #[error("Invalid sign-in code")]
    InvalidCode,

    /// Record does not exist.
    #[error("Record not found: {0}")]
    NotFound(Uuid),

    /// Record belongs to another editor.
    #[error("Record {0} belongs to another editor")]
    Forbidden(Uuid),

    /// Object path is empty, absolute or escapes the storage root.
    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    /// Upload without any bytes.
    #[error("Upload is empty")]
    EmptyUpload,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns true for errors caused by user-entered metadata.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingMovieName | Self::InvalidReferenceLink(_) | Self::InvalidTimestamp(_)
        )
    }
}

impl From<StoreError> for CaptureError {
    fn from(err: StoreError) -> Self {
        if err.is_validation() {
            CaptureError::InvalidMetadata(err.to_string())
        } else {
            CaptureError::Persistence(err.to_string())
        }
    }
}
