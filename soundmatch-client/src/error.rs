//! Error types for soundmatch-client
//!
//! Every [`SessionError`] is recovered into the single user-visible error
//! slot of the session state; none is fatal. A later error replaces an
//! earlier one.

use thiserror::Error;

/// Session-level error kinds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Selection rejected before any network call
    #[error("Invalid file type: {media_type}")]
    InvalidFileType { media_type: String },

    /// Submission network or service error
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Per-match audio fetch error
    #[error("Playback fetch failed for {path}: {reason}")]
    PlaybackFetchFailed { path: String, reason: String },
}

impl SessionError {
    /// Message shown to the user in the error slot
    pub fn user_message(&self) -> &'static str {
        match self {
            SessionError::InvalidFileType { .. } => "Please select a valid audio file",
            SessionError::UploadFailed(_) => "Error finding similar songs. Please try again.",
            SessionError::PlaybackFetchFailed { .. } => {
                "Error loading audio file. Please try again."
            }
        }
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
