//! Error types for the sync engine.
//!
//! [`SyncError`] covers every way a sync run can stop early. Only
//! configuration and connection-setup errors are hard failures returned to
//! the caller; enumeration errors halt the producing side of a flow and end
//! up in [`crate::SyncReport::halted`]. Per-object failures never become a
//! `SyncError` at all: they are recorded as
//! [`crate::summary::ItemStatus::Failed`] and the batch continues.

use std::path::PathBuf;

use crate::store::StoreError;

/// Sync engine error type.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    // -----------------------------------------------------------------------
    // Hard failures
    // -----------------------------------------------------------------------
    /// A required configuration value is empty.
    #[error("missing required configuration: {field}")]
    MissingConfig {
        /// Name of the missing field.
        field: &'static str,
    },

    /// The storage client could not be constructed.
    #[error("failed to set up storage connection: {0}")]
    ConnectionSetup(String),

    // -----------------------------------------------------------------------
    // Enumeration errors
    // -----------------------------------------------------------------------
    /// Walking the local tree failed.
    #[error("failed to walk {}: {message}", path.display())]
    Walk {
        /// Path being visited when the walk failed.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// The local path could not be inspected or prepared.
    #[error("local path {}: {source}", path.display())]
    LocalPath {
        /// The offending path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A listing page could not be fetched.
    #[error("failed to list prefix {prefix:?} at marker {marker:?}: {source}")]
    Listing {
        /// The listed prefix.
        prefix: String,
        /// The marker sent with the failing request.
        marker: String,
        /// Underlying storage error.
        source: StoreError,
    },

    /// A truncated listing page repeated the marker it was requested with.
    #[error("listing stalled: truncated page did not advance past marker {marker:?}")]
    StalledListing {
        /// The marker the listing was stuck on.
        marker: String,
    },

    /// A listed key or marker could not be URL-decoded.
    #[error("invalid URL-encoded listing value: {value}")]
    KeyEncoding {
        /// The raw value as returned by the store.
        value: String,
    },

    // -----------------------------------------------------------------------
    // Other
    // -----------------------------------------------------------------------
    /// The run was cancelled or hit its deadline.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// Whether this error is a hard failure that aborts the run before any
    /// transfer starts.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingConfig { .. } | Self::ConnectionSetup(_))
    }
}

/// Convenience result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
