//! Error types for tfsync_core operations.

use crate::ObjectId;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for tfsync_core operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Object with the given ID was not found in the store.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// Hash verification failed during object read.
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// The expected object ID
        expected: String,
        /// The actual computed hash
        actual: String,
    },

    /// The object file is corrupted or has invalid format.
    #[error("corrupted object at {}: {}", path.display(), reason)]
    CorruptedObject {
        /// Path to the corrupted object
        path: PathBuf,
        /// Description of the corruption
        reason: String,
    },

    /// Invalid hex string for ObjectId parsing.
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// Serialization error while encoding a tree, commit or index file.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error while decoding a tree, commit or index file.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// Blob exceeds maximum allowed size.
    #[error("blob too large: {size} bytes exceeds limit of {limit} bytes")]
    BlobTooLarge {
        /// Actual size of the blob
        size: u64,
        /// Maximum allowed size
        limit: u64,
    },

    /// Reference not found.
    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// Invalid ref file content or format.
    #[error("invalid ref at {}: {}", path.display(), reason)]
    InvalidRef {
        /// Path to the invalid ref file
        path: PathBuf,
        /// Description of what's invalid
        reason: String,
    },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The staging index could not be reconciled with the parent tree.
    #[error("unable to build a clean staging state: expected tree {expected}, staged tree is {actual}")]
    StagingInconsistent {
        /// Tree recorded against the parent commit
        expected: ObjectId,
        /// Tree materialized from the staging index after reseeding
        actual: ObjectId,
    },

    /// Another replay holds the staging index for this remote.
    #[error("staging index {} is locked by another replay", path.display())]
    StagingLocked {
        /// Path to the lock file
        path: PathBuf,
    },

    /// A collaborator does not implement the requested operation.
    #[error("operation not supported by this changeset source: {operation}")]
    NotSupported {
        /// Name of the missing operation
        operation: &'static str,
    },

    /// A file item has no content to download.
    #[error("no content available for {0}")]
    ContentUnavailable(String),

    /// The source has no changeset with this id.
    #[error("changeset {0} not found")]
    ChangesetNotFound(i64),

    /// No remote with this id is configured.
    #[error("remote not found: {0}")]
    RemoteNotFound(String),

    /// A history script could not be parsed.
    #[error("invalid history script at line {line}: {reason}")]
    InvalidScript {
        /// 1-based line number
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// An ignore pattern is not a valid regular expression.
    #[error("invalid ignore pattern: {0}")]
    InvalidPattern(String),

    /// The directory does not contain a `.tfsync` repository.
    #[error("not a tfsync repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// `init` was run where a repository already exists.
    #[error("tfsync repository already exists in {}", .0.display())]
    AlreadyInitialized(PathBuf),

    /// Replaying a changeset failed; nothing was committed for it.
    #[error("failed to replay changeset C{changeset_id}: {source}")]
    ChangesetFailed {
        /// Changeset that was being replayed
        changeset_id: i64,
        /// Underlying failure
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// Wraps this error with the changeset that was being replayed.
    pub fn in_changeset(self, changeset_id: i64) -> Self {
        match self {
            already @ Self::ChangesetFailed { .. } => already,
            other => Self::ChangesetFailed {
                changeset_id,
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, skipping `ChangesetFailed` wrappers.
    pub fn root_cause(&self) -> &SyncError {
        match self {
            Self::ChangesetFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self.root_cause() {
            Self::CorruptedObject { .. } | Self::HashMismatch { .. } => {
                Some("Run 'tfsync verify --objects' to identify all corrupted objects.")
            }
            Self::StagingInconsistent { .. } => Some(
                "The staging index disagrees with the last fetched commit. Delete .tfsync/index/<remote> and fetch again.",
            ),
            Self::StagingLocked { .. } => {
                Some("Wait for the other fetch to finish, or remove the stale .lock file if that process is dead.")
            }
            Self::NotARepository(_) => Some("Run 'tfsync init <url> <repository>' first."),
            Self::RemoteNotFound(_) => Some("Check the [remotes] section of .tfsync/config.toml."),
            Self::NotSupported { .. } => {
                Some("The configured changeset source cannot answer this query; use a full client.")
            }
            _ => None,
        }
    }
}

/// Convenience Result type for tfsync_core operations.
pub type Result<T> = std::result::Result<T, SyncError>;
