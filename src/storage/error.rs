//! Storage layer error types.
//!
//! All failures the engine can surface are defined here. We use `thiserror`
//! for ergonomic error definitions and readable messages.

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::types::{Fingerprint, InvalidNameError, RepoPath};

/// The main error type for repository operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No metadata root in the given directory or any ancestor.
    #[error("no repository found at or above {0}")]
    RepositoryNotFound(PathBuf),

    /// `init` ran on a directory that already holds a repository.
    #[error("repository already initialized at {0}")]
    AlreadyInitialized(PathBuf),

    /// An operand path is missing from the working directory.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// Commit was asked to snapshot an empty staging area.
    #[error("staging area is empty: nothing to commit")]
    EmptyStagingArea,

    /// No manifest exists for the requested commit id.
    #[error("commit '{0}' does not exist")]
    ManifestNotFound(String),

    /// A manifest file exists but cannot be parsed.
    #[error("malformed manifest at {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    /// A state table file cannot be parsed.
    #[error("malformed state table at {path}: {reason}")]
    TableParse { path: PathBuf, reason: String },

    /// Diff was asked about a path the last commit does not track.
    #[error("file '{0}' was not committed in the last commit")]
    FileNotTracked(RepoPath),

    /// A referenced blob is absent from the backup store, or the source
    /// file for a pending blob vanished before it could be copied.
    #[error("backup blob missing for '{path}' ({fingerprint})")]
    BackupMissing {
        path: RepoPath,
        fingerprint: Fingerprint,
    },

    /// Invalid path, fingerprint, branch or commit-id string.
    #[error("invalid name: {0}")]
    InvalidName(#[from] InvalidNameError),

    /// I/O error (filesystem level).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Check if this error indicates the target doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::RepositoryNotFound(_)
                | StorageError::FileNotFound(_)
                | StorageError::ManifestNotFound(_)
                | StorageError::FileNotTracked(_)
                | StorageError::BackupMissing { .. }
        )
    }

    /// Check if this error means persisted data is unreadable.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            StorageError::ManifestParse { .. } | StorageError::TableParse { .. }
        )
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
