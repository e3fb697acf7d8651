//! Storage layer for tig.
//!
//! This module is the whole persistence story: content hashing, the four
//! state tables, commit manifests, the content-addressed backup store, and
//! the head pointer. The [`Repository`] type ties them together and owns
//! the engine operations; the CLI never touches the leaf modules directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Repository                            │
//! │   (status, stage, commit, checkout, diff, log, switch)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌──────────┬─────────┼──────────┬──────────┐
//!        ▼          ▼         ▼          ▼          ▼
//!  ┌──────────┐ ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐
//!  │  hasher  │ │ table  │ │manifest│ │ backup │ │  refs  │
//!  │ (sha256) │ │(states)│ │(commits│ │ (blobs)│ │ (HEAD) │
//!  └──────────┘ └────────┘ └────────┘ └────────┘ └────────┘
//! ```
//!
//! Data flows one way, from the state tracker through the commit engine
//! into the manifest and backup stores. Checkout is the only operation that
//! moves backward, from a manifest to the working directory.

pub mod backup;
pub mod diff;
pub mod error;
pub mod hasher;
pub mod manifest;
pub mod refs;
pub mod repository;
pub mod table;
pub mod types;

// Re-export the public API surface.
pub use backup::BackupStore;
pub use diff::{positional_diff, DiffLine};
pub use error::{StorageError, StorageResult};
pub use manifest::{Manifest, ManifestStore};
pub use refs::Head;
pub use repository::{
    LogEntry, Repository, RestoreSummary, StageOutcome, StatusEntry, StatusReport,
    SwitchOutcome, METADATA_DIR,
};
pub use table::{StateTable, TableKind};
pub use types::{
    BranchName, CommitId, FileEntry, FileState, Fingerprint, InvalidNameError, RepoPath,
};
