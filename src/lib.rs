//! tig - a minimal local version control system.
//!
//! Files in a working directory move through four states (untracked,
//! modified, staged, committed) tracked by content hash. A commit freezes
//! the staging area into an immutable, content-addressed snapshot; checkout
//! replays any snapshot back onto disk.
//!
//! # Example
//!
//! ```no_run
//! use tig::storage::{RepoPath, Repository};
//!
//! let repo = Repository::init("./project").unwrap();
//! let path = RepoPath::parse("notes.txt").unwrap();
//! repo.stage(&path).unwrap();
//! let manifest = repo.commit("first snapshot").unwrap();
//! repo.checkout(manifest.id()).unwrap();
//! ```

pub mod cli;
pub mod ignore;
pub mod storage;
