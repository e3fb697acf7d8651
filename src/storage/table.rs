//! Persisted state tables.
//!
//! Four flat files per branch track where every path stands: staged,
//! untracked, modified, committed. Each file is one `path,fingerprint` line
//! per entry. Tables are read in full at the start of an operation, mutated
//! in memory, and rewritten in full at the end. This whole-file cycle is
//! the concurrency unit; there is no append log.
//!
//! The line format is parsed and serialized only here; engine code never
//! touches raw lines.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{Fingerprint, RepoPath};

/// Which of the four tables a `StateTable` instance is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Staged,
    Untracked,
    Modified,
    Committed,
}

impl TableKind {
    /// On-disk file name under the branch directory.
    pub fn file_name(self) -> &'static str {
        match self {
            TableKind::Staged => "staged_files.txt",
            TableKind::Untracked => "untracked_files.txt",
            TableKind::Modified => "modified_files.txt",
            TableKind::Committed => "committed_files.txt",
        }
    }
}

/// An in-memory path → fingerprint table.
///
/// Backed by a `BTreeMap` so serialization order is deterministic and paths
/// are unique by construction.
#[derive(Debug, Clone)]
pub struct StateTable {
    kind: TableKind,
    entries: BTreeMap<RepoPath, Fingerprint>,
}

impl StateTable {
    /// Create an empty table.
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// Build a table from an existing entry set (e.g. a manifest's).
    pub fn from_entries(kind: TableKind, entries: BTreeMap<RepoPath, Fingerprint>) -> Self {
        Self { kind, entries }
    }

    /// Load a table from disk. A missing file reads as an empty table.
    pub fn load(path: &Path, kind: TableKind) -> StorageResult<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new(kind)),
            Err(e) => return Err(e.into()),
        };

        let mut entries = BTreeMap::new();
        for line in contents.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let (raw_path, raw_hash) = line.split_once(',').ok_or_else(|| {
                StorageError::TableParse {
                    path: path.to_path_buf(),
                    reason: format!("missing ',' separator in line '{line}'"),
                }
            })?;
            let repo_path =
                RepoPath::parse(raw_path).map_err(|e| StorageError::TableParse {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            let fingerprint =
                Fingerprint::parse(raw_hash).map_err(|e| StorageError::TableParse {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            entries.insert(repo_path, fingerprint);
        }

        Ok(Self { kind, entries })
    }

    /// Rewrite the whole table file. Replaces any previous contents.
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        let mut out = String::new();
        for (repo_path, fingerprint) in &self.entries {
            out.push_str(repo_path.as_str());
            out.push(',');
            out.push_str(fingerprint.as_str());
            out.push('\n');
        }
        fs::write(path, out)?;
        Ok(())
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn get(&self, path: &RepoPath) -> Option<&Fingerprint> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &RepoPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Insert or replace an entry, returning the previous fingerprint.
    pub fn insert(&mut self, path: RepoPath, fingerprint: Fingerprint) -> Option<Fingerprint> {
        self.entries.insert(path, fingerprint)
    }

    pub fn remove(&mut self, path: &RepoPath) -> Option<Fingerprint> {
        self.entries.remove(path)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RepoPath, &Fingerprint)> {
        self.entries.iter()
    }

    /// Paths only, in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &RepoPath> {
        self.entries.keys()
    }

    pub fn entries(&self) -> &BTreeMap<RepoPath, Fingerprint> {
        &self.entries
    }
}
