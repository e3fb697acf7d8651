//! Content-addressed blob storage.
//!
//! Every file content referenced by a manifest is copied into the branch's
//! `backup/` directory under its fingerprint as the sole name. Two files
//! with identical content share one blob, and blobs are never deleted once
//! written (no garbage collection).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{FileEntry, Fingerprint, RepoPath};

/// One branch's blob store, keyed by fingerprint.
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the blob for a fingerprint.
    pub fn blob_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(fingerprint.as_str())
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.blob_path(fingerprint).is_file()
    }

    /// Copy a working file's current bytes into the store under the entry's
    /// fingerprint. A no-op when the blob already exists (content
    /// addressing); fails with `BackupMissing` when the source file has
    /// vanished in the meantime.
    pub fn ingest(&self, entry: &FileEntry, source: &Path) -> StorageResult<()> {
        if self.contains(&entry.fingerprint) {
            debug!("blob {} already stored, skipping", entry.fingerprint);
            return Ok(());
        }
        if !source.is_file() {
            return Err(StorageError::BackupMissing {
                path: entry.path.clone(),
                fingerprint: entry.fingerprint.clone(),
            });
        }
        fs::create_dir_all(&self.dir)?;
        fs::copy(source, self.blob_path(&entry.fingerprint))?;
        debug!("stored blob {} for '{}'", entry.fingerprint, entry.path);
        Ok(())
    }

    /// Copy a blob back out to a working path, creating parent directories
    /// as needed. Fails with `BackupMissing` when the blob is absent.
    pub fn restore(&self, entry: &FileEntry, target: &Path) -> StorageResult<()> {
        let blob = self.blob_path(&entry.fingerprint);
        if !blob.is_file() {
            return Err(StorageError::BackupMissing {
                path: entry.path.clone(),
                fingerprint: entry.fingerprint.clone(),
            });
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&blob, target)?;
        Ok(())
    }

    /// Read a blob's raw bytes (used by diff).
    pub fn read(&self, path: &RepoPath, fingerprint: &Fingerprint) -> StorageResult<Vec<u8>> {
        let blob = self.blob_path(fingerprint);
        if !blob.is_file() {
            return Err(StorageError::BackupMissing {
                path: path.clone(),
                fingerprint: fingerprint.clone(),
            });
        }
        Ok(fs::read(blob)?)
    }
}
