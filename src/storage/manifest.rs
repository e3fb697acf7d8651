//! Commit manifests.
//!
//! A manifest is the immutable record of one commit: a complete
//! path → fingerprint snapshot of the repository plus the commit message,
//! stored as `manifests/<commit-id>.csv` with a fixed header row. Manifests
//! are written once and never mutated.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{CommitId, Fingerprint, RepoPath};

/// Header row of every manifest file.
const MANIFEST_HEADER: &str = "filename,hash,message";

/// File extension for manifest files.
const MANIFEST_EXT: &str = "csv";

/// The immutable record of one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    id: CommitId,
    message: String,
    entries: BTreeMap<RepoPath, Fingerprint>,
}

impl Manifest {
    pub fn new(
        id: CommitId,
        message: impl Into<String>,
        entries: BTreeMap<RepoPath, Fingerprint>,
    ) -> Self {
        Self {
            id,
            message: message.into(),
            entries,
        }
    }

    pub fn id(&self) -> &CommitId {
        &self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn entries(&self) -> &BTreeMap<RepoPath, Fingerprint> {
        &self.entries
    }

    pub fn get(&self, path: &RepoPath) -> Option<&Fingerprint> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &RepoPath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads and writes manifests under one branch's `manifests/` directory.
pub struct ManifestStore {
    dir: PathBuf,
}

impl ManifestStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the manifest file for a commit id.
    pub fn path_for(&self, id: &CommitId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, MANIFEST_EXT))
    }

    pub fn exists(&self, id: &CommitId) -> bool {
        self.path_for(id).is_file()
    }

    /// Write a manifest. The caller guarantees the id is fresh; an existing
    /// file for the same id would be replaced.
    pub fn write(&self, manifest: &Manifest) -> StorageResult<()> {
        fs::create_dir_all(&self.dir)?;

        let mut out = String::from(MANIFEST_HEADER);
        out.push('\n');
        for (path, fingerprint) in &manifest.entries {
            out.push_str(path.as_str());
            out.push(',');
            out.push_str(fingerprint.as_str());
            out.push(',');
            out.push_str(&manifest.message);
            out.push('\n');
        }

        fs::write(self.path_for(&manifest.id), out)?;
        Ok(())
    }

    /// Read the manifest for a commit id.
    pub fn read(&self, id: &CommitId) -> StorageResult<Manifest> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(StorageError::ManifestNotFound(id.to_string()));
        }
        let contents = fs::read_to_string(&path)?;

        let mut lines = contents.lines();
        match lines.next() {
            Some(header) if header.trim_end() == MANIFEST_HEADER => {}
            other => {
                return Err(StorageError::ManifestParse {
                    path,
                    reason: format!(
                        "expected header '{}', found '{}'",
                        MANIFEST_HEADER,
                        other.unwrap_or("")
                    ),
                })
            }
        }

        let mut entries = BTreeMap::new();
        let mut message = String::new();
        for line in lines {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.splitn(3, ',');
            let raw_path = parts.next().unwrap_or("");
            let raw_hash = parts.next().ok_or_else(|| StorageError::ManifestParse {
                path: path.clone(),
                reason: format!("row '{line}' has no fingerprint column"),
            })?;
            let repo_path =
                RepoPath::parse(raw_path).map_err(|e| StorageError::ManifestParse {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            let fingerprint =
                Fingerprint::parse(raw_hash).map_err(|e| StorageError::ManifestParse {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            // Every row repeats the message; keep the first one.
            if entries.is_empty() {
                message = parts.next().unwrap_or("").to_string();
            }
            entries.insert(repo_path, fingerprint);
        }

        Ok(Manifest::new(id.clone(), message, entries))
    }

    /// List commit ids with a manifest on disk, oldest first.
    ///
    /// Lexicographic id order is chronological order, so a plain sort gives
    /// the history sequence.
    pub fn list(&self) -> StorageResult<Vec<CommitId>> {
        let mut ids = Vec::new();
        let dir_entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };

        for entry in dir_entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(MANIFEST_EXT) {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            match CommitId::parse(stem) {
                Ok(id) => ids.push(id),
                Err(_) => {
                    debug!("skipping non-manifest file {}", path.display());
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::hasher::hash_bytes;
    use tempfile::TempDir;

    fn entry(path: &str, bytes: &[u8]) -> (RepoPath, Fingerprint) {
        (RepoPath::parse(path).unwrap(), hash_bytes(bytes))
    }

    fn sample_manifest(message: &str) -> Manifest {
        let entries: BTreeMap<_, _> = [entry("a.txt", b"hello"), entry("docs/b.txt", b"world")]
            .into_iter()
            .collect();
        Manifest::new(CommitId::generate(), message, entries)
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path());

        let manifest = sample_manifest("first commit");
        store.write(&manifest).unwrap();

        let loaded = store.read(manifest.id()).unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_header_row_written() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path());

        let manifest = sample_manifest("msg");
        store.write(&manifest).unwrap();

        let contents = std::fs::read_to_string(store.path_for(manifest.id())).unwrap();
        assert_eq!(contents.lines().next(), Some("filename,hash,message"));
        assert_eq!(contents.lines().count(), 1 + manifest.len());
    }

    #[test]
    fn test_message_may_contain_commas() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path());

        let manifest = sample_manifest("fix a, b, and c");
        store.write(&manifest).unwrap();

        let loaded = store.read(manifest.id()).unwrap();
        assert_eq!(loaded.message(), "fix a, b, and c");
    }

    #[test]
    fn test_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path());
        let err = store.read(&CommitId::generate()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_bad_header_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path());
        let id = CommitId::generate();
        std::fs::write(store.path_for(&id), "not,the,header\n").unwrap();

        let err = store.read(&id).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path());

        let first = sample_manifest("one");
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = sample_manifest("two");
        store.write(&second).unwrap();
        store.write(&first).unwrap();
        std::fs::write(dir.path().join("junk.csv"), "noise").unwrap();
        std::fs::write(dir.path().join("README"), "noise").unwrap();

        let ids = store.list().unwrap();
        assert_eq!(ids, vec![first.id().clone(), second.id().clone()]);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path().join("absent"));
        assert!(store.list().unwrap().is_empty());
    }
}
