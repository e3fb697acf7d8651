//! Content fingerprinting.
//!
//! Deterministic SHA-256 digests of file bytes, rendered as lowercase hex.
//! Fingerprint equality is the system's definition of content equality, so
//! the digest has to be cryptographic strength.

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::storage::error::StorageResult;
use crate::storage::repository::METADATA_DIR;
use crate::storage::types::{FileEntry, Fingerprint, RepoPath};

/// Hash a byte slice. Pure: identical bytes always yield the identical
/// fingerprint string.
pub fn hash_bytes(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Fingerprint::new(format!("{:x}", hasher.finalize()))
}

/// Hash a file's content, streaming so large files never sit in memory.
pub fn hash_file(path: &Path) -> StorageResult<Fingerprint> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(Fingerprint::new(format!("{:x}", hasher.finalize())))
}

/// Hash every file under the working root, excluding the metadata root.
///
/// Returns entries with forward-slash relative paths, sorted by path.
pub fn hash_all(root: &Path) -> StorageResult<Vec<FileEntry>> {
    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && e.file_name() == METADATA_DIR));

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .expect("walked path is under the root");
        let path = RepoPath::from_relative(relative)?;
        let fingerprint = hash_file(entry.path())?;
        entries.push(FileEntry::new(path, fingerprint));
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HELLO_SHA256: &str =
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_hash_bytes_known_value() {
        assert_eq!(hash_bytes(b"hello").as_str(), HELLO_SHA256);
    }

    #[test]
    fn test_hash_determinism() {
        assert_eq!(hash_bytes(b"same bytes"), hash_bytes(b"same bytes"));
        assert_ne!(hash_bytes(b"one"), hash_bytes(b"two"));
    }

    #[test]
    fn test_hash_file_matches_hash_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello").unwrap();
        assert_eq!(hash_file(&path).unwrap().as_str(), HELLO_SHA256);
    }

    #[test]
    fn test_hash_file_missing() {
        let dir = TempDir::new().unwrap();
        assert!(hash_file(&dir.path().join("gone.txt")).is_err());
    }

    #[test]
    fn test_hash_all_skips_metadata_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(METADATA_DIR).join("main")).unwrap();
        fs::write(dir.path().join(METADATA_DIR).join("HEAD"), "main,").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs").join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let entries = hash_all(dir.path()).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "docs/b.txt"]);
    }
}
