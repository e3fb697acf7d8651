//! Head pointer and branch references.
//!
//! `HEAD` is a single line `branchName,commitId` naming the active branch
//! and its most recent commit; the commit id is empty until the first
//! commit. Each branch is a directory under the metadata root holding its
//! own state tables, manifests and blobs.

use std::fs;
use std::path::Path;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{BranchName, CommitId};

/// The repository-wide head pointer. Mutated only by commit, checkout and
/// switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Head {
    pub branch: BranchName,
    pub commit: Option<CommitId>,
}

impl Head {
    pub fn new(branch: BranchName, commit: Option<CommitId>) -> Self {
        Self { branch, commit }
    }

    /// Parse the `HEAD` file.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let contents = fs::read_to_string(path)?;
        let line = contents.lines().next().unwrap_or("").trim();

        let (raw_branch, raw_commit) = match line.split_once(',') {
            Some(parts) => parts,
            None => (line, ""),
        };

        let branch = BranchName::new(raw_branch).map_err(|e| StorageError::TableParse {
            path: path.to_path_buf(),
            reason: format!("bad branch name in HEAD: {e}"),
        })?;
        let commit = if raw_commit.is_empty() {
            None
        } else {
            Some(
                CommitId::parse(raw_commit).map_err(|e| StorageError::TableParse {
                    path: path.to_path_buf(),
                    reason: format!("bad commit id in HEAD: {e}"),
                })?,
            )
        };

        Ok(Self { branch, commit })
    }

    /// Rewrite the `HEAD` file.
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        let commit = self.commit.as_ref().map(|c| c.as_str()).unwrap_or("");
        fs::write(path, format!("{},{}\n", self.branch, commit))?;
        Ok(())
    }
}

/// List the branch directories under the metadata root, sorted by name.
pub fn list_branches(metadata_dir: &Path) -> StorageResult<Vec<BranchName>> {
    let mut branches = Vec::new();
    for entry in fs::read_dir(metadata_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if let Ok(branch) = BranchName::new(name) {
                branches.push(branch);
            }
        }
    }
    branches.sort();
    Ok(branches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_head_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("HEAD");

        let head = Head::new(BranchName::main(), Some(CommitId::generate()));
        head.save(&path).unwrap();
        assert_eq!(Head::load(&path).unwrap(), head);
    }

    #[test]
    fn test_head_without_commit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("HEAD");

        let head = Head::new(BranchName::main(), None);
        head.save(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "main,\n");
        let loaded = Head::load(&path).unwrap();
        assert_eq!(loaded.commit, None);
    }

    #[test]
    fn test_head_garbage_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("HEAD");
        std::fs::write(&path, "main,not-a-commit-id\n").unwrap();
        assert!(Head::load(&path).is_err());
    }

    #[test]
    fn test_list_branches() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("main")).unwrap();
        std::fs::create_dir(dir.path().join("feature")).unwrap();
        std::fs::write(dir.path().join("HEAD"), "main,").unwrap();

        let branches = list_branches(dir.path()).unwrap();
        let names: Vec<&str> = branches.iter().map(|b| b.as_str()).collect();
        assert_eq!(names, vec!["feature", "main"]);
    }
}
