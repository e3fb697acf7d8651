//! `.tigignore` handling.
//!
//! The ignore file sits at the repository root, one pattern per line. A
//! pattern is an exact repository-relative path, no globbing.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::Path;
use std::{fs, io};

use crate::storage::types::RepoPath;

/// Name of the ignore file at the repository root.
pub const IGNORE_FILE: &str = ".tigignore";

/// The loaded set of ignore patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    patterns: BTreeSet<String>,
}

impl IgnoreList {
    /// Load the ignore file from a repository root. A missing file means
    /// nothing is ignored.
    pub fn load(root: &Path) -> io::Result<Self> {
        let contents = match fs::read_to_string(root.join(IGNORE_FILE)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e),
        };

        let patterns = contents
            .lines()
            .map(|line| line.trim().replace('\\', "/"))
            .filter(|line| !line.is_empty())
            .collect();

        Ok(Self { patterns })
    }

    /// Exact relative-path match only.
    pub fn is_ignored(&self, path: &RepoPath) -> bool {
        self.patterns.contains(path.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn path(s: &str) -> RepoPath {
        RepoPath::parse(s).unwrap()
    }

    #[test]
    fn test_missing_file_ignores_nothing() {
        let dir = TempDir::new().unwrap();
        let ignore = IgnoreList::load(dir.path()).unwrap();
        assert!(ignore.is_empty());
        assert!(!ignore.is_ignored(&path("a.txt")));
    }

    #[test]
    fn test_exact_match_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(IGNORE_FILE), "build/out.log\nsecret.txt\n").unwrap();

        let ignore = IgnoreList::load(dir.path()).unwrap();
        assert!(ignore.is_ignored(&path("secret.txt")));
        assert!(ignore.is_ignored(&path("build/out.log")));
        // No globbing, no prefix matching.
        assert!(!ignore.is_ignored(&path("build/out2.log")));
        assert!(!ignore.is_ignored(&path("nested/secret.txt")));
    }

    #[test]
    fn test_blank_lines_and_whitespace() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(IGNORE_FILE), "\n  a.txt  \n\n").unwrap();

        let ignore = IgnoreList::load(dir.path()).unwrap();
        assert!(ignore.is_ignored(&path("a.txt")));
    }
}
