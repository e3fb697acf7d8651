//! Core type-safe wrappers for the storage layer.
//!
//! Everything that crosses a module boundary as a string on disk (paths,
//! fingerprints, commit ids, branch names) gets a validating newtype here so
//! the engine never passes a blob name where a commit id is expected.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use ulid::Ulid;

/// A content fingerprint: the lowercase hex SHA-256 digest of a file's bytes.
///
/// Fingerprint equality is treated as content equality throughout the
/// system, and the fingerprint doubles as the blob's storage key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Length of a hex-rendered SHA-256 digest.
    pub const HEX_LEN: usize = 64;

    /// Wrap a digest string produced by the hasher. Callers outside the
    /// storage layer go through [`Fingerprint::parse`] instead.
    pub(crate) fn new(hex: String) -> Self {
        debug_assert!(Self::validate(&hex).is_ok());
        Self(hex)
    }

    /// Parse an untrusted fingerprint string (table and manifest rows).
    pub fn parse(hex: impl Into<String>) -> Result<Self, InvalidNameError> {
        let hex = hex.into();
        Self::validate(&hex)?;
        Ok(Self(hex))
    }

    fn validate(hex: &str) -> Result<(), InvalidNameError> {
        if hex.is_empty() {
            return Err(InvalidNameError::Empty);
        }
        if hex.len() != Self::HEX_LEN {
            return Err(InvalidNameError::WrongLength {
                expected: Self::HEX_LEN,
                found: hex.len(),
            });
        }
        for (i, c) in hex.chars().enumerate() {
            if !c.is_ascii_hexdigit() || c.is_ascii_uppercase() {
                return Err(InvalidNameError::InvalidCharacter { char: c, position: i });
            }
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A repository-relative file path, forward-slash normalized.
///
/// This is the unique key in every state table and manifest. Absolute paths,
/// empty paths and `..` components are rejected so an entry can never escape
/// the working root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoPath(String);

impl RepoPath {
    /// Parse and normalize an untrusted path string.
    pub fn parse(path: impl Into<String>) -> Result<Self, InvalidNameError> {
        let normalized = path.into().replace('\\', "/");
        if normalized.is_empty() {
            return Err(InvalidNameError::Empty);
        }
        if normalized.starts_with('/') || normalized.ends_with('/') {
            return Err(InvalidNameError::InvalidPath(normalized));
        }
        for segment in normalized.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(InvalidNameError::InvalidPath(normalized));
            }
        }
        Ok(Self(normalized))
    }

    /// Build a `RepoPath` from a path already known to be relative to the
    /// working root (e.g. out of the directory walk).
    pub fn from_relative(path: &Path) -> Result<Self, InvalidNameError> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => match part.to_str() {
                    Some(s) => segments.push(s),
                    None => {
                        return Err(InvalidNameError::InvalidPath(
                            path.display().to_string(),
                        ))
                    }
                },
                _ => {
                    return Err(InvalidNameError::InvalidPath(
                        path.display().to_string(),
                    ))
                }
            }
        }
        Self::parse(segments.join("/"))
    }

    /// Resolve this path against a working root, using native separators.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for segment in self.0.split('/') {
            out.push(segment);
        }
        out
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RepoPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One (path, fingerprint) pair. Constructed transiently per operation;
/// only the pair itself is ever serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: RepoPath,
    pub fingerprint: Fingerprint,
}

impl FileEntry {
    pub fn new(path: RepoPath, fingerprint: Fingerprint) -> Self {
        Self { path, fingerprint }
    }
}

/// A commit identifier: a lowercase ULID.
///
/// The millisecond-timestamp prefix keeps ids monotonically sortable, so
/// lexicographic order over manifest filenames is chronological order, while
/// the random suffix makes two commits in the same instant distinct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommitId(String);

impl CommitId {
    /// Mint a fresh id for a new commit.
    pub fn generate() -> Self {
        Self(Ulid::new().to_string().to_lowercase())
    }

    /// Parse an untrusted id (CLI operand, manifest filename).
    pub fn parse(id: impl Into<String>) -> Result<Self, InvalidNameError> {
        let id = id.into();
        // Crockford base32 is case-insensitive; the on-disk form is lowercase.
        match Ulid::from_string(&id.to_uppercase()) {
            Ok(_) => Ok(Self(id.to_lowercase())),
            Err(_) => Err(InvalidNameError::InvalidCommitId(id)),
        }
    }

    /// The instant this commit was created, recovered from the id itself.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let millis = Ulid::from_string(&self.0.to_uppercase())
            .map(|u| u.timestamp_ms() as i64)
            .unwrap_or(0);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated branch name.
///
/// Branch names become directory names under the metadata root, so path
/// separators and traversal sequences are rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchName(String);

impl BranchName {
    /// The default branch created by `init`.
    pub const MAIN: &'static str = "main";

    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidNameError::Empty);
        }
        if name.len() > 64 {
            return Err(InvalidNameError::WrongLength {
                expected: 64,
                found: name.len(),
            });
        }
        if name == "." || name == ".." {
            return Err(InvalidNameError::InvalidPath(name));
        }
        for (i, c) in name.chars().enumerate() {
            if !c.is_ascii_alphanumeric() && c != '_' && c != '-' && c != '.' {
                return Err(InvalidNameError::InvalidCharacter { char: c, position: i });
            }
        }
        Ok(Self(name))
    }

    pub fn main() -> Self {
        Self(Self::MAIN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The classification the state tracker assigns to a working-tree file.
/// Every scanned file lands in exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Absent from every table.
    Untracked,
    /// Hash differs from the staged or committed record.
    Modified,
    /// Staged and unchanged since staging.
    Staged,
    /// Committed and unchanged since the last commit.
    Committed,
}

/// Error type for invalid names (paths, fingerprints, ids, branches).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameError {
    Empty,
    WrongLength { expected: usize, found: usize },
    InvalidCharacter { char: char, position: usize },
    InvalidPath(String),
    InvalidCommitId(String),
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name cannot be empty"),
            Self::WrongLength { expected, found } => {
                write!(f, "wrong length: expected {} characters, found {}", expected, found)
            }
            Self::InvalidCharacter { char, position } => {
                write!(f, "invalid character '{}' at position {}", char, position)
            }
            Self::InvalidPath(path) => write!(f, "invalid path: '{}'", path),
            Self::InvalidCommitId(id) => write!(f, "invalid commit id: '{}'", id),
        }
    }
}

impl std::error::Error for InvalidNameError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_parse_valid() {
        let hex = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        let fp = Fingerprint::parse(hex).unwrap();
        assert_eq!(fp.as_str(), hex);
    }

    #[test]
    fn test_fingerprint_parse_invalid() {
        assert!(Fingerprint::parse("").is_err());
        assert!(Fingerprint::parse("abc123").is_err()); // too short
        assert!(Fingerprint::parse("z".repeat(64)).is_err()); // not hex
        assert!(Fingerprint::parse("A".repeat(64)).is_err()); // uppercase
    }

    #[test]
    fn test_repo_path_normalization() {
        let p = RepoPath::parse("docs\\notes\\a.txt").unwrap();
        assert_eq!(p.as_str(), "docs/notes/a.txt");
    }

    #[test]
    fn test_repo_path_rejects_escapes() {
        assert!(RepoPath::parse("").is_err());
        assert!(RepoPath::parse("/etc/passwd").is_err());
        assert!(RepoPath::parse("../outside.txt").is_err());
        assert!(RepoPath::parse("a/../b.txt").is_err());
        assert!(RepoPath::parse("a//b.txt").is_err());
        assert!(RepoPath::parse("dir/").is_err());
    }

    #[test]
    fn test_repo_path_resolution() {
        let p = RepoPath::parse("docs/a.txt").unwrap();
        let resolved = p.to_path(Path::new("/repo"));
        assert_eq!(resolved, Path::new("/repo").join("docs").join("a.txt"));
    }

    #[test]
    fn test_commit_id_generate_and_parse() {
        let id = CommitId::generate();
        assert_eq!(id.as_str(), id.as_str().to_lowercase());
        let reparsed = CommitId::parse(id.as_str()).unwrap();
        assert_eq!(id, reparsed);
    }

    #[test]
    fn test_commit_id_rejects_garbage() {
        assert!(CommitId::parse("1700000000").is_err());
        assert!(CommitId::parse("not-a-commit").is_err());
        assert!(CommitId::parse("").is_err());
    }

    #[test]
    fn test_commit_id_order_is_chronological() {
        let first = CommitId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = CommitId::generate();
        assert!(first < second);
    }

    #[test]
    fn test_commit_id_timestamp_is_recent() {
        let id = CommitId::generate();
        let age = Utc::now().signed_duration_since(id.timestamp());
        assert!(age.num_seconds() < 5);
    }

    #[test]
    fn test_branch_name_validation() {
        assert!(BranchName::new("main").is_ok());
        assert!(BranchName::new("feature-1").is_ok());
        assert!(BranchName::new("").is_err());
        assert!(BranchName::new("a/b").is_err());
        assert!(BranchName::new("..").is_err());
    }
}
