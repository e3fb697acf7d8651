//! The repository context and the engine operations.
//!
//! `Repository` is the central component of the storage layer. It is an
//! explicit context value constructed once per command (`init`, `open` or
//! `discover`) and threaded into every operation; there is no hidden
//! global repository location.
//!
//! All other storage modules are driven from here: the state tracker,
//! staging, the commit engine, and checkout/restore.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::ignore::IgnoreList;
use crate::storage::backup::BackupStore;
use crate::storage::diff::{positional_diff, DiffLine};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::hasher;
use crate::storage::manifest::{Manifest, ManifestStore};
use crate::storage::refs::{self, Head};
use crate::storage::table::{StateTable, TableKind};
use crate::storage::types::{
    BranchName, CommitId, FileEntry, FileState, InvalidNameError, RepoPath,
};

/// Name of the metadata root directory.
pub const METADATA_DIR: &str = ".tig";

/// Subdirectory of a branch holding one manifest per commit.
const MANIFESTS_DIR: &str = "manifests";

/// Subdirectory of a branch holding content-addressed blobs.
const BACKUP_DIR: &str = "backup";

/// Name of the head pointer file.
const HEAD_FILE: &str = "HEAD";

/// A local repository: a working root plus the `.tig` metadata tree.
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
}

/// Filesystem locations of one branch's persisted state.
struct BranchPaths {
    dir: PathBuf,
}

impl BranchPaths {
    fn table(&self, kind: TableKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    fn manifests(&self) -> PathBuf {
        self.dir.join(MANIFESTS_DIR)
    }

    fn backup(&self) -> PathBuf {
        self.dir.join(BACKUP_DIR)
    }
}

/// One classified file from a status scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: RepoPath,
    pub state: FileState,
}

/// Result of a status scan.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub branch: BranchName,
    pub entries: Vec<StatusEntry>,
}

/// What staging one path did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The path is now (re)staged with its current fingerprint.
    Staged,
    /// Already staged with the same fingerprint; nothing changed.
    Unchanged,
    /// The path matches an ignore rule; nothing changed.
    Ignored,
}

/// Result of restoring a commit into the working directory.
#[derive(Debug, Clone)]
pub struct RestoreSummary {
    pub commit: CommitId,
    pub restored: usize,
    /// Entries whose blob was absent; restoration continued past them.
    pub missing: usize,
}

/// One commit as shown by `log`.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub id: CommitId,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// What switching branches did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Moved to an existing branch.
    Switched,
    /// The branch did not exist; it was created from the current one.
    Created,
    /// Already on the requested branch.
    AlreadyCurrent,
}

impl Repository {
    /// Initialize a new repository at `path`, creating the directory if
    /// needed. Pre-existing files are hashed into the untracked table.
    pub fn init(path: impl AsRef<Path>) -> StorageResult<Self> {
        let root = path.as_ref().to_path_buf();
        let metadata = root.join(METADATA_DIR);
        if metadata.exists() {
            return Err(StorageError::AlreadyInitialized(root));
        }

        fs::create_dir_all(&root)?;
        let repo = Self { root };
        let paths = repo.branch_paths(&BranchName::main());
        fs::create_dir_all(paths.manifests())?;
        fs::create_dir_all(paths.backup())?;

        let mut untracked = StateTable::new(TableKind::Untracked);
        for entry in hasher::hash_all(&repo.root)? {
            untracked.insert(entry.path, entry.fingerprint);
        }
        untracked.save(&paths.table(TableKind::Untracked))?;
        for kind in [TableKind::Staged, TableKind::Modified, TableKind::Committed] {
            StateTable::new(kind).save(&paths.table(kind))?;
        }

        Head::new(BranchName::main(), None).save(&repo.head_path())?;

        info!("initialized repository at {}", repo.root.display());
        Ok(repo)
    }

    /// Open the repository whose working root is exactly `path`.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let root = path.as_ref().to_path_buf();
        if !root.join(METADATA_DIR).is_dir() {
            return Err(StorageError::RepositoryNotFound(root));
        }
        Ok(Self { root })
    }

    /// Walk upward from `start` until a directory containing the metadata
    /// root is found.
    pub fn discover(start: impl AsRef<Path>) -> StorageResult<Self> {
        let start = start.as_ref();
        let mut current = start.to_path_buf();
        loop {
            if current.join(METADATA_DIR).is_dir() {
                return Ok(Self { root: current });
            }
            if !current.pop() {
                return Err(StorageError::RepositoryNotFound(start.to_path_buf()));
            }
        }
    }

    /// The working root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The current head pointer.
    pub fn head(&self) -> StorageResult<Head> {
        Head::load(&self.head_path())
    }

    // ==================== State tracking ====================

    /// Classify one path (or, with `None`, every file under the working
    /// root) and persist the refreshed untracked/modified tables.
    pub fn status(&self, path: Option<&RepoPath>) -> StorageResult<StatusReport> {
        let head = self.head()?;
        let paths = self.branch_paths(&head.branch);

        let committed = StateTable::load(&paths.table(TableKind::Committed), TableKind::Committed)?;
        let staged = StateTable::load(&paths.table(TableKind::Staged), TableKind::Staged)?;
        let mut untracked =
            StateTable::load(&paths.table(TableKind::Untracked), TableKind::Untracked)?;
        let mut modified =
            StateTable::load(&paths.table(TableKind::Modified), TableKind::Modified)?;

        let candidates = match path {
            Some(path) => {
                self.ensure_workspace_path(path)?;
                let absolute = path.to_path(&self.root);
                if !absolute.is_file() {
                    return Err(StorageError::FileNotFound(absolute));
                }
                vec![FileEntry::new(path.clone(), hasher::hash_file(&absolute)?)]
            }
            None => hasher::hash_all(&self.root)?,
        };

        let mut entries = Vec::with_capacity(candidates.len());
        for FileEntry { path, fingerprint } in candidates {
            let committed_hash = committed.get(&path);
            let staged_hash = staged.get(&path);

            // First match wins.
            let state = if committed_hash == Some(&fingerprint) && staged_hash.is_none() {
                FileState::Committed
            } else if staged_hash == Some(&fingerprint) {
                FileState::Staged
            } else if committed_hash.is_some() || staged_hash.is_some() {
                // Known to a table but the hash moved on. The untracked
                // table doubles as the needs-attention set.
                modified.insert(path.clone(), fingerprint.clone());
                untracked.insert(path.clone(), fingerprint.clone());
                FileState::Modified
            } else {
                untracked.insert(path.clone(), fingerprint.clone());
                FileState::Untracked
            };

            entries.push(StatusEntry { path, state });
        }

        untracked.save(&paths.table(TableKind::Untracked))?;
        modified.save(&paths.table(TableKind::Modified))?;

        Ok(StatusReport {
            branch: head.branch,
            entries,
        })
    }

    // ==================== Staging ====================

    /// Stage one path: record its current fingerprint as what the next
    /// commit will contain.
    pub fn stage(&self, path: &RepoPath) -> StorageResult<StageOutcome> {
        let head = self.head()?;
        let paths = self.branch_paths(&head.branch);

        self.ensure_workspace_path(path)?;
        let absolute = path.to_path(&self.root);
        if !absolute.is_file() {
            return Err(StorageError::FileNotFound(absolute));
        }

        let ignore = IgnoreList::load(&self.root)?;
        if ignore.is_ignored(path) {
            return Ok(StageOutcome::Ignored);
        }

        let current = hasher::hash_file(&absolute)?;

        let mut staged = StateTable::load(&paths.table(TableKind::Staged), TableKind::Staged)?;
        let mut untracked =
            StateTable::load(&paths.table(TableKind::Untracked), TableKind::Untracked)?;
        let mut modified =
            StateTable::load(&paths.table(TableKind::Modified), TableKind::Modified)?;

        // Staging supersedes both attention tables.
        untracked.remove(path);
        modified.remove(path);

        let outcome = if staged.get(path) == Some(&current) {
            StageOutcome::Unchanged
        } else {
            staged.insert(path.clone(), current);
            StageOutcome::Staged
        };

        staged.save(&paths.table(TableKind::Staged))?;
        untracked.save(&paths.table(TableKind::Untracked))?;
        modified.save(&paths.table(TableKind::Modified))?;

        Ok(outcome)
    }

    /// Stage every path recorded in the untracked and modified tables, then
    /// clear both. A listed file that has since vanished is skipped so the
    /// sweep can finish.
    pub fn stage_all(&self) -> StorageResult<Vec<(RepoPath, StageOutcome)>> {
        let head = self.head()?;
        let paths = self.branch_paths(&head.branch);

        let untracked =
            StateTable::load(&paths.table(TableKind::Untracked), TableKind::Untracked)?;
        let modified =
            StateTable::load(&paths.table(TableKind::Modified), TableKind::Modified)?;

        let candidates: BTreeSet<RepoPath> = untracked
            .paths()
            .chain(modified.paths())
            .cloned()
            .collect();

        let mut results = Vec::new();
        for path in candidates {
            match self.stage(&path) {
                Ok(outcome) => results.push((path, outcome)),
                Err(StorageError::FileNotFound(absolute)) => {
                    warn!("skipping vanished file {}", absolute.display());
                }
                Err(e) => return Err(e),
            }
        }

        let mut untracked =
            StateTable::load(&paths.table(TableKind::Untracked), TableKind::Untracked)?;
        untracked.clear();
        untracked.save(&paths.table(TableKind::Untracked))?;
        let mut modified =
            StateTable::load(&paths.table(TableKind::Modified), TableKind::Modified)?;
        modified.clear();
        modified.save(&paths.table(TableKind::Modified))?;

        Ok(results)
    }

    // ==================== Commit engine ====================

    /// Freeze the staging area into a new commit: a complete snapshot
    /// manifest plus backup blobs, advancing the head pointer.
    pub fn commit(&self, message: &str) -> StorageResult<Manifest> {
        let head = self.head()?;
        let paths = self.branch_paths(&head.branch);

        let mut staged = StateTable::load(&paths.table(TableKind::Staged), TableKind::Staged)?;
        if staged.is_empty() {
            return Err(StorageError::EmptyStagingArea);
        }
        let committed = StateTable::load(&paths.table(TableKind::Committed), TableKind::Committed)?;

        // Full snapshot: everything committed, overlaid by everything
        // staged. Staged wins on path conflicts.
        let mut entries = committed.entries().clone();
        for (path, fingerprint) in staged.iter() {
            entries.insert(path.clone(), fingerprint.clone());
        }

        let id = CommitId::generate();
        let manifest = Manifest::new(id.clone(), normalize_message(message), entries);

        let manifest_store = ManifestStore::new(paths.manifests());
        manifest_store.write(&manifest)?;

        let backup = BackupStore::new(paths.backup());
        for (path, fingerprint) in manifest.entries() {
            if backup.contains(fingerprint) {
                continue;
            }
            let entry = FileEntry::new(path.clone(), fingerprint.clone());
            backup.ingest(&entry, &path.to_path(&self.root))?;
        }

        Head::new(head.branch, Some(id.clone())).save(&self.head_path())?;

        staged.clear();
        staged.save(&paths.table(TableKind::Staged))?;

        StateTable::from_entries(TableKind::Committed, manifest.entries().clone())
            .save(&paths.table(TableKind::Committed))?;

        info!("created commit {} with {} entries", id, manifest.len());
        Ok(manifest)
    }

    // ==================== Checkout / restore ====================

    /// Replace the working directory with the snapshot named by `id` and
    /// reset all state tables to match it.
    pub fn checkout(&self, id: &CommitId) -> StorageResult<RestoreSummary> {
        let head = self.head()?;
        let paths = self.branch_paths(&head.branch);

        let manifest_store = ManifestStore::new(paths.manifests());
        let manifest = manifest_store.read(id)?;

        clear_working_dir(&self.root)?;

        let backup = BackupStore::new(paths.backup());
        let mut restored = 0;
        let mut missing = 0;
        for (path, fingerprint) in manifest.entries() {
            let entry = FileEntry::new(path.clone(), fingerprint.clone());
            let target = path.to_path(&self.root);
            match backup.restore(&entry, &target) {
                Ok(()) => restored += 1,
                // A lost blob shouldn't block restoring everything else.
                Err(e) => {
                    warn!("could not restore '{}': {}", path, e);
                    missing += 1;
                }
            }
        }

        StateTable::from_entries(TableKind::Committed, manifest.entries().clone())
            .save(&paths.table(TableKind::Committed))?;
        for kind in [TableKind::Staged, TableKind::Untracked, TableKind::Modified] {
            StateTable::new(kind).save(&paths.table(kind))?;
        }

        Head::new(head.branch, Some(id.clone())).save(&self.head_path())?;

        info!("checked out commit {} ({} files)", id, restored);
        Ok(RestoreSummary {
            commit: id.clone(),
            restored,
            missing,
        })
    }

    // ==================== Diff ====================

    /// Position-by-position comparison of a working file against its last
    /// committed content.
    pub fn diff(&self, path: &RepoPath) -> StorageResult<Vec<DiffLine>> {
        let head = self.head()?;
        let paths = self.branch_paths(&head.branch);

        self.ensure_workspace_path(path)?;
        let absolute = path.to_path(&self.root);
        if !absolute.is_file() {
            return Err(StorageError::FileNotFound(absolute));
        }

        let committed = StateTable::load(&paths.table(TableKind::Committed), TableKind::Committed)?;
        let fingerprint = committed
            .get(path)
            .ok_or_else(|| StorageError::FileNotTracked(path.clone()))?;

        let backup = BackupStore::new(paths.backup());
        let committed_bytes = backup.read(path, fingerprint)?;
        let working_bytes = fs::read(&absolute)?;

        let committed_text = String::from_utf8_lossy(&committed_bytes);
        let working_text = String::from_utf8_lossy(&working_bytes);
        Ok(positional_diff(&committed_text, &working_text))
    }

    // ==================== History ====================

    /// The commit history of the current branch, newest first.
    pub fn log(&self, limit: Option<usize>) -> StorageResult<Vec<LogEntry>> {
        let head = self.head()?;
        let paths = self.branch_paths(&head.branch);
        let manifest_store = ManifestStore::new(paths.manifests());

        let mut ids = manifest_store.list()?;
        ids.reverse();
        if let Some(limit) = limit {
            ids.truncate(limit);
        }

        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            let manifest = manifest_store.read(&id)?;
            entries.push(LogEntry {
                timestamp: id.timestamp(),
                message: manifest.message().to_string(),
                id,
            });
        }
        Ok(entries)
    }

    // ==================== Branches ====================

    /// All branches in the repository, sorted by name.
    pub fn branches(&self) -> StorageResult<Vec<BranchName>> {
        refs::list_branches(&self.root.join(METADATA_DIR))
    }

    /// Switch to a branch, creating it from the current branch's full state
    /// (tables, manifests, blobs) when it doesn't exist yet. The working
    /// directory is left untouched.
    pub fn switch(&self, branch: &BranchName) -> StorageResult<SwitchOutcome> {
        let head = self.head()?;
        if head.branch == *branch {
            return Ok(SwitchOutcome::AlreadyCurrent);
        }

        let target = self.branch_paths(branch);
        if target.dir.is_dir() {
            let latest = ManifestStore::new(target.manifests()).list()?.pop();
            Head::new(branch.clone(), latest).save(&self.head_path())?;
            info!("switched to branch {}", branch);
            return Ok(SwitchOutcome::Switched);
        }

        let current = self.branch_paths(&head.branch);
        copy_dir_recursive(&current.dir, &target.dir)?;
        Head::new(branch.clone(), head.commit).save(&self.head_path())?;
        info!("created branch {}", branch);
        Ok(SwitchOutcome::Created)
    }

    // ==================== Layout ====================

    fn head_path(&self) -> PathBuf {
        self.root.join(METADATA_DIR).join(HEAD_FILE)
    }

    fn branch_paths(&self, branch: &BranchName) -> BranchPaths {
        BranchPaths {
            dir: self.root.join(METADATA_DIR).join(branch.as_str()),
        }
    }

    /// Operand paths may never point into the metadata root.
    fn ensure_workspace_path(&self, path: &RepoPath) -> StorageResult<()> {
        let first = path.as_str().split('/').next().unwrap_or("");
        if first == METADATA_DIR {
            return Err(StorageError::InvalidName(InvalidNameError::InvalidPath(
                path.as_str().to_string(),
            )));
        }
        Ok(())
    }
}

/// Normalize a commit message to a single line; manifests are line-oriented.
fn normalize_message(message: &str) -> String {
    message.replace(['\r', '\n'], " ").trim().to_string()
}

/// Delete every file and directory in the working root except the metadata
/// root. Directory contents go before the directory itself.
fn clear_working_dir(root: &Path) -> StorageResult<()> {
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_name() == METADATA_DIR {
            continue;
        }
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> StorageResult<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
