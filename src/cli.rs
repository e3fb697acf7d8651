//! Command-line interface.
//!
//! Subcommands are a tagged enum with a single exhaustive dispatch, so an
//! unhandled command is a compile error rather than a missing map entry.
//! Parsing is a plain argument walk; engine errors are printed to stderr
//! and turn into a non-zero exit code.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::storage::diff::DiffLine;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::repository::{
    Repository, StageOutcome, StatusReport, SwitchOutcome, METADATA_DIR,
};
use crate::storage::types::{BranchName, CommitId, FileState, RepoPath};

// ANSI escape codes for terminal colors.
const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[91m";
const GREEN: &str = "\x1b[92m";
const YELLOW: &str = "\x1b[93m";

/// One parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init { directory: PathBuf },
    Add { path: String },
    Commit { message: String },
    Status { path: Option<String> },
    Log { limit: Option<usize> },
    Checkout { commit: String },
    Diff { path: String },
    Branch,
    Switch { name: String },
    Help,
}

/// Parse raw arguments (program name already stripped).
pub fn parse(args: &[String]) -> Result<Command, String> {
    let mut iter = args.iter();
    let Some(command) = iter.next() else {
        return Ok(Command::Help);
    };

    let command = match command.as_str() {
        "init" => Command::Init {
            directory: PathBuf::from(required(&mut iter, "init", "directory")?),
        },
        "add" => Command::Add {
            path: required(&mut iter, "add", "filename")?,
        },
        "commit" => Command::Commit {
            message: required(&mut iter, "commit", "message")?,
        },
        "status" => Command::Status {
            path: iter.next().cloned(),
        },
        "log" => {
            let limit = match iter.next() {
                Some(raw) => Some(
                    raw.parse::<usize>()
                        .map_err(|_| format!("log: '{raw}' is not a number"))?,
                ),
                None => None,
            };
            Command::Log { limit }
        }
        "checkout" => Command::Checkout {
            commit: required(&mut iter, "checkout", "commit_id")?,
        },
        "diff" => Command::Diff {
            path: required(&mut iter, "diff", "filename")?,
        },
        "branch" => Command::Branch,
        "switch" => Command::Switch {
            name: required(&mut iter, "switch", "branch")?,
        },
        "help" | "-h" | "--help" => Command::Help,
        other => return Err(format!("Unknown command: {other}\nRun 'tig help' for usage.")),
    };

    if let Some(extra) = iter.next() {
        return Err(format!("Unexpected argument: {extra}"));
    }
    Ok(command)
}

fn required<'a>(
    iter: &mut impl Iterator<Item = &'a String>,
    command: &str,
    operand: &str,
) -> Result<String, String> {
    iter.next()
        .cloned()
        .ok_or_else(|| format!("Usage: tig {command} <{operand}>"))
}

/// Execute a parsed command, mapping failures onto the exit code.
pub fn run(command: Command) -> ExitCode {
    match execute(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command) -> StorageResult<()> {
    match command {
        Command::Init { directory } => cmd_init(&directory),
        Command::Add { path } => cmd_add(&open_repo()?, &path),
        Command::Commit { message } => cmd_commit(&open_repo()?, &message),
        Command::Status { path } => cmd_status(&open_repo()?, path.as_deref()),
        Command::Log { limit } => cmd_log(&open_repo()?, limit),
        Command::Checkout { commit } => cmd_checkout(&open_repo()?, &commit),
        Command::Diff { path } => cmd_diff(&open_repo()?, &path),
        Command::Branch => cmd_branch(&open_repo()?),
        Command::Switch { name } => cmd_switch(&open_repo()?, &name),
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}

/// Every command except `init` runs against the repository discovered from
/// the current directory.
fn open_repo() -> StorageResult<Repository> {
    Repository::discover(env::current_dir()?)
}

fn cmd_init(directory: &Path) -> StorageResult<()> {
    let repo = Repository::init(directory)?;
    println!(
        "Initialized empty tig repository in {}",
        repo.root().join(METADATA_DIR).display()
    );
    Ok(())
}

fn cmd_add(repo: &Repository, raw: &str) -> StorageResult<()> {
    if raw == "." {
        let results = repo.stage_all()?;
        let staged = results
            .iter()
            .filter(|(_, outcome)| *outcome == StageOutcome::Staged)
            .count();
        println!("Added {staged} file(s) to the staging area.");
        return Ok(());
    }

    let path = RepoPath::parse(raw)?;
    match repo.stage(&path)? {
        StageOutcome::Staged => println!("Added {path}"),
        StageOutcome::Unchanged => println!("{path} is already staged."),
        StageOutcome::Ignored => println!("File '{path}' is ignored."),
    }
    Ok(())
}

fn cmd_commit(repo: &Repository, message: &str) -> StorageResult<()> {
    let manifest = repo.commit(message)?;
    let head = repo.head()?;
    println!(
        "[{} {}] {}",
        head.branch,
        manifest.id(),
        manifest.message()
    );
    println!(" {} file(s) in snapshot", manifest.len());
    Ok(())
}

fn cmd_status(repo: &Repository, raw: Option<&str>) -> StorageResult<()> {
    let operand = match raw {
        Some(raw) => Some(RepoPath::parse(raw)?),
        None => None,
    };
    let report = repo.status(operand.as_ref())?;
    print_status(&report);
    Ok(())
}

fn print_status(report: &StatusReport) {
    println!("\nOn branch {GREEN}{}{RESET}\n", report.branch);

    let with_state = |state: FileState| {
        report
            .entries
            .iter()
            .filter(move |entry| entry.state == state)
    };

    if with_state(FileState::Committed).count() == report.entries.len() {
        println!("{YELLOW}All files are up to date{RESET}");
        return;
    }

    if with_state(FileState::Committed).next().is_some() {
        println!("Files committed and up to date:");
        for entry in with_state(FileState::Committed) {
            println!("\t{YELLOW}committed:\t{}{RESET}", entry.path);
        }
        println!();
    }

    if with_state(FileState::Staged).next().is_some() {
        println!("Changes to be committed:");
        for entry in with_state(FileState::Staged) {
            println!("\t{GREEN}new file:\t{}{RESET}", entry.path);
        }
        println!();
    }

    if with_state(FileState::Modified).next().is_some() {
        println!("Changes not staged for commit:");
        println!("\t(use \"tig add <file>...\" to update what will be committed)");
        for entry in with_state(FileState::Modified) {
            println!("\t{RED}modified:\t{}{RESET}", entry.path);
        }
        println!();
    }

    if with_state(FileState::Untracked).next().is_some() {
        println!("Untracked files:");
        println!("\t(use \"tig add <file>...\" to include in what will be committed)");
        for entry in with_state(FileState::Untracked) {
            println!("\t{RED}{}{RESET}", entry.path);
        }
        println!();
    }
}

fn cmd_log(repo: &Repository, limit: Option<usize>) -> StorageResult<()> {
    let entries = repo.log(limit)?;
    if entries.is_empty() {
        println!("No commits found.");
        return Ok(());
    }
    for entry in entries {
        println!("Commit ID: {}", entry.id);
        println!("Date: {}", entry.timestamp.format("%Y-%m-%d %H:%M:%S"));
        println!("Message: {}", entry.message);
        println!("-----------------------------");
    }
    Ok(())
}

fn cmd_checkout(repo: &Repository, raw: &str) -> StorageResult<()> {
    // An operand that isn't even a well-formed id can't name any commit.
    let id = CommitId::parse(raw)
        .map_err(|_| StorageError::ManifestNotFound(raw.to_string()))?;
    let summary = repo.checkout(&id)?;
    println!("Checked out commit '{}'.", summary.commit);
    if summary.missing > 0 {
        eprintln!(
            "Warning: {} file(s) could not be restored from backup.",
            summary.missing
        );
    }
    Ok(())
}

fn cmd_diff(repo: &Repository, raw: &str) -> StorageResult<()> {
    let path = RepoPath::parse(raw)?;
    let lines = repo.diff(&path)?;
    if lines.is_empty() {
        println!("No differences found.");
        return Ok(());
    }
    for line in lines {
        match line {
            DiffLine::Context(text) => println!("  {text}"),
            DiffLine::Removed(text) => println!("{RED}- {text}{RESET}"),
            DiffLine::Added(text) => println!("{GREEN}+ {text}{RESET}"),
        }
    }
    Ok(())
}

fn cmd_branch(repo: &Repository) -> StorageResult<()> {
    let head = repo.head()?;
    println!("Branches in the repository:");
    for branch in repo.branches()? {
        if branch == head.branch {
            println!("* {GREEN}{branch}{RESET}");
        } else {
            println!("  {branch}");
        }
    }
    Ok(())
}

fn cmd_switch(repo: &Repository, name: &str) -> StorageResult<()> {
    let branch = BranchName::new(name)?;
    match repo.switch(&branch)? {
        SwitchOutcome::AlreadyCurrent => println!("Already on branch {branch}"),
        SwitchOutcome::Switched | SwitchOutcome::Created => {
            println!("Switched to branch {branch}")
        }
    }
    Ok(())
}

fn print_help() {
    println!("tig: a minimal local version control system");
    println!();
    println!("Usage: tig <command> [args]");
    println!();
    println!("Commands:");
    println!("  init <directory>      Initialize a new repository");
    println!("  add <filename|.>      Add a file (or everything pending) to the staging area");
    println!("  commit <message>      Commit the staged changes");
    println!("  status [filename]     Show the state of working files");
    println!("  log [n]               Show the commit history");
    println!("  checkout <commit_id>  Restore the working directory to a commit");
    println!("  diff <filename>       Compare a file against its last commit");
    println!("  branch                List all branches");
    println!("  switch <branch>       Switch to a branch, creating it if needed");
    println!("  help                  Show this help message");
}
