//! vcs
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **only doorway** to Git. Every repository read and
//! write flows through [`Vcs`], which shells out to the `git` CLI via the
//! central [`CommandRunner`]: reads go through the runner's query path (and
//! so still execute during a dry run), mutations go through its effectful
//! path (and so are simulated during a dry run).
//!
//! # Responsibilities
//!
//! - Resolve the current branch and HEAD commit
//! - Committed history since a timestamp, with per-file status and rename
//!   detection
//! - Working-tree status in machine-parseable form
//! - Commit, tag, and atomic push of branch plus tag
//!
//! # Invariants
//!
//! - The working directory is explicit per instance; the process-wide
//!   current directory is never consulted
//! - All operations return parsed, typed results - no caller touches raw
//!   git output

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::process::{CommandError, CommandRunner};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The underlying git invocation failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// HEAD is detached or no branch is checked out.
    #[error("no branch checked out in {dir}")]
    NoBranch { dir: PathBuf },

    /// Output was not in the shape git promises.
    #[error("unexpected git output: {0}")]
    UnexpectedOutput(String),
}

/// One file-level event reported by git, repository-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Added(String),
    Modified(String),
    Deleted(String),
    Renamed { from: String, to: String },
}

/// Git doorway for one repository working directory.
#[derive(Debug, Clone)]
pub struct Vcs {
    runner: CommandRunner,
    dir: PathBuf,
}

impl Vcs {
    /// Create a doorway for the repository at `dir`.
    pub fn new(runner: CommandRunner, dir: PathBuf) -> Self {
        Self { runner, dir }
    }

    /// The repository working directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The checked-out branch name.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::NoBranch`] for a detached HEAD.
    pub fn current_branch(&self) -> Result<String, VcsError> {
        let lines = self
            .runner
            .query(&self.dir, "git", &["rev-parse", "--abbrev-ref", "HEAD"])?;
        match lines.first().map(String::as_str) {
            Some("HEAD") | None => Err(VcsError::NoBranch {
                dir: self.dir.clone(),
            }),
            Some(name) => Ok(name.to_string()),
        }
    }

    /// Resolve HEAD to a full commit id.
    pub fn head_commit(&self) -> Result<String, VcsError> {
        let lines = self.runner.query(&self.dir, "git", &["rev-parse", "HEAD"])?;
        lines
            .into_iter()
            .next()
            .ok_or_else(|| VcsError::UnexpectedOutput("empty rev-parse output".to_string()))
    }

    /// Per-file events from commits after `since`, oldest commit first.
    ///
    /// Rename detection is on, so a moved file arrives as one
    /// [`FileEvent::Renamed`] instead of a delete/add pair. Event order
    /// matters: a later commit's delete supersedes an earlier add.
    pub fn log_since(&self, since: DateTime<Utc>) -> Result<Vec<FileEvent>, VcsError> {
        let since_arg = format!("--since={}", since.to_rfc3339());
        let lines = self.runner.query(
            &self.dir,
            "git",
            &[
                "log",
                &since_arg,
                "--name-status",
                "-M",
                "--reverse",
                "--pretty=format:",
            ],
        )?;

        let mut events = Vec::new();
        for line in &lines {
            if let Some(event) = parse_name_status_line(line)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Working-tree events: staged, unstaged, and untracked files.
    pub fn status(&self) -> Result<Vec<FileEvent>, VcsError> {
        let lines = self
            .runner
            .query(&self.dir, "git", &["status", "--porcelain"])?;

        let mut events = Vec::new();
        for line in &lines {
            if let Some(event) = parse_porcelain_line(line)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Commit all tracked changes with the given message.
    pub fn commit_all(&self, message: &str) -> Result<(), VcsError> {
        self.runner
            .run(&self.dir, "git", &["commit", "--all", "--message", message], false)?;
        Ok(())
    }

    /// Create a lightweight tag at HEAD.
    pub fn tag(&self, name: &str) -> Result<(), VcsError> {
        self.runner.run(&self.dir, "git", &["tag", name], false)?;
        Ok(())
    }

    /// Whether a tag with this exact name already exists.
    pub fn tag_exists(&self, name: &str) -> Result<bool, VcsError> {
        let lines = self.runner.query(&self.dir, "git", &["tag", "--list", name])?;
        Ok(lines.iter().any(|line| line.trim() == name))
    }

    /// Push a branch and a tag to origin in one atomic update.
    ///
    /// Either both refs land or neither does, so CI never sees a tag whose
    /// branch commit is missing.
    pub fn push_atomic(&self, branch: &str, tag: &str) -> Result<(), VcsError> {
        self.runner
            .run(&self.dir, "git", &["push", "--atomic", "origin", branch, tag], false)?;
        Ok(())
    }
}

/// Parse one `--name-status` line from `git log`.
///
/// Blank separator lines yield `None`.
fn parse_name_status_line(line: &str) -> Result<Option<FileEvent>, VcsError> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let mut fields = line.split('\t');
    let status = fields
        .next()
        .ok_or_else(|| VcsError::UnexpectedOutput(line.to_string()))?;
    let first = fields.next();
    let second = fields.next();

    let event = match (status.chars().next(), first, second) {
        (Some('A'), Some(path), _) => FileEvent::Added(path.to_string()),
        // Type changes count as modifications.
        (Some('M') | Some('T'), Some(path), _) => FileEvent::Modified(path.to_string()),
        (Some('D'), Some(path), _) => FileEvent::Deleted(path.to_string()),
        (Some('R'), Some(from), Some(to)) => FileEvent::Renamed {
            from: from.to_string(),
            to: to.to_string(),
        },
        // A copy leaves the source untouched; only the new path changed.
        (Some('C'), Some(_), Some(to)) => FileEvent::Added(to.to_string()),
        _ => return Err(VcsError::UnexpectedOutput(line.to_string())),
    };
    Ok(Some(event))
}

/// Parse one `git status --porcelain` line.
fn parse_porcelain_line(line: &str) -> Result<Option<FileEvent>, VcsError> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    if line.len() < 4 {
        return Err(VcsError::UnexpectedOutput(line.to_string()));
    }

    let codes = &line[..2];
    let rest = &line[3..];

    let event = if codes == "??" {
        FileEvent::Added(rest.to_string())
    } else if codes.contains('R') {
        let (from, to) = rest
            .split_once(" -> ")
            .ok_or_else(|| VcsError::UnexpectedOutput(line.to_string()))?;
        FileEvent::Renamed {
            from: from.to_string(),
            to: to.to_string(),
        }
    } else if codes.contains('D') {
        FileEvent::Deleted(rest.to_string())
    } else if codes.contains('A') {
        FileEvent::Added(rest.to_string())
    } else {
        FileEvent::Modified(rest.to_string())
    };
    Ok(Some(event))
}
