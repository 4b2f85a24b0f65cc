//! changes
//!
//! Change detection between releases.
//!
//! # Design
//!
//! A repository "has changes" when, since the channel's last-published
//! timestamp, some relevant file was touched. Detection layers two sources
//! in order - committed history first, then the uncommitted working tree -
//! into a running [`ChangedFileSet`] where later events supersede earlier
//! ones: a delete removes what an add inserted, a rename replaces the old
//! path with the new.
//!
//! The final set is filtered before it counts:
//! - hidden paths are dropped, except the `.github` directory (workflow
//!   edits are release-relevant)
//! - paths under the `test/` prefix are dropped
//! - configured exclusions are dropped, by exact match or directory prefix
//! - a surviving path must have a filesystem modification time strictly
//!   after the reference; any touch counts, content is never diffed
//!
//! Strict detection (production and other fully-committed publishes)
//! refuses to proceed while any uncommitted entry exists, relevant or not.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::vcs::{FileEvent, Vcs, VcsError};

/// Hidden directory still considered release-relevant.
const VISIBLE_HIDDEN_DIR: &str = ".github";

/// Reserved prefix for test code, never release-relevant.
const TEST_PREFIX: &str = "test";

/// Errors from change detection.
#[derive(Debug, Error)]
pub enum ChangeError {
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// Strict publishes require a fully committed tree.
    #[error("repository `{repo}` has uncommitted changes; commit or stash them first")]
    UncommittedChanges { repo: String },
}

/// An ephemeral set of repository-relative paths considered changed.
///
/// Built by applying file events in order; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedFileSet {
    paths: BTreeSet<String>,
}

impl ChangedFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Later events supersede earlier ones.
    pub fn apply(&mut self, event: &FileEvent) {
        match event {
            FileEvent::Added(path) | FileEvent::Modified(path) => {
                self.paths.insert(path.clone());
            }
            FileEvent::Deleted(path) => {
                self.paths.remove(path);
            }
            FileEvent::Renamed { from, to } => {
                self.paths.remove(from);
                self.paths.insert(to.clone());
            }
        }
    }

    /// Apply a sequence of events in order.
    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a FileEvent>) {
        for event in events {
            self.apply(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Changed paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Keep only paths the predicate accepts.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.paths.retain(|path| keep(path));
    }
}

/// Decides whether one repository has unpublished changes.
#[derive(Debug)]
pub struct ChangeDetector<'a> {
    vcs: &'a Vcs,
    repo_name: &'a str,
    exclusions: &'a [String],
}

impl<'a> ChangeDetector<'a> {
    pub fn new(vcs: &'a Vcs, repo_name: &'a str, exclusions: &'a [String]) -> Self {
        Self {
            vcs,
            repo_name,
            exclusions,
        }
    }

    /// Decide whether the repository changed since `since`.
    ///
    /// An absent reference timestamp means nothing was ever published on
    /// this channel, which always counts as changed.
    ///
    /// # Errors
    ///
    /// With `strict` set, fails with [`ChangeError::UncommittedChanges`]
    /// while any uncommitted working-tree entry exists.
    pub fn has_changes(
        &self,
        since: Option<DateTime<Utc>>,
        strict: bool,
    ) -> Result<bool, ChangeError> {
        match since {
            None => {
                // Still enforce the committed-tree requirement.
                if strict && !self.vcs.status()?.is_empty() {
                    return Err(ChangeError::UncommittedChanges {
                        repo: self.repo_name.to_string(),
                    });
                }
                Ok(true)
            }
            Some(since) => Ok(!self.changed_files(since, strict)?.is_empty()),
        }
    }

    /// The filtered changed set since `since`.
    pub fn changed_files(
        &self,
        since: DateTime<Utc>,
        strict: bool,
    ) -> Result<ChangedFileSet, ChangeError> {
        let mut set = ChangedFileSet::new();
        set.apply_all(&self.vcs.log_since(since)?);

        let uncommitted = self.vcs.status()?;
        if strict && !uncommitted.is_empty() {
            return Err(ChangeError::UncommittedChanges {
                repo: self.repo_name.to_string(),
            });
        }
        set.apply_all(&uncommitted);

        set.retain(|path| is_release_relevant(path, self.exclusions));
        self.retain_touched_after(&mut set, since);
        Ok(set)
    }

    /// Drop paths whose on-disk modification time is not strictly after
    /// `since`. Paths that no longer exist are dropped too: whatever
    /// removed them already produced its own delete event.
    fn retain_touched_after(&self, set: &mut ChangedFileSet, since: DateTime<Utc>) {
        let dir = self.vcs.dir();
        set.retain(|path| match modified_at(&dir.join(path)) {
            Some(mtime) => mtime > since,
            None => false,
        });
    }
}

/// Filesystem modification time as UTC, if the path is readable.
fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = std::fs::metadata(path).ok()?;
    let mtime = metadata.modified().ok()?;
    Some(DateTime::<Utc>::from(mtime))
}

/// Apply the hidden-path, test-prefix, and exclusion filters.
fn is_release_relevant(path: &str, exclusions: &[String]) -> bool {
    let hidden = path
        .split('/')
        .any(|component| component.starts_with('.') && component != VISIBLE_HIDDEN_DIR);
    if hidden {
        return false;
    }

    if path == TEST_PREFIX || path.starts_with("test/") {
        return false;
    }

    for exclusion in exclusions {
        let exclusion = exclusion.trim_end_matches('/');
        if path == exclusion || path.starts_with(&format!("{}/", exclusion)) {
            return false;
        }
    }

    true
}
