//! ci::mock
//!
//! Mock CI provider for deterministic testing.
//!
//! # Design
//!
//! The mock provider answers `runs_for_commit` from a per-commit script: a
//! sequence of poll results consumed one per call, with the final entry
//! repeating forever. That makes watcher scenarios (run appears late, run
//! completes, a second run shows up) deterministic without timing tricks.
//!
//! # Example
//!
//! ```
//! use convoy::ci::mock::MockCi;
//! use convoy::ci::{CiProvider, WorkflowEvent, WorkflowRun};
//!
//! # tokio_test::block_on(async {
//! let ci = MockCi::new().script_runs(
//!     "abc123",
//!     WorkflowEvent::Push,
//!     vec![
//!         vec![],
//!         vec![WorkflowRun::in_progress(7)],
//!         vec![WorkflowRun::completed(7, "success")],
//!     ],
//! );
//!
//! let first = ci.runs_for_commit("core", "abc123", WorkflowEvent::Push).await.unwrap();
//! assert!(first.is_empty());
//!
//! let second = ci.runs_for_commit("core", "abc123", WorkflowEvent::Push).await.unwrap();
//! assert_eq!(second[0].id, 7);
//! # });
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{
    CiError, CiProvider, CreateReleaseRequest, Release, WorkflowEvent, WorkflowRun,
};

/// Mock CI provider for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MockCi {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockCiInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockCiInner {
    /// Scripted poll results keyed by (sha, event).
    scripts: HashMap<(String, String), VecDeque<Vec<WorkflowRun>>>,
    /// Releases created so far.
    releases: Vec<RecordedRelease>,
    /// Last assigned release ID.
    last_release_id: u64,
    /// Operation to fail (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail runs_for_commit with the given error.
    RunsForCommit(CiError),
    /// Fail create_release with the given error.
    CreateRelease(CiError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    RunsForCommit {
        repo: String,
        sha: String,
        event: WorkflowEvent,
    },
    CreateRelease {
        repo: String,
        tag: String,
        prerelease: bool,
    },
}

/// A release recorded by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRelease {
    pub repo: String,
    pub tag: String,
    pub name: String,
    pub prerelease: bool,
}

impl MockCi {
    /// Create a new empty mock provider.
    ///
    /// With no script configured, `runs_for_commit` answers with no runs.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockCiInner::default())),
        }
    }

    /// Script successive poll results for one commit and event.
    ///
    /// Each call to `runs_for_commit` consumes one entry; the final entry
    /// repeats once the script is exhausted.
    pub fn script_runs(
        self,
        sha: &str,
        event: WorkflowEvent,
        polls: Vec<Vec<WorkflowRun>>,
    ) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.scripts.insert(
                (sha.to_string(), event.api_name().to_string()),
                polls.into(),
            );
        }
        self
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// All operations performed so far, in order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// All releases created so far, in order.
    pub fn releases(&self) -> Vec<RecordedRelease> {
        self.inner.lock().unwrap().releases.clone()
    }

    /// How many polls were made for a commit and event.
    pub fn poll_count(&self, sha: &str, event: WorkflowEvent) -> usize {
        self.inner
            .lock()
            .unwrap()
            .operations
            .iter()
            .filter(|op| {
                matches!(
                    op,
                    MockOperation::RunsForCommit { sha: s, event: e, .. }
                        if s == sha && *e == event
                )
            })
            .count()
    }
}

impl Default for MockCi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CiProvider for MockCi {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn runs_for_commit(
        &self,
        repo: &str,
        sha: &str,
        event: WorkflowEvent,
    ) -> Result<Vec<WorkflowRun>, CiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(MockOperation::RunsForCommit {
            repo: repo.to_string(),
            sha: sha.to_string(),
            event,
        });

        if let Some(FailOn::RunsForCommit(err)) = &inner.fail_on {
            return Err(err.clone());
        }

        let key = (sha.to_string(), event.api_name().to_string());
        let runs = match inner.scripts.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => Vec::new(),
        };
        Ok(runs)
    }

    async fn create_release(
        &self,
        repo: &str,
        request: CreateReleaseRequest,
    ) -> Result<Release, CiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(MockOperation::CreateRelease {
            repo: repo.to_string(),
            tag: request.tag.clone(),
            prerelease: request.prerelease,
        });

        if let Some(FailOn::CreateRelease(err)) = &inner.fail_on {
            return Err(err.clone());
        }

        let duplicate = inner
            .releases
            .iter()
            .any(|release| release.repo == repo && release.tag == request.tag);
        if duplicate {
            return Err(CiError::AlreadyExists(format!(
                "release for tag {}",
                request.tag
            )));
        }

        inner.last_release_id += 1;
        let id = inner.last_release_id;
        inner.releases.push(RecordedRelease {
            repo: repo.to_string(),
            tag: request.tag.clone(),
            name: request.name.clone(),
            prerelease: request.prerelease,
        });

        Ok(Release {
            id,
            url: format!("https://mock.invalid/{repo}/releases/{id}"),
        })
    }
}
