//! ci::traits
//!
//! CI provider trait for validating remote workflow runs.
//!
//! # Design
//!
//! The `CiProvider` trait is async because provider operations involve
//! network I/O. Convoy needs exactly two capabilities from a provider:
//! listing the workflow runs attached to a commit, and creating a release
//! object at a tag. Everything else (polling cadence, run tracking,
//! concurrency detection) lives in [`watch`](crate::ci::watch) on top of
//! this trait.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from CI provider operations.
///
/// These map to the common failure modes of a hosted CI API.
#[derive(Debug, Clone, Error)]
pub enum CiError {
    /// No token was available in the environment.
    #[error("authentication required: set CONVOY_TOKEN or GITHUB_TOKEN")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The resource already exists (e.g. a release for this tag).
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// The event that started a workflow run.
///
/// Convoy awaits workflows in two places: after pushing the release commit
/// and tag (`push`), and after creating the release object (`release`).
/// Listing runs scoped to the event keeps the two waits from observing each
/// other's runs on the same commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    Push,
    Release,
}

impl WorkflowEvent {
    /// The event name as the provider API and workflow files spell it.
    pub fn api_name(self) -> &'static str {
        match self {
            WorkflowEvent::Push => "push",
            WorkflowEvent::Release => "release",
        }
    }
}

impl std::fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.api_name())
    }
}

/// Lifecycle state of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
}

impl RunStatus {
    pub fn is_completed(self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

/// One workflow run attached to a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    /// Provider-assigned run ID.
    pub id: u64,
    /// Current lifecycle state.
    pub status: RunStatus,
    /// Final outcome, present once the run is completed.
    pub conclusion: Option<String>,
}

impl WorkflowRun {
    /// A completed run with the given conclusion, for tests and fixtures.
    pub fn completed(id: u64, conclusion: &str) -> Self {
        Self {
            id,
            status: RunStatus::Completed,
            conclusion: Some(conclusion.to_string()),
        }
    }

    /// A run still in progress.
    pub fn in_progress(id: u64) -> Self {
        Self {
            id,
            status: RunStatus::InProgress,
            conclusion: None,
        }
    }
}

/// Request to create a release object at an existing tag.
#[derive(Debug, Clone)]
pub struct CreateReleaseRequest {
    /// Tag name the release points at (must already be pushed).
    pub tag: String,
    /// Human-readable release title.
    pub name: String,
    /// Whether the release is marked as a prerelease.
    pub prerelease: bool,
}

/// A created release, as reported by the provider.
#[derive(Debug, Clone)]
pub struct Release {
    /// Provider-assigned release ID.
    pub id: u64,
    /// Web URL for viewing the release.
    pub url: String,
}

/// The CI provider abstraction.
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait CiProvider: Send + Sync {
    /// Get the provider name (e.g., "github").
    fn name(&self) -> &'static str;

    /// List workflow runs for a commit, scoped to a triggering event.
    ///
    /// # Arguments
    ///
    /// * `repo` - Repository name within the configured organization
    /// * `sha` - Full commit SHA the runs are attached to
    /// * `event` - Only runs started by this event are returned
    async fn runs_for_commit(
        &self,
        repo: &str,
        sha: &str,
        event: WorkflowEvent,
    ) -> Result<Vec<WorkflowRun>, CiError>;

    /// Create a release object at a tag.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if a release for the tag exists (callers resuming
    ///   an interrupted publish treat this as success)
    /// - `NotFound` if the tag has not been pushed
    async fn create_release(
        &self,
        repo: &str,
        request: CreateReleaseRequest,
    ) -> Result<Release, CiError>;
}
