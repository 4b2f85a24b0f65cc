//! ci::watch
//!
//! Blocks a publish step until the matching workflow run completes.
//!
//! # Design
//!
//! After a push or a release, exactly one workflow run is expected for the
//! commit. The watcher polls the provider at a fixed interval, adopts the
//! first run ID it observes, and then follows that run to completion. Two
//! situations are unrecoverable and fail the publish: a second run ID
//! appearing while the tracked run is incomplete (ambiguous which run
//! belongs to this publish), and no run appearing at all within the attempt
//! bound (the workflow was expected because the repository declares the
//! trigger). Once a run has been observed the watcher waits for it without
//! a deadline; only the external command timeout of the surrounding CI job
//! bounds it.

use std::time::Duration;

use thiserror::Error;

use super::traits::{CiError, CiProvider, RunStatus, WorkflowEvent};

/// How long to wait between polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How many empty polls are allowed before giving up on a run appearing.
pub const MAX_ABSENT_POLLS: u32 = 10;

/// Errors from awaiting a workflow run.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(
        "a concurrent workflow run appeared for commit {sha} \
         (tracking run {tracked}, also saw run {other})"
    )]
    ConcurrentWorkflow { sha: String, tracked: u64, other: u64 },

    #[error("no {event} workflow run appeared for commit {sha} after {attempts} polls")]
    WorkflowTimeout {
        sha: String,
        event: WorkflowEvent,
        attempts: u32,
    },

    #[error("workflow run {run} for commit {sha} concluded `{conclusion}`")]
    WorkflowFailure {
        run: u64,
        sha: String,
        conclusion: String,
    },

    #[error(transparent)]
    Ci(#[from] CiError),
}

/// Polls a CI provider until the workflow run for a commit completes.
pub struct WorkflowWatcher<'a> {
    provider: &'a dyn CiProvider,
    interval: Duration,
    max_absent_polls: u32,
}

impl<'a> WorkflowWatcher<'a> {
    pub fn new(provider: &'a dyn CiProvider) -> Self {
        Self {
            provider,
            interval: POLL_INTERVAL,
            max_absent_polls: MAX_ABSENT_POLLS,
        }
    }

    /// Override the poll interval (tests).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the empty-poll bound (tests).
    pub fn with_max_absent_polls(mut self, polls: u32) -> Self {
        self.max_absent_polls = polls;
        self
    }

    /// Wait for the workflow run attached to `sha` to complete.
    ///
    /// Succeeds iff the tracked run completes with conclusion `success`.
    pub async fn await_workflow(
        &self,
        repo: &str,
        sha: &str,
        event: WorkflowEvent,
    ) -> Result<(), WatchError> {
        let mut tracked: Option<u64> = None;
        let mut polls_without_run = 0u32;

        loop {
            let runs = self.provider.runs_for_commit(repo, sha, event).await?;

            if tracked.is_none() {
                tracked = runs.first().map(|run| run.id);
            }

            match tracked {
                None => {
                    polls_without_run += 1;
                    if polls_without_run >= self.max_absent_polls {
                        return Err(WatchError::WorkflowTimeout {
                            sha: sha.to_string(),
                            event,
                            attempts: polls_without_run,
                        });
                    }
                }
                Some(id) => {
                    if let Some(run) = runs.iter().find(|run| run.id == id) {
                        if run.status == RunStatus::Completed {
                            let conclusion = run
                                .conclusion
                                .clone()
                                .unwrap_or_else(|| "unknown".to_string());
                            if conclusion == "success" {
                                return Ok(());
                            }
                            return Err(WatchError::WorkflowFailure {
                                run: id,
                                sha: sha.to_string(),
                                conclusion,
                            });
                        }
                    }
                    if let Some(other) = runs.iter().find(|run| run.id != id) {
                        return Err(WatchError::ConcurrentWorkflow {
                            sha: sha.to_string(),
                            tracked: id,
                            other: other.id,
                        });
                    }
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::mock::{FailOn, MockCi};
    use crate::ci::traits::WorkflowRun;

    fn watcher(provider: &MockCi) -> WorkflowWatcher<'_> {
        WorkflowWatcher::new(provider).with_interval(Duration::from_millis(1))
    }

    #[test]
    fn defaults_match_the_polling_contract() {
        assert_eq!(POLL_INTERVAL, Duration::from_secs(2));
        assert_eq!(MAX_ABSENT_POLLS, 10);
    }

    #[tokio::test]
    async fn succeeds_when_the_tracked_run_completes() {
        let ci = MockCi::new().script_runs(
            "abc",
            WorkflowEvent::Push,
            vec![
                vec![],
                vec![WorkflowRun::in_progress(7)],
                vec![WorkflowRun::completed(7, "success")],
            ],
        );

        watcher(&ci)
            .await_workflow("core", "abc", WorkflowEvent::Push)
            .await
            .unwrap();
        assert_eq!(ci.poll_count("abc", WorkflowEvent::Push), 3);
    }

    #[tokio::test]
    async fn unsuccessful_conclusion_fails_with_the_conclusion() {
        let ci = MockCi::new().script_runs(
            "abc",
            WorkflowEvent::Release,
            vec![vec![WorkflowRun::completed(9, "cancelled")]],
        );

        let err = watcher(&ci)
            .await_workflow("core", "abc", WorkflowEvent::Release)
            .await
            .unwrap_err();
        match err {
            WatchError::WorkflowFailure { run, conclusion, .. } => {
                assert_eq!(run, 9);
                assert_eq!(conclusion, "cancelled");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_run_within_the_bound_times_out() {
        let ci = MockCi::new();

        let err = watcher(&ci)
            .with_max_absent_polls(4)
            .await_workflow("core", "abc", WorkflowEvent::Push)
            .await
            .unwrap_err();
        match err {
            WatchError::WorkflowTimeout { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(ci.poll_count("abc", WorkflowEvent::Push), 4);
    }

    #[tokio::test]
    async fn a_second_run_while_tracking_is_ambiguous() {
        let ci = MockCi::new().script_runs(
            "abc",
            WorkflowEvent::Push,
            vec![
                vec![WorkflowRun::in_progress(7)],
                vec![WorkflowRun::in_progress(7), WorkflowRun::in_progress(8)],
            ],
        );

        let err = watcher(&ci)
            .await_workflow("core", "abc", WorkflowEvent::Push)
            .await
            .unwrap_err();
        match err {
            WatchError::ConcurrentWorkflow { tracked, other, .. } => {
                assert_eq!(tracked, 7);
                assert_eq!(other, 8);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn a_completed_tracked_run_wins_over_a_newcomer() {
        let ci = MockCi::new().script_runs(
            "abc",
            WorkflowEvent::Push,
            vec![vec![
                WorkflowRun::completed(7, "success"),
                WorkflowRun::in_progress(8),
            ]],
        );

        watcher(&ci)
            .await_workflow("core", "abc", WorkflowEvent::Push)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn the_empty_poll_bound_stops_counting_once_a_run_appears() {
        let mut polls: Vec<Vec<WorkflowRun>> = vec![Vec::new(); 9];
        polls.push(vec![WorkflowRun::in_progress(5)]);
        polls.push(vec![WorkflowRun::in_progress(5)]);
        polls.push(vec![WorkflowRun::in_progress(5)]);
        polls.push(vec![WorkflowRun::completed(5, "success")]);
        let ci = MockCi::new().script_runs("abc", WorkflowEvent::Push, polls);

        watcher(&ci)
            .await_workflow("core", "abc", WorkflowEvent::Push)
            .await
            .unwrap();
        assert_eq!(ci.poll_count("abc", WorkflowEvent::Push), 13);
    }

    #[tokio::test]
    async fn provider_errors_propagate() {
        let ci = MockCi::new().fail_on(FailOn::RunsForCommit(CiError::RateLimited));

        let err = watcher(&ci)
            .await_workflow("core", "abc", WorkflowEvent::Push)
            .await
            .unwrap_err();
        assert!(matches!(err, WatchError::Ci(CiError::RateLimited)));
    }
}
