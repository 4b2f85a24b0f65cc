//! ci::dry_run
//!
//! CI provider used while simulating a publish.
//!
//! Reports the calls a real publish would make and answers optimistically:
//! every awaited workflow appears already completed and successful, so the
//! watcher returns without polling, and every release is "created" without
//! a network round trip.

use async_trait::async_trait;

use super::traits::{
    CiError, CiProvider, CreateReleaseRequest, Release, WorkflowEvent, WorkflowRun,
};
use crate::ui::output::{self, Verbosity};

#[derive(Debug)]
pub struct DryRunCi {
    verbosity: Verbosity,
}

impl DryRunCi {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

#[async_trait]
impl CiProvider for DryRunCi {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn runs_for_commit(
        &self,
        repo: &str,
        sha: &str,
        event: WorkflowEvent,
    ) -> Result<Vec<WorkflowRun>, CiError> {
        output::dry_run(
            format!("would await {event} workflow for {repo}@{sha}"),
            self.verbosity,
        );
        Ok(vec![WorkflowRun::completed(0, "success")])
    }

    async fn create_release(
        &self,
        repo: &str,
        request: CreateReleaseRequest,
    ) -> Result<Release, CiError> {
        output::dry_run(
            format!(
                "would create {} release `{}` at tag {} for {repo}",
                if request.prerelease {
                    "prerelease"
                } else {
                    "release"
                },
                request.name,
                request.tag,
            ),
            self.verbosity,
        );
        Ok(Release {
            id: 0,
            url: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::watch::WorkflowWatcher;

    #[tokio::test]
    async fn awaited_workflows_complete_immediately() {
        let ci = DryRunCi::new(Verbosity::Quiet);
        WorkflowWatcher::new(&ci)
            .await_workflow("core", "abc", WorkflowEvent::Push)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn releases_are_simulated() {
        let ci = DryRunCi::new(Verbosity::Quiet);
        let release = ci
            .create_release(
                "core",
                CreateReleaseRequest {
                    tag: "v1.2.4".to_string(),
                    name: "core 1.2.4".to_string(),
                    prerelease: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(release.id, 0);
    }
}
