//! release::step
//!
//! Publish pipeline steps and the persisted step pointer.
//!
//! # Design
//!
//! [`Step`] is the closed set of things a publish pipeline can do. Each
//! channel selects an ordered subset (its pipeline); the executor walks that
//! order and never invents steps outside it.
//!
//! [`StepPointer`] is the crash-resume record persisted in the local
//! configuration store. It always names the next step to run: when a step
//! finishes, the pointer advances to the successor (or to `Complete` at the
//! end of the pipeline) before anything else happens. A crash therefore
//! leaves the pointer on exactly the step whose effects are not yet known
//! to be applied.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of a publish pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    /// Compute the next version, rewrite manifests, update dependency ranges.
    Update,
    /// Run the package build.
    Build,
    /// Publish to the registry (alpha only, with the stamped identifier).
    Publish,
    /// Revert the manifest to the committed alpha form (alpha only).
    Restore,
    /// Commit the release edits.
    Commit,
    /// Create the release tag.
    Tag,
    /// Push branch and tag atomically.
    Push,
    /// Wait for the CI workflow triggered by the push.
    AwaitPushWorkflow,
    /// Create the release object on the CI provider.
    Release,
    /// Wait for the CI workflow triggered by the release.
    AwaitReleaseWorkflow,
    /// Record the publish in configuration (version, channel timestamp).
    Complete,
}

impl Step {
    /// Stable kebab-case name, as persisted and as shown in output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Update => "update",
            Step::Build => "build",
            Step::Publish => "publish",
            Step::Restore => "restore",
            Step::Commit => "commit",
            Step::Tag => "tag",
            Step::Push => "push",
            Step::AwaitPushWorkflow => "await-push-workflow",
            Step::Release => "release",
            Step::AwaitReleaseWorkflow => "await-release-workflow",
            Step::Complete => "complete",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted progress of a repository's publish pipeline.
///
/// Stored in the local configuration store under
/// `[repositories.<name>.step]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StepPointer {
    /// No publish in flight.
    #[default]
    NotStarted,
    /// A publish is in flight; `step` is the next step to run.
    InProgress { step: Step },
    /// The previous publish ran to completion.
    Complete,
}

impl StepPointer {
    /// True if no publish has begun.
    pub fn is_not_started(&self) -> bool {
        matches!(self, StepPointer::NotStarted)
    }

    /// True if a publish stopped mid-pipeline.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, StepPointer::InProgress { .. })
    }

    /// True if the previous publish finished.
    pub fn is_complete(&self) -> bool {
        matches!(self, StepPointer::Complete)
    }

    /// Decide whether `step` should execute under this pointer.
    ///
    /// A fresh pipeline runs everything. A resumed pipeline skips steps
    /// until it reaches the recorded one; the executor advances the pointer
    /// as it goes, so every later step runs too. A completed pipeline runs
    /// nothing.
    pub fn should_run(&self, step: Step) -> bool {
        match self {
            StepPointer::NotStarted => true,
            StepPointer::InProgress { step: resume_at } => *resume_at == step,
            StepPointer::Complete => false,
        }
    }
}

impl fmt::Display for StepPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepPointer::NotStarted => f.write_str("not started"),
            StepPointer::InProgress { step } => write!(f, "in progress at `{}`", step),
            StepPointer::Complete => f.write_str("complete"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        step: StepPointer,
    }

    #[test]
    fn default_is_not_started() {
        assert!(StepPointer::default().is_not_started());
    }

    #[test]
    fn step_names_are_kebab_case() {
        assert_eq!(Step::AwaitPushWorkflow.as_str(), "await-push-workflow");
        assert_eq!(Step::Update.to_string(), "update");
    }

    #[test]
    fn in_progress_serializes_with_step_field() {
        let holder = Holder {
            step: StepPointer::InProgress { step: Step::Push },
        };
        let toml = toml::to_string(&holder).unwrap();
        assert!(toml.contains("state = \"in_progress\""), "{}", toml);
        assert!(toml.contains("step = \"push\""), "{}", toml);

        let back: Holder = toml::from_str(&toml).unwrap();
        assert_eq!(back, holder);
    }

    #[test]
    fn complete_serializes_without_step_field() {
        let holder = Holder {
            step: StepPointer::Complete,
        };
        let toml = toml::to_string(&holder).unwrap();
        assert!(toml.contains("state = \"complete\""), "{}", toml);
        assert!(!toml.contains("step = "), "{}", toml);

        let back: Holder = toml::from_str(&toml).unwrap();
        assert_eq!(back, holder);
    }

    #[test]
    fn not_started_runs_everything() {
        let pointer = StepPointer::NotStarted;
        assert!(pointer.should_run(Step::Update));
        assert!(pointer.should_run(Step::Complete));
    }

    #[test]
    fn in_progress_runs_only_recorded_step() {
        let pointer = StepPointer::InProgress { step: Step::Push };
        assert!(!pointer.should_run(Step::Update));
        assert!(!pointer.should_run(Step::Tag));
        assert!(pointer.should_run(Step::Push));
        // Later steps are reached by advancing, not by matching.
        assert!(!pointer.should_run(Step::Release));
    }

    #[test]
    fn complete_runs_nothing() {
        let pointer = StepPointer::Complete;
        assert!(!pointer.should_run(Step::Update));
        assert!(!pointer.should_run(Step::Complete));
    }

    #[test]
    fn display_formatting() {
        assert_eq!(StepPointer::NotStarted.to_string(), "not started");
        assert_eq!(
            StepPointer::InProgress { step: Step::Tag }.to_string(),
            "in progress at `tag`"
        );
        assert_eq!(StepPointer::Complete.to_string(), "complete");
    }
}
