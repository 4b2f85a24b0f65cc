//! release::channel
//!
//! Channel-specific publish behavior.
//!
//! # Design
//!
//! The three channels share one pipeline shape per family and differ only
//! in a handful of hooks: which steps run, how the next version is derived,
//! which branch is acceptable, which timestamp is the change-detection
//! reference, and how dependents express a dependency on the published
//! artifact. Those hooks live here as methods on a plain enum; nothing
//! else in the crate branches on the channel.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::config::schema::DependencyKind;
use crate::core::config::Repository;
use crate::core::version::PackageVersion;
use crate::release::step::Step;

/// Alpha publishes stay local to the registry and leave no commit.
const ALPHA_PIPELINE: [Step; 5] = [
    Step::Update,
    Step::Build,
    Step::Publish,
    Step::Restore,
    Step::Complete,
];

/// Beta and production publish through source control and remote CI.
const RELEASE_PIPELINE: [Step; 9] = [
    Step::Update,
    Step::Build,
    Step::Commit,
    Step::Tag,
    Step::Push,
    Step::AwaitPushWorkflow,
    Step::Release,
    Step::AwaitReleaseWorkflow,
    Step::Complete,
];

/// Errors from channel preconditions.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error(
        "repository `{repo}` is on branch `{branch}`; publishing {version} \
         to production requires release branch `{expected}`"
    )]
    InvalidBranch {
        repo: String,
        branch: String,
        version: PackageVersion,
        expected: String,
    },
}

/// A publish channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Alpha,
    Beta,
    Production,
}

impl Channel {
    pub fn name(self) -> &'static str {
        match self {
            Channel::Alpha => "alpha",
            Channel::Beta => "beta",
            Channel::Production => "production",
        }
    }

    /// The ordered steps a publish on this channel runs.
    pub fn pipeline(self) -> &'static [Step] {
        match self {
            Channel::Alpha => &ALPHA_PIPELINE,
            Channel::Beta | Channel::Production => &RELEASE_PIPELINE,
        }
    }

    /// The version the next publish on this channel will carry.
    pub fn next_version(self, current: &PackageVersion) -> PackageVersion {
        match self {
            Channel::Alpha => current.next_alpha(),
            Channel::Beta => current.next_beta(),
            Channel::Production => current.next_production(),
        }
    }

    /// Check the active branch against the channel's requirements.
    ///
    /// Production releases must run from the release branch named after the
    /// version being published; the other channels accept any branch.
    pub fn validate_branch(
        self,
        repo: &Repository,
        branch: &str,
        next: &PackageVersion,
    ) -> Result<(), ChannelError> {
        if self != Channel::Production {
            return Ok(());
        }
        let expected = next.release_branch();
        if branch == expected {
            Ok(())
        } else {
            Err(ChannelError::InvalidBranch {
                repo: repo.name.clone(),
                branch: branch.to_string(),
                version: next.clone(),
                expected,
            })
        }
    }

    /// The repository's last publication on this channel, used both as the
    /// change-detection reference and for dependency-freshness comparison.
    pub fn last_published(self, repo: &Repository) -> Option<DateTime<Utc>> {
        match self {
            Channel::Alpha => repo.last_alpha_published,
            Channel::Beta => repo.last_beta_published,
            Channel::Production => repo.last_production_published,
        }
    }

    /// Record a finished publication on this channel.
    pub fn record_publication(self, repo: &mut Repository, at: DateTime<Utc>) {
        match self {
            Channel::Alpha => repo.last_alpha_published = Some(at),
            Channel::Beta => repo.last_beta_published = Some(at),
            Channel::Production => repo.last_production_published = Some(at),
        }
    }

    /// How a dependent's manifest should reference a dependency whose
    /// last published version is `version`.
    ///
    /// Internal alpha dependents float on the `alpha` dist-tag so every
    /// stamped publication is picked up without a manifest edit. Returns
    /// `None` for repositories that cannot be depended upon.
    pub fn dependency_range(
        self,
        kind: DependencyKind,
        version: &PackageVersion,
    ) -> Option<String> {
        match (kind, self) {
            (DependencyKind::None, _) => None,
            (DependencyKind::Internal, Channel::Alpha) => Some("alpha".to_string()),
            (DependencyKind::Internal, Channel::Beta) => Some(format!("^{version}")),
            (DependencyKind::Internal, Channel::Production)
            | (DependencyKind::External, _) => {
                Some(format!("^{}", version.without_pre_release()))
            }
        }
    }

    /// Whether the remote release object carries the prerelease flag.
    pub fn is_prerelease(self) -> bool {
        !matches!(self, Channel::Production)
    }

    /// Whether change detection must refuse an uncommitted tree.
    pub fn strict(self) -> bool {
        matches!(self, Channel::Production)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
