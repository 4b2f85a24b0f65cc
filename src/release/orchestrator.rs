//! release::orchestrator
//!
//! Drives a whole publish run across every configured repository.
//!
//! # Design
//!
//! A run is strictly sequential. Repositories are visited in configuration
//! order, which is required to also be dependency order, so a dependency's
//! freshly recorded version is visible before its dependents decide whether
//! they need to publish. The workspace lock is held from before the first
//! configuration read to after the last write.
//!
//! Per repository, the publish decision is: a pipeline interrupted mid-run
//! resumes unconditionally; otherwise the repository publishes when its
//! tree changed since the channel's last publication, or when a dependency
//! published more recently than it did. Any error aborts the remaining run.
//! Repositories that already completed keep their recorded state, and the
//! interrupted one keeps a step pointer the next run picks up.

use thiserror::Error;

use crate::changes::{ChangeDetector, ChangeError};
use crate::ci::triggers::TriggerError;
use crate::ci::watch::WatchError;
use crate::ci::{CiError, CiProvider};
use crate::core::config::schema::DependencyKind;
use crate::core::config::{ConfigError, ConfigStore};
use crate::core::lock::{LockError, WorkspaceLock};
use crate::core::manifest::{Manifest, ManifestError};
use crate::core::paths::WorkspacePaths;
use crate::deps::{any_dependencies_updated, DependencyError, DependencyResolver};
use crate::process::{CommandError, CommandRunner};
use crate::release::channel::{Channel, ChannelError};
use crate::release::executor::{RepoContext, StepExecutor};
use crate::release::step::{Step, StepPointer};
use crate::ui::output::{self, Verbosity};
use crate::ui::prompts::PromptError;
use crate::vcs::{Vcs, VcsError};

/// Flags for one publish run.
///
/// The execution mode is not here: the command runner and the stores were
/// built with it and are the only places allowed to branch on it.
#[derive(Debug, Clone, Copy)]
pub struct PublishOptions {
    pub channel: Channel,
    pub verbosity: Verbosity,
    /// Apply dependency-range updates without asking.
    pub update_all: bool,
    /// Whether prompts may actually read from the terminal.
    pub interactive: bool,
}

/// Any failure a publish run can surface.
///
/// Almost everything is a passthrough from a subsystem; the run itself
/// only adds the cross-channel resume conflict.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Change(#[from] ChangeError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error(transparent)]
    Trigger(#[from] TriggerError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Ci(#[from] CiError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(
        "repository `{repo}` is mid-publish at `{step}` from another channel; \
         finish that publish first or clear `step` in convoy.local.toml"
    )]
    ForeignStep { repo: String, step: Step },
}

/// Publish every repository that needs it on the given channel.
///
/// Holds the workspace lock for the whole run. Configuration is saved
/// after every step inside the executor, after every repository, and once
/// more at the end, so an interruption at any point leaves the on-disk
/// state describing exactly the work that happened.
pub async fn publish(
    paths: &WorkspacePaths,
    store: &ConfigStore,
    runner: &CommandRunner,
    ci: &dyn CiProvider,
    options: &PublishOptions,
) -> Result<(), PublishError> {
    let _lock = WorkspaceLock::acquire(paths)?;
    let mut config = store.load()?;

    // A finished cycle leaves Complete pointers behind; this run starts
    // the next cycle fresh.
    for repo in config.repositories.values_mut() {
        if repo.step.is_complete() {
            repo.step = StepPointer::NotStarted;
        }
    }

    let names: Vec<String> = config.repositories.keys().cloned().collect();
    let mut resolver = DependencyResolver::new();
    let executor = StepExecutor::new(store, runner, ci, options);

    for name in &names {
        let Some(repo) = config.repository(name).cloned() else {
            continue;
        };
        let dir = paths.repo_dir(repo.folder());
        let manifest = Manifest::load(&paths.manifest_path(repo.folder()))?;

        // Resolved for every repository, due or not: later dependents look
        // their dependencies up in the resolver's cache.
        let dependencies = resolver.resolve(&config, &repo, &manifest)?;

        let current = match &repo.version {
            Some(version) => version.clone(),
            None => manifest.version()?,
        };
        let next_version = options.channel.next_version(&current);
        let vcs = Vcs::new(runner.clone(), dir.clone());

        let due = match repo.step {
            StepPointer::InProgress { step } => {
                if !options.channel.pipeline().contains(&step) {
                    return Err(PublishError::ForeignStep {
                        repo: name.clone(),
                        step,
                    });
                }
                output::print(
                    format!("[{name}] resuming at {step}"),
                    options.verbosity,
                );
                true
            }
            _ => {
                let strict = options.channel.strict()
                    || repo.dependency == DependencyKind::External;
                let detector = ChangeDetector::new(&vcs, name, &repo.exclude);
                detector.has_changes(options.channel.last_published(&repo), strict)?
                    || any_dependencies_updated(&config, &repo, &dependencies, options.channel)
            }
        };
        if !due {
            output::debug(format!("[{name}] up to date"), options.verbosity);
            continue;
        }

        let branch = vcs.current_branch()?;
        options
            .channel
            .validate_branch(&repo, &branch, &next_version)?;

        output::print(
            format!("[{name}] {current} -> {next_version} ({})", options.channel),
            options.verbosity,
        );
        let ctx = RepoContext {
            name: name.clone(),
            dir,
            branch,
            next_version,
            dependencies,
        };
        executor.run_pipeline(&mut config, &ctx).await?;
        store.save(&config)?;
    }

    store.save(&config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_step_names_repo_and_step() {
        let error = PublishError::ForeignStep {
            repo: "core".to_string(),
            step: Step::Push,
        };
        let message = error.to_string();
        assert!(message.contains("`core`"));
        assert!(message.contains("`push`"));
        assert!(message.contains("convoy.local.toml"));
    }
}
