//! release::executor
//!
//! Runs a channel pipeline for one repository, one step at a time.
//!
//! # Design
//!
//! The executor owns the resume protocol. For each step S of the pipeline:
//! if the persisted pointer allows S, the pointer is set to S and saved,
//! S's body runs, and only then does the pointer advance to the successor
//! step (or to the terminal completed state) and save again. A crash leaves
//! the pointer naming exactly the step whose work is not known to have
//! finished, and the next run re-enters there.
//!
//! Step bodies are written to be safe under that at-least-once contract:
//! commit skips a clean tree, tag skips an existing tag, and a release that
//! already exists counts as created. Bodies never branch on dry-run; the
//! command runner and the two stores absorb the mode.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use indexmap::IndexSet;

use crate::ci::triggers;
use crate::ci::watch::{WorkflowWatcher, POLL_INTERVAL};
use crate::ci::{CiError, CiProvider, CreateReleaseRequest, WorkflowEvent};
use crate::core::config::{Config, ConfigStore};
use crate::core::manifest::Manifest;
use crate::core::version::PackageVersion;
use crate::process::CommandRunner;
use crate::release::channel::Channel;
use crate::release::orchestrator::{PublishError, PublishOptions};
use crate::release::step::{Step, StepPointer};
use crate::ui::output::{self, Verbosity};
use crate::ui::prompts;
use crate::vcs::Vcs;

/// Everything the executor needs to know about one repository's publish.
#[derive(Debug)]
pub struct RepoContext {
    /// Repository name, which is both the configuration key and the remote
    /// repository name.
    pub name: String,
    /// Absolute working directory of the repository clone.
    pub dir: PathBuf,
    /// The branch the repository is on, already validated for the channel.
    pub branch: String,
    /// The version this publish will produce.
    pub next_version: PackageVersion,
    /// Transitive organization dependencies, in configuration order.
    pub dependencies: IndexSet<String>,
}

impl RepoContext {
    fn manifest_path(&self) -> PathBuf {
        self.dir.join("package.json")
    }

    fn tag_name(&self) -> String {
        format!("v{}", self.next_version)
    }
}

/// Applies a channel pipeline to one repository.
///
/// This is the single mutation pathway for a publish: every manifest edit,
/// subprocess, and configuration write during a repository's pipeline goes
/// through here.
pub struct StepExecutor<'a> {
    store: &'a ConfigStore,
    runner: &'a CommandRunner,
    ci: &'a dyn CiProvider,
    channel: Channel,
    update_all: bool,
    interactive: bool,
    verbosity: Verbosity,
    watch_interval: Duration,
}

impl<'a> StepExecutor<'a> {
    pub fn new(
        store: &'a ConfigStore,
        runner: &'a CommandRunner,
        ci: &'a dyn CiProvider,
        options: &PublishOptions,
    ) -> Self {
        Self {
            store,
            runner,
            ci,
            channel: options.channel,
            update_all: options.update_all,
            interactive: options.interactive,
            verbosity: options.verbosity,
            watch_interval: POLL_INTERVAL,
        }
    }

    /// Replace the CI poll interval. Tests shorten it.
    pub fn with_watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = interval;
        self
    }

    /// Run every remaining pipeline step for one repository.
    ///
    /// The pointer is persisted before and after every step, so an
    /// interruption at any point resumes at the step that was running.
    pub async fn run_pipeline(
        &self,
        config: &mut Config,
        ctx: &RepoContext,
    ) -> Result<(), PublishError> {
        let steps = self.channel.pipeline();
        for (index, step) in steps.iter().enumerate() {
            let pointer = config
                .repository(&ctx.name)
                .map(|repo| repo.step)
                .unwrap_or_default();
            if !pointer.should_run(*step) {
                output::debug(
                    format!("[{}] skipping {} ({})", ctx.name, step, pointer),
                    self.verbosity,
                );
                continue;
            }

            self.set_pointer(config, ctx, StepPointer::InProgress { step: *step });
            self.store.save(config)?;
            output::step(&ctx.name, step, self.verbosity);

            self.run_step(*step, config, ctx).await?;

            let advanced = match steps.get(index + 1) {
                Some(next) => StepPointer::InProgress { step: *next },
                None => StepPointer::Complete,
            };
            self.set_pointer(config, ctx, advanced);
            self.store.save(config)?;
        }
        Ok(())
    }

    fn set_pointer(&self, config: &mut Config, ctx: &RepoContext, pointer: StepPointer) {
        // Repository keys are never removed while a run is in flight.
        if let Some(repo) = config.repository_mut(&ctx.name) {
            repo.step = pointer;
        }
    }

    async fn run_step(
        &self,
        step: Step,
        config: &mut Config,
        ctx: &RepoContext,
    ) -> Result<(), PublishError> {
        match step {
            Step::Update => self.update(config, ctx),
            Step::Build => self.build(ctx),
            Step::Publish => self.publish(config, ctx),
            Step::Restore => self.restore(ctx),
            Step::Commit => self.commit(ctx),
            Step::Tag => self.tag(ctx),
            Step::Push => self.push(ctx),
            Step::AwaitPushWorkflow => self.await_workflow(ctx, WorkflowEvent::Push).await,
            Step::Release => self.release(ctx).await,
            Step::AwaitReleaseWorkflow => self.await_workflow(ctx, WorkflowEvent::Release).await,
            Step::Complete => self.complete(config, ctx),
        }
    }

    /// Set the next version and refresh organization dependency ranges.
    ///
    /// The version is recomputed from persisted state rather than read back
    /// from the manifest, and configuration only records it at `complete`,
    /// so an interrupted update lands on the same answer when re-entered.
    fn update(&self, config: &Config, ctx: &RepoContext) -> Result<(), PublishError> {
        let mut manifest = Manifest::load(&ctx.manifest_path())?;
        manifest.set_version(&ctx.next_version);

        for dependency in &ctx.dependencies {
            let Some(dep) = config.repository(dependency) else {
                continue;
            };
            let package = config.scoped_package(dependency);
            let Some(version) = &dep.version else {
                output::debug(
                    format!(
                        "[{}] `{package}` has never been published; leaving its range alone",
                        ctx.name
                    ),
                    self.verbosity,
                );
                continue;
            };
            let Some(range) = self.channel.dependency_range(dep.dependency, version) else {
                continue;
            };
            match manifest.dependency_range(&package) {
                // The manifest does not reference this dependency; build
                // ordering was the only reason it was resolved.
                None => continue,
                Some(current) if current == range => continue,
                Some(_) => {}
            }

            let apply = self.update_all
                || prompts::confirm(
                    &format!("Update `{package}` to `{range}` in `{}`?", ctx.name),
                    true,
                    self.interactive,
                )?;
            if apply {
                manifest.set_dependency(&package, &range);
                output::print(format!("[{}] {package} -> {range}", ctx.name), self.verbosity);
            }
        }

        manifest.save(self.runner.mode())?;
        Ok(())
    }

    /// Run the package build script when one is declared.
    fn build(&self, ctx: &RepoContext) -> Result<(), PublishError> {
        let manifest = Manifest::load(&ctx.manifest_path())?;
        if !manifest.has_script("build") {
            output::debug(
                format!("[{}] no build script declared", ctx.name),
                self.verbosity,
            );
            return Ok(());
        }
        self.runner.run(&ctx.dir, "npm", &["run", "build"], false)?;
        Ok(())
    }

    /// Publish to the registry under a stamped alpha identifier.
    ///
    /// Every attempt stamps a fresh identifier, so a re-entered publish
    /// never collides with a half-finished earlier one.
    fn publish(&self, config: &Config, ctx: &RepoContext) -> Result<(), PublishError> {
        let mut manifest = Manifest::load(&ctx.manifest_path())?;
        let stamped = ctx.next_version.alpha_stamped(Utc::now());
        manifest.set_version(&stamped);
        manifest.save(self.runner.mode())?;

        let mut args = vec!["publish", "--tag", "alpha"];
        if let Some(registry) = &config.registry {
            args.push("--registry");
            args.push(registry.as_str());
        }
        self.runner.run(&ctx.dir, "npm", &args, false)?;
        Ok(())
    }

    /// Return the manifest to the bare alpha version after a stamped publish.
    fn restore(&self, ctx: &RepoContext) -> Result<(), PublishError> {
        let mut manifest = Manifest::load(&ctx.manifest_path())?;
        manifest.set_version(&ctx.next_version);
        manifest.save(self.runner.mode())?;
        Ok(())
    }

    /// Commit the release edits. A clean tree means a prior attempt already
    /// committed them.
    fn commit(&self, ctx: &RepoContext) -> Result<(), PublishError> {
        let vcs = self.vcs(ctx);
        if vcs.status()?.is_empty() {
            output::debug(
                format!("[{}] nothing left to commit", ctx.name),
                self.verbosity,
            );
            return Ok(());
        }
        vcs.commit_all(&format!("release: {} {}", ctx.name, ctx.next_version))?;
        Ok(())
    }

    fn tag(&self, ctx: &RepoContext) -> Result<(), PublishError> {
        let vcs = self.vcs(ctx);
        let tag = ctx.tag_name();
        if vcs.tag_exists(&tag)? {
            output::debug(
                format!("[{}] tag {tag} already exists", ctx.name),
                self.verbosity,
            );
            return Ok(());
        }
        vcs.tag(&tag)?;
        Ok(())
    }

    /// Push branch and tag in one atomic update. Git treats refs that are
    /// already up to date as a no-op, which covers re-entry.
    fn push(&self, ctx: &RepoContext) -> Result<(), PublishError> {
        self.vcs(ctx).push_atomic(&ctx.branch, &ctx.tag_name())?;
        Ok(())
    }

    /// Wait for the workflow the previous step triggered, if the repository
    /// declares one for `event`.
    async fn await_workflow(
        &self,
        ctx: &RepoContext,
        event: WorkflowEvent,
    ) -> Result<(), PublishError> {
        if !triggers::declares_trigger(&ctx.dir, event)? {
            output::debug(
                format!("[{}] no workflow declares an `{event}` trigger", ctx.name),
                self.verbosity,
            );
            return Ok(());
        }

        let sha = self.vcs(ctx).head_commit()?;
        WorkflowWatcher::new(self.ci)
            .with_interval(self.watch_interval)
            .await_workflow(&ctx.name, &sha, event)
            .await?;
        output::debug(
            format!("[{}] `{event}` workflow for {sha} succeeded", ctx.name),
            self.verbosity,
        );
        Ok(())
    }

    /// Create the remote release object for the tag. An already existing
    /// release is a success: a prior attempt got that far.
    async fn release(&self, ctx: &RepoContext) -> Result<(), PublishError> {
        let request = CreateReleaseRequest {
            tag: ctx.tag_name(),
            name: format!("{} {}", ctx.name, ctx.next_version),
            prerelease: self.channel.is_prerelease(),
        };
        match self.ci.create_release(&ctx.name, request).await {
            Ok(release) => {
                output::debug(
                    format!("[{}] created release {}", ctx.name, release.url),
                    self.verbosity,
                );
                Ok(())
            }
            Err(CiError::AlreadyExists(_)) => {
                output::debug(
                    format!("[{}] release for {} already exists", ctx.name, ctx.tag_name()),
                    self.verbosity,
                );
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Record the finished publish in configuration.
    fn complete(&self, config: &mut Config, ctx: &RepoContext) -> Result<(), PublishError> {
        if let Some(repo) = config.repository_mut(&ctx.name) {
            repo.version = Some(ctx.next_version.clone());
            self.channel.record_publication(repo, Utc::now());
        }
        output::success(
            format!(
                "[{}] published {} to {}",
                ctx.name, ctx.next_version, self.channel
            ),
            self.verbosity,
        );
        Ok(())
    }

    fn vcs(&self, ctx: &RepoContext) -> Vcs {
        Vcs::new(self.runner.clone(), ctx.dir.clone())
    }
}
