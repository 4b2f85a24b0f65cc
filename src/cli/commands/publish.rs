//! publish command - run one channel across every due repository

use anyhow::Result;

use crate::ci::dry_run::DryRunCi;
use crate::ci::github::GitHubCi;
use crate::ci::CiProvider;
use crate::core::config::ConfigStore;
use crate::core::paths::WorkspacePaths;
use crate::process::{CommandRunner, ExecMode};
use crate::release::{self, Channel, PublishOptions};
use crate::ui::output;

use super::Context;

/// Publish the given channel.
///
/// Wires up the workspace collaborators, then hands the run to the
/// orchestrator on a fresh `tokio` runtime: the CLI itself stays
/// synchronous, only CI polling suspends.
pub fn publish(ctx: &Context, channel: Channel, update_all: bool, dry_run: bool) -> Result<()> {
    let paths = WorkspacePaths::discover(&ctx.start_dir()?)?;
    let mode = if dry_run {
        ExecMode::DryRun
    } else {
        ExecMode::Real
    };
    let runner = CommandRunner::new(mode, ctx.verbosity);
    let store = ConfigStore::new(paths.clone(), mode);

    // The provider owner comes from configuration, so peek at it before the
    // locked run loads everything again.
    let organization = store.load()?.organization;
    let provider = build_provider(ctx, channel, dry_run, &organization)?;

    let options = PublishOptions {
        channel,
        verbosity: ctx.verbosity,
        // A dry run never prompts; it reports the automatic answer instead.
        update_all: update_all || dry_run,
        interactive: ctx.interactive,
    };

    if dry_run {
        output::dry_run("simulating; nothing will be changed", ctx.verbosity);
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(release::publish(
        &paths,
        &store,
        &runner,
        provider.as_ref(),
        &options,
    ))?;
    Ok(())
}

/// Pick the CI provider for this run.
///
/// Only a real beta or production run talks to the forge and needs a
/// token. The alpha pipeline has no CI steps; it gets the logging
/// provider, same as dry-run.
fn build_provider(
    ctx: &Context,
    channel: Channel,
    dry_run: bool,
    organization: &str,
) -> Result<Box<dyn CiProvider>> {
    if dry_run || channel == Channel::Alpha {
        Ok(Box::new(DryRunCi::new(ctx.verbosity)))
    } else {
        Ok(Box::new(GitHubCi::from_env(organization)?))
    }
}
