//! status command - inspect workspace publish state without changing it

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::core::config::ConfigStore;
use crate::core::paths::WorkspacePaths;
use crate::process::ExecMode;
use crate::ui::output;

use super::Context;

/// Print per-repository publish state.
pub fn status(ctx: &Context) -> Result<()> {
    let paths = WorkspacePaths::discover(&ctx.start_dir()?)?;
    // Read-only command: the mode only gates saves, which never happen here.
    let store = ConfigStore::new(paths, ExecMode::DryRun);
    let config = store.load()?;

    if config.repositories.is_empty() {
        output::print("no repositories configured", ctx.verbosity);
        return Ok(());
    }

    for (name, repo) in &config.repositories {
        let version = repo
            .version
            .as_ref()
            .map(|version| version.to_string())
            .unwrap_or_else(|| "unpublished".to_string());
        output::print(
            format!("{name} [{}] {version}", repo.dependency),
            ctx.verbosity,
        );
        output::print(
            format!("  alpha:      {}", stamp(repo.last_alpha_published)),
            ctx.verbosity,
        );
        output::print(
            format!("  beta:       {}", stamp(repo.last_beta_published)),
            ctx.verbosity,
        );
        output::print(
            format!("  production: {}", stamp(repo.last_production_published)),
            ctx.verbosity,
        );
        if !repo.step.is_not_started() {
            output::print(format!("  step:       {}", repo.step), ctx.verbosity);
        }
    }
    Ok(())
}

fn stamp(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "never".to_string(),
    }
}
