//! cli::commands
//!
//! Individual command handler implementations.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Discovers the workspace from the start directory
//! 2. Builds the collaborators the command needs (stores, runner, provider)
//! 3. Delegates to [`crate::release`] or reads configuration directly
//!
//! The publish commands are async underneath (CI polling); handlers stay
//! synchronous by running them on a `tokio` runtime via `block_on`.

pub mod completion;
pub mod publish;
pub mod status;

use std::path::PathBuf;

use anyhow::Result;

use super::args::Command;
use crate::release::Channel;
use crate::ui::output::Verbosity;

/// Per-invocation context shared by every handler.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory to run from, when `--cwd` was given.
    pub cwd: Option<PathBuf>,
    pub verbosity: Verbosity,
    /// Whether prompts may actually read from the terminal.
    pub interactive: bool,
}

impl Context {
    /// The directory workspace discovery starts from.
    pub fn start_dir(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Alpha {
            update_all,
            dry_run,
        } => publish::publish(ctx, Channel::Alpha, update_all, dry_run),
        Command::Beta {
            update_all,
            dry_run,
        } => publish::publish(ctx, Channel::Beta, update_all, dry_run),
        Command::Production {
            update_all,
            dry_run,
        } => publish::publish(ctx, Channel::Production, update_all, dry_run),
        Command::Status => status::status(ctx),
        Command::Completion { shell } => completion::completion(shell),
    }
}
