//! cli
//!
//! Command-line interface layer for Convoy.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Build the per-invocation context (verbosity, prompting, start directory)
//! - Delegate to command handlers
//!
//! The layer stays thin. Publish semantics live in [`crate::release`];
//! handlers here only wire collaborators together and hand the result back
//! as an exit status.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use anyhow::Result;

use crate::ui::output::Verbosity;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let ctx = commands::Context {
        cwd: cli.cwd.clone(),
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
        interactive: cli.interactive(),
    };

    commands::dispatch(cli.command, &ctx)
}
