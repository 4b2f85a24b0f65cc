//! completion command - generate shell completion scripts

use std::io::Write;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{generate, shells};

use crate::cli::args::{Cli, Shell};

/// Write a completion script for `shell` to stdout.
pub fn completion(shell: Shell) -> Result<()> {
    write_completion(shell, &mut std::io::stdout());
    Ok(())
}

fn write_completion(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    match shell {
        Shell::Bash => generate(shells::Bash, &mut cmd, &name, out),
        Shell::Zsh => generate(shells::Zsh, &mut cmd, &name, out),
        Shell::Fish => generate(shells::Fish, &mut cmd, &name, out),
        Shell::PowerShell => generate(shells::PowerShell, &mut cmd, &name, out),
    }
}
