//! process
//!
//! External command execution with dry-run support.
//!
//! # Design
//!
//! Every subprocess Convoy spawns goes through [`CommandRunner`]. The
//! execution mode is fixed when the runner is constructed, so no call site
//! carries its own real-vs-simulated branching:
//!
//! - [`CommandRunner::run`] - effectful commands (npm, git mutations).
//!   In dry-run mode the command is printed and nothing is spawned.
//! - [`CommandRunner::query`] - read-only commands (git log, git status).
//!   These execute in every mode, since a dry run still has to decide and
//!   report what would happen.
//!
//! Working directories are always explicit. The process-wide current
//! directory is never changed.

use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;

use crate::ui::output::{self, Verbosity};

/// Execution mode, fixed at runner construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Spawn subprocesses for real.
    Real,
    /// Print effectful commands instead of spawning them.
    DryRun,
}

impl ExecMode {
    /// True in dry-run mode.
    pub fn is_dry_run(self) -> bool {
        matches!(self, ExecMode::DryRun)
    }
}

/// Errors from command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The subprocess could not be spawned at all.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The subprocess exited with a non-zero status or was killed by a
    /// signal. `ExitStatus` displays both cases.
    #[error("`{command}` failed ({status})")]
    Exit { command: String, status: ExitStatus },

    /// Captured stdout was not valid UTF-8.
    #[error("`{command}` produced non-UTF-8 output")]
    NonUtf8 { command: String },
}

/// Runs external commands against a fixed execution mode.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    mode: ExecMode,
    verbosity: Verbosity,
}

impl CommandRunner {
    /// Create a runner with the given mode and verbosity.
    pub fn new(mode: ExecMode, verbosity: Verbosity) -> Self {
        Self { mode, verbosity }
    }

    /// Get the execution mode.
    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    /// True if this runner simulates effectful commands.
    pub fn is_dry_run(&self) -> bool {
        self.mode.is_dry_run()
    }

    /// Run an effectful command in `cwd`.
    ///
    /// With `capture` set, stdout is piped and returned as lines; otherwise
    /// stdout is inherited and the result is empty. stdin and stderr are
    /// always inherited.
    ///
    /// In dry-run mode nothing is spawned: the command is printed and an
    /// empty result returned. Callers must not depend on captured output
    /// while simulating.
    ///
    /// # Errors
    ///
    /// Fails with [`CommandError`] if the process cannot be spawned, exits
    /// non-zero, or is terminated by a signal.
    pub fn run(
        &self,
        cwd: &Path,
        program: &str,
        args: &[&str],
        capture: bool,
    ) -> Result<Vec<String>, CommandError> {
        if self.mode.is_dry_run() {
            output::dry_run(display_command(program, args), self.verbosity);
            return Ok(Vec::new());
        }
        self.execute(cwd, program, args, capture)
    }

    /// Run a read-only command in `cwd`, capturing stdout as lines.
    ///
    /// Queries execute in every mode: dry-run only suppresses effects, and
    /// the run still needs real repository state to decide what it would do.
    pub fn query(
        &self,
        cwd: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<Vec<String>, CommandError> {
        self.execute(cwd, program, args, true)
    }

    fn execute(
        &self,
        cwd: &Path,
        program: &str,
        args: &[&str],
        capture: bool,
    ) -> Result<Vec<String>, CommandError> {
        let command = display_command(program, args);
        output::debug(format!("run: {} (in {})", command, cwd.display()), self.verbosity);

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .stdout(if capture {
                Stdio::piped()
            } else {
                Stdio::inherit()
            })
            .output()
            .map_err(|source| CommandError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CommandError::Exit {
                command,
                status: output.status,
            });
        }

        let stdout =
            String::from_utf8(output.stdout).map_err(|_| CommandError::NonUtf8 { command })?;
        Ok(stdout.lines().map(str::to_string).collect())
    }
}

/// Render a command line for messages and dry-run output.
fn display_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}
