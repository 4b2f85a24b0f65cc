//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output, disables prompts

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Convoy - coordinated package publishing across repositories
#[derive(Parser, Debug)]
#[command(name = "cvy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if convoy was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; disables prompts
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Determine if prompts may read from the terminal.
    ///
    /// True when stdin is a TTY and `--quiet` was not given. Without a
    /// terminal every prompt resolves to its default answer.
    pub fn interactive(&self) -> bool {
        !self.quiet && std::io::stdin().is_terminal()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish changed repositories to the alpha channel
    #[command(
        name = "alpha",
        long_about = "Publish changed repositories to the alpha channel.\n\n\
            Each due repository gets the next alpha version and is published \
            straight to the package registry under a transient stamped \
            identifier and the `alpha` dist-tag. Nothing is committed, \
            tagged, or pushed; afterwards the manifest is restored to the \
            bare alpha version, so the working tree only carries the \
            version bump. Dependents reference internal alpha packages \
            through the floating `alpha` dist-tag.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Publish every repository that changed since its last alpha
    cvy alpha

    # Preview the run without touching anything
    cvy alpha --dry-run

    # Accept every dependency-range update without prompting
    cvy alpha --update-all"
    )]
    Alpha {
        /// Update dependency expressions without asking
        #[arg(long)]
        update_all: bool,

        /// Log what would happen without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Publish changed repositories to the beta channel
    #[command(
        name = "beta",
        long_about = "Publish changed repositories to the beta channel.\n\n\
            Each due repository moves to the next `-beta` version. The \
            release edits are committed and tagged, branch and tag are \
            pushed atomically, and convoy waits for the CI workflow the \
            push triggers, creates a prerelease on the forge, and waits \
            for the workflow the release triggers. The registry publish \
            itself happens in CI, not locally.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Cut a beta across every changed repository
    cvy beta

    # See which repositories would publish, and as what
    cvy beta --dry-run

RESUMING:
    An interrupted run records the step it stopped at. Running the same
    command again picks each repository up exactly where it left off."
    )]
    Beta {
        /// Update dependency expressions without asking
        #[arg(long)]
        update_all: bool,

        /// Log what would happen without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Publish changed repositories to production
    #[command(
        name = "production",
        long_about = "Publish changed repositories to production.\n\n\
            Each due repository is promoted to its bare release version and \
            goes through the same commit, tag, push, and CI sequence as \
            beta, with the forge release created as a full release rather \
            than a prerelease. Production is strict: every repository must \
            sit on its release branch (`major.minor`), and a repository \
            with uncommitted changes refuses to publish.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Promote the current betas to production
    cvy production

    # Preview first
    cvy production --dry-run

BRANCH RULE:
    Publishing 1.4.0 to production requires the repository to be on
    branch `1.4`. Create it from the tested beta state beforehand."
    )]
    Production {
        /// Update dependency expressions without asking
        #[arg(long)]
        update_all: bool,

        /// Log what would happen without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show per-repository publish state
    #[command(
        name = "status",
        long_about = "Show per-repository publish state.\n\n\
            Read-only: prints each repository's classification, recorded \
            version, last publication per channel, and, when a publish was \
            interrupted, the pipeline step it will resume at.",
        after_help = "\
WORKFLOW EXAMPLES:
    # What state is the workspace in?
    cvy status"
    )]
    Status,

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts.\n\n\
            Writes a completion script for the given shell to stdout.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    source <(cvy completion bash)

    # Zsh
    cvy completion zsh > ~/.zfunc/_cvy

    # Fish
    cvy completion fish > ~/.config/fish/completions/cvy.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn publish_flags_parse() {
        let cli = Cli::try_parse_from(["cvy", "beta", "--update-all", "--dry-run"]).unwrap();
        match cli.command {
            Command::Beta {
                update_all,
                dry_run,
            } => {
                assert!(update_all);
                assert!(dry_run);
            }
            other => panic!("parsed the wrong command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_apply_after_the_subcommand() {
        let cli = Cli::try_parse_from(["cvy", "alpha", "--quiet", "--cwd", "/tmp/ws"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.cwd.as_deref(), Some(std::path::Path::new("/tmp/ws")));
    }

    #[test]
    fn quiet_disables_prompts() {
        let cli = Cli::try_parse_from(["cvy", "--quiet", "status"]).unwrap();
        assert!(!cli.interactive());
    }
}
