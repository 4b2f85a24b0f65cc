//! ui::output
//!
//! Terminal output conventions for the `cvy` binary.
//!
//! # Design
//!
//! User-facing text funnels through this module so the quiet and debug
//! flags behave the same everywhere. Step progress lines carry a `[name]`
//! prefix to keep interleaved multi-repository runs readable, and dry-run
//! announcements share a single `[dry-run]` marker.

use std::fmt::Display;

/// How much the current invocation should say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Progress and results.
    Normal,
    /// Progress plus diagnostic detail.
    Debug,
}

impl Verbosity {
    /// Derive verbosity from the global CLI flags. Quiet wins over debug.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }

    fn shows_progress(self) -> bool {
        self != Verbosity::Quiet
    }

    fn shows_debug(self) -> bool {
        self == Verbosity::Debug
    }
}

/// Print a progress line, unless quiet.
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity.shows_progress() {
        println!("{message}");
    }
}

/// Print a diagnostic line, only in debug mode.
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity.shows_debug() {
        eprintln!("[debug] {message}");
    }
}

/// Print an error. Errors are never suppressed.
pub fn error(message: impl Display) {
    eprintln!("error: {message}");
}

/// Print a completion line, unless quiet.
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity.shows_progress() {
        println!("{message}");
    }
}

/// Print a step progress line for one repository, unless quiet.
pub fn step(repo: &str, message: impl Display, verbosity: Verbosity) {
    if verbosity.shows_progress() {
        println!("[{repo}] {message}");
    }
}

/// Announce an effect a dry run would have had, unless quiet.
pub fn dry_run(message: impl Display, verbosity: Verbosity) {
    if verbosity.shows_progress() {
        println!("[dry-run] {message}");
    }
}
