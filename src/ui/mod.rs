//! ui
//!
//! Terminal interaction for the `cvy` binary.
//!
//! # Modules
//!
//! - [`output`] - Progress, diagnostic, and dry-run line formatting
//! - [`prompts`] - Interactive confirmations before irreversible steps
//!
//! Everything user-visible routes through here so the quiet, debug, and
//! non-interactive flags behave uniformly across commands.

pub mod output;
pub mod prompts;
