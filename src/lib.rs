//! Convoy - A Rust-native CLI for coordinated multi-repository publishing
//!
//! Convoy drives package releases across a workspace of related repositories:
//! detecting which packages changed since their last release, moving versions
//! through release channels, propagating dependency updates to downstream
//! repositories, and watching the remote CI workflows a release push triggers.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to release)
//! - [`release`] - Orchestrates the per-repository publish pipeline
//! - [`core`] - Workspace paths, locking, configuration, versions, manifests
//! - [`vcs`] - Single interface for all Git operations
//! - [`changes`] - Change detection between releases
//! - [`deps`] - Inter-repository dependency resolution
//! - [`ci`] - Abstraction for remote CI providers (GitHub v1)
//! - [`process`] - External command execution with dry-run support
//! - [`ui`] - Terminal output and interactive prompts
//!
//! # Correctness Invariants
//!
//! Convoy maintains the following invariants:
//!
//! 1. At most one publish run mutates a workspace at a time
//! 2. A step recorded as finished has had all of its effects applied
//! 3. Dependents always publish after the dependencies that pulled them in
//! 4. Dry-run mode never mutates repositories, manifests, or remote state

pub mod changes;
pub mod ci;
pub mod cli;
pub mod core;
pub mod deps;
pub mod process;
pub mod release;
pub mod ui;
pub mod vcs;
