//! ci
//!
//! Remote CI validation.
//!
//! # Architecture
//!
//! The `CiProvider` trait defines the two capabilities a publish needs from
//! a hosted CI service: listing the workflow runs attached to a commit and
//! creating a release object at a tag. On top of it, `watch` turns the
//! listing endpoint into a blocking "wait for this commit's workflow"
//! primitive, and `triggers` decides whether a wait is warranted at all by
//! probing the repository's workflow declarations.
//!
//! # Modules
//!
//! - `traits`: core `CiProvider` trait and run/release types
//! - [`github`]: GitHub implementation using the REST API
//! - [`mock`]: scripted implementation for deterministic testing
//! - `dry_run`: optimistic no-op implementation for simulated publishes
//! - `watch`: poll loop awaiting a commit's workflow run
//! - `triggers`: workflow trigger probe

pub mod dry_run;
pub mod github;
pub mod mock;
mod traits;
pub mod triggers;
pub mod watch;

pub use traits::*;
