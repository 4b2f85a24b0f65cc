//! release
//!
//! The publish machinery: channels, pipelines, and the run loop.
//!
//! # Architecture
//!
//! A publish run flows through three layers:
//!
//! 1. **Orchestrator**: locks the workspace, decides per repository whether
//!    a publish is due, and walks repositories in configuration order.
//! 2. **Executor**: runs one repository's pipeline step by step, persisting
//!    the step pointer around every step so a crash can resume.
//! 3. **Channel**: the policy hooks that make alpha, beta, and production
//!    differ (pipeline shape, versioning, branch rules, dependency ranges).
//!
//! Steps themselves are plain data ([`step::Step`]); every effect they have
//! goes through the command runner, the VCS wrapper, the manifest store, or
//! the CI provider, which is what makes dry-run and testing tractable.

pub mod channel;
pub mod executor;
pub mod orchestrator;
pub mod step;

pub use channel::{Channel, ChannelError};
pub use orchestrator::{publish, PublishError, PublishOptions};
pub use step::{Step, StepPointer};
