//! core
//!
//! Core domain types, schemas, and storage for Convoy.
//!
//! # Modules
//!
//! - [`paths`] - Centralized path routing and workspace discovery
//! - [`lock`] - Exclusive workspace lock
//! - [`config`] - Two-store configuration: schema, merge, split, persistence
//! - [`version`] - Package versions and channel version math
//! - [`manifest`] - Package manifest read/write
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Persisted documents survive a load/save cycle byte-order intact

pub mod config;
pub mod lock;
pub mod manifest;
pub mod paths;
pub mod version;
