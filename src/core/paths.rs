//! core::paths
//!
//! Centralized path routing for Convoy workspace locations.
//!
//! # Architecture
//!
//! A workspace is the directory that holds `convoy.toml` plus the managed
//! repository folders. All storage locations are routed through a
//! centralized helper so that every component agrees on:
//! - where the shared and local configuration stores live
//! - where the exclusive lock file lives
//! - how a repository's folder name maps to an on-disk directory
//!
//! **Hard rule:** no code outside this module may compute `root.join(...)`
//! paths for Convoy storage. All paths go through [`WorkspacePaths`].
//!
//! # Storage Layout
//!
//! All Convoy data lives directly in the workspace root:
//! - `convoy.toml` - shared configuration (committed)
//! - `convoy.local.toml` - local configuration (per machine)
//! - `.convoy.lock` - exclusive lock file
//! - `<folder>/` - one directory per managed repository
//!
//! # Example
//!
//! ```
//! use convoy::core::paths::WorkspacePaths;
//! use std::path::PathBuf;
//!
//! let paths = WorkspacePaths::new(PathBuf::from("/work"));
//!
//! assert_eq!(
//!     paths.shared_config_path(),
//!     PathBuf::from("/work/convoy.toml")
//! );
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared configuration store file name.
pub const SHARED_CONFIG_FILE: &str = "convoy.toml";

/// Local configuration store file name.
pub const LOCAL_CONFIG_FILE: &str = "convoy.local.toml";

/// Lock file name.
pub const LOCK_FILE: &str = ".convoy.lock";

/// Errors from workspace discovery.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("no {SHARED_CONFIG_FILE} found in `{0}` or any parent directory")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Centralized path routing for a Convoy workspace.
///
/// # Invariants
///
/// - `root` is the directory containing `convoy.toml`
/// - Repository directories are resolved relative to `root` unless the
///   configured folder is already absolute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    /// The workspace root directory.
    pub root: PathBuf,
}

impl WorkspacePaths {
    /// Create a new WorkspacePaths rooted at the given directory.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Discover the workspace root by walking upward from `start`.
    ///
    /// The nearest ancestor (including `start` itself) that contains a
    /// `convoy.toml` becomes the root.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::NotFound`] if no ancestor holds a
    /// `convoy.toml`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let paths = WorkspacePaths::discover(&std::env::current_dir()?)?;
    /// ```
    pub fn discover(start: &Path) -> Result<Self, WorkspaceError> {
        let start = start.canonicalize()?;
        let mut dir = start.as_path();
        loop {
            if dir.join(SHARED_CONFIG_FILE).is_file() {
                return Ok(Self::new(dir.to_path_buf()));
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => return Err(WorkspaceError::NotFound(start)),
            }
        }
    }

    // =========================================================================
    // Workspace-scoped paths
    // =========================================================================

    /// Get the path to the shared configuration store.
    ///
    /// This is `<root>/convoy.toml`.
    ///
    /// # Example
    ///
    /// ```
    /// use convoy::core::paths::WorkspacePaths;
    /// use std::path::PathBuf;
    ///
    /// let paths = WorkspacePaths::new(PathBuf::from("/work"));
    /// assert_eq!(
    ///     paths.shared_config_path(),
    ///     PathBuf::from("/work/convoy.toml")
    /// );
    /// ```
    pub fn shared_config_path(&self) -> PathBuf {
        self.root.join(SHARED_CONFIG_FILE)
    }

    /// Get the path to the local configuration store.
    ///
    /// This is `<root>/convoy.local.toml`.
    pub fn local_config_path(&self) -> PathBuf {
        self.root.join(LOCAL_CONFIG_FILE)
    }

    /// Get the path to the workspace lock file.
    ///
    /// This is `<root>/.convoy.lock`.
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    // =========================================================================
    // Repository paths
    // =========================================================================

    /// Resolve a repository folder to an on-disk directory.
    ///
    /// Relative folders are joined onto the workspace root; absolute
    /// folders (a per-machine override) are used as-is.
    ///
    /// # Example
    ///
    /// ```
    /// use convoy::core::paths::WorkspacePaths;
    /// use std::path::PathBuf;
    ///
    /// let paths = WorkspacePaths::new(PathBuf::from("/work"));
    /// assert_eq!(paths.repo_dir("core"), PathBuf::from("/work/core"));
    /// assert_eq!(paths.repo_dir("/elsewhere/core"), PathBuf::from("/elsewhere/core"));
    /// ```
    pub fn repo_dir(&self, folder: &str) -> PathBuf {
        let folder = Path::new(folder);
        if folder.is_absolute() {
            folder.to_path_buf()
        } else {
            self.root.join(folder)
        }
    }

    /// Get the path to a repository's package manifest.
    ///
    /// This is `<repo_dir>/package.json`.
    pub fn manifest_path(&self, folder: &str) -> PathBuf {
        self.repo_dir(folder).join("package.json")
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Get the workspace root as a Path reference.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
