//! core::config
//!
//! Two-store configuration: loading, merging, splitting, saving.
//!
//! # Overview
//!
//! Convoy persists workspace state in two TOML documents at the workspace
//! root:
//! - **Shared** (`convoy.toml`): committed, organization-wide
//! - **Local** (`convoy.local.toml`): per machine, never committed
//!
//! # Precedence
//!
//! [`ConfigStore::load`] merges the two into one [`Config`]: for each
//! repository key, local fields override shared fields of the same name;
//! unset local fields fall back to shared. The local store may only
//! override repositories the shared store introduces - a local-only key is
//! an error, not a new repository.
//!
//! [`ConfigStore::save`] re-splits by field ownership and rewrites both
//! documents, preserving repository order. A repository key never gets
//! dropped in either direction.
//!
//! # Example
//!
//! ```no_run
//! use convoy::core::config::ConfigStore;
//! use convoy::core::paths::WorkspacePaths;
//! use convoy::process::ExecMode;
//! use std::path::PathBuf;
//!
//! let paths = WorkspacePaths::new(PathBuf::from("/work"));
//! let store = ConfigStore::new(paths, ExecMode::Real);
//! let mut config = store.load().unwrap();
//!
//! for repo in config.repositories.values() {
//!     println!("{} -> {}", repo.name, repo.folder());
//! }
//! # let _ = &mut config;
//! ```

pub mod schema;

pub use schema::{DependencyKind, LocalConfig, LocalRepository, SharedConfig, SharedRepository};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use thiserror::Error;

use crate::core::paths::WorkspacePaths;
use crate::core::version::PackageVersion;
use crate::process::ExecMode;
use crate::release::step::StepPointer;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error(
        "repository `{0}` appears only in the local store; \
         the local store may override repositories, not introduce them"
    )]
    UnknownRepository(String),
}

/// One repository with local fields overlaid on shared fields.
///
/// Fields keep the store they came from so that a save can re-split them
/// without loss; accessors apply precedence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Repository {
    /// The repository key in the configuration maps.
    pub name: String,

    // Shared fields
    pub dependency: DependencyKind,
    pub folder: Option<String>,
    pub extra_dependencies: Vec<String>,
    pub exclude: Vec<String>,
    pub version: Option<PackageVersion>,
    pub last_beta_published: Option<DateTime<Utc>>,
    pub last_production_published: Option<DateTime<Utc>>,

    // Local fields
    pub folder_override: Option<String>,
    pub last_alpha_published: Option<DateTime<Utc>>,
    pub step: StepPointer,
}

impl Repository {
    /// The working directory for this repository.
    ///
    /// Local override wins, then the shared folder, then the name itself.
    pub fn folder(&self) -> &str {
        self.folder_override
            .as_deref()
            .or(self.folder.as_deref())
            .unwrap_or(&self.name)
    }
}

/// Merged configuration for a workspace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Organization name: the npm scope and the CI provider owner.
    pub organization: String,

    /// Publish registry, forwarded to npm when set.
    pub registry: Option<String>,

    /// Managed repositories, in publish order.
    pub repositories: IndexMap<String, Repository>,
}

impl Config {
    /// Get a repository by name.
    pub fn repository(&self, name: &str) -> Option<&Repository> {
        self.repositories.get(name)
    }

    /// Get a repository by name, mutably.
    pub fn repository_mut(&mut self, name: &str) -> Option<&mut Repository> {
        self.repositories.get_mut(name)
    }

    /// The scoped package name for a repository, e.g. `@acme/core`.
    pub fn scoped_package(&self, repo_name: &str) -> String {
        format!("@{}/{}", self.organization, repo_name)
    }

    /// Map a manifest dependency key back to a managed repository name.
    ///
    /// Returns `None` for packages outside the organization scope or not
    /// under management.
    pub fn repo_for_package(&self, package: &str) -> Option<&str> {
        let name = package.strip_prefix(&format!("@{}/", self.organization))?;
        self.repositories
            .get(name)
            .map(|repo| repo.name.as_str())
    }
}

/// Loads and saves the two configuration stores.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    paths: WorkspacePaths,
    mode: ExecMode,
}

impl ConfigStore {
    /// Create a store for the given workspace.
    ///
    /// In dry-run mode, [`ConfigStore::save`] is a no-op: a simulated run
    /// must leave both documents untouched.
    pub fn new(paths: WorkspacePaths, mode: ExecMode) -> Self {
        Self { paths, mode }
    }

    /// Load and merge both stores.
    ///
    /// A missing local store is an empty one. A missing shared store is an
    /// error: workspace discovery already proved it exists.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let shared_path = self.paths.shared_config_path();
        let shared: SharedConfig = read_toml(&shared_path)?;
        shared.validate()?;

        let local_path = self.paths.local_config_path();
        let local: LocalConfig = if local_path.exists() {
            read_toml(&local_path)?
        } else {
            LocalConfig::default()
        };

        Self::merge(shared, local)
    }

    /// Re-split and persist both stores.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        if self.mode.is_dry_run() {
            return Ok(());
        }

        let (shared, local) = Self::split(config);
        write_toml_atomic(&self.paths.shared_config_path(), &shared)?;
        write_toml_atomic(&self.paths.local_config_path(), &local)?;
        Ok(())
    }

    /// Merge parsed stores into one configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownRepository`] for a key present only in
    /// the local store.
    pub fn merge(shared: SharedConfig, mut local: LocalConfig) -> Result<Config, ConfigError> {
        if let Some(name) = local
            .repositories
            .keys()
            .find(|name| !shared.repositories.contains_key(*name))
        {
            return Err(ConfigError::UnknownRepository(name.clone()));
        }

        let mut repositories = IndexMap::with_capacity(shared.repositories.len());
        for (name, shared_repo) in shared.repositories {
            let local_repo = local.repositories.shift_remove(&name).unwrap_or_default();
            repositories.insert(
                name.clone(),
                Repository {
                    name,
                    dependency: shared_repo.dependency,
                    folder: shared_repo.folder,
                    extra_dependencies: shared_repo.extra_dependencies,
                    exclude: shared_repo.exclude,
                    version: shared_repo.version,
                    last_beta_published: shared_repo.last_beta_published,
                    last_production_published: shared_repo.last_production_published,
                    folder_override: local_repo.folder,
                    last_alpha_published: local_repo.last_alpha_published,
                    step: local_repo.step.unwrap_or_default(),
                },
            );
        }

        Ok(Config {
            organization: shared.organization,
            registry: shared.registry,
            repositories,
        })
    }

    /// Split a configuration back into its two stores.
    ///
    /// Local entries with nothing to say are dropped rather than written
    /// empty; a `NotStarted` step pointer is expressed by absence.
    pub fn split(config: &Config) -> (SharedConfig, LocalConfig) {
        let mut shared_repos = IndexMap::with_capacity(config.repositories.len());
        let mut local_repos = IndexMap::new();

        for (name, repo) in &config.repositories {
            shared_repos.insert(
                name.clone(),
                SharedRepository {
                    dependency: repo.dependency,
                    folder: repo.folder.clone(),
                    extra_dependencies: repo.extra_dependencies.clone(),
                    exclude: repo.exclude.clone(),
                    version: repo.version.clone(),
                    last_beta_published: repo.last_beta_published,
                    last_production_published: repo.last_production_published,
                },
            );

            let local_repo = LocalRepository {
                folder: repo.folder_override.clone(),
                last_alpha_published: repo.last_alpha_published,
                step: if repo.step.is_not_started() {
                    None
                } else {
                    Some(repo.step)
                },
            };
            if !local_repo.is_empty() {
                local_repos.insert(name.clone(), local_repo);
            }
        }

        (
            SharedConfig {
                organization: config.organization.clone(),
                registry: config.registry.clone(),
                repositories: shared_repos,
            },
            LocalConfig {
                repositories: local_repos,
            },
        )
    }
}

/// Read and parse a TOML file.
fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Write a TOML file atomically.
///
/// Writes to a sibling temp file, fsyncs, then renames over the target so
/// a crash mid-write never leaves a torn document.
fn write_toml_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    let contents =
        toml::to_string_pretty(value).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

    let temp_path = path.with_extension("toml.tmp");
    let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
        path: temp_path.clone(),
        source: e,
    })?;

    file.write_all(contents.as_bytes())
        .map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

    file.sync_all().map_err(|e| ConfigError::WriteError {
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
