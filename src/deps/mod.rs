//! deps
//!
//! Dependency resolution between managed repositories.
//!
//! # Design
//!
//! Resolution runs once per repository, in configuration order. The
//! configuration is required to list dependencies before the repositories
//! that use them; the resolver does not reorder. Under that invariant each
//! repository's transitive closure is its direct dependencies unioned with
//! their already-resolved closures, so a whole run costs one pass over the
//! dependency edges.
//!
//! Direct dependencies come from two places: manifest entries inside the
//! organization's package namespace, and dependencies configured explicitly
//! for repositories whose coupling is invisible to the manifest.

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::core::config::{Config, Repository};
use crate::core::config::schema::DependencyKind;
use crate::core::manifest::Manifest;
use crate::release::channel::Channel;

/// Errors from dependency resolution.
///
/// Every variant is a configuration problem; none of them are transient.
#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("repository `{repo}` depends on `{dependency}`, which is not a configured repository")]
    UnknownDependency { repo: String, dependency: String },

    #[error(
        "repository `{repo}` depends on `{dependency}`, \
         which is configured with dependency kind `none`"
    )]
    NotDependable { repo: String, dependency: String },

    #[error(
        "repository `{repo}` depends on `{dependency}`, which appears later in the \
         configuration; list dependencies before the repositories that use them"
    )]
    OutOfOrder { repo: String, dependency: String },
}

/// Resolves transitive dependency sets, caching per run.
#[derive(Debug, Default)]
pub struct DependencyResolver {
    resolved: IndexMap<String, IndexSet<String>>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the transitive dependency set of `repo`.
    ///
    /// Relies on every dependency having been resolved earlier in the same
    /// run; a cache miss means the configuration lists a dependent before
    /// one of its dependencies.
    pub fn resolve(
        &mut self,
        config: &Config,
        repo: &Repository,
        manifest: &Manifest,
    ) -> Result<IndexSet<String>, DependencyError> {
        let mut direct: IndexSet<String> = IndexSet::new();
        direct.extend(manifest.organization_dependencies(&config.organization));
        direct.extend(repo.extra_dependencies.iter().cloned());

        let mut closure = IndexSet::new();
        for dependency in &direct {
            let target = config.repository(dependency).ok_or_else(|| {
                DependencyError::UnknownDependency {
                    repo: repo.name.clone(),
                    dependency: dependency.clone(),
                }
            })?;
            if target.dependency == DependencyKind::None {
                return Err(DependencyError::NotDependable {
                    repo: repo.name.clone(),
                    dependency: dependency.clone(),
                });
            }
            let transitive = self.resolved.get(dependency).ok_or_else(|| {
                DependencyError::OutOfOrder {
                    repo: repo.name.clone(),
                    dependency: dependency.clone(),
                }
            })?;
            closure.insert(dependency.clone());
            closure.extend(transitive.iter().cloned());
        }

        self.resolved.insert(repo.name.clone(), closure.clone());
        Ok(closure)
    }
}

/// Whether `repo` must republish because of its dependencies.
///
/// True when the repository never published on this channel, or when any
/// dependency's last publication on the channel is strictly newer than the
/// repository's own.
pub fn any_dependencies_updated(
    config: &Config,
    repo: &Repository,
    dependencies: &IndexSet<String>,
    channel: Channel,
) -> bool {
    let Some(own) = channel.last_published(repo) else {
        return true;
    };
    dependencies
        .iter()
        .filter_map(|name| config.repository(name))
        .filter_map(|dependency| channel.last_published(dependency))
        .any(|published| published > own)
}
