//! core::config::schema
//!
//! Configuration schema types for the two stores.
//!
//! # Shared Store
//!
//! `convoy.toml` at the workspace root. Committed, meaningful to the whole
//! organization: the organization name, the registry, and per-repository
//! release state (classification, exclusions, published version, beta and
//! production timestamps).
//!
//! # Local Store
//!
//! `convoy.local.toml` at the workspace root. Per machine, not committed:
//! folder overrides, alpha timestamps, and the in-flight step pointer.
//!
//! # Validation
//!
//! Both stores reject unknown fields outright (`deny_unknown_fields`), so a
//! field written into the wrong store is a parse error, not a silent no-op.
//! Repository tables are `IndexMap`s: document order is publish order and
//! survives a load/save cycle.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::version::PackageVersion;
use crate::release::step::StepPointer;

/// Dependency classification for a repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Not dependable: no other repository may list it.
    #[default]
    None,
    /// Organization-internal: dependents track the release channel
    /// (the `alpha` dist-tag, a beta range, or a release range).
    Internal,
    /// Published externally: dependents pin a caret release range on
    /// every channel.
    External,
}

impl DependencyKind {
    /// Stable snake_case name, as persisted.
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyKind::None => "none",
            DependencyKind::Internal => "internal",
            DependencyKind::External => "external",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared store: `convoy.toml`.
///
/// # Example
///
/// ```toml
/// organization = "acme"
/// registry = "https://registry.example"
///
/// [repositories.core]
/// dependency = "internal"
/// version = "1.2.3-alpha"
/// last_beta_published = "2024-01-02T08:15:00Z"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SharedConfig {
    /// Organization name: the npm scope and the CI provider owner.
    pub organization: String,

    /// Publish registry, forwarded to npm when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    /// Managed repositories. Table order is publish order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub repositories: IndexMap<String, SharedRepository>,
}

impl SharedConfig {
    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.organization.is_empty() {
            return Err(ConfigError::InvalidValue(
                "organization must not be empty".to_string(),
            ));
        }

        for (name, repo) in &self.repositories {
            for extra in &repo.extra_dependencies {
                if !self.repositories.contains_key(extra) {
                    return Err(ConfigError::InvalidValue(format!(
                        "repository `{}` lists unknown extra dependency `{}`",
                        name, extra
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Shared per-repository fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SharedRepository {
    /// Whether and how other repositories may depend on this one.
    pub dependency: DependencyKind,

    /// Working directory, relative to the workspace root.
    /// Defaults to the repository name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,

    /// Repositories treated as dependencies even when no manifest says so.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_dependencies: Vec<String>,

    /// Paths excluded from change detection, relative to the repository.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Last published version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<PackageVersion>,

    /// When the last beta publish finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_beta_published: Option<DateTime<Utc>>,

    /// When the last production publish finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_production_published: Option<DateTime<Utc>>,
}

/// Local store: `convoy.local.toml`.
///
/// # Example
///
/// ```toml
/// [repositories.core]
/// last_alpha_published = "2024-01-01T00:00:00Z"
///
/// [repositories.core.step]
/// state = "in_progress"
/// step = "push"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LocalConfig {
    /// Per-repository local fields. May only override repositories the
    /// shared store introduces.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub repositories: IndexMap<String, LocalRepository>,
}

/// Local per-repository fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LocalRepository {
    /// Per-machine working directory override. May be absolute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,

    /// When the last alpha publish finished on this machine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_alpha_published: Option<DateTime<Utc>>,

    /// In-flight step pointer. Absent means not started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<StepPointer>,
}

impl LocalRepository {
    /// True if every field is unset, so the entry can be dropped on save.
    pub fn is_empty(&self) -> bool {
        self.folder.is_none() && self.last_alpha_published.is_none() && self.step.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::step::Step;

    #[test]
    fn dependency_kind_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&DependencyKind::None).unwrap(), "\"none\"");
        assert_eq!(
            serde_json::to_string(&DependencyKind::Internal).unwrap(),
            "\"internal\""
        );
        assert_eq!(
            serde_json::to_string(&DependencyKind::External).unwrap(),
            "\"external\""
        );
    }

    #[test]
    fn shared_config_parses_full_example() {
        let toml = r#"
organization = "acme"
registry = "https://registry.example"

[repositories.core]
dependency = "internal"
folder = "core"
extra_dependencies = ["tooling"]
exclude = ["docs", "README.md"]
version = "1.2.3-alpha"
last_beta_published = "2024-01-02T08:15:00Z"

[repositories.tooling]
dependency = "internal"
"#;
        let config: SharedConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.organization, "acme");
        let core = &config.repositories["core"];
        assert_eq!(core.dependency, DependencyKind::Internal);
        assert_eq!(core.exclude, vec!["docs", "README.md"]);
        assert_eq!(core.version.as_ref().unwrap().build(), "1.2.3-alpha");
        config.validate().unwrap();
    }

    #[test]
    fn shared_config_rejects_unknown_fields() {
        let toml = r#"
organization = "acme"

[repositories.core]
last_alpha_published = "2024-01-01T00:00:00Z"
"#;
        // Alpha timestamps belong to the local store.
        assert!(toml::from_str::<SharedConfig>(toml).is_err());
    }

    #[test]
    fn shared_config_requires_organization() {
        assert!(toml::from_str::<SharedConfig>("[repositories.core]\n").is_err());
    }

    #[test]
    fn validate_rejects_unknown_extra_dependency() {
        let toml = r#"
organization = "acme"

[repositories.core]
extra_dependencies = ["no-such-repo"]
"#;
        let config: SharedConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no-such-repo"));
    }

    #[test]
    fn local_config_parses_step_pointer() {
        let toml = r#"
[repositories.core]
last_alpha_published = "2024-01-01T00:00:00Z"

[repositories.core.step]
state = "in_progress"
step = "push"
"#;
        let config: LocalConfig = toml::from_str(toml).unwrap();
        let core = &config.repositories["core"];
        assert_eq!(core.step, Some(StepPointer::InProgress { step: Step::Push }));
    }

    #[test]
    fn local_config_rejects_shared_fields() {
        let toml = r#"
[repositories.core]
version = "1.2.3"
"#;
        assert!(toml::from_str::<LocalConfig>(toml).is_err());
    }

    #[test]
    fn local_repository_is_empty() {
        assert!(LocalRepository::default().is_empty());
        let with_step = LocalRepository {
            step: Some(StepPointer::Complete),
            ..Default::default()
        };
        assert!(!with_step.is_empty());
    }

    #[test]
    fn repositories_preserve_document_order() {
        let toml = r#"
organization = "acme"

[repositories.zeta]
[repositories.alpha]
[repositories.mid]
"#;
        let config: SharedConfig = toml::from_str(toml).unwrap();
        let order: Vec<&str> = config.repositories.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["zeta", "alpha", "mid"]);
    }
}
