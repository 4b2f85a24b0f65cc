//! core::manifest
//!
//! Package manifest (`package.json`) read and write.
//!
//! # Design
//!
//! Manifests are edited in place: the document is parsed into an
//! order-preserving JSON map, individual fields are rewritten, and the
//! whole document is saved back with its key order intact. Convoy never
//! reformats a manifest beyond the fields it changes.
//!
//! Dependency edits touch every section a package appears in
//! (`dependencies`, `devDependencies`, `peerDependencies`,
//! `optionalDependencies`), so a package listed both as a runtime and a
//! peer dependency stays consistent.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::version::{PackageVersion, VersionError};
use crate::process::ExecMode;

/// Manifest sections that hold dependency maps.
pub const DEPENDENCY_SECTIONS: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// Errors from manifest operations.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write manifest '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("manifest '{path}' is missing field `{field}`")]
    MissingField { path: PathBuf, field: &'static str },

    #[error("manifest '{path}' has an invalid version: {source}")]
    InvalidVersion {
        path: PathBuf,
        #[source]
        source: VersionError,
    },
}

/// A parsed `package.json`, held with its key order.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    doc: Map<String, Value>,
}

impl Manifest {
    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = fs::read_to_string(path).map_err(|e| ManifestError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let doc: Map<String, Value> =
            serde_json::from_str(&contents).map_err(|e| ManifestError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            doc,
        })
    }

    /// The manifest's location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The package name.
    pub fn name(&self) -> Result<&str, ManifestError> {
        self.doc
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ManifestError::MissingField {
                path: self.path.clone(),
                field: "name",
            })
    }

    /// The package version, parsed.
    pub fn version(&self) -> Result<PackageVersion, ManifestError> {
        let raw = self
            .doc
            .get("version")
            .and_then(Value::as_str)
            .ok_or(ManifestError::MissingField {
                path: self.path.clone(),
                field: "version",
            })?;

        PackageVersion::parse(raw).map_err(|source| ManifestError::InvalidVersion {
            path: self.path.clone(),
            source,
        })
    }

    /// Set the package version.
    pub fn set_version(&mut self, version: &PackageVersion) {
        self.doc
            .insert("version".to_string(), Value::String(version.build()));
    }

    /// True if a script with this name is declared.
    pub fn has_script(&self, name: &str) -> bool {
        self.doc
            .get("scripts")
            .and_then(Value::as_object)
            .is_some_and(|scripts| scripts.contains_key(name))
    }

    /// Repository names this package depends on within the organization
    /// scope, in first-seen order across all dependency sections.
    ///
    /// Returns bare names: a `@acme/core` entry yields `core`.
    pub fn organization_dependencies(&self, organization: &str) -> Vec<String> {
        let prefix = format!("@{}/", organization);
        let mut names = Vec::new();

        for section in DEPENDENCY_SECTIONS {
            let Some(deps) = self.doc.get(section).and_then(Value::as_object) else {
                continue;
            };
            for key in deps.keys() {
                if let Some(name) = key.strip_prefix(&prefix) {
                    if !names.iter().any(|existing| existing == name) {
                        names.push(name.to_string());
                    }
                }
            }
        }

        names
    }

    /// The declared range for a package, from the first section listing it.
    pub fn dependency_range(&self, package: &str) -> Option<&str> {
        DEPENDENCY_SECTIONS.iter().find_map(|section| {
            self.doc
                .get(*section)
                .and_then(Value::as_object)
                .and_then(|deps| deps.get(package))
                .and_then(Value::as_str)
        })
    }

    /// Rewrite the range for a package in every section that lists it.
    ///
    /// Returns `true` if any section changed.
    pub fn set_dependency(&mut self, package: &str, range: &str) -> bool {
        let mut changed = false;

        for section in DEPENDENCY_SECTIONS {
            let Some(deps) = self.doc.get_mut(section).and_then(Value::as_object_mut) else {
                continue;
            };
            if let Some(entry) = deps.get_mut(package) {
                if entry.as_str() != Some(range) {
                    *entry = Value::String(range.to_string());
                    changed = true;
                }
            }
        }

        changed
    }

    /// Save the manifest back to its path.
    ///
    /// Writes atomically (sibling temp file, fsync, rename). In dry-run
    /// mode nothing is written.
    pub fn save(&self, mode: ExecMode) -> Result<(), ManifestError> {
        if mode.is_dry_run() {
            return Ok(());
        }

        // npm convention: two-space indent, trailing newline.
        let mut contents = serde_json::to_string_pretty(&self.doc).map_err(|e| {
            ManifestError::ParseError {
                path: self.path.clone(),
                message: e.to_string(),
            }
        })?;
        contents.push('\n');

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ManifestError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ManifestError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ManifestError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| ManifestError::WriteError {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FIXTURE: &str = r#"{
  "name": "@acme/app",
  "version": "1.2.3-alpha",
  "scripts": {
    "build": "tsc",
    "test": "vitest"
  },
  "dependencies": {
    "@acme/core": "alpha",
    "lodash": "^4.17.0",
    "@acme/tooling": "^1.0.0"
  },
  "devDependencies": {
    "@acme/core": "alpha",
    "@other/thing": "^2.0.0"
  }
}"#;

    fn write_manifest(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("package.json");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_reads_name_and_version() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, FIXTURE);

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.name().unwrap(), "@acme/app");
        assert_eq!(manifest.version().unwrap().build(), "1.2.3-alpha");
    }

    #[test]
    fn missing_name_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, r#"{"version": "1.0.0"}"#);

        let manifest = Manifest::load(&path).unwrap();
        let err = manifest.name().unwrap_err();
        assert!(matches!(err, ManifestError::MissingField { field: "name", .. }));
    }

    #[test]
    fn invalid_version_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, r#"{"name": "x", "version": "not-a-version"}"#);

        let manifest = Manifest::load(&path).unwrap();
        assert!(matches!(
            manifest.version(),
            Err(ManifestError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn has_script_checks_declared_scripts() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, FIXTURE);

        let manifest = Manifest::load(&path).unwrap();
        assert!(manifest.has_script("build"));
        assert!(!manifest.has_script("lint"));
    }

    #[test]
    fn organization_dependencies_are_scoped_and_deduplicated() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, FIXTURE);

        let manifest = Manifest::load(&path).unwrap();
        // `core` appears in two sections but is reported once.
        assert_eq!(
            manifest.organization_dependencies("acme"),
            vec!["core", "tooling"]
        );
        assert!(manifest.organization_dependencies("other-org").is_empty());
    }

    #[test]
    fn set_dependency_updates_every_section() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, FIXTURE);

        let mut manifest = Manifest::load(&path).unwrap();
        assert!(manifest.set_dependency("@acme/core", "^1.2.3-beta"));

        assert_eq!(manifest.dependency_range("@acme/core"), Some("^1.2.3-beta"));
        manifest.save(ExecMode::Real).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("^1.2.3-beta").count(), 2);
    }

    #[test]
    fn set_dependency_reports_no_change() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, FIXTURE);

        let mut manifest = Manifest::load(&path).unwrap();
        assert!(!manifest.set_dependency("@acme/core", "alpha"));
        assert!(!manifest.set_dependency("@acme/absent", "^1.0.0"));
    }

    #[test]
    fn save_preserves_key_order() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, FIXTURE);

        let mut manifest = Manifest::load(&path).unwrap();
        manifest.set_version(&PackageVersion::parse("1.2.4-alpha").unwrap());
        manifest.save(ExecMode::Real).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let name = text.find("\"name\"").unwrap();
        let version = text.find("\"version\"").unwrap();
        let scripts = text.find("\"scripts\"").unwrap();
        let deps = text.find("\"dependencies\"").unwrap();
        assert!(name < version && version < scripts && scripts < deps);
        assert!(text.contains("\"version\": \"1.2.4-alpha\""));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn dry_run_save_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, FIXTURE);

        let mut manifest = Manifest::load(&path).unwrap();
        manifest.set_version(&PackageVersion::parse("9.9.9").unwrap());
        manifest.save(ExecMode::DryRun).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"version\": \"1.2.3-alpha\""));
    }
}
