//! ci::triggers
//!
//! Probes a repository's workflow files for trigger declarations.
//!
//! # Design
//!
//! Awaiting a workflow only makes sense when the repository actually has
//! one wired to the event. The probe reads `.github/workflows/*.yml` and
//! answers whether any workflow declares the event under its `on:` key, in
//! any of the three YAML shapes GitHub accepts (scalar, sequence, mapping).
//! A repository without a workflows directory simply has no triggers; a
//! workflow file that fails to parse is an error, since it would also fail
//! on the provider side.

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use thiserror::Error;

use super::traits::WorkflowEvent;

/// Where GitHub looks for workflow definitions.
const WORKFLOWS_DIR: &str = ".github/workflows";

/// Errors from probing workflow files.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("failed to read workflow {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse workflow {path}: {message}")]
    ParseError { path: PathBuf, message: String },
}

/// Whether any workflow in the repository is triggered by `event`.
pub fn declares_trigger(repo_dir: &Path, event: WorkflowEvent) -> Result<bool, TriggerError> {
    let dir = repo_dir.join(WORKFLOWS_DIR);
    if !dir.is_dir() {
        return Ok(false);
    }

    let entries = std::fs::read_dir(&dir).map_err(|source| TriggerError::ReadError {
        path: dir.clone(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| TriggerError::ReadError {
            path: dir.clone(),
            source,
        })?;
        let path = entry.path();
        let extension = path.extension().and_then(|ext| ext.to_str());
        if !matches!(extension, Some("yml" | "yaml")) {
            continue;
        }
        if workflow_declares(&path, event)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn workflow_declares(path: &Path, event: WorkflowEvent) -> Result<bool, TriggerError> {
    let text = std::fs::read_to_string(path).map_err(|source| TriggerError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: Value = serde_yaml::from_str(&text).map_err(|err| TriggerError::ParseError {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(trigger_declared(&doc, event.api_name()))
}

fn trigger_declared(doc: &Value, event: &str) -> bool {
    let Value::Mapping(root) = doc else {
        return false;
    };

    // YAML 1.1 parsers resolve a bare `on` key to boolean true; accept both.
    let on = lookup_str(root, "on").or_else(|| {
        root.iter()
            .find_map(|(key, value)| matches!(key, Value::Bool(true)).then_some(value))
    });

    match on {
        Some(Value::String(name)) => name == event,
        Some(Value::Sequence(names)) => names.iter().any(|name| name.as_str() == Some(event)),
        Some(Value::Mapping(triggers)) => lookup_str(triggers, event).is_some(),
        _ => false,
    }
}

fn lookup_str<'v>(map: &'v serde_yaml::Mapping, key: &str) -> Option<&'v Value> {
    map.iter().find_map(|(k, v)| match k {
        Value::String(name) if name == key => Some(v),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo_with_workflow(contents: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let workflows = dir.path().join(WORKFLOWS_DIR);
        std::fs::create_dir_all(&workflows).unwrap();
        std::fs::write(workflows.join("ci.yml"), contents).unwrap();
        dir
    }

    #[test]
    fn scalar_trigger_matches_exactly() {
        let repo = repo_with_workflow("name: CI\non: push\njobs: {}\n");
        assert!(declares_trigger(repo.path(), WorkflowEvent::Push).unwrap());
        assert!(!declares_trigger(repo.path(), WorkflowEvent::Release).unwrap());
    }

    #[test]
    fn sequence_trigger_matches_any_entry() {
        let repo = repo_with_workflow("on: [pull_request, release]\njobs: {}\n");
        assert!(declares_trigger(repo.path(), WorkflowEvent::Release).unwrap());
        assert!(!declares_trigger(repo.path(), WorkflowEvent::Push).unwrap());
    }

    #[test]
    fn mapping_trigger_matches_by_key() {
        let repo = repo_with_workflow(
            r#"
name: Publish
on:
  push:
    tags: ['v*']
  release:
    types: [published]
jobs: {}
"#,
        );
        assert!(declares_trigger(repo.path(), WorkflowEvent::Push).unwrap());
        assert!(declares_trigger(repo.path(), WorkflowEvent::Release).unwrap());
    }

    #[test]
    fn boolean_on_key_is_accepted() {
        // YAML 1.1 emitters write the `on` key as a bare boolean.
        let repo = repo_with_workflow("true:\n  push:\n    branches: [main]\njobs: {}\n");
        assert!(declares_trigger(repo.path(), WorkflowEvent::Push).unwrap());
    }

    #[test]
    fn missing_workflows_dir_means_no_triggers() {
        let dir = TempDir::new().unwrap();
        assert!(!declares_trigger(dir.path(), WorkflowEvent::Push).unwrap());
    }

    #[test]
    fn non_yaml_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let workflows = dir.path().join(WORKFLOWS_DIR);
        std::fs::create_dir_all(&workflows).unwrap();
        std::fs::write(workflows.join("README.md"), "on: push\n").unwrap();
        assert!(!declares_trigger(dir.path(), WorkflowEvent::Push).unwrap());
    }

    #[test]
    fn unparseable_workflow_is_an_error() {
        let repo = repo_with_workflow("on: [push\n");
        let err = declares_trigger(repo.path(), WorkflowEvent::Push).unwrap_err();
        assert!(matches!(err, TriggerError::ParseError { .. }));
    }

    #[test]
    fn any_workflow_in_the_directory_can_match() {
        let repo = repo_with_workflow("on: pull_request\njobs: {}\n");
        let workflows = repo.path().join(WORKFLOWS_DIR);
        std::fs::write(workflows.join("publish.yaml"), "on: release\njobs: {}\n").unwrap();
        assert!(declares_trigger(repo.path(), WorkflowEvent::Release).unwrap());
    }
}
