//! Target listing and test-case resolution
//!
//! A target is a named sub-directory of `testcases_home`. Resolving a suite against a target maps each manifest
//! name to `target_dir/name` and marks the case `Ready` when that path is a runnable regular file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use testmaster_core::TestCase;
use thiserror::Error;

use crate::config::EngineConfig;

#[derive(Debug, Error, Diagnostic)]
pub enum TargetError {
    #[error("unable to list targets in {}", .path.display())]
    #[diagnostic(code(testmaster::target::read))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unknown target '{name}' (available: {})", .available.join(", "))]
    #[diagnostic(code(testmaster::target::unknown), help("targets are the sub-directories of the testcases home"))]
    Unknown { name: String, available: Vec<String> },
}

/// A named directory under which test-case files are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub dir: PathBuf,
}

/// List the targets available under `testcases_home`, sorted by name.
pub fn list_targets(testcases_home: &Path) -> Result<Vec<Target>, TargetError> {
    let entries = fs::read_dir(testcases_home).map_err(|source| TargetError::Read {
        path: testcases_home.to_path_buf(),
        source,
    })?;

    let mut targets: Vec<Target> = entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .map(|entry| Target {
            name: entry.file_name().to_string_lossy().into_owned(),
            dir: entry.path(),
        })
        .collect();
    targets.sort_by(|a, b| a.name.cmp(&b.name));

    for target in &targets {
        tracing::debug!("Added target {} to the list of targets", target.name);
    }
    Ok(targets)
}

/// Look up a target by name.
pub fn select_target(config: &EngineConfig, name: &str) -> Result<Target, TargetError> {
    let targets = list_targets(&config.testcases_home)?;
    match targets.iter().find(|t| t.name == name) {
        Some(target) => {
            tracing::info!("Loaded test target: {}", target.name);
            Ok(target.clone())
        }
        None => Err(TargetError::Unknown {
            name: name.to_string(),
            available: targets.into_iter().map(|t| t.name).collect(),
        }),
    }
}

/// Resolve manifest names against a target directory.
///
/// Returns one [`TestCase`] per name, in manifest order. Cases whose file is missing, is not a regular file, or
/// cannot be run stay `NotReady`.
pub fn resolve_cases(target_dir: &Path, names: &[String], config: &EngineConfig) -> Vec<TestCase> {
    let total = names.len();
    names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let mut case = TestCase::new(name.as_str());
            let joined = target_dir.join(name);
            let path = std::path::absolute(&joined).unwrap_or(joined);
            tracing::debug!("Loading test case {} of {} {}", index + 1, total, path.display());

            if is_runnable(&path, config) {
                // A freshly created case is NotReady, so Resolve is always legal here.
                if let Err(e) = case.mark_ready(path) {
                    tracing::error!("{}", e);
                }
            } else {
                tracing::info!("Test case {} not found or not runnable in {}", name, target_dir.display());
            }
            case
        })
        .collect()
}

/// The cases eligible for execution, in manifest order.
pub fn ready_cases(cases: &[TestCase]) -> Vec<TestCase> {
    cases.iter().filter(|c| c.is_ready()).cloned().collect()
}

fn is_runnable(path: &Path, config: &EngineConfig) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    config.interpreter_for(path).is_some() || is_executable(&meta)
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    true
}
