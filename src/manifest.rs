//! Suite manifest loading
//!
//! Reads a manifest file from disk and hands the text to [`testmaster_core::parse_manifest`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;
use testmaster_core::parse_manifest;

use crate::config::EngineConfig;

#[derive(Debug, Error, Diagnostic)]
#[error("unable to read test cases from test suite {}", .path.display())]
#[diagnostic(code(testmaster::manifest::read))]
pub struct ManifestError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// A loaded suite manifest: where it came from and the ordered case names it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    pub path: PathBuf,
    pub names: Vec<String>,
}

impl Suite {
    /// File name of the manifest, for display.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Find a manifest: as given if it exists, otherwise relative to `testsuites_home`.
pub fn locate_manifest(path: &Path, config: &EngineConfig) -> PathBuf {
    if path.exists() || path.is_absolute() {
        return path.to_path_buf();
    }
    let candidate = config.testsuites_home.join(path);
    if candidate.exists() {
        candidate
    } else {
        path.to_path_buf()
    }
}

/// Read and parse a suite manifest.
pub fn load_manifest(path: &Path) -> Result<Suite, ManifestError> {
    let text = fs::read_to_string(path).map_err(|source| ManifestError {
        path: path.to_path_buf(),
        source,
    })?;
    let names = parse_manifest(&text);
    tracing::info!(
        "Found {} test case(s) in {}",
        names.len(),
        path.file_name().unwrap_or(path.as_os_str()).to_string_lossy()
    );
    Ok(Suite {
        path: path.to_path_buf(),
        names,
    })
}
