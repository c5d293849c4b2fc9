//! Result artifact persistence
//!
//! Writes the per-case `output.txt`/`errors.txt` files and the per-run `summary.json`. Write failures are recovered
//! here: they are logged and reported back as [`ArtifactStatus::Failed`], never propagated.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use testmaster_core::{ErrorCause, Outcome};

use super::coordinator::{SuiteRun, Termination};

pub const SUMMARY_FILE_NAME: &str = "summary.json";

/// What happened to one artifact file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    Written(PathBuf),
    /// The capture was empty after trimming whitespace, so no file was created
    Skipped,
    Failed { path: PathBuf, reason: String },
}

impl ArtifactStatus {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ArtifactStatus::Written(path) => Some(path),
            _ => None,
        }
    }
}

/// Write `content`, trimmed of surrounding whitespace, to `dir/file_name` unless it is blank.
pub fn write_capture(dir: &Path, file_name: &str, content: &[u8]) -> ArtifactStatus {
    let trimmed = content.trim_ascii();
    if trimmed.is_empty() {
        return ArtifactStatus::Skipped;
    }

    let path = dir.join(file_name);
    match fs::write(&path, trimmed) {
        Ok(()) => ArtifactStatus::Written(path),
        Err(e) => {
            tracing::error!(error = %e, "Unable to write test case artifact {}", path.display());
            ArtifactStatus::Failed {
                path,
                reason: e.to_string(),
            }
        }
    }
}

#[derive(Serialize)]
struct SuiteSummary<'a> {
    started_at: String,
    results_root: &'a Path,
    termination: String,
    total: usize,
    passed: usize,
    failed: usize,
    errors: usize,
    cases: Vec<CaseSummary<'a>>,
}

#[derive(Serialize)]
struct CaseSummary<'a> {
    name: &'a str,
    file: &'a Path,
    outcome: Outcome,
    exit_code: Option<i32>,
    error: Option<&'a ErrorCause>,
    results_dir: &'a Path,
    duration_ms: u128,
}

/// Render the suite summary as pretty JSON.
pub fn summary_json(run: &SuiteRun) -> serde_json::Result<String> {
    let summary = SuiteSummary {
        started_at: run.started_at.to_rfc3339(),
        results_root: &run.results_root,
        termination: match &run.termination {
            Termination::Completed => "completed".to_string(),
            Termination::Cancelled => "cancelled".to_string(),
            Termination::Aborted(err) => format!("aborted: {}", err),
        },
        total: run.results.len(),
        passed: run.count(Outcome::Passed),
        failed: run.count(Outcome::Failed),
        errors: run.count(Outcome::Error),
        cases: run
            .results
            .iter()
            .map(|r| CaseSummary {
                name: &r.name,
                file: &r.path,
                outcome: r.outcome,
                exit_code: r.exit_code,
                error: r.error.as_ref(),
                results_dir: &r.case_results_dir,
                duration_ms: r.duration.as_millis(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&summary)
}

/// Write `summary.json` into the results root.
pub fn write_summary(run: &SuiteRun) -> ArtifactStatus {
    let path = run.results_root.join(SUMMARY_FILE_NAME);
    let written = summary_json(run)
        .map_err(|e| e.to_string())
        .and_then(|json| fs::write(&path, json).map_err(|e| e.to_string()));
    match written {
        Ok(()) => ArtifactStatus::Written(path),
        Err(reason) => {
            tracing::warn!("Unable to write suite summary {}: {}", path.display(), reason);
            ArtifactStatus::Failed { path, reason }
        }
    }
}
