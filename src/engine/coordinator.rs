//! Suite run coordinator
//!
//! Runs the ready cases of a suite strictly one after another:
//!
//! 1. Create the results root `results_home/<YYYYMMDDHHMMSS>/` (exclusive; an existing directory is fatal).
//! 2. For each ready case, in manifest order: create `results_root/<name without extension>/`, move the case to
//!    `Running`, execute it, move it to its terminal state, write `output.txt`/`errors.txt` when the captures are
//!    non-blank, and append a [`TestCaseResult`].
//! 3. Log the suite results and write `summary.json`.
//!
//! A case directory that cannot be created (including a name collision such as `x.py` + `x.sh`) aborts the rest of
//! the run; the results gathered so far are kept. A stop request is honoured between cases and kills the case that is
//! currently running.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use testmaster_core::{ErrorCause, Outcome, TestCase, case_dir_name};
use tokio_util::sync::CancellationToken;

use super::EngineError;
use super::artifacts::{self, ArtifactStatus};
use super::executor::ProcessExecutor;
use super::progress::ProgressSink;
use crate::config::EngineConfig;

/// Format of the results-root directory name.
pub const RESULTS_ROOT_FORMAT: &str = "%Y%m%d%H%M%S";

/// Outcome of executing one test case within a suite run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseResult {
    /// Case name as declared in the manifest
    pub name: String,
    /// Resolved path that was executed
    pub path: PathBuf,
    pub outcome: Outcome,
    pub exit_code: Option<i32>,
    pub error: Option<ErrorCause>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub case_results_dir: PathBuf,
    pub output_artifact: ArtifactStatus,
    pub errors_artifact: ArtifactStatus,
    pub duration: Duration,
}

impl TestCaseResult {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// How a suite run ended.
#[derive(Debug)]
pub enum Termination {
    /// Every ready case was executed
    Completed,
    /// A stop was requested; remaining cases were not started
    Cancelled,
    /// An engine error made it impossible to continue
    Aborted(EngineError),
}

/// One invocation of "run all ready test cases".
#[derive(Debug)]
pub struct SuiteRun {
    pub started_at: DateTime<Local>,
    pub results_root: PathBuf,
    /// Results in execution order
    pub results: Vec<TestCaseResult>,
    /// Every case handed to the run, with its final state
    pub cases: Vec<TestCase>,
    pub termination: Termination,
    pub summary: Option<ArtifactStatus>,
}

impl SuiteRun {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    /// Completed, and every executed case passed.
    pub fn is_success(&self) -> bool {
        matches!(self.termination, Termination::Completed) && self.results.iter().all(|r| r.outcome == Outcome::Passed)
    }
}

/// Result of asking the engine to run a suite.
#[derive(Debug)]
pub enum RunOutcome {
    /// No case was ready; nothing was created on disk
    NothingToRun,
    Ran(SuiteRun),
}

/// Results-root path for a run started at `started_at`.
pub fn results_root_for(results_home: &Path, started_at: &DateTime<Local>) -> PathBuf {
    results_home.join(started_at.format(RESULTS_ROOT_FORMAT).to_string())
}

fn create_results_root(results_home: &Path, started_at: &DateTime<Local>) -> Result<PathBuf, EngineError> {
    fs::create_dir_all(results_home).map_err(|source| EngineError::ResultsRoot {
        path: results_home.to_path_buf(),
        source,
    })?;
    let root = results_root_for(results_home, started_at);
    match fs::create_dir(&root) {
        Ok(()) => {
            tracing::info!("Created suite results folder {}", root.display());
            Ok(root)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(EngineError::ResultsRootExists { path: root }),
        Err(source) => Err(EngineError::ResultsRoot { path: root, source }),
    }
}

fn create_case_dir(results_root: &Path, case: &TestCase) -> Result<PathBuf, EngineError> {
    let dir = results_root.join(case_dir_name(case.name()));
    match fs::create_dir(&dir) {
        Ok(()) => {
            tracing::debug!("Created test case results folder {}", dir.display());
            Ok(dir)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(EngineError::CaseDirCollision {
            name: case.name().to_string(),
            path: dir,
        }),
        Err(source) => Err(EngineError::CaseDir { path: dir, source }),
    }
}

/// Drive one suite run. The caller guarantees no other run is active.
#[tracing::instrument(skip_all, fields(cases = cases.len()))]
pub(super) async fn run_suite(
    config: &EngineConfig,
    mut cases: Vec<TestCase>,
    started_at: DateTime<Local>,
    sink: &mut dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<RunOutcome, EngineError> {
    let total = cases.iter().filter(|c| c.is_ready()).count();
    if total == 0 {
        tracing::warn!("No test cases loaded. Nothing to do");
        sink.on_nothing_to_run();
        return Ok(RunOutcome::NothingToRun);
    }

    let results_root = create_results_root(&config.results_home, &started_at)?;
    sink.on_run_start(&results_root, total);

    let executor = ProcessExecutor::new(config);
    let mut results = Vec::with_capacity(total);
    let mut termination = Termination::Completed;
    let mut index = 0;

    for case in cases.iter_mut().filter(|c| c.is_ready()) {
        if cancel.is_cancelled() {
            tracing::info!("Stop requested; {} test case(s) not started", total - index);
            termination = Termination::Cancelled;
            break;
        }
        index += 1;

        let case_dir = match create_case_dir(&results_root, case) {
            Ok(dir) => dir,
            Err(e) => {
                tracing::error!("{}; aborting suite run", e);
                termination = Termination::Aborted(e);
                break;
            }
        };

        if let Err(e) = case.start() {
            termination = Termination::Aborted(e.into());
            break;
        }
        tracing::info!("Running test case {} of {}: {}", index, total, case.name());
        sink.on_case_start(index, total, case);

        let Some(path) = case.resolved_path().map(Path::to_path_buf) else {
            // Ready implies a resolved path
            termination = Termination::Aborted(EngineError::Unresolved {
                name: case.name().to_string(),
            });
            break;
        };

        let execution = {
            let observed: &TestCase = case;
            executor
                .execute(&path, &case_dir, cancel, |stream, chunk| {
                    sink.on_output(observed, stream, chunk)
                })
                .await
        };

        let outcome = execution.outcome();
        if let Err(e) = case.finish(outcome) {
            termination = Termination::Aborted(e.into());
            break;
        }

        let output_artifact = artifacts::write_capture(&case_dir, &config.output_file_name, &execution.stdout);
        let errors_artifact = artifacts::write_capture(&case_dir, &config.errors_file_name, &execution.stderr);

        let result = TestCaseResult {
            name: case.name().to_string(),
            path,
            outcome,
            exit_code: execution.exit_code,
            error: execution.error,
            stdout: execution.stdout,
            stderr: execution.stderr,
            case_results_dir: case_dir,
            output_artifact,
            errors_artifact,
            duration: execution.duration,
        };
        match &result.error {
            Some(cause) => tracing::warn!("test case {} of {} {}: {}", index, total, outcome, cause),
            None => tracing::info!("test case {} of {} complete: {}", index, total, outcome),
        }
        sink.on_case_complete(&result);
        results.push(result);
    }

    let mut run = SuiteRun {
        started_at,
        results_root,
        results,
        cases,
        termination,
        summary: None,
    };

    tracing::info!(
        "Test suite results: {} passed, {} failed, {} error(s) of {} run",
        run.count(Outcome::Passed),
        run.count(Outcome::Failed),
        run.count(Outcome::Error),
        run.results.len()
    );
    if config.write_summary {
        run.summary = Some(artifacts::write_summary(&run));
    }
    sink.on_run_complete(&run);
    Ok(RunOutcome::Ran(run))
}
