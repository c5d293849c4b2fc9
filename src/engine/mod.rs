//! Test execution engine
//!
//! Given resolved test cases and an [`EngineConfig`], the engine runs every ready case one at a time, captures its
//! stdout and stderr, classifies the outcome and persists the results layout:
//!
//! ```text
//! results_home/
//!   20260118093015/          results root, one per suite run
//!     summary.json
//!     login_test/            one per case, named after the case file without its extension
//!       output.txt           only when stdout is non-blank
//!       errors.txt           only when stderr is non-blank
//! ```
//!
//! ## Modules
//!
//! - `multiplexer` - concurrent draining of a child's two output streams
//! - `executor` - spawning one case and classifying how it ended
//! - `coordinator` - the sequential suite run
//! - `artifacts` - output/error files and the suite summary
//! - `progress` - the observer interface for front ends

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod artifacts;
pub mod coordinator;
pub mod executor;
pub mod multiplexer;
pub mod progress;

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local};
use miette::Diagnostic;
use testmaster_core::{TestCase, TransitionError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;

pub use artifacts::ArtifactStatus;
pub use coordinator::{RunOutcome, SuiteRun, Termination, TestCaseResult};
pub use executor::{Execution, ProcessExecutor};
pub use multiplexer::{Captured, StreamMultiplexer};
pub use progress::{NullSink, ProgressSink};

/// Errors that stop the engine itself, as opposed to a test case failing.
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("a suite run is already in progress")]
    #[diagnostic(code(testmaster::engine::run_in_progress))]
    RunInProgress,

    #[error("results folder {} already exists", .path.display())]
    #[diagnostic(
        code(testmaster::engine::results_root_exists),
        help("results folders are named by the second a run starts; wait a second and run again")
    )]
    ResultsRootExists { path: PathBuf },

    #[error("unable to create results folder {}", .path.display())]
    #[diagnostic(code(testmaster::engine::results_root))]
    ResultsRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("test case '{name}' collides with an earlier case: {} already exists", .path.display())]
    #[diagnostic(
        code(testmaster::engine::case_dir_collision),
        help("case results folders drop the file extension; rename one of the cases")
    )]
    CaseDirCollision { name: String, path: PathBuf },

    #[error("unable to create test case results folder {}", .path.display())]
    #[diagnostic(code(testmaster::engine::case_dir))]
    CaseDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("test case '{name}' is ready but has no resolved path")]
    #[diagnostic(code(testmaster::engine::unresolved))]
    Unresolved { name: String },

    #[error(transparent)]
    #[diagnostic(code(testmaster::engine::transition))]
    Transition(#[from] TransitionError),
}

/// The test execution engine.
///
/// Holds the configuration and enforces that at most one suite run is active at a time.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    active: AtomicBool,
}

/// Clears the active flag when a run ends, however it ends.
struct ActiveRun<'a>(&'a AtomicBool);

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            active: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run every ready case in `cases`, in order, naming the results root after the current local time.
    ///
    /// ## Returns
    /// - `Ok(RunOutcome::NothingToRun)` when no case is ready; nothing is created on disk.
    /// - `Ok(RunOutcome::Ran(run))` once the run has started, even if it was later cancelled or aborted
    ///   (see [`SuiteRun::termination`]).
    /// - `Err` when the run could not start: another run is active, or the results root cannot be created.
    pub async fn run_suite(
        &self,
        cases: Vec<TestCase>,
        sink: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, EngineError> {
        self.run_suite_at(cases, Local::now(), sink, cancel).await
    }

    /// Like [`Engine::run_suite`], with an explicit start time for the results root name.
    pub async fn run_suite_at(
        &self,
        cases: Vec<TestCase>,
        started_at: DateTime<Local>,
        sink: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, EngineError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(EngineError::RunInProgress);
        }
        let _active = ActiveRun(&self.active);

        coordinator::run_suite(&self.config, cases, started_at, sink, cancel).await
    }
}
