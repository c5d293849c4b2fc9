//! Progress reporting boundary
//!
//! The engine reports lifecycle events and live output to a [`ProgressSink`]. Sinks are purely observational: the
//! engine's results do not depend on what a sink does, and [`NullSink`] is a valid choice.

use std::path::Path;

use testmaster_core::{StreamKind, TestCase};

use super::coordinator::{SuiteRun, TestCaseResult};

/// Trait for observing a suite run.
///
/// Implement this trait to present progress (console, GUI, machine-readable logs).
pub trait ProgressSink {
    /// Called instead of any other event when there are no ready cases
    fn on_nothing_to_run(&mut self) {}

    /// Called once the results root exists, before the first case starts
    fn on_run_start(&mut self, _results_root: &Path, _total: usize) {}

    /// Called when a case transitions to `Running` (`index` is 1-based)
    fn on_case_start(&mut self, index: usize, total: usize, case: &TestCase);

    /// Called with each chunk of output as the running case produces it
    fn on_output(&mut self, _case: &TestCase, _stream: StreamKind, _chunk: &[u8]) {}

    /// Called after a case reaches its terminal state and its artifacts are written
    fn on_case_complete(&mut self, result: &TestCaseResult);

    /// Called when the run ends, whether completed, cancelled or aborted
    fn on_run_complete(&mut self, run: &SuiteRun);
}

/// Sink that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_case_start(&mut self, _index: usize, _total: usize, _case: &TestCase) {}

    fn on_case_complete(&mut self, _result: &TestCaseResult) {}

    fn on_run_complete(&mut self, _run: &SuiteRun) {}
}
