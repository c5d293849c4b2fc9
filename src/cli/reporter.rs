//! Console presentation of a suite run
//!
//! Prints a banner, one "Running test case i of n" line per case, the case's live output (unless quiet), a colored
//! status line per case and a final summary.

use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::time::Duration;

use testmaster_core::{Outcome, StreamKind, TestCase};

use crate::engine::{ProgressSink, SuiteRun, Termination, TestCaseResult};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const BOLD_GREEN: &str = "\x1b[1;32m";
const BOLD_RED: &str = "\x1b[1;31m";
const RESET: &str = "\x1b[0m";

const RULE: &str = "===================";

/// Default console reporter.
///
/// Write errors are ignored: losing console output never changes a run's results.
pub struct ConsoleReporter<W: Write = io::Stdout> {
    out: W,
    color: bool,
    stream_output: bool,
    at_line_start: bool,
}

impl ConsoleReporter<io::Stdout> {
    /// Reporter on stdout, colored when stdout is a terminal.
    pub fn stdout(stream_output: bool) -> Self {
        let color = io::stdout().is_terminal();
        Self::new(io::stdout(), color, stream_output)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, color: bool, stream_output: bool) -> Self {
        Self {
            out,
            color,
            stream_output,
            at_line_start: true,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{}{}{}", code, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn line(&mut self, text: &str) {
        if !self.at_line_start {
            let _ = writeln!(self.out);
        }
        let _ = writeln!(self.out, "{}", text);
        self.at_line_start = true;
    }

    fn status(&self, result: &TestCaseResult) -> String {
        let ms = result.duration.as_millis();
        match result.outcome {
            Outcome::Passed => format!("{} ({}ms)", self.paint(GREEN, "PASSED"), ms),
            Outcome::Failed => match result.exit_code {
                Some(code) => format!("{} with exit code {} ({}ms)", self.paint(RED, "FAILED"), code, ms),
                None => format!("{} ({}ms)", self.paint(RED, "FAILED"), ms),
            },
            Outcome::Error => match &result.error {
                Some(cause) => format!("{}: {} ({}ms)", self.paint(YELLOW, "ERROR"), cause, ms),
                None => format!("{} ({}ms)", self.paint(YELLOW, "ERROR"), ms),
            },
        }
    }
}

impl<W: Write> ProgressSink for ConsoleReporter<W> {
    fn on_nothing_to_run(&mut self) {
        self.line("No test cases loaded. Nothing to do");
    }

    fn on_run_start(&mut self, results_root: &Path, total: usize) {
        let banner = self.paint(BOLD, &format!("{} test suite starts {}", RULE, RULE));
        self.line(&banner);
        self.line(&format!("collected {} test case(s)", total));
        self.line(&format!("results in {}", results_root.display()));
        self.line("");
    }

    fn on_case_start(&mut self, index: usize, total: usize, case: &TestCase) {
        self.line(&format!("Running test case {} of {}: {}", index, total, case.name()));
    }

    fn on_output(&mut self, _case: &TestCase, _stream: StreamKind, chunk: &[u8]) {
        if !self.stream_output || chunk.is_empty() {
            return;
        }
        let _ = self.out.write_all(chunk);
        let _ = self.out.flush();
        self.at_line_start = chunk.ends_with(b"\n");
    }

    fn on_case_complete(&mut self, result: &TestCaseResult) {
        let status = self.status(result);
        self.line(&format!("{} {}", result.name, status));
    }

    fn on_run_complete(&mut self, run: &SuiteRun) {
        self.line("");
        match &run.termination {
            Termination::Completed => {}
            Termination::Cancelled => {
                let not_started = run.cases.iter().filter(|c| c.is_ready()).count();
                let text = self.paint(YELLOW, &format!("run cancelled: {} test case(s) not started", not_started));
                self.line(&text);
            }
            Termination::Aborted(err) => {
                let text = self.paint(BOLD_RED, &format!("run aborted: {}", err));
                self.line(&text);
            }
        }

        let mut parts = Vec::new();
        for (outcome, label) in [
            (Outcome::Passed, "passed"),
            (Outcome::Failed, "failed"),
            (Outcome::Error, "error"),
        ] {
            let count = run.count(outcome);
            if count > 0 {
                parts.push(format!("{} {}", count, label));
            }
        }
        if parts.is_empty() {
            parts.push("no test cases run".to_string());
        }

        let elapsed: Duration = run.results.iter().map(|r| r.duration).sum();
        let summary = format!("{} {} in {:.2}s {}", RULE, parts.join(", "), elapsed.as_secs_f64(), RULE);
        let color = if run.is_success() { BOLD_GREEN } else { BOLD_RED };
        let summary = self.paint(color, &summary);
        self.line(&summary);
        let _ = self.out.flush();
    }
}
