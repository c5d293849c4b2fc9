//! Terminal outcomes of a test case and the reasons an execution can end in `Error`.

use std::fmt;

use serde::Serialize;

/// Terminal classification of one test case execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Process exited with status 0.
    Passed,
    /// Process ran to completion and reported a non-zero status.
    Failed,
    /// Process could not be spawned, or ended without a collectible exit status.
    Error,
}

impl Outcome {
    /// Classify a process termination by its exit code.
    ///
    /// ## Parameters
    /// - `code`: the exit code, or `None` when the process produced no usable status
    ///   (killed by a signal, launcher failure).
    ///
    /// ## Returns
    /// - (`Outcome`): `Passed` for `Some(0)`, `Failed` for any other code, `Error` for `None`.
    ///
    /// ## Examples
    /// ```rust
    /// use testmaster_core::Outcome;
    ///
    /// assert_eq!(Outcome::from_exit_code(Some(0)), Outcome::Passed);
    /// assert_eq!(Outcome::from_exit_code(Some(2)), Outcome::Failed);
    /// assert_eq!(Outcome::from_exit_code(None), Outcome::Error);
    /// ```
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Outcome::Passed,
            Some(_) => Outcome::Failed,
            None => Outcome::Error,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed => "failed",
            Outcome::Error => "error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a case ended in [`Outcome::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ErrorCause {
    /// The process could not be created (missing binary, permission denied, bad interpreter).
    Spawn(String),
    /// The process was terminated by a signal.
    Signal(i32),
    /// The process exited but the OS reported neither an exit code nor a signal.
    Abnormal,
    /// The opt-in per-case deadline elapsed and the process was killed.
    TimedOut,
    /// A stop was requested while the process was running and it was killed.
    Cancelled,
}

impl fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCause::Spawn(msg) => write!(f, "failed to spawn: {}", msg),
            ErrorCause::Signal(sig) => write!(f, "terminated by signal {}", sig),
            ErrorCause::Abnormal => f.write_str("terminated without an exit status"),
            ErrorCause::TimedOut => f.write_str("timed out"),
            ErrorCause::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// One of the two output streams captured from a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
