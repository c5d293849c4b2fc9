//! Test-case lifecycle state machine.
//!
//! ```text
//!  NotReady --Resolve--> Ready --Spawn--> Running --Terminate(outcome)--> Passed | Failed | Error
//! ```
//!
//! ## Notes
//! - `NotReady -> Ready` only on successful target resolution.
//! - `Running` leaves exactly once, into a terminal state. Terminal states are never left; a suite reload
//!   re-creates the case list instead.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::TransitionError;
use crate::outcome::Outcome;

/// Lifecycle state of one manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestState {
    /// Unresolved against the current target; excluded from execution.
    NotReady,
    /// Resolved to an existing, runnable file; eligible for execution.
    Ready,
    /// The executor has attempted to spawn the process and has no exit status yet.
    Running,
    Passed,
    Failed,
    Error,
}

impl TestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TestState::Passed | TestState::Failed | TestState::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestState::NotReady => "not ready",
            TestState::Ready => "ready",
            TestState::Running => "running",
            TestState::Passed => "passed",
            TestState::Failed => "failed",
            TestState::Error => "error",
        }
    }

    /// Apply a transition, returning the next state.
    ///
    /// ## Returns
    /// - `Some(next)` when the transition is legal from `self`, `None` otherwise.
    pub fn apply(self, transition: Transition) -> Option<TestState> {
        match (self, transition) {
            (TestState::NotReady, Transition::Resolve) => Some(TestState::Ready),
            (TestState::Ready, Transition::Spawn) => Some(TestState::Running),
            (TestState::Running, Transition::Terminate(outcome)) => Some(outcome.into()),
            _ => None,
        }
    }
}

impl From<Outcome> for TestState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Passed => TestState::Passed,
            Outcome::Failed => TestState::Failed,
            Outcome::Error => TestState::Error,
        }
    }
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that move a test case through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Resolve,
    Spawn,
    Terminate(Outcome),
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Resolve => f.write_str("resolve"),
            Transition::Spawn => f.write_str("spawn"),
            Transition::Terminate(outcome) => write!(f, "terminate({})", outcome),
        }
    }
}

/// One entry from a suite manifest, as seen against the currently selected target.
///
/// ## Notes
/// - `state == Ready` implies `resolved_path` is `Some`. The resolver is responsible for checking that the path is
///   an existing, runnable regular file before calling [`TestCase::mark_ready`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCase {
    name: String,
    resolved_path: Option<PathBuf>,
    state: TestState,
}

impl TestCase {
    /// Create an unresolved case from a manifest name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolved_path: None,
            state: TestState::NotReady,
        }
    }

    /// File name exactly as declared in the manifest.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolved_path(&self) -> Option<&Path> {
        self.resolved_path.as_deref()
    }

    pub fn state(&self) -> TestState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == TestState::Ready
    }

    /// Record a successful resolution (`NotReady -> Ready`).
    pub fn mark_ready(&mut self, path: PathBuf) -> Result<(), TransitionError> {
        self.advance(Transition::Resolve)?;
        self.resolved_path = Some(path);
        Ok(())
    }

    /// Record a spawn attempt (`Ready -> Running`).
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.advance(Transition::Spawn)
    }

    /// Record process termination (`Running -> Passed | Failed | Error`).
    pub fn finish(&mut self, outcome: Outcome) -> Result<(), TransitionError> {
        self.advance(Transition::Terminate(outcome))
    }

    fn advance(&mut self, transition: Transition) -> Result<(), TransitionError> {
        match self.state.apply(transition) {
            Some(next) => {
                self.state = next;
                Ok(())
            }
            None => Err(TransitionError {
                name: self.name.clone(),
                from: self.state,
                transition,
            }),
        }
    }
}
