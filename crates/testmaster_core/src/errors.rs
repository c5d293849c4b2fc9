//! Errors raised by the pure test-case vocabulary.

use thiserror::Error;

use crate::state::{TestState, Transition};

/// An event was applied to a test case in a state that does not accept it.
///
/// The engine treats this as a logic error: a correctly driven suite run never produces one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("test case '{name}': cannot apply {transition} while {from}")]
pub struct TransitionError {
    pub name: String,
    pub from: TestState,
    pub transition: Transition,
}
