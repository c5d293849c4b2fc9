//! Provide the shared, pure vocabulary of the testmaster engine.
//!
//! This crate holds everything that both the execution engine and any front end (console, GUI, reports) must agree
//! on, without doing any IO itself:
//! - the test-case lifecycle state machine ([`state`]),
//! - terminal outcomes and the reasons a case can end in `Error` ([`outcome`]),
//! - suite manifest text parsing ([`manifest`]),
//! - results-directory naming and interpreter extension matching ([`naming`]).
//!
//! ## Notes
//!
//! - This is a "semantic core" crate: **no IO**, no global state, no async runtime.
//! - Filesystem resolution, process spawning and artifact persistence live in the `testmaster` crate.

pub mod errors;
pub mod manifest;
pub mod naming;
pub mod outcome;
pub mod state;

pub use errors::TransitionError;
pub use manifest::parse_manifest;
pub use naming::{case_dir_name, has_extension};
pub use outcome::{ErrorCause, Outcome, StreamKind};
pub use state::{TestCase, TestState, Transition};
