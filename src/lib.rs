#![forbid(unsafe_code)]
//! Test Master: a sequential runner for suites of executable test cases
//!
//! A suite manifest lists test-case file names. Selecting a target (a directory under the testcases home) resolves
//! those names to files; every case found becomes `Ready`. Running the suite executes the ready cases one at a time,
//! captures each case's stdout and stderr, classifies the outcome as passed, failed or error, and writes the results
//! under a timestamped directory.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `engine` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! ## Example
//!
//! ```no_run
//! use testmaster::config::EngineConfig;
//! use testmaster::engine::{Engine, NullSink, RunOutcome};
//! use testmaster::{manifest, target};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::default();
//! let suite = manifest::load_manifest("testsuites/smoke".as_ref())?;
//! let target = target::select_target(&config, "staging")?;
//! let cases = target::resolve_cases(&target.dir, &suite.names, &config);
//!
//! let engine = Engine::new(config);
//! if let RunOutcome::Ran(run) = engine.run_suite(cases, &mut NullSink, &CancellationToken::new()).await? {
//!     println!("{} case(s) run, results in {}", run.results.len(), run.results_root.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod logging;
pub mod manifest;
pub mod target;

pub use config::EngineConfig;
pub use engine::{Engine, EngineError, RunOutcome, SuiteRun, TestCaseResult};
pub use testmaster_core::{Outcome, TestCase, TestState};
