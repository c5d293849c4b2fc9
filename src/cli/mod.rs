//! CLI module for Test Master
//!
//! This module provides the command-line interface for running test suites.
//!
//! ## Commands
//!
//! - `run <suite> --target <name>` - Run every ready test case of a suite
//! - `list <suite> --target <name>` - Show how each manifest entry resolves
//! - `targets` - List the available targets
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `reporter` - Console progress reporting
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod reporter;

use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::Diagnostic;

use crate::config::{DEFAULT_CONFIG_FILE, EngineConfig};

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    /// Every executed case passed, or there was nothing to run
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// A case failed or errored, or the run was cancelled or aborted
    pub const FAILURE: ExitCode = ExitCode(1);
    /// Bad arguments or setup (config, manifest, target, results folder)
    pub const USAGE: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create a setup error (exit code 2).
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::USAGE)
    }

    /// Render a library diagnostic (code, cause chain, help) as a setup error.
    pub fn diagnostic<E>(err: E) -> Self
    where
        E: Diagnostic + Send + Sync + 'static,
    {
        Self::usage(format!("{:?}", miette::Report::new(err)))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Sequential runner for suites of executable test cases
#[derive(Parser, Debug)]
#[command(name = "testmaster")]
#[command(version = VERSION)]
#[command(about = "Run suites of executable test cases one at a time", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (default: conf/testmaster.conf, when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Folder under which results folders are created
    #[arg(long, global = true, value_name = "DIR")]
    pub results_home: Option<PathBuf>,

    /// Folder holding one sub-folder per target
    #[arg(long, global = true, value_name = "DIR")]
    pub testcases_home: Option<PathBuf>,

    /// Show engine logs on the console
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Suite manifest and target shared by `run` and `list`.
#[derive(Args, Debug)]
pub struct SuiteArgs {
    /// Suite manifest, as a path or a name under the testsuites home
    #[arg(value_name = "SUITE")]
    pub suite: PathBuf,

    /// Target to resolve test cases against
    #[arg(short, long, value_name = "NAME")]
    pub target: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every ready test case of a suite
    Run {
        #[command(flatten)]
        suite: SuiteArgs,
        /// Kill a test case still running after this many seconds
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,
        /// Do not stream test case output to the console
        #[arg(short, long)]
        quiet: bool,
        /// Do not write summary.json into the results folder
        #[arg(long)]
        no_summary: bool,
    },

    /// Show how each test case of a suite resolves against a target
    List {
        #[command(flatten)]
        suite: SuiteArgs,
    },

    /// List the available targets
    Targets,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let (config, loaded) = load_config(&cli)?;

    crate::logging::init(cli.verbose, config.log_file.as_deref())
        .map_err(|e| CliError::usage(format!("Error opening log file: {}", e)))?;
    if !loaded {
        tracing::warn!("No configs read from {}, using defaults", DEFAULT_CONFIG_FILE);
    }

    match cli.command {
        Command::Run {
            suite,
            timeout,
            quiet,
            no_summary,
        } => {
            let mut config = config;
            if let Some(secs) = timeout {
                config = config.with_timeout(Some(Duration::from_secs(secs)));
            }
            if no_summary {
                config = config.with_write_summary(false);
            }
            commands::run_suite(config, &suite.suite, &suite.target, quiet)
        }
        Command::List { suite } => commands::list_suite(&config, &suite.suite, &suite.target),
        Command::Targets => commands::list_targets(&config),
    }
}

/// Build the engine config from the config file and global flags.
///
/// Returns whether a config file was read. A missing default config file is not an error; a missing file named
/// with `--config` is.
fn load_config(cli: &Cli) -> CliResult<(EngineConfig, bool)> {
    let (mut config, loaded) = match &cli.config {
        Some(path) => (EngineConfig::from_file(path).map_err(CliError::diagnostic)?, true),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                (EngineConfig::from_file(&default).map_err(CliError::diagnostic)?, true)
            } else {
                (EngineConfig::default(), false)
            }
        }
    };

    if let Some(dir) = &cli.results_home {
        config = config.with_results_home(dir);
    }
    if let Some(dir) = &cli.testcases_home {
        config = config.with_testcases_home(dir);
    }
    Ok((config, loaded))
}

// ============================================================================
// Tests
// ============================================================================
