//! Structured logging setup
//!
//! Console events go to stderr, filtered by `RUST_LOG` (default `warn`, or `info` with `--verbose`). When a log file is
//! configured, every event at `info` and above is also appended to it without ANSI colours.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. Calling it again is a no-op.
pub fn init(verbose: bool, log_file: Option<&Path>) -> io::Result<()> {
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_filter(env_filter(if verbose { "info" } else { "warn" }));

    let file = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(env_filter("info")),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry().with(console).with(file).try_init();
    Ok(())
}
