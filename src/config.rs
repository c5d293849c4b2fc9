//! Engine configuration
//!
//! The engine never reads process-wide state: every path, interpreter rule and limit it uses comes from an
//! [`EngineConfig`] passed in at construction. Configs can be built in code with the `with_*` methods or loaded
//! from a key/value config file with [`EngineConfig::from_file`].
//!
//! ## Config file format
//!
//! ```text
//! # comments and blank lines are ignored
//! results_home       /var/lib/testmaster/results
//! python_interpreter /usr/bin/python3.12
//! timeout            300
//! ```
//!
//! Each line is a key and a value separated by the first run of whitespace. Lines without a delimiter are skipped.
//! Later lines override earlier ones.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;
use testmaster_core::has_extension;

/// Errors raised while loading configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unable to read config file {}", .path.display())]
    #[diagnostic(code(testmaster::config::read), help("pass --config only for files that exist"))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid value '{value}' for config key '{key}': {reason}")]
    #[diagnostic(code(testmaster::config::invalid_value))]
    InvalidValue { key: String, value: String, reason: String },
}

/// Launch rule for interpreted test scripts.
///
/// A case whose file name ends in `.{extension}` (case-insensitive) is launched as
/// `program args... <path>` instead of being executed directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterRule {
    pub extension: String,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl InterpreterRule {
    pub fn new(extension: impl Into<String>, program: impl Into<PathBuf>, args: &[&str]) -> Self {
        Self {
            extension: extension.into(),
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Python scripts run unbuffered so streamed output arrives promptly.
    pub fn python(program: impl Into<PathBuf>) -> Self {
        Self::new("py", program, &["-u"])
    }

    pub fn matches(&self, path: &Path) -> bool {
        has_extension(path, &self.extension)
    }
}

/// Configuration for the test execution engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory under which one timestamped results root is created per suite run
    pub results_home: PathBuf,
    /// Directory whose sub-directories are the available targets
    pub testcases_home: PathBuf,
    /// Fallback directory for relative manifest paths
    pub testsuites_home: PathBuf,
    /// Interpreter launch rules, checked in order
    pub interpreters: Vec<InterpreterRule>,
    /// Opt-in per-case deadline; `None` lets a case run indefinitely
    pub timeout: Option<Duration>,
    /// How long to keep draining pipes after the child exits
    pub drain_grace: Duration,
    pub output_file_name: String,
    pub errors_file_name: String,
    /// Whether to persist `summary.json` in the results root
    pub write_summary: bool,
    /// Optional log file that receives a copy of all log events
    pub log_file: Option<PathBuf>,
}

pub const DEFAULT_PYTHON_INTERPRETER: &str = "python3";

/// Config file read when none is named on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "conf/testmaster.conf";

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            results_home: PathBuf::from("testresults"),
            testcases_home: PathBuf::from("testcases"),
            testsuites_home: PathBuf::from("testsuites"),
            interpreters: vec![InterpreterRule::python(DEFAULT_PYTHON_INTERPRETER)],
            timeout: None,
            drain_grace: Duration::from_secs(5),
            output_file_name: "output.txt".to_string(),
            errors_file_name: "errors.txt".to_string(),
            write_summary: true,
            log_file: None,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results_home(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_home = dir.into();
        self
    }

    pub fn with_testcases_home(mut self, dir: impl Into<PathBuf>) -> Self {
        self.testcases_home = dir.into();
        self
    }

    pub fn with_testsuites_home(mut self, dir: impl Into<PathBuf>) -> Self {
        self.testsuites_home = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    pub fn with_write_summary(mut self, write: bool) -> Self {
        self.write_summary = write;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Add an interpreter rule, replacing any existing rule for the same extension.
    pub fn with_interpreter(mut self, rule: InterpreterRule) -> Self {
        self.interpreters
            .retain(|r| !r.extension.eq_ignore_ascii_case(&rule.extension));
        self.interpreters.push(rule);
        self
    }

    /// Set the program used for `.py` cases.
    pub fn with_python_interpreter(self, program: impl Into<PathBuf>) -> Self {
        self.with_interpreter(InterpreterRule::python(program))
    }

    /// Find the interpreter rule for a case path, if it is an interpreted script.
    pub fn interpreter_for(&self, path: &Path) -> Option<&InterpreterRule> {
        self.interpreters.iter().find(|rule| rule.matches(path))
    }

    /// Load defaults overlaid with the known keys from a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let values = read_config_file(path)?;
        tracing::info!("Read {} config value(s) from {}", values.len(), path.display());
        Self::default().apply(&values)
    }

    /// Overlay known keys from a parsed config map.
    pub fn apply(mut self, values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        for (key, value) in values {
            match key.as_str() {
                "results_home" => self.results_home = PathBuf::from(value),
                "testcases_home" => self.testcases_home = PathBuf::from(value),
                "testsuites_home" => self.testsuites_home = PathBuf::from(value),
                "python_interpreter" => self = self.with_python_interpreter(value),
                "timeout" => self.timeout = Some(parse_timeout(key, value)?),
                "drain_grace" => self.drain_grace = parse_seconds(key, value)?,
                "log_file" => self.log_file = Some(PathBuf::from(value)),
                "write_summary" => self.write_summary = parse_bool(key, value)?,
                _ => tracing::debug!(key = %key, "ignoring unknown config key"),
            }
        }
        Ok(self)
    }
}

/// Read a key/value config file into a map.
pub fn read_config_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_config(&text))
}

/// Parse key/value config text.
pub fn parse_config(text: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Skip mal-formed lines (no delimiter)
        let Some((key, value)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        values.insert(key.trim().to_string(), value.trim().to_string());
    }
    values
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: "expected a number of seconds".to_string(),
    })?;
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: "must be a non-negative number of seconds".to_string(),
    })
}

fn parse_timeout(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let timeout = parse_seconds(key, value)?;
    if timeout.is_zero() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be greater than zero; leave the key out for no timeout".to_string(),
        });
    }
    Ok(timeout)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
