//! Process executor
//!
//! Spawns one test case as a child process, drains its output through the [`StreamMultiplexer`] and classifies how
//! it ended. A case's own misbehaviour (non-zero exit, crash, failure to start) is returned as data in
//! [`Execution`], never as an `Err`.
//!
//! ## Launch convention
//!
//! - Paths matching an [`InterpreterRule`](crate::config::InterpreterRule) run as `program args... <path>`
//!   (Python: `python3 -u <path>`, so output streams unbuffered).
//! - Everything else is executed directly. No shell is involved either way.
//! - stdin is `/dev/null`; stdout and stderr are separate pipes.
//! - The case results directory is exported as `TESTMASTER_RESULTS_DIR`.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use testmaster_core::{ErrorCause, Outcome, StreamKind};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::multiplexer::{Captured, StreamMultiplexer};
use crate::config::EngineConfig;

/// Environment variable through which a test case learns where to put extra result files.
pub const RESULTS_DIR_ENV: &str = "TESTMASTER_RESULTS_DIR";

/// What happened when one test case was executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Exit code; `None` if the process never started or ended without one
    pub exit_code: Option<i32>,
    /// Set whenever the outcome is `Error`
    pub error: Option<ErrorCause>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Whether both streams were drained to end-of-stream
    pub output_complete: bool,
    pub duration: Duration,
}

impl Execution {
    pub fn outcome(&self) -> Outcome {
        if self.error.is_some() {
            Outcome::Error
        } else {
            Outcome::from_exit_code(self.exit_code)
        }
    }

    fn spawn_failure(error: std::io::Error, duration: Duration) -> Self {
        Self {
            exit_code: None,
            error: Some(ErrorCause::Spawn(error.to_string())),
            stdout: Vec::new(),
            stderr: Vec::new(),
            output_complete: true,
            duration,
        }
    }
}

/// How waiting on the child ended.
enum Ended {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Runs single test cases according to an [`EngineConfig`].
pub struct ProcessExecutor<'a> {
    config: &'a EngineConfig,
}

impl<'a> ProcessExecutor<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Program and arguments used to launch `path`.
    pub fn command_line(&self, path: &Path) -> (std::path::PathBuf, Vec<std::ffi::OsString>) {
        match self.config.interpreter_for(path) {
            Some(rule) => {
                let mut args: Vec<std::ffi::OsString> = rule.args.iter().map(Into::into).collect();
                args.push(path.as_os_str().to_owned());
                (rule.program.clone(), args)
            }
            None => (path.to_path_buf(), Vec::new()),
        }
    }

    /// Run one test case to completion.
    ///
    /// ## Parameters
    /// - `path`: resolved path of the test case.
    /// - `results_dir`: the case results directory, exported to the child.
    /// - `cancel`: stop request; kills the child and yields `ErrorCause::Cancelled`.
    /// - `observe`: receives each output chunk as it arrives (after it is captured).
    ///
    /// ## Notes
    /// - The child is always reaped before this returns: on exit, timeout and cancellation alike.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub async fn execute<F>(
        &self,
        path: &Path,
        results_dir: &Path,
        cancel: &CancellationToken,
        observe: F,
    ) -> Execution
    where
        F: FnMut(StreamKind, &[u8]),
    {
        let started = Instant::now();
        let (program, args) = self.command_line(path);
        tracing::info!(
            program = %program.display(),
            results_dir = %results_dir.display(),
            "running test case"
        );

        let mut command = Command::new(&program);
        command
            .args(&args)
            .env(RESULTS_DIR_ENV, results_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group: a terminal Ctrl-C reaches the runner, which then stops the case itself.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(error = %e, "unable to spawn {}", program.display());
                return Execution::spawn_failure(e, started.elapsed());
            }
        };

        let mut mux = StreamMultiplexer::new();
        if let Some(stdout) = child.stdout.take() {
            mux.attach(StreamKind::Stdout, stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            mux.attach(StreamKind::Stderr, stderr);
        }

        let (exited_tx, exited_rx) = oneshot::channel::<()>();
        let grace = self.config.drain_grace;
        let cutoff = async move {
            // Sender dropped or fired: either way the child is gone
            let _ = exited_rx.await;
            tokio::time::sleep(grace).await;
        };

        let wait = async {
            let ended = wait_for_exit(&mut child, self.config.timeout, cancel).await;
            let _ = exited_tx.send(());
            ended
        };

        let (ended, captured) = tokio::join!(wait, mux.drain(cutoff, observe));
        let duration = started.elapsed();
        classify(ended, captured, duration)
    }
}

async fn wait_for_exit(child: &mut Child, timeout: Option<Duration>, cancel: &CancellationToken) -> Ended {
    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        status = child.wait() => Ended::Exited(status),
        () = deadline => {
            tracing::warn!(?timeout, "test case timed out; killing");
            reap(child).await;
            Ended::TimedOut
        }
        () = cancel.cancelled() => {
            tracing::info!("stop requested; killing test case");
            reap(child).await;
            Ended::Cancelled
        }
    }
}

async fn reap(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "failed to kill test case");
        // kill() fails if the child already exited; make sure it is waited on
        let _ = child.wait().await;
    }
}

fn classify(ended: Ended, captured: Captured, duration: Duration) -> Execution {
    let (exit_code, error) = match ended {
        Ended::Exited(Ok(status)) => match status.code() {
            Some(code) => (Some(code), None),
            None => (None, Some(abnormal_cause(status))),
        },
        Ended::Exited(Err(e)) => {
            tracing::error!(error = %e, "failed to collect exit status");
            (None, Some(ErrorCause::Abnormal))
        }
        Ended::TimedOut => (None, Some(ErrorCause::TimedOut)),
        Ended::Cancelled => (None, Some(ErrorCause::Cancelled)),
    };

    Execution {
        exit_code,
        error,
        stdout: captured.stdout,
        stderr: captured.stderr,
        output_complete: captured.complete,
        duration,
    }
}

#[cfg(unix)]
fn abnormal_cause(status: ExitStatus) -> ErrorCause {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => ErrorCause::Signal(signal),
        None => ErrorCause::Abnormal,
    }
}

#[cfg(not(unix))]
fn abnormal_cause(_status: ExitStatus) -> ErrorCause {
    ErrorCause::Abnormal
}
