//! Integration tests for the test execution engine
//!
//! These run real child processes. Shell cases are launched through a `/bin/sh` interpreter rule rather than
//! executed directly, so a script written by one test is never exec'd while another test's fork still holds it open.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, TimeZone};
use tempfile::TempDir;
use testmaster::config::{EngineConfig, InterpreterRule};
use testmaster::engine::{
    ArtifactStatus, Engine, EngineError, NullSink, ProgressSink, RunOutcome, SuiteRun, Termination, TestCaseResult,
};
use testmaster::{manifest, target};
use testmaster_core::{ErrorCause, Outcome, StreamKind, TestCase, TestState};
use tokio_util::sync::CancellationToken;

struct Fixture {
    root: TempDir,
    config: EngineConfig,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("testcases/staging")).unwrap();
        let config = EngineConfig::new()
            .with_testcases_home(root.path().join("testcases"))
            .with_results_home(root.path().join("results"))
            .with_interpreter(InterpreterRule::new("sh", "/bin/sh", &[]))
            .with_drain_grace(Duration::from_millis(500));
        Self { root, config }
    }

    fn target_dir(&self) -> PathBuf {
        self.root.path().join("testcases/staging")
    }

    fn results_home(&self) -> PathBuf {
        self.root.path().join("results")
    }

    fn write_case(&self, name: &str, body: &str) -> PathBuf {
        let path = self.target_dir().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn cases(&self, names: &[&str]) -> Vec<TestCase> {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        target::resolve_cases(&self.target_dir(), &names, &self.config)
    }

    async fn run(&self, cases: Vec<TestCase>) -> SuiteRun {
        let engine = Engine::new(self.config.clone());
        ran(engine
            .run_suite(cases, &mut NullSink, &CancellationToken::new())
            .await
            .unwrap())
    }
}

fn ran(outcome: RunOutcome) -> SuiteRun {
    match outcome {
        RunOutcome::Ran(run) => run,
        RunOutcome::NothingToRun => panic!("expected the suite to run"),
    }
}

/// Records every progress event as a line of text.
#[derive(Default)]
struct Recorder {
    events: Vec<String>,
    stdout: Vec<u8>,
}

impl ProgressSink for Recorder {
    fn on_nothing_to_run(&mut self) {
        self.events.push("nothing to run".to_string());
    }

    fn on_run_start(&mut self, _results_root: &Path, total: usize) {
        self.events.push(format!("start {}", total));
    }

    fn on_case_start(&mut self, index: usize, total: usize, case: &TestCase) {
        self.events.push(format!("case {} of {}: {} ({})", index, total, case.name(), case.state()));
    }

    fn on_output(&mut self, _case: &TestCase, stream: StreamKind, chunk: &[u8]) {
        if stream == StreamKind::Stdout {
            self.stdout.extend_from_slice(chunk);
        }
    }

    fn on_case_complete(&mut self, result: &TestCaseResult) {
        self.events.push(format!("done {}: {}", result.name, result.outcome));
    }

    fn on_run_complete(&mut self, run: &SuiteRun) {
        self.events.push(format!("complete {}", run.results.len()));
    }
}

// =============================================================================
// Resolution
// =============================================================================

#[test]
fn manifest_entries_missing_from_target_stay_not_ready() {
    let fx = Fixture::new();
    let manifest_path = fx.root.path().join("smoke");
    fs::write(&manifest_path, "# sample\na.py\n\nb.sh\n").unwrap();
    fx.write_case("a.py", "print('hello')\n");

    let suite = manifest::load_manifest(&manifest_path).unwrap();
    assert_eq!(suite.names, ["a.py", "b.sh"]);

    let cases = target::resolve_cases(&fx.target_dir(), &suite.names, &fx.config);
    assert_eq!(cases[0].state(), TestState::Ready);
    assert_eq!(cases[1].state(), TestState::NotReady);

    let ready = target::ready_cases(&cases);
    let names: Vec<_> = ready.iter().map(|c| c.name()).collect();
    assert_eq!(names, ["a.py"]);
}

#[tokio::test]
async fn nothing_to_run_creates_no_results_folder() {
    let fx = Fixture::new();
    let engine = Engine::new(fx.config.clone());
    let mut recorder = Recorder::default();

    let outcome = engine
        .run_suite(fx.cases(&["missing.sh"]), &mut recorder, &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::NothingToRun));
    assert!(!fx.results_home().exists());
    assert_eq!(recorder.events, ["nothing to run"]);
}

// =============================================================================
// Outcomes and artifacts
// =============================================================================

#[tokio::test]
async fn stdout_only_case_passes_with_output_file() {
    let fx = Fixture::new();
    fx.write_case("a.sh", "echo hello\nexit 0\n");

    let run = fx.run(fx.cases(&["a.sh"])).await;
    let result = &run.results[0];

    assert_eq!(result.outcome, Outcome::Passed);
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(result.case_results_dir, run.results_root.join("a"));
    assert_eq!(fs::read_to_string(result.case_results_dir.join("output.txt")).unwrap(), "hello");
    assert!(!result.case_results_dir.join("errors.txt").exists());
    assert_eq!(result.errors_artifact, ArtifactStatus::Skipped);
    assert_eq!(run.cases[0].state(), TestState::Passed);
}

#[tokio::test]
async fn stderr_and_nonzero_exit_fails_with_errors_file() {
    let fx = Fixture::new();
    fx.write_case("c.sh", "echo boom >&2\nexit 2\n");

    let run = fx.run(fx.cases(&["c.sh"])).await;
    let result = &run.results[0];

    assert_eq!(result.outcome, Outcome::Failed);
    assert_eq!(result.exit_code, Some(2));
    assert!(result.error.is_none());
    assert_eq!(fs::read_to_string(result.case_results_dir.join("errors.txt")).unwrap(), "boom");
    assert!(!result.case_results_dir.join("output.txt").exists());
    assert!(!run.is_success());
}

#[tokio::test]
async fn whitespace_only_output_writes_no_files() {
    let fx = Fixture::new();
    fx.write_case("blank.sh", "printf '  \\n\\t\\n'\nprintf '\\n' >&2\n");

    let run = fx.run(fx.cases(&["blank.sh"])).await;
    let result = &run.results[0];

    assert_eq!(result.outcome, Outcome::Passed);
    assert!(result.case_results_dir.is_dir());
    assert!(!result.case_results_dir.join("output.txt").exists());
    assert!(!result.case_results_dir.join("errors.txt").exists());
}

#[tokio::test]
async fn permission_revoked_after_resolution_is_error_and_run_continues() {
    let fx = Fixture::new();
    let binary = fx.write_case("d.bin", "#!/bin/sh\nexit 0\n");
    fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();
    fx.write_case("e.sh", "echo after\n");

    let cases = fx.cases(&["d.bin", "e.sh"]);
    assert!(cases.iter().all(|c| c.is_ready()));
    fs::set_permissions(&binary, fs::Permissions::from_mode(0o644)).unwrap();

    let run = fx.run(cases).await;

    assert!(matches!(run.termination, Termination::Completed));
    assert_eq!(run.results.len(), 2);
    assert_eq!(run.results[0].outcome, Outcome::Error);
    assert_eq!(run.results[0].exit_code, None);
    assert!(matches!(run.results[0].error, Some(ErrorCause::Spawn(_))));
    assert_eq!(run.results[1].outcome, Outcome::Passed);
}

#[tokio::test]
async fn colliding_case_folders_abort_the_run() {
    let fx = Fixture::new();
    fx.write_case("x.sh", "echo first\n");
    fx.write_case("x.py", "print('second')\n");

    let run = fx.run(fx.cases(&["x.sh", "x.py"])).await;

    match &run.termination {
        Termination::Aborted(EngineError::CaseDirCollision { name, path }) => {
            assert_eq!(name, "x.py");
            assert_eq!(path, &run.results_root.join("x"));
        }
        other => panic!("expected a collision, got {other:?}"),
    }
    assert_eq!(run.results.len(), 1);
    assert_eq!(fs::read_to_string(run.results_root.join("x/output.txt")).unwrap(), "first");
    assert_eq!(run.cases[1].state(), TestState::Ready);
}

#[tokio::test]
async fn executable_without_interpreter_runs_directly() {
    let fx = Fixture::new();
    std::os::unix::fs::symlink("/bin/sh", fx.target_dir().join("shell")).unwrap();

    let run = fx.run(fx.cases(&["shell"])).await;

    assert_eq!(run.results[0].outcome, Outcome::Passed);
    assert_eq!(run.results[0].case_results_dir, run.results_root.join("shell"));
}

#[tokio::test]
async fn python_case_runs_through_interpreter() {
    let has_python = std::process::Command::new("python3")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success());
    if !has_python {
        return; // Skip if python3 not installed
    }

    let fx = Fixture::new();
    fx.write_case("a.py", "print('hello')\n");

    let run = fx.run(fx.cases(&["a.py"])).await;
    let result = &run.results[0];

    assert_eq!(result.outcome, Outcome::Passed);
    assert_eq!(fs::read_to_string(result.case_results_dir.join("output.txt")).unwrap(), "hello");
    assert!(!result.case_results_dir.join("errors.txt").exists());
}

#[tokio::test]
async fn case_learns_its_results_folder_from_environment() {
    let fx = Fixture::new();
    fx.write_case(
        "env.sh",
        "printf '%s' \"$TESTMASTER_RESULTS_DIR\"\necho extra > \"$TESTMASTER_RESULTS_DIR/extra.txt\"\n",
    );

    let run = fx.run(fx.cases(&["env.sh"])).await;
    let result = &run.results[0];

    assert_eq!(result.stdout_text(), result.case_results_dir.display().to_string());
    assert_eq!(fs::read_to_string(result.case_results_dir.join("extra.txt")).unwrap(), "extra\n");
}

// =============================================================================
// Stream draining
// =============================================================================

#[tokio::test]
async fn bursty_output_on_both_streams_does_not_deadlock() {
    let fx = Fixture::new();
    fx.write_case(
        "burst.sh",
        "head -c 1048576 /dev/zero >&2\nhead -c 1048576 /dev/zero\necho tail >&2\nexit 3\n",
    );

    let run = tokio::time::timeout(Duration::from_secs(60), fx.run(fx.cases(&["burst.sh"])))
        .await
        .expect("suite run deadlocked");
    let result = &run.results[0];

    assert_eq!(result.outcome, Outcome::Failed);
    assert_eq!(result.stdout.len(), 1 << 20);
    assert_eq!(result.stderr.len(), (1 << 20) + "tail\n".len());
    assert!(result.stderr.ends_with(b"tail\n"));
}

#[tokio::test]
async fn live_output_matches_captured_output() {
    let fx = Fixture::new();
    fx.write_case("count.sh", "for i in 1 2 3 4 5; do echo line $i; done\n");
    let engine = Engine::new(fx.config.clone());
    let mut recorder = Recorder::default();

    let run = ran(engine
        .run_suite(fx.cases(&["count.sh"]), &mut recorder, &CancellationToken::new())
        .await
        .unwrap());

    assert_eq!(recorder.stdout, run.results[0].stdout);
    assert_eq!(recorder.stdout, b"line 1\nline 2\nline 3\nline 4\nline 5\n");
}

// =============================================================================
// Suite run lifecycle
// =============================================================================

#[tokio::test]
async fn progress_events_follow_execution_order() {
    let fx = Fixture::new();
    fx.write_case("a.sh", "exit 0\n");
    fx.write_case("b.sh", "exit 1\n");
    let engine = Engine::new(fx.config.clone());
    let mut recorder = Recorder::default();

    engine
        .run_suite(fx.cases(&["a.sh", "gone.sh", "b.sh"]), &mut recorder, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        recorder.events,
        [
            "start 2",
            "case 1 of 2: a.sh (running)",
            "done a.sh: passed",
            "case 2 of 2: b.sh (running)",
            "done b.sh: failed",
            "complete 2",
        ]
    );
}

#[tokio::test]
async fn summary_json_describes_the_run() {
    let fx = Fixture::new();
    fx.write_case("a.sh", "exit 0\n");
    fx.write_case("b.sh", "exit 4\n");

    let run = fx.run(fx.cases(&["a.sh", "b.sh"])).await;
    let summary_path = run.results_root.join("summary.json");
    assert_eq!(run.summary, Some(ArtifactStatus::Written(summary_path.clone())));

    let summary: serde_json::Value = serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
    assert_eq!(summary["termination"], "completed");
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["passed"], 1);
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["cases"][1]["name"], "b.sh");
    assert_eq!(summary["cases"][1]["outcome"], "failed");
    assert_eq!(summary["cases"][1]["exit_code"], 4);
}

#[tokio::test]
async fn summary_can_be_disabled() {
    let mut fx = Fixture::new();
    fx.config = fx.config.clone().with_write_summary(false);
    fx.write_case("a.sh", "exit 0\n");

    let run = fx.run(fx.cases(&["a.sh"])).await;

    assert!(run.summary.is_none());
    assert!(!run.results_root.join("summary.json").exists());
}

#[tokio::test]
async fn second_concurrent_run_is_rejected() {
    let fx = Fixture::new();
    fx.write_case("slow.sh", "sleep 1\n");
    let engine = Engine::new(fx.config.clone());
    let cancel = CancellationToken::new();

    let first = async {
        let mut sink = NullSink;
        engine.run_suite(fx.cases(&["slow.sh"]), &mut sink, &cancel).await
    };
    let second = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let mut sink = NullSink;
        engine.run_suite(fx.cases(&["slow.sh"]), &mut sink, &cancel).await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(matches!(first, Ok(RunOutcome::Ran(_))));
    assert!(matches!(second, Err(EngineError::RunInProgress)));

    // The engine is free again once the first run has finished
    let later = Local.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).single().unwrap();
    let third = engine
        .run_suite_at(fx.cases(&["slow.sh"]), later, &mut NullSink, &cancel)
        .await
        .unwrap();
    assert_eq!(ran(third).results_root, fx.results_home().join("20300101000000"));
}

#[tokio::test]
async fn existing_results_root_is_not_reused() {
    let fx = Fixture::new();
    fx.write_case("a.sh", "exit 0\n");
    let started_at = Local.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).single().unwrap();
    fs::create_dir_all(fx.results_home().join("20300601120000")).unwrap();

    let engine = Engine::new(fx.config.clone());
    let err = engine
        .run_suite_at(fx.cases(&["a.sh"]), started_at, &mut NullSink, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::ResultsRootExists { .. }));
}

#[tokio::test]
async fn timeout_kills_case_and_run_continues() {
    let mut fx = Fixture::new();
    fx.config = fx.config.clone().with_timeout(Some(Duration::from_millis(300)));
    fx.write_case("hang.sh", "echo started\nexec sleep 30\n");
    fx.write_case("next.sh", "exit 0\n");

    let run = fx.run(fx.cases(&["hang.sh", "next.sh"])).await;

    assert_eq!(run.results[0].outcome, Outcome::Error);
    assert_eq!(run.results[0].error, Some(ErrorCause::TimedOut));
    assert_eq!(run.results[0].stdout_text(), "started\n");
    assert_eq!(run.results[1].outcome, Outcome::Passed);
    assert!(matches!(run.termination, Termination::Completed));
}

#[tokio::test]
async fn cancel_stops_running_case_and_skips_the_rest() {
    let fx = Fixture::new();
    fx.write_case("hang.sh", "exec sleep 30\n");
    fx.write_case("never.sh", "exit 0\n");
    let engine = Engine::new(fx.config.clone());
    let cancel = CancellationToken::new();

    let stop = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        stop.cancel();
    });

    let run = ran(engine
        .run_suite(fx.cases(&["hang.sh", "never.sh"]), &mut NullSink, &cancel)
        .await
        .unwrap());

    assert!(matches!(run.termination, Termination::Cancelled));
    assert_eq!(run.results.len(), 1);
    assert_eq!(run.results[0].error, Some(ErrorCause::Cancelled));
    assert_eq!(run.cases[1].state(), TestState::Ready);
    assert!(!run.results_root.join("never").exists());
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let fx = Fixture::new();
    fx.write_case("a.sh", "exit 0\n");
    let engine = Engine::new(fx.config.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let run = ran(engine.run_suite(fx.cases(&["a.sh"]), &mut NullSink, &cancel).await.unwrap());

    assert!(matches!(run.termination, Termination::Cancelled));
    assert!(run.results.is_empty());
    assert!(run.results_root.is_dir());
}
