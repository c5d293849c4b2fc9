//! Command implementations for the CLI

use std::path::Path;

use tokio_util::sync::CancellationToken;

use super::reporter::ConsoleReporter;
use super::{CliError, CliResult, ExitCode};
use crate::config::EngineConfig;
use crate::engine::{Engine, RunOutcome};
use crate::manifest::{self, Suite};
use crate::target::{self, Target};
use testmaster_core::TestCase;

/// Print the available targets, one per line.
pub fn list_targets(config: &EngineConfig) -> CliResult<ExitCode> {
    let targets = target::list_targets(&config.testcases_home).map_err(CliError::diagnostic)?;
    if targets.is_empty() {
        eprintln!("No targets found in {}", config.testcases_home.display());
        return Ok(ExitCode::SUCCESS);
    }
    for target in targets {
        println!("{}", target.name);
    }
    Ok(ExitCode::SUCCESS)
}

/// Print each manifest entry with its state and resolved path.
pub fn list_suite(config: &EngineConfig, suite: &Path, target_name: &str) -> CliResult<ExitCode> {
    let (suite, target, cases) = load_cases(config, suite, target_name)?;
    println!(
        "{} against {}: {} test case(s), {} ready",
        suite.display_name(),
        target.name,
        cases.len(),
        cases.iter().filter(|c| c.is_ready()).count()
    );
    print!("{}", format_case_table(&cases));
    Ok(ExitCode::SUCCESS)
}

/// Run every ready case of a suite, reporting progress on the console.
///
/// ## Returns
/// - `ExitCode::SUCCESS` when every executed case passed, or nothing was ready.
/// - `ExitCode::FAILURE` when a case failed or errored, or the run was cancelled or aborted.
pub fn run_suite(config: EngineConfig, suite: &Path, target_name: &str, quiet: bool) -> CliResult<ExitCode> {
    let (suite, target, cases) = load_cases(&config, suite, target_name)?;
    tracing::info!(
        "Loaded {} test case(s) from {} against target {}",
        cases.len(),
        suite.display_name(),
        target.name
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::usage(format!("Error starting async runtime: {}", e)))?;

    let engine = Engine::new(config);
    let cancel = CancellationToken::new();
    let mut reporter = ConsoleReporter::stdout(!quiet);

    let outcome = runtime.block_on(async {
        let stop = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Stop requested, stopping the current test case");
                stop.cancel();
            }
        });
        engine.run_suite(cases, &mut reporter, &cancel).await
    });

    match outcome.map_err(CliError::diagnostic)? {
        RunOutcome::NothingToRun => Ok(ExitCode::SUCCESS),
        RunOutcome::Ran(run) if run.is_success() => Ok(ExitCode::SUCCESS),
        RunOutcome::Ran(_) => Ok(ExitCode::FAILURE),
    }
}

fn load_cases(config: &EngineConfig, suite: &Path, target_name: &str) -> CliResult<(Suite, Target, Vec<TestCase>)> {
    let suite = manifest::load_manifest(&manifest::locate_manifest(suite, config)).map_err(CliError::diagnostic)?;
    let target = target::select_target(config, target_name).map_err(CliError::diagnostic)?;
    let cases = target::resolve_cases(&target.dir, &suite.names, config);
    Ok((suite, target, cases))
}

/// One aligned line per case: name, state, resolved path.
fn format_case_table(cases: &[TestCase]) -> String {
    let width = cases.iter().map(|c| c.name().len()).max().unwrap_or(0);
    let mut out = String::new();
    for case in cases {
        let path = case
            .resolved_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let line = format!("{:<width$}  {:<9}  {}", case.name(), case.state().as_str(), path, width = width);
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_case_table() {
        let mut ready = TestCase::new("login_test.py");
        ready.mark_ready(PathBuf::from("/cases/staging/login_test.py")).unwrap();
        let missing = TestCase::new("gone.sh");

        insta::assert_snapshot!(format_case_table(&[ready, missing]), @r"
        login_test.py  ready      /cases/staging/login_test.py
        gone.sh        not ready
        ");
    }

    #[test]
    fn test_case_table_empty() {
        assert_eq!(format_case_table(&[]), "");
    }
}
