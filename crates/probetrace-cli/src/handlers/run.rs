//! Run command handler

use super::reporter_for;
use crate::commands::{OutputMode, RunArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::loader::{load_classes, load_instrument_config};
use probetrace::{Interpreter, Program, RecorderConfig, TestRun, TraceRecorder};
use std::path::{Path, PathBuf};
use tracing::info;

/// Class directories to load for `path`: the binary-mode output directories
/// when present, otherwise `path` itself
#[must_use]
pub fn class_dirs(path: &Path) -> Vec<PathBuf> {
    let (product, tests) = OutputMode::Binary.dirs();
    let instrumented: Vec<PathBuf> = [product, tests]
        .iter()
        .map(|dir| path.join(dir))
        .filter(|dir| dir.is_dir())
        .collect();
    if instrumented.is_empty() {
        vec![path.to_path_buf()]
    } else {
        instrumented
    }
}

/// Load the classes under `args.paths`, run every test method, and append
/// the trace to the log.
///
/// Fails after the log is flushed when any test failed.
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<Vec<TestRun>> {
    let settings = load_instrument_config(args.config.as_deref())?;
    let mut classes = Vec::new();
    for path in &args.paths {
        if !path.is_dir() {
            return Err(CliError::invalid_argument(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        for dir in class_dirs(path) {
            classes.extend(load_classes(&dir)?);
        }
    }
    if classes.is_empty() {
        return Err(CliError::invalid_argument("no class files found"));
    }
    let program = Program::new(classes);

    let recorder_config = RecorderConfig::builder()
        .log_path(&args.log)
        .flush_threshold(args.flush_threshold)
        .build();
    let recorder = TraceRecorder::new(&recorder_config);
    let runs = Interpreter::new(&program, &recorder)
        .with_builtins()
        .with_step_limit(args.step_limit)
        .run_tests(&settings)?;
    recorder.flush_logs()?;
    recorder.flush()?;
    info!(log = %args.log.display(), tests = runs.len(), "trace written");

    let reporter = reporter_for(config);
    reporter.header("Tests");
    for run in &runs {
        match (&run.error, config.verbosity.is_verbose()) {
            (Some(error), _) => reporter.failure(&format!("{}: {error}", run.signature)),
            (None, true) => reporter.success(&run.signature),
            (None, false) => {}
        }
    }
    let failed = runs.iter().filter(|run| !run.passed).count();
    reporter.row("tests", runs.len());
    reporter.row("failed", failed);
    reporter.row("log", args.log.display());

    if failed > 0 {
        return Err(CliError::test_execution(format!(
            "{failed} of {} tests failed",
            runs.len()
        )));
    }
    Ok(runs)
}
