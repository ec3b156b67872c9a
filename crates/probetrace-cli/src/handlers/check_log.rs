//! Check-log command handler

use super::reporter_for;
use crate::commands::CheckLogArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use probetrace::EventKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;

/// Record counts of one trace log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogSummary {
    /// Non-blank records
    pub records: usize,
    /// Test start markers
    pub tests: usize,
    /// Records per event kind
    pub counts: BTreeMap<String, usize>,
}

impl LogSummary {
    /// Count for one event kind
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.counts.get(kind.as_str()).copied().unwrap_or(0)
    }
}

/// Classify every non-blank line of `text`
#[must_use]
pub fn summarize_log(text: &str) -> LogSummary {
    let mut summary = LogSummary::default();
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        let kind = EventKind::of(line);
        summary.records += 1;
        if kind == EventKind::TestStart {
            summary.tests += 1;
        }
        *summary.counts.entry(kind.as_str().to_string()).or_insert(0) += 1;
    }
    summary
}

/// Read a trace log and print its counts
pub fn execute_check_log(config: &CliConfig, args: &CheckLogArgs) -> CliResult<LogSummary> {
    let text = fs::read_to_string(&args.file)?;
    let summary = summarize_log(&text);
    let reporter = reporter_for(config);

    if args.json {
        reporter.raw(&serde_json::to_string_pretty(&summary)?);
        return Ok(summary);
    }
    reporter.header(&args.file.display().to_string());
    reporter.row("records", summary.records);
    reporter.row("tests", summary.tests);
    for (kind, count) in &summary.counts {
        reporter.row(kind, count);
    }
    let unknown = summary.count(EventKind::Unknown);
    if unknown > 0 {
        reporter.warning(&format!("{unknown} unrecognized records"));
    }
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Verbosity;
    use tempfile::TempDir;

    const LOG: &str = r#"=== START TEST: FooTest.testA() ===
{"event":"EXERCISED","file":"Foo.java","line":"12"}
{"event":"VAR","file":"Foo.java","line":"12","name":"x","type":"int","source":"variable","value":"1"}
{"event":"CONDITION","file":"Foo.java","line":"12","expression":"x < y","result":"true"}

=== END TEST: FooTest.testA() ===
garbage
"#;

    #[test]
    fn test_summarize_counts_by_kind() {
        let summary = summarize_log(LOG);
        assert_eq!(summary.records, 6);
        assert_eq!(summary.tests, 1);
        assert_eq!(summary.count(EventKind::Exercised), 1);
        assert_eq!(summary.count(EventKind::Var), 1);
        assert_eq!(summary.count(EventKind::Condition), 1);
        assert_eq!(summary.count(EventKind::TestEnd), 1);
        assert_eq!(summary.count(EventKind::Unknown), 1);
        assert_eq!(summary.count(EventKind::FieldAccessed), 0);
    }

    #[test]
    fn test_empty_log() {
        assert_eq!(summarize_log("\n\n"), LogSummary::default());
    }

    #[test]
    fn test_execute_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coverage.log");
        fs::write(&path, LOG).unwrap();
        let args = CheckLogArgs {
            file: path,
            json: true,
        };
        let config = CliConfig::new().with_verbosity(Verbosity::Quiet);
        assert_eq!(execute_check_log(&config, &args).unwrap().tests, 1);
    }

    #[test]
    fn test_missing_log_fails() {
        let dir = TempDir::new().unwrap();
        let args = CheckLogArgs {
            file: dir.path().join("none.log"),
            json: false,
        };
        assert!(execute_check_log(&CliConfig::new(), &args).is_err());
    }
}
