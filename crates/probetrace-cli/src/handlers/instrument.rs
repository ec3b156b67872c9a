//! Instrument command handler

use super::reporter_for;
use crate::commands::{InstrumentArgs, OutputMode};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::loader::{
    discover_modules, load_classes, load_instrument_config, write_classes, PRODUCT_CLASSES,
    TEST_CLASSES,
};
use probetrace::{
    FieldSelection, InstrumentSession, InstrumentationReport, Instrumenter, LineSelection,
    Program,
};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Instrument every module of the project and write the results.
///
/// Product classes get line, condition and field probes; test classes get
/// lifecycle probes. One session spans all modules so a line anchored in
/// one module is not anchored again in another.
pub fn execute_instrument(
    config: &CliConfig,
    args: &InstrumentArgs,
) -> CliResult<InstrumentationReport> {
    let settings = load_instrument_config(args.config.as_deref())?;
    let lines = LineSelection::load(&args.lines)?;
    let fields = FieldSelection::load(&args.fields);
    if lines.is_empty() {
        warn!(path = %args.lines.display(), "line selection is empty");
    }
    let instrumenter = Instrumenter::new(settings, lines, fields);
    let modules = discover_modules(&args.project)?;

    let mut reporter = reporter_for(config);
    reporter.start_progress(modules.len() as u64, "instrumenting");
    let mut session = InstrumentSession::new();
    let mut report = InstrumentationReport::new();
    for module in &modules {
        reporter.tick(&module.display().to_string());
        let module_report = instrument_module(&instrumenter, module, args.mode, &mut session)?;
        report.merge(&module_report);
    }
    reporter.finish();

    let summary = report.summary();
    reporter.header("Instrumentation");
    reporter.row("modules", modules.len());
    reporter.row("methods", summary.methods);
    reporter.row("instrumented", summary.instrumented);
    reporter.row("skipped", summary.skipped);
    reporter.row("probes", summary.probes);
    for failure in report.failures() {
        reporter.warning(&format!(
            "{} rolled back by {}: {}",
            failure.signature, failure.transformer, failure.message
        ));
    }

    if let Some(path) = &args.report {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        info!(path = %path.display(), "report written");
    }
    if report.is_clean() {
        reporter.success(&format!("{} probes inserted", summary.probes));
    }
    Ok(report)
}

/// Instrument one module's product and test classes
pub fn instrument_module(
    instrumenter: &Instrumenter,
    module: &Path,
    mode: OutputMode,
    session: &mut InstrumentSession,
) -> CliResult<InstrumentationReport> {
    let mut product = Program::new(load_classes(&module.join(PRODUCT_CLASSES))?);
    let mut tests = Program::new(load_classes(&module.join(TEST_CLASSES))?);
    if product.classes.is_empty() && tests.classes.is_empty() {
        return Err(CliError::invalid_argument(format!(
            "module {} has no classes under {PRODUCT_CLASSES} or {TEST_CLASSES}",
            module.display()
        )));
    }

    let mut report = instrumenter.instrument_product(&mut product, session);
    report.merge(&instrumenter.instrument_tests(&mut tests, session));

    let (product_dir, test_dir) = mode.dirs();
    let written = write_classes(&module.join(product_dir), &product.classes, mode)?
        + write_classes(&module.join(test_dir), &tests.classes, mode)?;
    info!(
        module = %module.display(),
        classes = written,
        probes = report.summary().probes,
        "module instrumented"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Verbosity;
    use probetrace::ir::{BinOp, Expr, InstrKind, Local, Type};
    use probetrace::{Class, Method};
    use tempfile::TempDir;

    fn product_class() -> Class {
        let mut class = Class::new("Calc");
        class.source_file = Some("Calc.java".to_string());
        let mut method = Method::new("twice", vec![Local::new("x", Type::Int)], Type::Int);
        method.body.declare(Local::new("x", Type::Int));
        let x = Expr::local("x", Type::Int);
        method.body.push(
            5,
            InstrKind::Return(Some(Expr::binary(BinOp::Add, x.clone(), x))),
        );
        class.methods.push(method);
        class
    }

    fn test_class() -> Class {
        let mut class = Class::new("CalcTest");
        let mut method = Method::new("testTwice", vec![], Type::Void);
        method.body.push(9, InstrKind::Return(None));
        class.methods.push(method);
        class
    }

    fn write_module(root: &Path) {
        let product = root.join(PRODUCT_CLASSES);
        let tests = root.join(TEST_CLASSES);
        fs::create_dir_all(&product).unwrap();
        fs::create_dir_all(&tests).unwrap();
        fs::write(product.join("Calc.json"), serde_json::to_string(&product_class()).unwrap())
            .unwrap();
        fs::write(tests.join("CalcTest.json"), serde_json::to_string(&test_class()).unwrap())
            .unwrap();
    }

    fn args(root: &Path, mode: OutputMode) -> InstrumentArgs {
        let lines = root.join("lines.txt");
        let fields = root.join("fields.txt");
        fs::write(&lines, "Calc:5\n").unwrap();
        fs::write(&fields, "").unwrap();
        InstrumentArgs {
            project: root.to_path_buf(),
            lines,
            fields,
            mode,
            config: None,
            report: Some(root.join("report.json")),
        }
    }

    fn quiet() -> CliConfig {
        CliConfig::new().with_verbosity(Verbosity::Quiet)
    }

    #[test]
    fn test_binary_mode_writes_instrumented_classes() {
        let dir = TempDir::new().unwrap();
        write_module(dir.path());
        let report = execute_instrument(&quiet(), &args(dir.path(), OutputMode::Binary)).unwrap();

        assert!(report.summary().probes > 0);
        let product = load_classes(&dir.path().join("instrumented-classes")).unwrap();
        let tests = load_classes(&dir.path().join("instrumented-test-classes")).unwrap();
        assert_eq!(product.len(), 1);
        assert_eq!(tests.len(), 1);
        assert!(product[0].methods[0].body.len() > 1);
        assert!(dir.path().join("report.json").exists());
    }

    #[test]
    fn test_text_mode_writes_ir() {
        let dir = TempDir::new().unwrap();
        write_module(dir.path());
        execute_instrument(&quiet(), &args(dir.path(), OutputMode::Text)).unwrap();
        assert!(dir.path().join("ir-out").join("Calc.ir").exists());
        assert!(dir.path().join("ir-test-out").join("CalcTest.ir").exists());
    }

    #[test]
    fn test_missing_line_selection_fails() {
        let dir = TempDir::new().unwrap();
        write_module(dir.path());
        let mut args = args(dir.path(), OutputMode::Binary);
        args.lines = dir.path().join("absent.txt");
        assert!(execute_instrument(&quiet(), &args).is_err());
    }

    #[test]
    fn test_empty_module_is_rejected() {
        let dir = TempDir::new().unwrap();
        let instrumenter = Instrumenter::default();
        let mut session = InstrumentSession::new();
        let err = instrument_module(&instrumenter, dir.path(), OutputMode::Text, &mut session)
            .unwrap_err();
        assert!(err.to_string().contains("no classes"));
    }
}
