//! End-to-end scenarios: programs and selections loaded from disk, traces
//! written to a real log file.

#![allow(clippy::unwrap_used)]

use probetrace::ir::{BinOp, CallTarget, Expr, InstrId, InstrKind, Local, Place, Type};
use probetrace::{
    parse_simple_record, Class, EventKind, FieldSelection, InstrumentConfig, InstrumentSession,
    Instrumenter, Interpreter, LineSelection, Method, ProbeError, Program, RecorderConfig,
    TraceRecorder,
};
use std::fs;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Route library logs to the test harness; `RUST_LOG=debug` shows resolution
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `Account.withdraw(int amount)` with a guard on line 12 and the test class
/// `AccountTest` calling it twice.
fn bank_program() -> Program {
    let mut withdraw = Method::new(
        "withdraw",
        vec![Local::new("amount", Type::Int)],
        Type::Int,
    );
    let body = &mut withdraw.body;
    body.declare(Local::new("amount", Type::Int));
    body.declare(Local::new("balance", Type::Int));
    body.push(
        11,
        InstrKind::Assign {
            target: Place::Local(Local::new("balance", Type::Int)),
            value: Expr::int(100),
        },
    );
    body.push(
        12,
        InstrKind::Branch {
            condition: Expr::binary(
                BinOp::Gt,
                Expr::local("amount", Type::Int),
                Expr::local("balance", Type::Int),
            ),
            target: InstrId::new(3),
        },
    );
    body.push(
        13,
        InstrKind::Return(Some(Expr::binary(
            BinOp::Sub,
            Expr::local("balance", Type::Int),
            Expr::local("amount", Type::Int),
        ))),
    );
    body.push(15, InstrKind::Return(Some(Expr::int(-1))));
    let mut account = Class::new("com.bank.Account");
    account.methods.push(withdraw);

    let call = |amount: i32, expected: i32| InstrKind::Invoke {
        target: CallTarget::new("Assert", "assertEquals", Type::Void),
        args: vec![
            Expr::int(expected),
            Expr::call(
                CallTarget::new("com.bank.Account", "withdraw", Type::Int),
                vec![Expr::int(amount)],
            ),
        ],
    };
    let mut small = Method::new("testSmall", vec![], Type::Void);
    small.body.push(20, call(30, 70));
    let mut large = Method::new("testLarge", vec![], Type::Void);
    large.body.push(25, call(300, -1));
    let mut test = Class::new("com.bank.AccountTest");
    test.methods.extend([small, large]);

    Program::new(vec![account, test])
}

#[test]
fn test_trace_file_from_disk_inputs() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let program_path = dir.path().join("program.json");
    let lines_path = dir.path().join("lines.txt");
    let log_path = dir.path().join("coverage.log");
    fs::write(&program_path, serde_json::to_string_pretty(&bank_program()).unwrap()).unwrap();
    fs::write(&lines_path, "com/bank/Account.java:12,14\n").unwrap();

    let mut program: Program =
        serde_json::from_str(&fs::read_to_string(&program_path).unwrap()).unwrap();
    let instrumenter = Instrumenter::new(
        InstrumentConfig::default(),
        LineSelection::load(&lines_path).unwrap(),
        FieldSelection::load(&dir.path().join("absent-fields.txt")),
    );
    let mut session = InstrumentSession::new();
    let product = instrumenter.instrument_product(&mut program, &mut session);
    let tests = instrumenter.instrument_tests(&mut program, &mut session);
    assert!(product.is_clean() && tests.is_clean());

    {
        let config = RecorderConfig::builder().log_path(&log_path).build();
        let recorder = TraceRecorder::new(&config);
        let mut interp = Interpreter::new(&program, &recorder).with_builtins();
        let runs = interp.run_tests(instrumenter.config()).unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.passed), "{runs:?}");
    }

    let log = fs::read_to_string(&log_path).unwrap();
    let records: Vec<&str> = log.lines().collect();
    assert_eq!(records[0], "=== START TEST: <com.bank.AccountTest: void testSmall()> ===");
    assert_eq!(
        records.iter().filter(|r| EventKind::of(r) == EventKind::TestEnd).count(),
        2
    );
    // line 14 is untagged and resolves forward to the `return -1` on 15
    let exercised: Vec<String> = records
        .iter()
        .filter(|r| EventKind::of(r) == EventKind::Exercised)
        .map(|r| parse_simple_record(r)["line"].clone())
        .collect();
    assert_eq!(exercised, vec!["12", "12", "14"]);
    let values: Vec<String> = records
        .iter()
        .filter(|r| EventKind::of(r) == EventKind::Var)
        .map(|r| parse_simple_record(r)["value"].clone())
        .collect();
    assert_eq!(values, vec!["30", "100", "300", "100"]);
}

#[test]
fn test_log_is_appended_across_recorders() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("coverage.log");
    for run in 0..2 {
        let config = RecorderConfig::builder().log_path(&log_path).build();
        let recorder = TraceRecorder::new(&config);
        recorder.begin_test(&format!("run{run}"));
        recorder.end_test(&format!("run{run}")).unwrap();
    }
    let log = fs::read_to_string(&log_path).unwrap();
    assert_eq!(log.lines().count(), 4);
    assert!(log.lines().nth(2).unwrap().contains("run1"));
}

#[test]
fn test_missing_line_selection_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = LineSelection::load(&dir.path().join("nope.txt")).unwrap_err();
    assert!(matches!(err, ProbeError::Io(_)));
}

#[test]
fn test_instrumented_program_round_trips_through_json() {
    let mut program = bank_program();
    let instrumenter = Instrumenter::new(
        InstrumentConfig::default(),
        LineSelection::parse("com/bank/Account.java:12"),
        FieldSelection::default(),
    );
    instrumenter.instrument_product(&mut program, &mut InstrumentSession::new());
    let json = serde_json::to_string(&program).unwrap();
    let back: Program = serde_json::from_str(&json).unwrap();
    assert_eq!(back, program);
}
