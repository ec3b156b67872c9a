//! Smoke tests for the probetrace CLI
//!
//! Drive the binary end to end over a small on-disk project.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use probetrace::ir::{BinOp, CallTarget, Expr, InstrKind, Local, Type};
use probetrace::{Class, Method};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command for the probetrace binary
fn probetrace() -> Command {
    Command::cargo_bin("probetrace").expect("probetrace binary should exist")
}

fn calc_class() -> Class {
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

fn calc_test_class() -> Class {
    let mut class = Class::new("CalcTest");
    let mut method = Method::new("testTwice", vec![], Type::Void);
    let twice = Expr::call(CallTarget::new("Calc", "twice", Type::Int), vec![Expr::int(2)]);
    method.body.push(
        9,
        InstrKind::Invoke {
            target: CallTarget::new("Assert", "assertEquals", Type::Void),
            args: vec![Expr::int(4), twice],
        },
    );
    method.body.push(10, InstrKind::Return(None));
    class.methods.push(method);
    class
}

/// Project root with one module holding compiled classes and selection files
fn write_project(root: &Path) {
    let classes = root.join("target").join("classes");
    let test_classes = root.join("target").join("test-classes");
    fs::create_dir_all(&classes).unwrap();
    fs::create_dir_all(&test_classes).unwrap();
    fs::write(
        classes.join("Calc.json"),
        serde_json::to_string_pretty(&calc_class()).unwrap(),
    )
    .unwrap();
    fs::write(
        test_classes.join("CalcTest.json"),
        serde_json::to_string_pretty(&calc_test_class()).unwrap(),
    )
    .unwrap();
    fs::write(root.join("lines.txt"), "Calc:5\n").unwrap();
    fs::write(root.join("fields.txt"), "").unwrap();
}

fn instrument(root: &Path, mode: &str) -> assert_cmd::assert::Assert {
    probetrace()
        .arg("instrument")
        .arg(root)
        .arg("--lines")
        .arg(root.join("lines.txt"))
        .arg("--fields")
        .arg(root.join("fields.txt"))
        .args(["--mode", mode, "--color", "never"])
        .assert()
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    probetrace()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_lists_commands() {
    probetrace()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("instrument"))
        .stdout(predicate::str::contains("check-log"));
}

#[test]
fn test_no_subcommand_fails() {
    probetrace().assert().failure();
}

#[test]
fn test_instrument_requires_selection_files() {
    probetrace()
        .args(["instrument", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--lines"));
}

// ============================================================================
// Instrument / Run / Check-log
// ============================================================================

#[test]
fn test_instrument_binary_mode() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    instrument(dir.path(), "binary")
        .success()
        .stdout(predicate::str::contains("probes"));
    assert!(dir.path().join("instrumented-classes/Calc.json").exists());
    assert!(dir
        .path()
        .join("instrumented-test-classes/CalcTest.json")
        .exists());
}

#[test]
fn test_instrument_text_mode() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    instrument(dir.path(), "text").success();
    let ir = fs::read_to_string(dir.path().join("ir-out/Calc.ir")).unwrap();
    assert!(ir.contains("twice"));
    assert!(dir.path().join("ir-test-out/CalcTest.ir").exists());
}

#[test]
fn test_instrument_missing_line_file_fails() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    fs::remove_file(dir.path().join("lines.txt")).unwrap();
    instrument(dir.path(), "binary")
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_run_then_check_log() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    instrument(dir.path(), "binary").success();

    let log = dir.path().join("coverage.log");
    probetrace()
        .arg("run")
        .arg(dir.path())
        .arg("--log")
        .arg(&log)
        .assert()
        .success();

    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("=== START TEST: "));
    assert!(text.contains("=== END TEST: "));
    assert!(text.contains("\"event\":\"EXERCISED\""));

    probetrace()
        .arg("check-log")
        .arg(&log)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tests\": 1"))
        .stdout(predicate::str::contains("EXERCISED"));
}

#[test]
fn test_run_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    probetrace()
        .arg("run")
        .arg(dir.path().join("nowhere"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
}
