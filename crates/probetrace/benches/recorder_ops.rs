//! Recorder and Instrumentation Benchmarks
//!
//! Benchmarks for trace recording throughput and per-program instrumentation.
//!
//! Run with: `cargo bench --bench recorder_ops`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use probetrace::ir::{BinOp, Expr, InstrId, InstrKind, Local, Type};
use probetrace::{
    Class, FieldSelection, InstrumentConfig, InstrumentSession, Instrumenter, LineSelection,
    LogSink, Method, Program, TraceEvent, TraceRecorder,
};
use std::io;

#[derive(Debug)]
struct NullSink;

impl LogSink for NullSink {
    fn append(&self, records: &[String]) -> io::Result<()> {
        black_box(records);
        Ok(())
    }
}

fn bench_record_distinct(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_distinct");

    for count in [100, 1000, 10_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{count}_events")),
            &count,
            |bench, &n| {
                bench.iter(|| {
                    let recorder = TraceRecorder::with_sink(NullSink, 1000);
                    for i in 0..n {
                        recorder.record(&TraceEvent::Var {
                            file: "com/acme/Foo.java".into(),
                            line: 13,
                            name: "x".into(),
                            ty: "int".into(),
                            source: "variable".into(),
                            value: i.to_string(),
                        });
                    }
                    recorder.flush_logs().ok();
                    black_box(recorder);
                });
            },
        );
    }

    group.finish();
}

fn bench_record_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_dedup");

    for count in [1000, 10_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{count}_repeats")),
            &count,
            |bench, &n| {
                bench.iter(|| {
                    let recorder = TraceRecorder::with_sink(NullSink, 1000);
                    for i in 0..n {
                        recorder.record(&TraceEvent::SubconditionChecked {
                            file: "com/acme/Foo.java".into(),
                            line: 13,
                            index: (i % 4) + 1,
                        });
                    }
                    black_box(recorder.test_case_records().len());
                });
            },
        );
    }

    group.finish();
}

fn wide_program(methods: u32) -> Program {
    let mut class = Class::new("com.acme.Wide");
    for m in 0..methods {
        let base = (m * 10 + 1) as i32;
        let mut method = Method::new(format!("m{m}"), vec![Local::new("a", Type::Int)], Type::Int);
        method.body.declare(Local::new("a", Type::Int));
        method.body.push(
            base,
            InstrKind::Branch {
                condition: Expr::binary(
                    BinOp::And,
                    Expr::binary(BinOp::Gt, Expr::local("a", Type::Int), Expr::int(0)),
                    Expr::binary(BinOp::Lt, Expr::local("a", Type::Int), Expr::int(100)),
                ),
                target: InstrId::new(2),
            },
        );
        method.body.push(base + 1, InstrKind::Return(Some(Expr::int(0))));
        method.body.push(base + 2, InstrKind::Return(Some(Expr::int(1))));
        class.methods.push(method);
    }
    Program::new(vec![class])
}

fn bench_instrument_product(c: &mut Criterion) {
    let mut group = c.benchmark_group("instrument_product");

    for methods in [10u32, 100, 500] {
        let program = wide_program(methods);
        let selection = LineSelection::parse(&format!("com/acme/Wide.java:1-{}", methods * 10));
        let instrumenter =
            Instrumenter::new(InstrumentConfig::default(), selection, FieldSelection::default());
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{methods}_methods")),
            &program,
            |bench, program| {
                bench.iter(|| {
                    let mut copy = program.clone();
                    let report =
                        instrumenter.instrument_product(&mut copy, &mut InstrumentSession::new());
                    black_box(report.summary());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_record_distinct,
    bench_record_dedup,
    bench_instrument_product
);
criterion_main!(benches);
