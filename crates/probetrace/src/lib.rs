//! Probetrace: IR instrumentation for spectrum-based fault localization
//!
//! Rewrites the methods of a program so that, when its tests run, a trace
//! log records which requested source lines were reached, how each branch
//! condition on those lines decomposed into operands and operators, which
//! monitored static fields were read, and which test each record belongs to.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    PROBETRACE Architecture                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Program IR │    │ Instrument │    │ Interpreter│            │
//! │   │ + line /   │───►│ pipeline   │───►│ (probes)   │            │
//! │   │ field sel. │    │            │    │            │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │                                             ▼                   │
//! │                                    ┌─────────────────┐          │
//! │                                    │  TraceRecorder  │──► log   │
//! │                                    └─────────────────┘          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use probetrace::{
//!     FieldSelection, InstrumentConfig, InstrumentSession, Instrumenter, LineSelection, Program,
//! };
//!
//! let mut program = Program::default();
//! let instrumenter = Instrumenter::new(
//!     InstrumentConfig::default(),
//!     LineSelection::parse("com/acme/Foo.java:10,12-14"),
//!     FieldSelection::parse("Config.limit"),
//! );
//! let mut session = InstrumentSession::new();
//! let report = instrumenter.instrument_product(&mut program, &mut session);
//! assert!(report.is_clean());
//! ```

#![warn(missing_docs)]

mod config;
mod event;
pub mod instrument;
pub mod interp;
pub mod ir;
mod probe;
pub mod recorder;
mod result;
mod selection;

pub use config::{
    InstrumentConfig, InstrumentConfigBuilder, RecorderConfig, RecorderConfigBuilder,
    DEFAULT_FLUSH_THRESHOLD, DEFAULT_LOG_PATH,
};
pub use event::{
    line_key, parse_simple_record, subcondition_key, EventKind, TraceEvent, EXERCISED_MARKER,
    SUBCONDITION_MARKER, TEST_END_PREFIX, TEST_START_PREFIX, UNSUPPORTED_VALUE,
};
pub use instrument::{
    instrument_program, BodyTransformer, InstrumentSession, InstrumentationReport,
    InstrumentationSummary, Instrumenter, MethodFailure,
};
pub use interp::{Interpreter, TestRun, Value};
pub use ir::{Class, Method, MethodBody, Program};
pub use probe::{Probe, ValueSource};
pub use recorder::{FileSink, LogSink, MemorySink, TraceRecorder};
pub use result::{ProbeError, ProbeResult};
pub use selection::{FieldSelection, LineSelection, MAX_RANGE_SPAN};
