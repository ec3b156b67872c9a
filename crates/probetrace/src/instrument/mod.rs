//! Probe insertion for product and test code.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  PROBETRACE INSTRUMENTATION                                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Program → Pipeline → BodyTransformer* → validate → commit      │
//! │               ↓              ↓                                  │
//! │        LineLedger     StatementResolver + ExpressionInstrumenter│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - Product phase: LINE_EXERCISED probes on resolved anchors of selected
//!   lines, value-capture and CONDITION probes on branches of those lines,
//!   FIELD_ACCESSED probes before reads of monitored static fields.
//! - Test phase: start marker on entry, end marker before every exit.
//!
//! A method whose rewrite fails keeps its original body.

mod expr;
mod pipeline;
mod report;
mod resolver;
mod transformer;

pub use expr::{ExpressionInstrumenter, ProbeContext};
pub use pipeline::{instrument_program, InstrumentSession, Instrumenter};
pub use report::{InstrumentationReport, InstrumentationSummary, MethodFailure};
pub use resolver::{resolve, StatementResolver};
pub use transformer::{
    BodyTransformer, FieldAccessTransformer, LineLedger, MethodTarget, Outcome,
    ProductCodeTransformer, SkipReason, TestLifecycleTransformer,
};
