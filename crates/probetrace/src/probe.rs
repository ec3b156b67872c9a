//! Probe payloads carried by `InstrKind::Probe`.
//!
//! A probe is the IR-level call into the trace recorder. Everything it logs
//! is fixed at instrumentation time except VAR values, which are read from
//! the named local when the probe executes.

use crate::ir::{BinOp, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provenance of a value captured by a VAR probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// A literal materialized into a temporary
    Constant,
    /// A program variable or a computed temporary
    Variable,
}

impl ValueSource {
    /// Wire spelling
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Variable => "variable",
        }
    }
}

/// Trace recorder call inserted into a method body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Probe {
    /// A requested source line was reached
    LineExercised {
        /// Source file of the declaring class
        file: String,
        /// Requested line (not necessarily the anchor's tag)
        line: u32,
    },
    /// A branch condition was about to be evaluated
    SubconditionChecked {
        /// Source file
        file: String,
        /// Line of the branch
        line: u32,
        /// 1-based position of the branch among branches on this line
        index: u32,
    },
    /// A binary sub-expression of a condition with its operand names
    Condition {
        /// Source file
        file: String,
        /// Line of the branch
        line: u32,
        /// Subcondition index of the enclosing branch
        index: u32,
        /// Name of the local holding the left operand
        left: String,
        /// Operator
        op: BinOp,
        /// Name of the local holding the right operand
        right: String,
    },
    /// Value of a local at this point
    Var {
        /// Source file
        file: String,
        /// Line of the branch
        line: u32,
        /// Local whose value is captured
        var: Local,
        /// Where the value came from
        source: ValueSource,
    },
    /// A monitored static field was read
    FieldAccessed {
        /// Source file
        file: String,
        /// Line of the reading instruction
        line: u32,
        /// `Class.field`
        field: String,
    },
    /// Reset per-test state and write the start marker
    TestStart {
        /// Test method signature
        test: String,
    },
    /// Write the end marker and move test-case entries to the batch
    TestEnd {
        /// Test method signature
        test: String,
    },
}

impl Probe {
    /// Short kind name
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LineExercised { .. } => "EXERCISED",
            Self::SubconditionChecked { .. } => "SUBCONDITION_CHECKED",
            Self::Condition { .. } => "CONDITION",
            Self::Var { .. } => "VAR",
            Self::FieldAccessed { .. } => "FIELD_ACCESSED",
            Self::TestStart { .. } => "TEST_START",
            Self::TestEnd { .. } => "TEST_END",
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LineExercised { file, line } => write!(f, "EXERCISED {file}:{line}"),
            Self::SubconditionChecked { file, line, index } => {
                write!(f, "SUBCONDITION_CHECKED {file}:{line} [{index}]")
            }
            Self::Condition {
                file,
                line,
                index,
                left,
                op,
                right,
            } => write!(
                f,
                "CONDITION {file}:{line} [{index}] {left} {} {right}",
                op.symbol()
            ),
            Self::Var {
                file,
                line,
                var,
                source,
            } => write!(
                f,
                "VAR {file}:{line} {} {} ({})",
                var.ty,
                var.name,
                source.as_str()
            ),
            Self::FieldAccessed { file, line, field } => {
                write!(f, "FIELD_ACCESSED {file}:{line} {field}")
            }
            Self::TestStart { test } => write!(f, "TEST_START {test}"),
            Self::TestEnd { test } => write!(f, "TEST_END {test}"),
        }
    }
}
