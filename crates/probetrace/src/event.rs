//! Trace events and their flat key/value wire form.
//!
//! Records are written as single-line objects such as
//! `{"event":"EXERCISED","file":"Foo.java","line":"10"}`. Readers of the log
//! (including the recorder's own dedup) use [`parse_simple_record`], a lenient
//! single-pass splitter: it breaks on every comma and then on the first colon
//! of each entry, so values containing commas or colons are not recovered
//! intact. Downstream tooling depends on exactly this behavior.

use std::collections::HashMap;
use std::fmt;

/// Substring identifying SUBCONDITION_CHECKED records
pub const SUBCONDITION_MARKER: &str = r#""event":"SUBCONDITION_CHECKED""#;

/// Substring identifying line-exercised records
pub const EXERCISED_MARKER: &str = r#""event":"EXERCISED""#;

/// Prefix of the test-start marker line
pub const TEST_START_PREFIX: &str = "=== START TEST: ";

/// Prefix of the test-end marker line
pub const TEST_END_PREFIX: &str = "=== END TEST: ";

/// Logged in place of values that have no textual rendering
pub const UNSUPPORTED_VALUE: &str = "[unsupported type]";

/// One trace record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A requested line was reached
    LineExercised {
        /// Source file
        file: String,
        /// Requested line
        line: u32,
    },
    /// A branch condition was evaluated
    SubconditionChecked {
        /// Source file
        file: String,
        /// Branch line
        line: u32,
        /// 1-based index among branches on the line
        index: u32,
    },
    /// Operand names and operator of a binary sub-expression
    Condition {
        /// Source file
        file: String,
        /// Branch line
        line: u32,
        /// Subcondition index
        index: u32,
        /// Left operand name
        left: String,
        /// Operator symbol
        operator: String,
        /// Right operand name
        right: String,
    },
    /// Captured value of a local
    Var {
        /// Source file
        file: String,
        /// Branch line
        line: u32,
        /// Local name
        name: String,
        /// Static type, as written in the IR
        ty: String,
        /// `constant` or `variable`
        source: String,
        /// Rendered value or [`UNSUPPORTED_VALUE`]
        value: String,
    },
    /// A monitored field was read
    FieldAccessed {
        /// Source file
        file: String,
        /// Line of the read
        line: u32,
        /// `Class.field`
        field: String,
    },
    /// Start-of-test marker
    TestStart(String),
    /// End-of-test marker
    TestEnd(String),
}

/// Values are wrapped in quotes verbatim; embedded `"` and `\` are not escaped
fn quoted(text: &str) -> String {
    format!("\"{text}\"")
}

impl TraceEvent {
    /// Wire form of the event, one line without terminator
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::LineExercised { file, line } => format!(
                r#"{{"event":"EXERCISED","file":{},"line":"{line}"}}"#,
                quoted(file)
            ),
            Self::SubconditionChecked { file, line, index } => format!(
                r#"{{"event":"SUBCONDITION_CHECKED","file":{},"line":"{line}","index":{index}}}"#,
                quoted(file)
            ),
            Self::Condition {
                file,
                line,
                index,
                left,
                operator,
                right,
            } => format!(
                r#"{{"event":"CONDITION","file":{},"line":"{line}","index":{index},"OP_left":{},"operator":{},"OP_right":{}}}"#,
                quoted(file),
                quoted(left),
                quoted(operator),
                quoted(right)
            ),
            Self::Var {
                file,
                line,
                name,
                ty,
                source,
                value,
            } => format!(
                r#"{{"event":"VAR","file":{},"line":"{line}","name":{},"type":{},"source":{},"value":{}}}"#,
                quoted(file),
                quoted(name),
                quoted(ty),
                quoted(source),
                quoted(value)
            ),
            Self::FieldAccessed { file, line, field } => format!(
                r#"{{"event":"FIELD_ACCESSED","file":{},"line":"{line}","field":{}}}"#,
                quoted(file),
                quoted(field)
            ),
            Self::TestStart(test) => format!("{TEST_START_PREFIX}{test} ==="),
            Self::TestEnd(test) => format!("{TEST_END_PREFIX}{test} ==="),
        }
    }

    /// Kind of the event
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::LineExercised { .. } => EventKind::Exercised,
            Self::SubconditionChecked { .. } => EventKind::SubconditionChecked,
            Self::Condition { .. } => EventKind::Condition,
            Self::Var { .. } => EventKind::Var,
            Self::FieldAccessed { .. } => EventKind::FieldAccessed,
            Self::TestStart(_) => EventKind::TestStart,
            Self::TestEnd(_) => EventKind::TestEnd,
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Classification of a raw log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// Line reached
    Exercised,
    /// Branch evaluated
    SubconditionChecked,
    /// Binary sub-expression
    Condition,
    /// Value capture
    Var,
    /// Monitored field read
    FieldAccessed,
    /// Test start marker
    TestStart,
    /// Test end marker
    TestEnd,
    /// Anything else
    Unknown,
}

impl EventKind {
    /// Classify a raw record
    #[must_use]
    pub fn of(record: &str) -> Self {
        let trimmed = record.trim();
        if trimmed.starts_with(TEST_START_PREFIX) {
            return Self::TestStart;
        }
        if trimmed.starts_with(TEST_END_PREFIX) {
            return Self::TestEnd;
        }
        match parse_simple_record(trimmed).get("event").map(String::as_str) {
            Some("EXERCISED") => Self::Exercised,
            Some("SUBCONDITION_CHECKED") => Self::SubconditionChecked,
            Some("CONDITION") => Self::Condition,
            Some("VAR") => Self::Var,
            Some("FIELD_ACCESSED") => Self::FieldAccessed,
            _ => Self::Unknown,
        }
    }

    /// Label used in summaries
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exercised => "EXERCISED",
            Self::SubconditionChecked => "SUBCONDITION_CHECKED",
            Self::Condition => "CONDITION",
            Self::Var => "VAR",
            Self::FieldAccessed => "FIELD_ACCESSED",
            Self::TestStart => "TEST_START",
            Self::TestEnd => "TEST_END",
            Self::Unknown => "UNKNOWN",
        }
    }
}

fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Lenient key/value split of a flat record.
///
/// Trims, drops one leading `{` and one trailing `}`, splits on every `,`,
/// skips empty entries and entries without `:`, splits each entry at its
/// first `:` and strips one pair of surrounding quotes from key and value.
/// Later duplicates overwrite earlier keys.
#[must_use]
pub fn parse_simple_record(record: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut body = record.trim();
    if let Some(rest) = body.strip_prefix('{') {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix('}') {
        body = rest;
    }
    for entry in body.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let Some((key, value)) = entry.split_once(':') else {
            continue;
        };
        map.insert(
            strip_quotes(key).to_string(),
            strip_quotes(value).to_string(),
        );
    }
    map
}

fn field<'a>(map: &'a HashMap<String, String>, key: &str) -> &'a str {
    map.get(key).map_or("", String::as_str)
}

/// `file:line:index` dedup key of a SUBCONDITION_CHECKED record
#[must_use]
pub fn subcondition_key(record: &str) -> String {
    let map = parse_simple_record(record);
    format!(
        "{}:{}:{}",
        field(&map, "file"),
        field(&map, "line"),
        field(&map, "index")
    )
}

/// `file:line` dedup key of a line-exercised record
#[must_use]
pub fn line_key(record: &str) -> String {
    let map = parse_simple_record(record);
    format!("{}:{}", field(&map, "file"), field(&map, "line"))
}
