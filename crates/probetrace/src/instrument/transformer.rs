//! Per-method body transformers.
//!
//! A transformer receives one method body and either leaves it alone or
//! inserts probes. Transformers never touch other methods; the pipeline
//! decides whether their changes are kept.

use super::expr::{ExpressionInstrumenter, ProbeContext};
use super::resolver::StatementResolver;
use crate::config::InstrumentConfig;
use crate::ir::{Class, ControlFlowGraph, InstrKind, LineIndex, Method, MethodBody};
use crate::probe::Probe;
use crate::result::{ProbeError, ProbeResult};
use crate::selection::{FieldSelection, LineSelection};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Identity of the method being transformed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTarget {
    /// Fully qualified class name
    pub class: String,
    /// Source file used in trace events
    pub file: String,
    /// Method name
    pub method: String,
    /// Full method signature
    pub signature: String,
}

impl MethodTarget {
    /// Target for `method` declared in `class`
    #[must_use]
    pub fn new(class: &Class, method: &Method) -> Self {
        Self {
            class: class.name.clone(),
            file: class.source_path(),
            method: method.name.clone(),
            signature: method.signature(&class.name),
        }
    }
}

/// Line keys (`file:line`) that already carry a LINE_EXERCISED probe.
///
/// Keys recorded while transforming one method stay pending until the
/// pipeline commits them, so a failed method leaves no trace in the session.
#[derive(Debug)]
pub struct LineLedger<'s> {
    committed: &'s HashSet<String>,
    pending: HashSet<String>,
}

impl<'s> LineLedger<'s> {
    /// Ledger over the session's committed keys
    #[must_use]
    pub fn new(committed: &'s HashSet<String>) -> Self {
        Self {
            committed,
            pending: HashSet::new(),
        }
    }

    /// Whether `key` is committed or pending
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.committed.contains(key) || self.pending.contains(key)
    }

    /// Record a pending key; returns false if it was already known
    pub fn record(&mut self, key: String) -> bool {
        if self.contains(&key) {
            return false;
        }
        self.pending.insert(key)
    }

    /// Pending keys, for committing
    #[must_use]
    pub fn into_pending(self) -> HashSet<String> {
        self.pending
    }
}

/// Why a transformer left a method alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Declaring class is trace infrastructure
    Infrastructure,
    /// Test class seen by a product-code transformer
    TestClass,
    /// Static initializer
    StaticInitializer,
    /// Method is not a test
    NotATest,
}

/// Result of one transformer on one method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Method excluded before looking at its body
    Skipped(SkipReason),
    /// Nothing to do for this body
    Unchanged,
    /// Probes were inserted
    Instrumented {
        /// Number of probe instructions added
        probes: usize,
    },
}

/// A per-method IR rewrite
pub trait BodyTransformer {
    /// Short name for logs and reports
    fn name(&self) -> &'static str;

    /// Transform `body` in place
    fn transform(
        &self,
        target: &MethodTarget,
        body: &mut MethodBody,
        ledger: &mut LineLedger<'_>,
    ) -> ProbeResult<Outcome>;
}

fn probe_count(body: &MethodBody) -> usize {
    body.instructions
        .iter()
        .filter(|i| matches!(i.kind, InstrKind::Probe(_)))
        .count()
}

fn outcome(before: usize, body: &MethodBody) -> Outcome {
    match probe_count(body) - before {
        0 => Outcome::Unchanged,
        probes => Outcome::Instrumented { probes },
    }
}

fn product_skip(config: &InstrumentConfig, target: &MethodTarget) -> Option<SkipReason> {
    if config.is_infrastructure(&target.class) {
        Some(SkipReason::Infrastructure)
    } else if config.is_test_class(&target.class) {
        Some(SkipReason::TestClass)
    } else if target.method == crate::ir::STATIC_INITIALIZER {
        Some(SkipReason::StaticInitializer)
    } else {
        None
    }
}

/// Line-exercised and condition probes for selected lines of product code
#[derive(Debug)]
pub struct ProductCodeTransformer<'a> {
    selection: &'a LineSelection,
    config: &'a InstrumentConfig,
}

impl<'a> ProductCodeTransformer<'a> {
    /// Transformer for the given selection
    #[must_use]
    pub fn new(selection: &'a LineSelection, config: &'a InstrumentConfig) -> Self {
        Self { selection, config }
    }

    /// Requested lines lying within the tolerance of some tagged line
    fn matched_lines(&self, target: &MethodTarget, body: &MethodBody) -> BTreeSet<u32> {
        let requested = self.selection.lines_for(&target.file);
        if requested.is_empty() {
            return requested;
        }
        let present = body.lines();
        let tolerance = self.config.line_tolerance;
        requested
            .into_iter()
            .filter(|req| present.iter().any(|line| line.abs_diff(*req) <= tolerance))
            .collect()
    }

    fn anchor_lines(
        &self,
        target: &MethodTarget,
        body: &mut MethodBody,
        lines: &BTreeSet<u32>,
        ledger: &mut LineLedger<'_>,
    ) -> ProbeResult<()> {
        let cfg = ControlFlowGraph::from_body(body);
        let index = LineIndex::from_body(body);
        let resolver = StatementResolver::new(&cfg, &index);
        let anchors: Vec<_> = lines
            .iter()
            .map(|line| (*line, resolver.resolve(*line)))
            .collect();

        for (line, anchor) in anchors {
            let Some(anchor) = anchor else {
                debug!(method = %target.signature, line, "no reachable anchor for requested line");
                continue;
            };
            if !ledger.record(format!("{}:{line}", target.file)) {
                continue;
            }
            debug!(method = %target.signature, line, %anchor, "line probe anchored");
            body.insert_before(
                anchor,
                InstrKind::Probe(Probe::LineExercised {
                    file: target.file.clone(),
                    line,
                }),
            )?;
        }
        Ok(())
    }

    fn instrument_conditions(
        &self,
        target: &MethodTarget,
        body: &mut MethodBody,
        lines: &BTreeSet<u32>,
    ) -> ProbeResult<()> {
        let branches: Vec<_> = body
            .instructions
            .iter()
            .filter(|i| i.is_branch())
            .filter_map(|i| i.tagged_line().map(|line| (i.id, line)))
            .filter(|(_, line)| lines.contains(line))
            .collect();

        // Index restarts at 1 whenever the branch line differs from the previous one
        let mut current_line = None;
        let mut counter = 1;
        for (id, line) in branches {
            if current_line != Some(line) {
                current_line = Some(line);
                counter = 1;
            }
            let context = ProbeContext {
                file: target.file.clone(),
                line,
                index: counter,
            };
            let condition = match body.get(id).map(|i| &i.kind) {
                Some(InstrKind::Branch { condition, .. }) => condition.clone(),
                _ => return Err(ProbeError::malformed(format!("branch {id} vanished"))),
            };
            let rewritten =
                ExpressionInstrumenter::new(body, id, &context, &target.signature)
                    .instrument(&condition)?;
            if let Some(InstrKind::Branch { condition, .. }) = body.get_mut(id).map(|i| &mut i.kind)
            {
                *condition = rewritten;
            }
            body.insert_before(
                id,
                InstrKind::Probe(Probe::SubconditionChecked {
                    file: context.file,
                    line,
                    index: context.index,
                }),
            )?;
            counter += 1;
        }
        Ok(())
    }
}

impl BodyTransformer for ProductCodeTransformer<'_> {
    fn name(&self) -> &'static str {
        "product-code"
    }

    fn transform(
        &self,
        target: &MethodTarget,
        body: &mut MethodBody,
        ledger: &mut LineLedger<'_>,
    ) -> ProbeResult<Outcome> {
        if let Some(reason) = product_skip(self.config, target) {
            return Ok(Outcome::Skipped(reason));
        }
        let lines = self.matched_lines(target, body);
        if lines.is_empty() {
            return Ok(Outcome::Unchanged);
        }
        let before = probe_count(body);
        self.anchor_lines(target, body, &lines, ledger)?;
        self.instrument_conditions(target, body, &lines)?;
        Ok(outcome(before, body))
    }
}

/// FIELD_ACCESSED probes before assignments that read monitored fields
#[derive(Debug)]
pub struct FieldAccessTransformer<'a> {
    fields: &'a FieldSelection,
    config: &'a InstrumentConfig,
}

impl<'a> FieldAccessTransformer<'a> {
    /// Transformer for the given field selection
    #[must_use]
    pub fn new(fields: &'a FieldSelection, config: &'a InstrumentConfig) -> Self {
        Self { fields, config }
    }
}

impl BodyTransformer for FieldAccessTransformer<'_> {
    fn name(&self) -> &'static str {
        "field-access"
    }

    fn transform(
        &self,
        target: &MethodTarget,
        body: &mut MethodBody,
        _ledger: &mut LineLedger<'_>,
    ) -> ProbeResult<Outcome> {
        if let Some(reason) = product_skip(self.config, target) {
            return Ok(Outcome::Skipped(reason));
        }
        if self.fields.is_empty() {
            return Ok(Outcome::Unchanged);
        }
        let mut reads = Vec::new();
        for instr in &body.instructions {
            if let InstrKind::Assign { value, .. } = &instr.kind {
                let mut names: Vec<String> = value
                    .field_reads()
                    .into_iter()
                    .filter(|field| self.fields.monitors(field))
                    .map(|field| field.qualified_name())
                    .collect();
                names.sort();
                names.dedup();
                let line = instr.tagged_line().unwrap_or(0);
                reads.extend(names.into_iter().map(|name| (instr.id, line, name)));
            }
        }
        let before = probe_count(body);
        for (id, line, field) in reads {
            body.insert_before(
                id,
                InstrKind::Probe(Probe::FieldAccessed {
                    file: target.file.clone(),
                    line,
                    field,
                }),
            )?;
        }
        Ok(outcome(before, body))
    }
}

/// Test start/end probes around test method bodies
#[derive(Debug)]
pub struct TestLifecycleTransformer<'a> {
    config: &'a InstrumentConfig,
}

impl<'a> TestLifecycleTransformer<'a> {
    /// Transformer using the configured test naming rules
    #[must_use]
    pub fn new(config: &'a InstrumentConfig) -> Self {
        Self { config }
    }
}

impl BodyTransformer for TestLifecycleTransformer<'_> {
    fn name(&self) -> &'static str {
        "test-lifecycle"
    }

    fn transform(
        &self,
        target: &MethodTarget,
        body: &mut MethodBody,
        _ledger: &mut LineLedger<'_>,
    ) -> ProbeResult<Outcome> {
        if self.config.is_infrastructure(&target.class) {
            return Ok(Outcome::Skipped(SkipReason::Infrastructure));
        }
        if target.method == crate::ir::STATIC_INITIALIZER {
            return Ok(Outcome::Skipped(SkipReason::StaticInitializer));
        }
        if !self.config.test_lifecycle
            || !self.config.is_test_method(&target.class, &target.method)
        {
            return Ok(Outcome::Skipped(SkipReason::NotATest));
        }

        let before = probe_count(body);
        let end = || {
            InstrKind::Probe(Probe::TestEnd {
                test: target.signature.clone(),
            })
        };
        let returns: Vec<_> = body
            .instructions
            .iter()
            .filter(|i| matches!(i.kind, InstrKind::Return(_)))
            .map(|i| i.id)
            .collect();
        for id in returns {
            body.insert_before(id, end())?;
        }
        let falls_through = body.instructions.last().map_or(true, |i| !i.is_terminator());
        if falls_through {
            body.push_back(end());
            body.push_back(InstrKind::Return(None));
        }
        body.insert_entry(InstrKind::Probe(Probe::TestStart {
            test: target.signature.clone(),
        }));
        debug!(method = %target.signature, "test lifecycle probes inserted");
        Ok(outcome(before, body))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ir::{BinOp, Expr, FieldRef, InstrId, Local, Place, Type};

    fn target(class: &str, method: &str) -> MethodTarget {
        MethodTarget {
            class: class.into(),
            file: format!("{}.java", class.replace('.', "/")),
            method: method.into(),
            signature: format!("<{class}: void {method}()>"),
        }
    }

    fn kinds(body: &MethodBody) -> Vec<String> {
        body.instructions
            .iter()
            .map(|i| match &i.kind {
                InstrKind::Probe(p) => p.kind().to_string(),
                InstrKind::Return(_) => "return".to_string(),
                other => format!("{other}").split(' ').next().unwrap_or("").to_string(),
            })
            .collect()
    }

    #[test]
    fn test_ledger_pending_and_committed() {
        let committed: HashSet<String> = ["A.java:1".to_string()].into_iter().collect();
        let mut ledger = LineLedger::new(&committed);
        assert!(!ledger.record("A.java:1".into()));
        assert!(ledger.record("A.java:2".into()));
        assert!(!ledger.record("A.java:2".into()));
        assert_eq!(ledger.into_pending().len(), 1);
    }

    #[test]
    fn test_product_skips_infrastructure_tests_and_clinit() {
        let selection = LineSelection::parse("Logger.java:1\nFooTest.java:1\nFoo.java:1");
        let config = InstrumentConfig::default();
        let transformer = ProductCodeTransformer::new(&selection, &config);
        let committed = HashSet::new();
        let mut ledger = LineLedger::new(&committed);
        let mut body = MethodBody::new();
        body.push(1, InstrKind::Return(None));

        let cases = [
            ("Logger", "log", SkipReason::Infrastructure),
            ("FooTest", "testA", SkipReason::TestClass),
            ("Foo", "<clinit>", SkipReason::StaticInitializer),
        ];
        for (class, method, reason) in cases {
            let outcome = transformer
                .transform(&target(class, method), &mut body, &mut ledger)
                .unwrap();
            assert_eq!(outcome, Outcome::Skipped(reason));
        }
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_lines_outside_tolerance_leave_body_unchanged() {
        let selection = LineSelection::parse("Foo.java:20");
        let config = InstrumentConfig::default();
        let transformer = ProductCodeTransformer::new(&selection, &config);
        let committed = HashSet::new();
        let mut ledger = LineLedger::new(&committed);
        let mut body = MethodBody::new();
        body.push(18, InstrKind::Return(None));
        let outcome = transformer
            .transform(&target("Foo", "m"), &mut body, &mut ledger)
            .unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
    }

    #[test]
    fn test_same_line_branches_get_increasing_indices() {
        let selection = LineSelection::parse("Foo.java:5");
        let config = InstrumentConfig::default();
        let transformer = ProductCodeTransformer::new(&selection, &config);
        let committed = HashSet::new();
        let mut ledger = LineLedger::new(&committed);
        let mut body = MethodBody::new();
        body.declare(Local::new("a", Type::Boolean));
        body.declare(Local::new("b", Type::Boolean));
        let exit = InstrId::new(2);
        body.push(
            5,
            InstrKind::Branch {
                condition: Expr::local("a", Type::Boolean),
                target: exit,
            },
        );
        body.push(
            5,
            InstrKind::Branch {
                condition: Expr::local("b", Type::Boolean),
                target: exit,
            },
        );
        body.push(6, InstrKind::Return(None));

        transformer
            .transform(&target("Foo", "m"), &mut body, &mut ledger)
            .unwrap();
        let indices: Vec<u32> = body
            .instructions
            .iter()
            .filter_map(|i| match &i.kind {
                InstrKind::Probe(Probe::SubconditionChecked { index, .. }) => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_field_access_probe_before_reading_assignment() {
        let fields = FieldSelection::parse("Foo.count");
        let config = InstrumentConfig::default();
        let transformer = FieldAccessTransformer::new(&fields, &config);
        let committed = HashSet::new();
        let mut ledger = LineLedger::new(&committed);
        let mut body = MethodBody::new();
        let read = Expr::binary(
            BinOp::Add,
            Expr::FieldRead(FieldRef::new("Foo", "count", Type::Int)),
            Expr::FieldRead(FieldRef::new("Foo", "other", Type::Int)),
        );
        body.push(
            7,
            InstrKind::Assign {
                target: Place::Local(Local::new("x", Type::Int)),
                value: read,
            },
        );
        body.push(8, InstrKind::Return(None));
        let outcome = transformer
            .transform(&target("Foo", "m"), &mut body, &mut ledger)
            .unwrap();
        assert_eq!(outcome, Outcome::Instrumented { probes: 1 });
        assert_eq!(
            body.instructions[0].kind,
            InstrKind::Probe(Probe::FieldAccessed {
                file: "Foo.java".into(),
                line: 7,
                field: "Foo.count".into(),
            })
        );
    }

    #[test]
    fn test_lifecycle_two_returns() {
        let config = InstrumentConfig::default();
        let transformer = TestLifecycleTransformer::new(&config);
        let committed = HashSet::new();
        let mut ledger = LineLedger::new(&committed);
        let mut body = MethodBody::new();
        let second = InstrId::new(2);
        body.push(
            3,
            InstrKind::Branch {
                condition: Expr::local("c", Type::Boolean),
                target: second,
            },
        );
        body.push(4, InstrKind::Return(None));
        body.push(5, InstrKind::Return(None));

        let outcome = transformer
            .transform(&target("FooTest", "testTwo"), &mut body, &mut ledger)
            .unwrap();
        assert_eq!(outcome, Outcome::Instrumented { probes: 3 });
        assert_eq!(
            kinds(&body),
            vec!["TEST_START", "if", "TEST_END", "return", "TEST_END", "return"]
        );
        // the branch now lands on the end probe guarding the second return
        let end_before_second = body.instructions[4].id;
        assert_eq!(body.instructions[1].jump_target(), Some(end_before_second));
    }

    #[test]
    fn test_lifecycle_without_return_appends_one() {
        let config = InstrumentConfig::default();
        let transformer = TestLifecycleTransformer::new(&config);
        let committed = HashSet::new();
        let mut ledger = LineLedger::new(&committed);
        let mut body = MethodBody::new();
        body.push(3, InstrKind::Nop);

        transformer
            .transform(&target("Foo", "testNoReturn"), &mut body, &mut ledger)
            .unwrap();
        assert_eq!(kinds(&body), vec!["TEST_START", "nop", "TEST_END", "return"]);
    }

    #[test]
    fn test_lifecycle_ignores_non_tests() {
        let config = InstrumentConfig::default();
        let transformer = TestLifecycleTransformer::new(&config);
        let committed = HashSet::new();
        let mut ledger = LineLedger::new(&committed);
        let mut body = MethodBody::new();
        let outcome = transformer
            .transform(&target("Foo", "helper"), &mut body, &mut ledger)
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::NotATest));
        assert!(body.is_empty());
    }
}
