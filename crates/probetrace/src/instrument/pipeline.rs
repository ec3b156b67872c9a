//! Applies transformers to every method of a program.
//!
//! Each method is transformed on a copy of its body. The copy replaces the
//! original only when every transformer succeeded; otherwise the method keeps
//! its original IR, the line keys it claimed are dropped, and the failure is
//! reported with the method signature.

use super::report::{InstrumentationReport, MethodFailure};
use super::transformer::{
    BodyTransformer, FieldAccessTransformer, LineLedger, MethodTarget, ProductCodeTransformer,
    TestLifecycleTransformer,
};
use crate::config::InstrumentConfig;
use crate::ir::Program;
use crate::selection::{FieldSelection, LineSelection};
use std::collections::HashSet;
use tracing::{debug, warn};

/// State shared by all methods instrumented in one run
#[derive(Debug, Default)]
pub struct InstrumentSession {
    lines_logged: HashSet<String>,
}

impl InstrumentSession {
    /// Fresh session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `file:line` already has a line probe somewhere in the run
    #[must_use]
    pub fn is_logged(&self, key: &str) -> bool {
        self.lines_logged.contains(key)
    }

    /// Number of distinct line keys probed so far
    #[must_use]
    pub fn logged_count(&self) -> usize {
        self.lines_logged.len()
    }

    fn commit(&mut self, keys: HashSet<String>) {
        self.lines_logged.extend(keys);
    }
}

/// Run `transformers` over every method of `program`
pub fn instrument_program(
    program: &mut Program,
    transformers: &[&dyn BodyTransformer],
    session: &mut InstrumentSession,
) -> InstrumentationReport {
    let mut report = InstrumentationReport::new();
    for class in &mut program.classes {
        let targets: Vec<MethodTarget> = class
            .methods
            .iter()
            .map(|m| MethodTarget::new(class, m))
            .collect();
        for (method, target) in class.methods.iter_mut().zip(targets) {
            let mut body = method.body.clone();
            let mut ledger = LineLedger::new(&session.lines_logged);
            let mut outcomes = Vec::with_capacity(transformers.len());
            let mut failure = None;
            for transformer in transformers {
                let result = transformer
                    .transform(&target, &mut body, &mut ledger)
                    .and_then(|outcome| body.validate().map(|()| outcome));
                match result {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => {
                        failure = Some(MethodFailure {
                            signature: target.signature.clone(),
                            transformer: transformer.name().to_string(),
                            message: e.to_string(),
                        });
                        break;
                    }
                }
            }
            if let Some(failure) = failure {
                warn!(
                    method = %failure.signature,
                    transformer = %failure.transformer,
                    error = %failure.message,
                    "method left uninstrumented"
                );
                report.record_failure(failure);
                continue;
            }
            let pending = ledger.into_pending();
            session.commit(pending);
            method.body = body;
            debug!(method = %target.signature, ?outcomes, "method processed");
            report.record_method(&target.class, &outcomes);
        }
    }
    report
}

/// Product-phase and test-phase instrumentation with one configuration
#[derive(Debug, Clone, Default)]
pub struct Instrumenter {
    config: InstrumentConfig,
    lines: LineSelection,
    fields: FieldSelection,
}

impl Instrumenter {
    /// Instrumenter for the given selections
    #[must_use]
    pub fn new(config: InstrumentConfig, lines: LineSelection, fields: FieldSelection) -> Self {
        Self {
            config,
            lines,
            fields,
        }
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &InstrumentConfig {
        &self.config
    }

    /// Line and condition probes, then field-access probes, on product classes
    pub fn instrument_product(
        &self,
        program: &mut Program,
        session: &mut InstrumentSession,
    ) -> InstrumentationReport {
        let product = ProductCodeTransformer::new(&self.lines, &self.config);
        let fields = FieldAccessTransformer::new(&self.fields, &self.config);
        instrument_program(program, &[&product, &fields], session)
    }

    /// Test lifecycle probes on test classes
    pub fn instrument_tests(
        &self,
        program: &mut Program,
        session: &mut InstrumentSession,
    ) -> InstrumentationReport {
        let lifecycle = TestLifecycleTransformer::new(&self.config);
        instrument_program(program, &[&lifecycle], session)
    }
}
