//! Instrumentation report.
//!
//! Summarizes one pipeline run: how many methods were visited, skipped,
//! left unchanged or instrumented, how many probes went in, and which
//! methods were rolled back and why.

use super::transformer::{Outcome, SkipReason};
use serde::Serialize;
use std::collections::BTreeMap;

/// A method whose instrumentation was rolled back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodFailure {
    /// Method signature
    pub signature: String,
    /// Transformer that failed
    pub transformer: String,
    /// Error message
    pub message: String,
}

/// Summary counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstrumentationSummary {
    /// Methods visited
    pub methods: usize,
    /// Methods at least one transformer changed
    pub instrumented: usize,
    /// Methods every transformer skipped
    pub skipped: usize,
    /// Methods rolled back after an error
    pub failed: usize,
    /// Probe instructions inserted
    pub probes: usize,
}

/// Instrumentation report for one or more programs
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstrumentationReport {
    methods: usize,
    instrumented: usize,
    skipped: usize,
    probes: usize,
    probes_by_class: BTreeMap<String, usize>,
    skip_reasons: BTreeMap<String, usize>,
    failures: Vec<MethodFailure>,
}

impl InstrumentationReport {
    /// Empty report
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the combined outcomes of all transformers on one method
    pub fn record_method(&mut self, class: &str, outcomes: &[Outcome]) {
        self.methods += 1;
        let probes: usize = outcomes
            .iter()
            .map(|o| match o {
                Outcome::Instrumented { probes } => *probes,
                _ => 0,
            })
            .sum();
        if probes > 0 {
            self.instrumented += 1;
            self.probes += probes;
            *self.probes_by_class.entry(class.to_string()).or_insert(0) += probes;
        } else if !outcomes.is_empty()
            && outcomes.iter().all(|o| matches!(o, Outcome::Skipped(_)))
        {
            self.skipped += 1;
            for outcome in outcomes {
                if let Outcome::Skipped(reason) = outcome {
                    *self.skip_reasons.entry(skip_label(*reason).to_string()).or_insert(0) += 1;
                }
            }
        }
    }

    /// Record a rolled-back method
    pub fn record_failure(&mut self, failure: MethodFailure) {
        self.methods += 1;
        self.failures.push(failure);
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: &Self) {
        self.methods += other.methods;
        self.instrumented += other.instrumented;
        self.skipped += other.skipped;
        self.probes += other.probes;
        for (class, probes) in &other.probes_by_class {
            *self.probes_by_class.entry(class.clone()).or_insert(0) += probes;
        }
        for (reason, count) in &other.skip_reasons {
            *self.skip_reasons.entry(reason.clone()).or_insert(0) += count;
        }
        self.failures.extend(other.failures.iter().cloned());
    }

    /// Summary counts
    #[must_use]
    pub fn summary(&self) -> InstrumentationSummary {
        InstrumentationSummary {
            methods: self.methods,
            instrumented: self.instrumented,
            skipped: self.skipped,
            failed: self.failures.len(),
            probes: self.probes,
        }
    }

    /// Rolled-back methods
    #[must_use]
    pub fn failures(&self) -> &[MethodFailure] {
        &self.failures
    }

    /// Probes inserted per class
    #[must_use]
    pub fn probes_by_class(&self) -> &BTreeMap<String, usize> {
        &self.probes_by_class
    }

    /// Whether every method was processed without error
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

const fn skip_label(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::Infrastructure => "infrastructure",
        SkipReason::TestClass => "test-class",
        SkipReason::StaticInitializer => "static-initializer",
        SkipReason::NotATest => "not-a-test",
    }
}
