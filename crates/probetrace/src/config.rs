//! Instrumentation and recorder configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of batched records that triggers a flush
pub const DEFAULT_FLUSH_THRESHOLD: usize = 1000;

/// Default persistent log file
pub const DEFAULT_LOG_PATH: &str = "coverage.log";

/// Settings for the instrumentation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Classes whose name starts with this prefix are trace infrastructure
    /// and never instrumented
    pub infrastructure_prefix: String,
    /// Class-name suffix identifying test classes
    pub test_class_suffix: String,
    /// Method-name prefix identifying test methods
    pub test_method_prefix: String,
    /// Requested lines match body lines at most this far away
    pub line_tolerance: u32,
    /// Insert test-start / test-end probes into test methods
    pub test_lifecycle: bool,
}

impl InstrumentConfig {
    /// Create a builder for instrumentation config
    #[must_use]
    pub fn builder() -> InstrumentConfigBuilder {
        InstrumentConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether `class` is trace infrastructure
    #[must_use]
    pub fn is_infrastructure(&self, class: &str) -> bool {
        !self.infrastructure_prefix.is_empty() && class.starts_with(&self.infrastructure_prefix)
    }

    /// Whether `class` is a test class
    #[must_use]
    pub fn is_test_class(&self, class: &str) -> bool {
        !self.test_class_suffix.is_empty() && class.ends_with(&self.test_class_suffix)
    }

    /// Whether `method` in `class` is a test method
    #[must_use]
    pub fn is_test_method(&self, class: &str, method: &str) -> bool {
        self.is_test_class(class)
            || (!self.test_method_prefix.is_empty() && method.starts_with(&self.test_method_prefix))
    }
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            infrastructure_prefix: "Logger".to_string(),
            test_class_suffix: "Test".to_string(),
            test_method_prefix: "test".to_string(),
            line_tolerance: 1,
            test_lifecycle: true,
        }
    }
}

/// Builder for [`InstrumentConfig`]
#[derive(Debug)]
pub struct InstrumentConfigBuilder {
    config: InstrumentConfig,
}

impl InstrumentConfigBuilder {
    /// Set the infrastructure class prefix
    #[must_use]
    pub fn infrastructure_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.infrastructure_prefix = prefix.into();
        self
    }

    /// Set the test class suffix
    #[must_use]
    pub fn test_class_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.test_class_suffix = suffix.into();
        self
    }

    /// Set the test method prefix
    #[must_use]
    pub fn test_method_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.test_method_prefix = prefix.into();
        self
    }

    /// Set the line-matching tolerance
    #[must_use]
    pub fn line_tolerance(mut self, tolerance: u32) -> Self {
        self.config.line_tolerance = tolerance;
        self
    }

    /// Enable or disable test lifecycle probes
    #[must_use]
    pub fn test_lifecycle(mut self, enabled: bool) -> Self {
        self.config.test_lifecycle = enabled;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> InstrumentConfig {
        self.config
    }
}

/// Settings for the run-time trace recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Batched records that trigger a flush
    pub flush_threshold: usize,
    /// Persistent log, opened in append mode
    pub log_path: PathBuf,
}

impl RecorderConfig {
    /// Create a builder for recorder config
    #[must_use]
    pub fn builder() -> RecorderConfigBuilder {
        RecorderConfigBuilder::default()
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }
}

/// Builder for [`RecorderConfig`]
#[derive(Debug, Default)]
pub struct RecorderConfigBuilder {
    flush_threshold: usize,
    log_path: Option<PathBuf>,
}

impl RecorderConfigBuilder {
    /// Set the flush threshold
    #[must_use]
    pub fn flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold;
        self
    }

    /// Set the log path
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> RecorderConfig {
        RecorderConfig {
            flush_threshold: if self.flush_threshold == 0 {
                DEFAULT_FLUSH_THRESHOLD
            } else {
                self.flush_threshold
            },
            log_path: self
                .log_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH)),
        }
    }
}
