//! Result and error types for Probetrace.

use thiserror::Error;

/// Result type for Probetrace operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur in Probetrace
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The instrumenter met an IR node it cannot decompose.
    ///
    /// Fatal to the enclosing method body only.
    #[error("Unsupported construct in {method}: {node}")]
    UnsupportedConstruct {
        /// Signature of the method being instrumented
        method: String,
        /// Description of the offending node
        node: String,
    },

    /// Malformed selection input
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// IR is internally inconsistent (dangling jump, unknown local, ...)
    #[error("Malformed IR: {message}")]
    MalformedIr {
        /// Error message
        message: String,
    },

    /// Runtime failure while interpreting IR
    #[error("Execution failed in {method}: {message}")]
    Execution {
        /// Signature of the executing method
        method: String,
        /// Error message
        message: String,
    },

    /// Persistent log could not be written
    #[error("Trace log flush failed: {0}")]
    Flush(#[source] std::io::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProbeError {
    /// Create an unsupported-construct error
    #[must_use]
    pub fn unsupported(method: impl Into<String>, node: impl Into<String>) -> Self {
        Self::UnsupportedConstruct {
            method: method.into(),
            node: node.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a malformed-IR error
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedIr {
            message: message.into(),
        }
    }

    /// Create an execution error
    #[must_use]
    pub fn execution(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Whether this error aborts only the enclosing method body
    #[must_use]
    pub const fn is_method_local(&self) -> bool {
        matches!(self, Self::UnsupportedConstruct { .. } | Self::MalformedIr { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_display_names_method_and_node() {
        let err = ProbeError::unsupported("<Foo: int bar(int)>", "field read Foo.count");
        let text = err.to_string();
        assert!(text.contains("<Foo: int bar(int)>"));
        assert!(text.contains("field read Foo.count"));
        assert!(err.is_method_local());
    }

    #[test]
    fn test_configuration_is_not_method_local() {
        let err = ProbeError::configuration("bad line");
        assert!(err.to_string().contains("Configuration"));
        assert!(!err.is_method_local());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ProbeError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
