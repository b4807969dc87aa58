//! Finding - one evaluator verdict about one observation.

use alloc::string::String;

use crate::{Code, Protocol, Severity, Timestamp};

/// A single diagnostic verdict.
///
/// Findings are created by the evaluators, appended to a report in
/// observation order and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Finding {
    pub severity: Severity,
    pub code: Code,
    /// Human-readable description of what was observed.
    pub message: String,
    /// When the triggering observation was made (or captured).
    pub timestamp: Timestamp,
}

impl Finding {
    pub fn new(
        severity: Severity,
        code: Code,
        message: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            timestamp,
        }
    }

    /// Shorthand for an informational finding.
    pub fn ok(code: Code, message: impl Into<String>, timestamp: Timestamp) -> Self {
        Self::new(Severity::Ok, code, message, timestamp)
    }

    pub fn warning(code: Code, message: impl Into<String>, timestamp: Timestamp) -> Self {
        Self::new(Severity::Warning, code, message, timestamp)
    }

    pub fn critical(code: Code, message: impl Into<String>, timestamp: Timestamp) -> Self {
        Self::new(Severity::Critical, code, message, timestamp)
    }

    pub fn error(code: Code, message: impl Into<String>, timestamp: Timestamp) -> Self {
        Self::new(Severity::Error, code, message, timestamp)
    }

    pub fn protocol(&self) -> Protocol {
        self.code.protocol()
    }
}
