//! Execution results and the failure taxonomy
//!
//! [`ExecutionResult`] is handed to callers verbatim. Its JSON shape is the
//! only wire format the engine defines:
//!
//! ```json
//! {
//!   "success": false,
//!   "repairs": [],
//!   "errors": [{ "message": "...", "category": "lock_violation" }],
//!   "eventsEmitted": [],
//!   "telemetryEventsEmitted": 0
//! }
//! ```
//!
//! `warnings` only appears when non-empty (rollback irreversibility).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an execution failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Missing, foreign or expired canvas lock
    LockViolation,
    /// A declared precondition did not hold, or there was nothing to roll back
    PreconditionFailure,
    /// Malformed mutation payload or oversize plan
    ValidationFailure,
    /// Datastore rejected a write
    MutationFailure,
    /// Inverse mutations could not be applied
    RollbackFailure,
    /// Mutation resolved to a table outside the canvas whitelist
    ForbiddenOperation,
    /// Repair name outside the approved set
    ForbiddenRepair,
    /// Anything unexpected
    Unknown,
}

impl FailureCategory {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LockViolation => "lock_violation",
            Self::PreconditionFailure => "precondition_failure",
            Self::ValidationFailure => "validation_failure",
            Self::MutationFailure => "mutation_failure",
            Self::RollbackFailure => "rollback_failure",
            Self::ForbiddenOperation => "forbidden_operation",
            Self::ForbiddenRepair => "forbidden_repair",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One categorized error in a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    /// Human-readable message, free of raw backend output
    pub message: String,
    /// Failure category
    pub category: FailureCategory,
}

impl ExecutionError {
    /// Create new error
    #[inline]
    #[must_use]
    pub fn new(category: FailureCategory, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category,
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

/// Outcome of `execute_plan` or `rollback_last_plan`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Whether the plan (or rollback) committed
    pub success: bool,
    /// Trail of whitelisted repairs applied during the attempt
    pub repairs: Vec<String>,
    /// Categorized errors; non-empty iff `success` is false
    pub errors: Vec<ExecutionError>,
    /// Events emitted after commit; empty unless `success`
    pub events_emitted: Vec<String>,
    /// Telemetry records emitted after commit; zero unless `success`
    pub telemetry_events_emitted: usize,
    /// Irreversibility notes (rollback) or post-commit notes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ExecutionResult {
    /// Successful result with no events yet
    #[must_use]
    pub fn succeeded(repairs: Vec<String>) -> Self {
        Self {
            success: true,
            repairs,
            errors: Vec::new(),
            events_emitted: Vec::new(),
            telemetry_events_emitted: 0,
            warnings: Vec::new(),
        }
    }

    /// Failed result carrying one error
    #[must_use]
    pub fn failed(category: FailureCategory, message: impl Into<String>) -> Self {
        Self::failed_with(vec![ExecutionError::new(category, message)], Vec::new())
    }

    /// Failed result carrying the given errors and repair trail
    ///
    /// An empty error list is replaced with a single `unknown` error so that a
    /// failure is never reported without a reason.
    #[must_use]
    pub fn failed_with(mut errors: Vec<ExecutionError>, repairs: Vec<String>) -> Self {
        if errors.is_empty() {
            errors.push(ExecutionError::new(
                FailureCategory::Unknown,
                "execution failed without a reported cause",
            ));
        }
        Self {
            success: false,
            repairs,
            errors,
            events_emitted: Vec::new(),
            telemetry_events_emitted: 0,
            warnings: Vec::new(),
        }
    }

    /// Record emitted events and telemetry count
    ///
    /// Ignored on failed results; events never accompany a failure.
    #[must_use]
    pub fn with_emissions(mut self, events: Vec<String>, telemetry: usize) -> Self {
        if self.success {
            self.events_emitted = events;
            self.telemetry_events_emitted = telemetry;
        }
        self
    }

    /// Attach warnings
    #[inline]
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    /// Category of the first error, if any
    #[inline]
    #[must_use]
    pub fn category(&self) -> Option<FailureCategory> {
        self.errors.first().map(|e| e.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn failure_never_carries_emissions() {
        let result = ExecutionResult::failed(FailureCategory::LockViolation, "no lock")
            .with_emissions(vec!["e".into()], 1);
        assert!(result.events_emitted.is_empty());
        assert_eq!(result.telemetry_events_emitted, 0);
        assert_eq!(result.category(), Some(FailureCategory::LockViolation));
    }

    #[test]
    fn empty_failure_gets_unknown_error() {
        let result = ExecutionResult::failed_with(Vec::new(), Vec::new());
        assert_eq!(result.category(), Some(FailureCategory::Unknown));
    }

    #[test]
    fn wire_shape_is_camel_case_and_omits_empty_warnings() {
        let result = ExecutionResult::succeeded(vec!["r".into()])
            .with_emissions(vec!["canvas.updated".into()], 1);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "repairs": ["r"],
                "errors": [],
                "eventsEmitted": ["canvas.updated"],
                "telemetryEventsEmitted": 1
            })
        );
    }

    #[test]
    fn category_serializes_snake_case() {
        let err = ExecutionError::new(FailureCategory::ForbiddenRepair, "x");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["category"], "forbidden_repair");
        assert_eq!(err.to_string(), "[forbidden_repair] x");
    }
}
