//! Shared result wrappers for analysis stages

use crate::error::AnalysisError;
use serde::Serialize;

/// Severity level for bottlenecks and conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Worth a look, no immediate impact
    Low,
    /// Noticeable impact on duration or correctness
    Medium,
    /// Dominates the run or threatens correctness on the critical path
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        };
        f.write_str(label)
    }
}

/// A metric that may not apply to a given run
///
/// Insufficient data (zero wall-clock time, too few invocations, a degraded
/// graph) is an answer, not a failure, so reports carry it as a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Metric<T> {
    Applicable(T),
    NotApplicable { reason: String },
}

impl<T> Metric<T> {
    /// Convert an analysis result, keeping only the reason for failures
    pub fn from_result(result: Result<T, AnalysisError>) -> Self {
        match result {
            Ok(value) => Metric::Applicable(value),
            Err(AnalysisError::InsufficientData { reason, .. }) => {
                Metric::NotApplicable { reason }
            }
            Err(other) => Metric::NotApplicable {
                reason: other.to_string(),
            },
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Metric::Applicable(value) => Some(value),
            Metric::NotApplicable { .. } => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Metric::Applicable(_))
    }
}
