//! Error taxonomy for workflow log analysis
//!
//! Only [`AnalysisError::WorkflowNotFound`] ends a request. Everything else is
//! recovered where it happens: parse errors skip one line, graph errors
//! degrade one run, insufficient data turns one metric into "not applicable".

use thiserror::Error;

/// Errors raised while loading and analyzing workflow logs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("{source_name}:{line}: {reason}")]
    RecordParse {
        source_name: String,
        line: usize,
        reason: String,
    },

    #[error(
        "Invocation '{invocation_id}' in workflow '{workflow_id}' references missing parent '{parent_id}'"
    )]
    DanglingReference {
        workflow_id: String,
        invocation_id: String,
        parent_id: String,
    },

    #[error("Handoff cycle in workflow '{workflow_id}' through invocation '{invocation_id}'")]
    CycleDetected {
        workflow_id: String,
        invocation_id: String,
    },

    #[error("Workflow '{0}' not found in logs")]
    WorkflowNotFound(String),

    #[error("Insufficient data for workflow '{workflow_id}': {reason}")]
    InsufficientData { workflow_id: String, reason: String },
}

impl AnalysisError {
    /// Whether this error marks the run's graph as structurally inconsistent
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            AnalysisError::DanglingReference { .. } | AnalysisError::CycleDetected { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_parse_message_has_location() {
        let err = AnalysisError::RecordParse {
            source_name: "events.jsonl".to_string(),
            line: 17,
            reason: "missing field `workflow_id`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "events.jsonl:17: missing field `workflow_id`"
        );
    }

    #[test]
    fn test_structural_errors() {
        let dangling = AnalysisError::DanglingReference {
            workflow_id: "wf".to_string(),
            invocation_id: "b".to_string(),
            parent_id: "zz".to_string(),
        };
        let cycle = AnalysisError::CycleDetected {
            workflow_id: "wf".to_string(),
            invocation_id: "a".to_string(),
        };
        assert!(dangling.is_structural());
        assert!(cycle.is_structural());
        assert!(!AnalysisError::WorkflowNotFound("wf".to_string()).is_structural());
        assert!(dangling.to_string().contains("missing parent 'zz'"));
    }
}
