//! Bottleneck detection
//!
//! An invocation is a bottleneck when its own duration takes more than the
//! configured share (default 40%) of the run's wall-clock time. The check is
//! strictly greater-than and done without dividing, so exactly 40% is never
//! flagged:
//!
//! ```text
//! duration × 100 > threshold% × W
//! ```
//!
//! # Example
//!
//! ```
//! use relevo::bottleneck::detect_bottlenecks;
//! use relevo::record::{InvocationRecord, InvocationStatus};
//! use relevo::workflow_graph::WorkflowGraph;
//!
//! let records = vec![
//!     InvocationRecord::new("i1", "wf", "planner", 20.0, None, InvocationStatus::Success, &[]),
//!     InvocationRecord::new("i2", "wf", "coder", 70.0, Some("i1"), InvocationStatus::Success, &[]),
//! ];
//! let graph = WorkflowGraph::build("wf", &records);
//!
//! let report = detect_bottlenecks(&graph, Some(100.0), 40.0).unwrap();
//! assert_eq!(report.bottlenecks.len(), 1);
//! assert_eq!(report.bottlenecks[0].agent_name, "coder");
//! ```

use crate::error::{AnalysisError, Result};
use crate::metric::Severity;
use crate::workflow_graph::WorkflowGraph;
use serde::Serialize;

/// A single invocation dominating wall-clock time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bottleneck {
    pub invocation_id: String,
    pub agent_name: String,
    pub duration_seconds: f64,
    pub percent_of_wall_clock: f64,
    pub severity: Severity,
}

impl Bottleneck {
    pub fn description(&self) -> String {
        format!(
            "{} ({}) took {:.1}s, {:.1}% of wall-clock time. \
             Consider splitting its work or running its siblings concurrently.",
            self.agent_name, self.invocation_id, self.duration_seconds, self.percent_of_wall_clock
        )
    }
}

/// Bottlenecks of one run, highest share first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BottleneckReport {
    pub wall_clock_seconds: f64,
    pub threshold_percent: f64,
    pub bottlenecks: Vec<Bottleneck>,
}

impl BottleneckReport {
    pub fn is_empty(&self) -> bool {
        self.bottlenecks.is_empty()
    }
}

/// Flag invocations above `threshold_percent` of wall-clock time
///
/// A run with no offender yields an empty report.
///
/// # Errors
///
/// [`AnalysisError::InsufficientData`] if wall-clock time is unknown or not
/// positive.
pub fn detect_bottlenecks(
    graph: &WorkflowGraph,
    wall_clock_seconds: Option<f64>,
    threshold_percent: f64,
) -> Result<BottleneckReport> {
    let wall_clock = match wall_clock_seconds {
        Some(w) if w > 0.0 => w,
        Some(_) => {
            return Err(AnalysisError::InsufficientData {
                workflow_id: graph.workflow_id().to_string(),
                reason: "zero wall-clock duration".to_string(),
            })
        }
        None => {
            return Err(AnalysisError::InsufficientData {
                workflow_id: graph.workflow_id().to_string(),
                reason: "workflow still in progress".to_string(),
            })
        }
    };

    let mut bottlenecks: Vec<Bottleneck> = graph
        .nodes()
        .filter(|(_, record)| record.duration_seconds * 100.0 > threshold_percent * wall_clock)
        .map(|(_, record)| Bottleneck {
            invocation_id: record.invocation_id.clone(),
            agent_name: record.agent_name.clone(),
            duration_seconds: record.duration_seconds,
            percent_of_wall_clock: record.duration_seconds / wall_clock * 100.0,
            severity: Severity::High,
        })
        .collect();

    bottlenecks.sort_by(|a, b| {
        b.percent_of_wall_clock
            .total_cmp(&a.percent_of_wall_clock)
            .then_with(|| a.invocation_id.cmp(&b.invocation_id))
    });

    for b in &bottlenecks {
        tracing::debug!("Bottleneck in '{}': {}", graph.workflow_id(), b.description());
    }

    Ok(BottleneckReport {
        wall_clock_seconds: wall_clock,
        threshold_percent,
        bottlenecks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{InvocationRecord, InvocationStatus};

    fn graph_with(durations: &[(&str, f64)]) -> WorkflowGraph {
        let records: Vec<InvocationRecord> = durations
            .iter()
            .map(|&(id, d)| {
                InvocationRecord::new(
                    id,
                    "wf",
                    &format!("agent-{}", id),
                    d,
                    None,
                    InvocationStatus::Success,
                    &[],
                )
            })
            .collect();
        WorkflowGraph::build("wf", &records)
    }

    #[test]
    fn test_exactly_forty_percent_not_flagged() {
        let graph = graph_with(&[("a", 40.0), ("b", 10.0)]);
        let report = detect_bottlenecks(&graph, Some(100.0), 40.0).unwrap();
        assert!(report.is_empty());

        let graph = graph_with(&[("a", 110.0)]);
        let report = detect_bottlenecks(&graph, Some(275.0), 40.0).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_just_above_forty_percent_flagged() {
        let graph = graph_with(&[("a", 40.0001)]);
        let report = detect_bottlenecks(&graph, Some(100.0), 40.0).unwrap();
        assert_eq!(report.bottlenecks.len(), 1);
        assert_eq!(report.bottlenecks[0].severity, Severity::High);
    }

    #[test]
    fn test_ordered_by_descending_share() {
        // Overlapping invocations can both exceed 40%
        let graph = graph_with(&[("a", 45.0), ("b", 80.0), ("c", 5.0)]);
        let report = detect_bottlenecks(&graph, Some(100.0), 40.0).unwrap();

        let ids: Vec<&str> = report
            .bottlenecks
            .iter()
            .map(|b| b.invocation_id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!((report.bottlenecks[0].percent_of_wall_clock - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_wall_clock() {
        let graph = graph_with(&[("a", 1.0)]);
        assert!(detect_bottlenecks(&graph, None, 40.0).is_err());
        assert!(detect_bottlenecks(&graph, Some(0.0), 40.0).is_err());
    }
}
