//! Critical path analysis for workflow handoff graphs
//!
//! The **critical path** is the longest duration-weighted chain of dependent
//! invocations. No amount of concurrency can finish the run faster than this
//! chain, so time saved anywhere else does not shorten the run.
//!
//! # Algorithm: Longest Path via Dynamic Programming
//!
//! ```text
//! 1. Topological sort of invocations (Kahn, iterative)
//! 2. For each invocation v in topological order:
//!    best[v] = duration[v] + max(best[u] for u in parents(v), default 0)
//! 3. Critical path = backtrack from the v with maximum best[v]
//! ```
//!
//! Ties, both between predecessors and between path ends, go to the smaller
//! invocation id so repeated runs produce the same path.
//!
//! # Example Run
//!
//! ```text
//! planner (10s)
//! ├─ docs-writer (5s)     ← Not on critical path
//! └─ coder (40s)          ← On critical path
//!    └─ reviewer (15s)    ← On critical path
//!
//! Critical path: planner → coder → reviewer
//! Total duration: 10 + 40 + 15 = 65s
//! ```
//!
//! # Example
//!
//! ```
//! use relevo::critical_path::find_critical_path;
//! use relevo::record::{InvocationRecord, InvocationStatus};
//! use relevo::workflow_graph::WorkflowGraph;
//!
//! # fn main() -> Result<(), relevo::error::AnalysisError> {
//! let records = vec![
//!     InvocationRecord::new("i1", "wf", "planner", 10.0, None, InvocationStatus::Success, &[]),
//!     InvocationRecord::new("i2", "wf", "docs-writer", 5.0, Some("i1"), InvocationStatus::Success, &[]),
//!     InvocationRecord::new("i3", "wf", "coder", 40.0, Some("i1"), InvocationStatus::Success, &[]),
//!     InvocationRecord::new("i4", "wf", "reviewer", 15.0, Some("i3"), InvocationStatus::Success, &[]),
//! ];
//! let graph = WorkflowGraph::build("wf", &records);
//!
//! let path = find_critical_path(&graph)?;
//! assert_eq!(path.agent_names(), vec!["planner", "coder", "reviewer"]);
//! assert_eq!(path.total_duration, 65.0);
//! # Ok(())
//! # }
//! ```

use crate::error::{AnalysisError, Result};
use crate::workflow_graph::{NodeId, WorkflowGraph};
use serde::Serialize;

/// One invocation on the critical path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStep {
    pub invocation_id: String,
    pub agent_name: String,
    pub duration_seconds: f64,
    /// Path duration up to and including this step
    pub cumulative_seconds: f64,
}

/// Result of critical path analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalPath {
    /// Nodes on the critical path, root to leaf
    #[serde(skip)]
    pub path: Vec<NodeId>,

    pub steps: Vec<PathStep>,

    /// Sum of durations along the path (seconds)
    pub total_duration: f64,

    /// Σ of every invocation's duration in the run
    pub agent_seconds: f64,

    /// Share of all agent time that lies on the path
    pub percent_of_agent_time: f64,

    /// `agent_seconds / total_duration`: upper bound on speedup from
    /// running everything off the path concurrently
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_theoretical_speedup: Option<f64>,
}

impl CriticalPath {
    /// Percentage of `total` (e.g. wall-clock seconds) spent on the path
    pub fn critical_path_percentage(&self, total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        (self.total_duration / total) * 100.0
    }

    /// Longest single invocation on the path
    pub fn longest_step(&self) -> Option<&PathStep> {
        self.steps.iter().max_by(|a, b| {
            a.duration_seconds
                .total_cmp(&b.duration_seconds)
                .then_with(|| b.invocation_id.cmp(&a.invocation_id))
        })
    }

    pub fn is_on_critical_path(&self, node: NodeId) -> bool {
        self.path.contains(&node)
    }

    pub fn contains_invocation(&self, invocation_id: &str) -> bool {
        self.steps.iter().any(|s| s.invocation_id == invocation_id)
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.agent_name.as_str()).collect()
    }
}

/// Find the critical path through a workflow graph
///
/// # Errors
///
/// - The graph's first structural problem if it is degraded (dangling
///   reference or cycle): path analysis is not trustworthy then.
/// - [`AnalysisError::InsufficientData`] for a run without invocations.
///
/// # Performance
///
/// O(V log V + E); the topological sort keeps ready nodes ordered by id.
pub fn find_critical_path(graph: &WorkflowGraph) -> Result<CriticalPath> {
    if let Some(problem) = graph.problems().first() {
        return Err(problem.clone());
    }

    if graph.node_count() == 0 {
        return Err(AnalysisError::InsufficientData {
            workflow_id: graph.workflow_id().to_string(),
            reason: "no invocations recorded".to_string(),
        });
    }

    // Step 1: topological order
    let order = graph
        .topological_order()
        .ok_or_else(|| AnalysisError::CycleDetected {
            workflow_id: graph.workflow_id().to_string(),
            invocation_id: String::new(),
        })?;

    let id_of = |node: NodeId| {
        graph
            .invocation(node)
            .map_or("", |r| r.invocation_id.as_str())
    };

    // Step 2: best[v] = duration[v] + max(best[parent])
    let mut best = vec![0.0f64; graph.node_count()];
    let mut predecessor: Vec<Option<NodeId>> = vec![None; graph.node_count()];

    for &node in &order {
        let mut chosen: Option<NodeId> = None;
        for &parent in graph.parents(node) {
            chosen = match chosen {
                None => Some(parent),
                Some(current) => {
                    let better = best[parent.0] > best[current.0]
                        || (best[parent.0] == best[current.0] && id_of(parent) < id_of(current));
                    Some(if better { parent } else { current })
                }
            };
        }
        best[node.0] = graph.duration(node) + chosen.map_or(0.0, |p| best[p.0]);
        predecessor[node.0] = chosen;
    }

    // Step 3: path end with the maximum cumulative duration
    let mut end = order[0];
    for &node in &order[1..] {
        if best[node.0] > best[end.0] || (best[node.0] == best[end.0] && id_of(node) < id_of(end)) {
            end = node;
        }
    }

    // Step 4: backtrack through predecessors
    let mut path = vec![end];
    let mut current = end;
    while let Some(prev) = predecessor[current.0] {
        path.push(prev);
        current = prev;
    }
    path.reverse();

    let steps: Vec<PathStep> = path
        .iter()
        .filter_map(|&node| {
            graph.invocation(node).map(|record| PathStep {
                invocation_id: record.invocation_id.clone(),
                agent_name: record.agent_name.clone(),
                duration_seconds: record.duration_seconds,
                cumulative_seconds: best[node.0],
            })
        })
        .collect();

    let total_duration = best[end.0];
    let agent_seconds = graph.total_duration();
    let percent_of_agent_time = if agent_seconds > 0.0 {
        total_duration / agent_seconds * 100.0
    } else {
        0.0
    };
    let max_theoretical_speedup = (total_duration > 0.0).then(|| agent_seconds / total_duration);

    Ok(CriticalPath {
        path,
        steps,
        total_duration,
        agent_seconds,
        percent_of_agent_time,
        max_theoretical_speedup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{InvocationRecord, InvocationStatus};

    fn inv(id: &str, parent: Option<&str>, duration: f64) -> InvocationRecord {
        InvocationRecord::new(
            id,
            "wf",
            &format!("agent_{}", id),
            duration,
            parent,
            InvocationStatus::Success,
            &[],
        )
    }

    fn ids(result: &CriticalPath) -> Vec<&str> {
        result
            .steps
            .iter()
            .map(|s| s.invocation_id.as_str())
            .collect()
    }

    #[test]
    fn test_empty_graph() {
        let graph = WorkflowGraph::build("wf", &[]);
        assert!(matches!(
            find_critical_path(&graph),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_single_invocation() {
        let graph = WorkflowGraph::build("wf", &[inv("a", None, 12.5)]);
        let result = find_critical_path(&graph).unwrap();

        assert_eq!(result.path.len(), 1);
        assert_eq!(result.total_duration, 12.5);
        assert_eq!(result.percent_of_agent_time, 100.0);
        assert_eq!(result.max_theoretical_speedup, Some(1.0));
    }

    #[test]
    fn test_linear_path() {
        let graph = WorkflowGraph::build(
            "wf",
            &[inv("a", None, 10.0), inv("b", Some("a"), 5.0), inv("c", Some("b"), 7.0)],
        );
        let result = find_critical_path(&graph).unwrap();

        assert_eq!(ids(&result), vec!["a", "b", "c"]);
        assert_eq!(result.total_duration, 22.0);
        assert_eq!(result.steps[1].cumulative_seconds, 15.0);
    }

    #[test]
    fn test_branching_path() {
        let graph = WorkflowGraph::build(
            "wf",
            &[inv("a", None, 10.0), inv("b", Some("a"), 5.0), inv("c", Some("a"), 20.0)],
        );
        let result = find_critical_path(&graph).unwrap();

        assert_eq!(ids(&result), vec!["a", "c"]);
        assert_eq!(result.total_duration, 30.0);
        assert!(result.is_on_critical_path(graph.node_by_id("c").unwrap()));
        assert!(!result.is_on_critical_path(graph.node_by_id("b").unwrap()));
    }

    #[test]
    fn test_multiple_roots() {
        let graph = WorkflowGraph::build(
            "wf",
            &[
                inv("a", None, 10.0),
                inv("b", Some("a"), 10.0),
                inv("x", None, 25.0),
            ],
        );
        let result = find_critical_path(&graph).unwrap();

        assert_eq!(ids(&result), vec!["x"]);
        assert_eq!(result.total_duration, 25.0);
        assert_eq!(result.max_theoretical_speedup, Some(45.0 / 25.0));
    }

    #[test]
    fn test_tie_broken_by_id() {
        let graph = WorkflowGraph::build(
            "wf",
            &[inv("r", None, 1.0), inv("z", Some("r"), 5.0), inv("m", Some("r"), 5.0)],
        );
        let result = find_critical_path(&graph).unwrap();
        assert_eq!(ids(&result), vec!["r", "m"]);

        // Two independent roots of equal length
        let graph = WorkflowGraph::build("wf", &[inv("q", None, 3.0), inv("p", None, 3.0)]);
        assert_eq!(ids(&find_critical_path(&graph).unwrap()), vec!["p"]);
    }

    #[test]
    fn test_longest_step() {
        let graph = WorkflowGraph::build(
            "wf",
            &[inv("a", None, 5.0), inv("b", Some("a"), 20.0), inv("c", Some("b"), 3.0)],
        );
        let result = find_critical_path(&graph).unwrap();
        assert_eq!(result.longest_step().unwrap().invocation_id, "b");
    }

    #[test]
    fn test_critical_path_percentage() {
        let graph = WorkflowGraph::build("wf", &[inv("a", None, 10.0), inv("b", Some("a"), 20.0)]);
        let result = find_critical_path(&graph).unwrap();

        assert_eq!(result.critical_path_percentage(50.0), 60.0);
        assert_eq!(result.critical_path_percentage(0.0), 0.0);
    }

    #[test]
    fn test_degraded_graph_refused() {
        let graph = WorkflowGraph::build("wf", &[inv("a", Some("b"), 1.0), inv("b", Some("a"), 1.0)]);
        assert!(matches!(
            find_critical_path(&graph),
            Err(AnalysisError::CycleDetected { .. })
        ));

        let graph = WorkflowGraph::build("wf", &[inv("a", Some("ghost"), 1.0)]);
        assert!(matches!(
            find_critical_path(&graph),
            Err(AnalysisError::DanglingReference { .. })
        ));
    }
}
