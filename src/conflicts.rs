//! Artifact conflict detection
//!
//! Builds an artifact → invocations map for one run. Every artifact written
//! by two or more distinct invocations is a conflict, keyed by the artifact so
//! the reported set does not depend on record order.
//!
//! Severity is MEDIUM, or HIGH when every invocation touching the artifact
//! lies on the critical path: a clash there risks both correctness and delay.
//! The same agent writing one artifact twice is still a conflict (usually a
//! retry that was not idempotent) and is marked `same_agent`.
//!
//! # Example
//!
//! ```
//! use relevo::conflicts::detect_conflicts;
//! use relevo::record::{InvocationRecord, InvocationStatus};
//! use relevo::workflow_graph::WorkflowGraph;
//!
//! let records = vec![
//!     InvocationRecord::new("i1", "wf", "coder", 10.0, None, InvocationStatus::Success, &["src/lib.rs"]),
//!     InvocationRecord::new("i2", "wf", "fixer", 5.0, None, InvocationStatus::Success, &["src/lib.rs"]),
//! ];
//! let graph = WorkflowGraph::build("wf", &records);
//!
//! let conflicts = detect_conflicts(&graph, None);
//! assert_eq!(conflicts.len(), 1);
//! assert_eq!(conflicts.conflicts[0].invocation_ids, vec!["i1", "i2"]);
//! ```

use crate::critical_path::CriticalPath;
use crate::metric::Severity;
use crate::workflow_graph::WorkflowGraph;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One artifact touched by several invocations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub artifact: String,
    /// Touching invocations, sorted by id
    pub invocation_ids: Vec<String>,
    /// Distinct agents involved, sorted
    pub agents: Vec<String>,
    /// Some agent touched the artifact more than once
    pub same_agent: bool,
    pub on_critical_path: bool,
    pub severity: Severity,
}

/// Conflicts of one run, highest severity first, then by artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConflictList {
    pub conflicts: Vec<Conflict>,
}

impl ConflictList {
    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn for_artifact(&self, artifact: &str) -> Option<&Conflict> {
        self.conflicts.iter().find(|c| c.artifact == artifact)
    }
}

/// Detect artifacts written by more than one invocation of a run
///
/// `critical_path` is `None` when path analysis is unavailable (degraded
/// graph); severity then stays MEDIUM.
pub fn detect_conflicts(graph: &WorkflowGraph, critical_path: Option<&CriticalPath>) -> ConflictList {
    let mut touches: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut agents_of: BTreeMap<&str, &str> = BTreeMap::new();

    for (_, record) in graph.nodes() {
        agents_of.insert(&record.invocation_id, &record.agent_name);
        for artifact in record.artifacts() {
            touches
                .entry(artifact)
                .or_default()
                .insert(&record.invocation_id);
        }
    }

    let mut conflicts: Vec<Conflict> = touches
        .into_iter()
        .filter(|(_, invocations)| invocations.len() >= 2)
        .map(|(artifact, invocations)| {
            let agent_names: Vec<&str> = invocations
                .iter()
                .filter_map(|id| agents_of.get(id).copied())
                .collect();
            let distinct: BTreeSet<&str> = agent_names.iter().copied().collect();

            let on_critical_path = critical_path
                .is_some_and(|cp| invocations.iter().all(|id| cp.contains_invocation(id)));

            Conflict {
                artifact: artifact.to_string(),
                invocation_ids: invocations.iter().map(|s| s.to_string()).collect(),
                same_agent: distinct.len() < agent_names.len(),
                agents: distinct.into_iter().map(str::to_string).collect(),
                on_critical_path,
                severity: if on_critical_path {
                    Severity::High
                } else {
                    Severity::Medium
                },
            }
        })
        .collect();

    conflicts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.artifact.cmp(&b.artifact))
    });

    for c in &conflicts {
        tracing::debug!(
            "Conflict in '{}' on {}: {:?} ({})",
            graph.workflow_id(),
            c.artifact,
            c.invocation_ids,
            c.severity
        );
    }

    ConflictList { conflicts }
}
