//! Parallelization candidates
//!
//! Two invocations of the same run are *unrelated* when neither is a
//! handoff-ancestor of the other. Nothing in the recorded dependencies forces
//! them to run one after the other, so each unrelated pair is a candidate for
//! concurrent execution.
//!
//! Whether the pair also writes a common artifact decides how strong the
//! recommendation is:
//!
//! - [`ParallelMode::Ranked`]: every unrelated pair is reported, pairs with
//!   disjoint artifacts first.
//! - [`ParallelMode::DisjointOnly`]: pairs sharing an artifact are dropped.
//!
//! The time a pair could save is given as a range. The upper bound is the
//! shorter of the two durations (perfect overlap); the lower bound scales it
//! by `speedup_floor` for disjoint pairs and is zero for pairs that share an
//! artifact, since those may need to serialize anyway.

use crate::config::ParallelismConfig;
use crate::error::{AnalysisError, Result};
use crate::workflow_graph::{NodeId, WorkflowGraph};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// How artifact overlap affects candidate selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ParallelMode {
    /// Overlap lowers a pair's rank
    #[default]
    Ranked,
    /// Overlap excludes a pair
    DisjointOnly,
}

/// Estimated seconds saved by running a pair concurrently
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SavingsRange {
    pub low_seconds: f64,
    pub high_seconds: f64,
}

/// A pair of unrelated invocations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParallelCandidate {
    pub first_invocation: String,
    pub first_agent: String,
    pub second_invocation: String,
    pub second_agent: String,
    pub artifact_disjoint: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shared_artifacts: Vec<String>,
    pub estimated_savings: SavingsRange,
}

impl ParallelCandidate {
    /// Whether this pair consists of the two given invocations, in any order
    pub fn is_pair(&self, a: &str, b: &str) -> bool {
        (self.first_invocation == a && self.second_invocation == b)
            || (self.first_invocation == b && self.second_invocation == a)
    }
}

/// Parallelization candidates of one run, best first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParallelizationReport {
    pub mode: ParallelMode,
    /// All unrelated pairs in the run
    pub unrelated_pairs: usize,
    /// Unrelated pairs that share no artifact
    pub disjoint_pairs: usize,
    pub candidates: Vec<ParallelCandidate>,
    /// Candidates cut by `max_candidates`
    pub omitted: usize,
}

/// Find unrelated invocation pairs
///
/// # Errors
///
/// - The graph's first structural problem if it is degraded.
/// - [`AnalysisError::InsufficientData`] with fewer than two invocations.
pub fn find_parallel_candidates(
    graph: &WorkflowGraph,
    config: &ParallelismConfig,
) -> Result<ParallelizationReport> {
    if let Some(problem) = graph.problems().first() {
        return Err(problem.clone());
    }
    if graph.node_count() < 2 {
        return Err(AnalysisError::InsufficientData {
            workflow_id: graph.workflow_id().to_string(),
            reason: "fewer than two invocations".to_string(),
        });
    }

    let spans = ForestSpans::new(graph).ok_or_else(|| AnalysisError::CycleDetected {
        workflow_id: graph.workflow_id().to_string(),
        invocation_id: String::new(),
    })?;

    let artifacts: Vec<BTreeSet<&str>> = graph
        .nodes()
        .map(|(_, record)| record.artifacts().collect())
        .collect();

    let unrelated_pairs = spans.unrelated_pair_count();
    let mut disjoint_pairs = 0;
    let mut eligible = 0;
    let mut candidates = Vec::new();
    let keep = config.max_candidates;

    for (a, b) in spans.unrelated_pairs() {
        let shared: Vec<String> = artifacts[a.0]
            .intersection(&artifacts[b.0])
            .map(|s| s.to_string())
            .collect();
        let artifact_disjoint = shared.is_empty();
        if artifact_disjoint {
            disjoint_pairs += 1;
        } else if config.mode == ParallelMode::DisjointOnly {
            continue;
        }

        let (Some(x), Some(y)) = (graph.invocation(a), graph.invocation(b)) else {
            continue;
        };
        let (first, second) = if x.invocation_id <= y.invocation_id {
            (x, y)
        } else {
            (y, x)
        };
        let high = first.duration_seconds.min(second.duration_seconds);
        let low = if artifact_disjoint {
            high * config.speedup_floor
        } else {
            0.0
        };

        eligible += 1;
        candidates.push(ParallelCandidate {
            first_invocation: first.invocation_id.clone(),
            first_agent: first.agent_name.clone(),
            second_invocation: second.invocation_id.clone(),
            second_agent: second.agent_name.clone(),
            artifact_disjoint,
            shared_artifacts: shared,
            estimated_savings: SavingsRange {
                low_seconds: low,
                high_seconds: high,
            },
        });

        // Bound memory on wide runs
        if candidates.len() >= 2 * keep.max(1) {
            candidates.sort_by(rank);
            candidates.truncate(keep);
        }
    }

    candidates.sort_by(rank);
    candidates.truncate(keep);
    let omitted = eligible - candidates.len();

    tracing::debug!(
        "Workflow '{}': {} unrelated pairs, {} artifact-disjoint",
        graph.workflow_id(),
        unrelated_pairs,
        disjoint_pairs
    );

    Ok(ParallelizationReport {
        mode: config.mode,
        unrelated_pairs,
        disjoint_pairs,
        candidates,
        omitted,
    })
}

/// Disjoint pairs first, then larger possible saving, then ids
fn rank(x: &ParallelCandidate, y: &ParallelCandidate) -> Ordering {
    y.artifact_disjoint
        .cmp(&x.artifact_disjoint)
        .then_with(|| {
            y.estimated_savings
                .high_seconds
                .total_cmp(&x.estimated_savings.high_seconds)
        })
        .then_with(|| x.first_invocation.cmp(&y.first_invocation))
        .then_with(|| x.second_invocation.cmp(&y.second_invocation))
}

/// Preorder layout of the handoff forest
///
/// Every invocation names at most one parent, so an acyclic handoff graph is
/// a forest. In preorder each subtree occupies a contiguous span
/// `position..end`: nodes inside the span are descendants, nodes after it
/// are unrelated, and nodes before it are ancestors or unrelated.
struct ForestSpans {
    order: Vec<NodeId>,
    /// Exclusive end of the subtree span, by preorder position
    end: Vec<usize>,
}

impl ForestSpans {
    /// `None` if some node is unreachable from the roots
    fn new(graph: &WorkflowGraph) -> Option<Self> {
        let order: Vec<NodeId> = graph
            .roots()
            .iter()
            .flat_map(|&root| graph.descendants(root))
            .collect();
        if order.len() != graph.node_count() {
            return None;
        }

        let mut position = vec![0; order.len()];
        for (pos, node) in order.iter().enumerate() {
            position[node.0] = pos;
        }

        // Children follow their parent in preorder, so walk backwards
        let mut size = vec![1usize; order.len()];
        for pos in (0..order.len()).rev() {
            for child in graph.children(order[pos]) {
                size[pos] += size[position[child.0]];
            }
        }

        let end = size.iter().enumerate().map(|(pos, s)| pos + s).collect();
        Some(Self { order, end })
    }

    /// Number of unordered pairs where neither node is an ancestor of the other
    fn unrelated_pair_count(&self) -> usize {
        let n = self.order.len();
        self.end.iter().map(|&end| n - end).sum()
    }

    /// Each unrelated pair exactly once, earlier preorder position first
    fn unrelated_pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.order.iter().enumerate().flat_map(move |(pos, &a)| {
            self.order[self.end[pos]..].iter().map(move |&b| (a, b))
        })
    }
}
