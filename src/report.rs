//! Per-workflow reports, run listings and cross-workflow summaries
//!
//! Reports are plain data: every collection is ordered (ids, severities,
//! `BTreeMap`s), so rendering the same snapshot twice is byte-identical.

use crate::bottleneck::{detect_bottlenecks, BottleneckReport};
use crate::config::AnalyzerConfig;
use crate::conflicts::{detect_conflicts, ConflictList};
use crate::critical_path::{find_critical_path, CriticalPath};
use crate::error::AnalysisError;
use crate::loader::{LoadStats, LogSnapshot};
use crate::metric::Metric;
use crate::overhead::{compute_overhead, OverheadMetric};
use crate::parallelism::{find_parallel_candidates, ParallelizationReport};
use crate::record::{InvocationStatus, WorkflowRun};
use crate::workflow_graph::WorkflowGraph;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    InProgress,
}

impl RunStatus {
    fn of(run: &WorkflowRun) -> Self {
        if run.is_complete() {
            RunStatus::Completed
        } else {
            RunStatus::InProgress
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::InProgress => "in progress",
        }
    }
}

/// Invocation outcome counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub success: usize,
    pub failure: usize,
    pub in_progress: usize,
}

impl OutcomeCounts {
    fn record(&mut self, status: InvocationStatus) {
        match status {
            InvocationStatus::Success => self.success += 1,
            InvocationStatus::Failure => self.failure += 1,
            InvocationStatus::InProgress => self.in_progress += 1,
        }
    }
}

/// Time and outcome totals for one agent label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStats {
    pub agent_name: String,
    pub invocations: usize,
    pub total_seconds: f64,
    pub failures: usize,
}

fn collect_agent_stats<'a>(runs: impl Iterator<Item = &'a WorkflowRun>) -> Vec<AgentStats> {
    let mut by_agent: BTreeMap<&str, AgentStats> = BTreeMap::new();
    for run in runs {
        for inv in &run.invocations {
            let stats = by_agent
                .entry(inv.agent_name.as_str())
                .or_insert_with(|| AgentStats {
                    agent_name: inv.agent_name.clone(),
                    invocations: 0,
                    total_seconds: 0.0,
                    failures: 0,
                });
            stats.invocations += 1;
            stats.total_seconds += inv.duration_seconds;
            if inv.outcome.status == InvocationStatus::Failure {
                stats.failures += 1;
            }
        }
    }

    let mut stats: Vec<AgentStats> = by_agent.into_values().collect();
    stats.sort_by(|a, b| {
        b.total_seconds
            .total_cmp(&a.total_seconds)
            .then_with(|| a.agent_name.cmp(&b.agent_name))
    });
    stats
}

/// Full analysis of one workflow run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowReport {
    pub workflow_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wall_clock_seconds: Option<f64>,
    pub invocation_count: usize,
    pub handoff_count: usize,
    pub outcomes: OutcomeCounts,
    pub agents: Vec<AgentStats>,
    pub overhead: Metric<OverheadMetric>,
    pub bottlenecks: Metric<BottleneckReport>,
    pub critical_path: Metric<CriticalPath>,
    pub parallelization: Metric<ParallelizationReport>,
    pub conflicts: ConflictList,
    /// Dangling references or cycles were found; path analysis is omitted
    pub degraded: bool,
    pub warnings: Vec<String>,
    pub snapshot_digest: String,
}

impl WorkflowReport {
    /// Run every analysis stage on one workflow run
    pub fn build(run: &WorkflowRun, config: &AnalyzerConfig, snapshot_digest: &str) -> Self {
        let graph = WorkflowGraph::from_run(run);
        let wall_clock = run.wall_clock_seconds();

        let overhead = Metric::from_result(compute_overhead(&graph, wall_clock, &config.thresholds));
        let bottlenecks = Metric::from_result(detect_bottlenecks(
            &graph,
            wall_clock,
            config.thresholds.bottleneck_percent,
        ));

        let degraded = graph.is_degraded();
        let mut warnings: Vec<String> = graph.problems().iter().map(|p| p.to_string()).collect();
        if run.start_inferred {
            warnings.push("no workflow_start event; start inferred from earliest event".to_string());
        }

        let (critical_path, parallelization) = if degraded {
            let reason = "path analysis omitted: handoff graph is inconsistent".to_string();
            (
                Metric::NotApplicable {
                    reason: reason.clone(),
                },
                Metric::NotApplicable { reason },
            )
        } else {
            (
                Metric::from_result(find_critical_path(&graph)),
                Metric::from_result(find_parallel_candidates(&graph, &config.parallelism)),
            )
        };

        let conflicts = detect_conflicts(&graph, critical_path.value());

        let mut outcomes = OutcomeCounts::default();
        for inv in &run.invocations {
            outcomes.record(inv.outcome.status);
        }

        Self {
            workflow_id: run.workflow_id.clone(),
            task: run.task.clone(),
            status: RunStatus::of(run),
            started_at: run.started_at,
            ended_at: run.ended_at,
            wall_clock_seconds: wall_clock,
            invocation_count: graph.node_count(),
            handoff_count: run.handoffs.len(),
            outcomes,
            agents: collect_agent_stats(std::iter::once(run)),
            overhead,
            bottlenecks,
            critical_path,
            parallelization,
            conflicts,
            degraded,
            warnings,
            snapshot_digest: snapshot_digest.to_string(),
        }
    }
}

/// Analyze one workflow run by id
///
/// # Errors
///
/// [`AnalysisError::WorkflowNotFound`] if the id is absent from the snapshot.
pub fn analyze_workflow(
    snapshot: &LogSnapshot,
    workflow_id: &str,
    config: &AnalyzerConfig,
) -> Result<WorkflowReport, AnalysisError> {
    let run = snapshot.run(workflow_id)?;
    Ok(WorkflowReport::build(run, config, snapshot.digest()))
}

/// One row of `list`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunListEntry {
    pub workflow_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub invocation_count: usize,
}

/// Workflow runs found in the logs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunListing {
    pub runs: Vec<RunListEntry>,
}

/// Enumerate runs, optionally keeping only ids matching `pattern`
pub fn list_runs(snapshot: &LogSnapshot, pattern: Option<&Regex>) -> RunListing {
    let runs = snapshot
        .runs()
        .filter(|run| pattern.map_or(true, |re| re.is_match(&run.workflow_id)))
        .map(|run| RunListEntry {
            workflow_id: run.workflow_id.clone(),
            status: RunStatus::of(run),
            started_at: run.started_at,
            ended_at: run.ended_at,
            invocation_count: run.invocations.len(),
        })
        .collect();
    RunListing { runs }
}

/// Agent that shows up as a bottleneck most often
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BottleneckAgent {
    pub agent_name: String,
    pub occurrences: usize,
}

/// Aggregate view across every run in the snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub total_runs: usize,
    pub completed_runs: usize,
    pub in_progress_runs: usize,
    pub degraded_runs: usize,
    pub total_invocations: usize,
    /// Mean overhead over runs where overhead applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_overhead_percent: Option<f64>,
    pub runs_with_overhead: usize,
    pub already_parallelized_runs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_frequent_bottleneck: Option<BottleneckAgent>,
    pub conflicted_runs: usize,
    pub agents: Vec<AgentStats>,
    pub load: LoadStats,
    pub snapshot_digest: String,
}

/// Summarize every run in the snapshot
pub fn summarize(snapshot: &LogSnapshot, config: &AnalyzerConfig) -> SummaryReport {
    let mut completed_runs = 0;
    let mut degraded_runs = 0;
    let mut total_invocations = 0;
    let mut overhead_sum = 0.0;
    let mut runs_with_overhead = 0;
    let mut already_parallelized_runs = 0;
    let mut conflicted_runs = 0;
    let mut bottleneck_counts: BTreeMap<String, usize> = BTreeMap::new();

    for run in snapshot.runs() {
        let report = WorkflowReport::build(run, config, snapshot.digest());

        if report.status == RunStatus::Completed {
            completed_runs += 1;
        }
        if report.degraded {
            degraded_runs += 1;
        }
        if !report.conflicts.is_empty() {
            conflicted_runs += 1;
        }
        total_invocations += report.invocation_count;

        if let Some(overhead) = report.overhead.value() {
            overhead_sum += overhead.overhead_percent;
            runs_with_overhead += 1;
            if overhead.already_parallelized {
                already_parallelized_runs += 1;
            }
        }

        if let Some(bottlenecks) = report.bottlenecks.value() {
            for b in &bottlenecks.bottlenecks {
                *bottleneck_counts.entry(b.agent_name.clone()).or_insert(0) += 1;
            }
        }
    }

    // BTreeMap iteration is alphabetical; strict `>` keeps the first name on ties
    let mut most_frequent_bottleneck: Option<BottleneckAgent> = None;
    for (agent_name, occurrences) in bottleneck_counts {
        if most_frequent_bottleneck
            .as_ref()
            .map_or(true, |best| occurrences > best.occurrences)
        {
            most_frequent_bottleneck = Some(BottleneckAgent {
                agent_name,
                occurrences,
            });
        }
    }

    SummaryReport {
        total_runs: snapshot.len(),
        completed_runs,
        in_progress_runs: snapshot.len() - completed_runs,
        degraded_runs,
        total_invocations,
        average_overhead_percent: (runs_with_overhead > 0)
            .then(|| overhead_sum / runs_with_overhead as f64),
        runs_with_overhead,
        already_parallelized_runs,
        most_frequent_bottleneck,
        conflicted_runs,
        agents: collect_agent_stats(snapshot.runs()),
        load: snapshot.stats().clone(),
        snapshot_digest: snapshot.digest().to_string(),
    }
}
