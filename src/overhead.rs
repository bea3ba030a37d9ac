//! Coordination overhead
//!
//! Overhead is the share of wall-clock time not spent inside any invocation:
//!
//! ```text
//! overhead% = (W - Σ durations) / W × 100
//! ```
//!
//! | overhead | band |
//! |---|---|
//! | < 15% | efficient |
//! | 15% – 30% | moderate |
//! | > 30% | needs attention |
//!
//! A negative value means invocations already overlapped in real time. It is
//! reported as-is and the run is flagged `already_parallelized`.

use crate::config::Thresholds;
use crate::error::{AnalysisError, Result};
use crate::workflow_graph::WorkflowGraph;
use serde::Serialize;

/// Overhead classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverheadBand {
    Efficient,
    Moderate,
    NeedsAttention,
}

impl OverheadBand {
    pub fn classify(overhead_percent: f64, thresholds: &Thresholds) -> Self {
        if overhead_percent < thresholds.efficient_below_percent {
            OverheadBand::Efficient
        } else if overhead_percent <= thresholds.attention_above_percent {
            OverheadBand::Moderate
        } else {
            OverheadBand::NeedsAttention
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OverheadBand::Efficient => "efficient",
            OverheadBand::Moderate => "moderate",
            OverheadBand::NeedsAttention => "needs attention",
        }
    }
}

/// Scalar timing statistics of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverheadMetric {
    pub wall_clock_seconds: f64,
    /// Σ invocation durations
    pub agent_seconds: f64,
    /// `wall_clock_seconds - agent_seconds`, may be negative
    pub overhead_seconds: f64,
    pub overhead_percent: f64,
    pub band: OverheadBand,
    pub already_parallelized: bool,
}

/// Compute coordination overhead for a run
///
/// # Errors
///
/// [`AnalysisError::InsufficientData`] when the run is still in progress,
/// its wall-clock duration is not positive, or it has no invocations.
pub fn compute_overhead(
    graph: &WorkflowGraph,
    wall_clock_seconds: Option<f64>,
    thresholds: &Thresholds,
) -> Result<OverheadMetric> {
    let insufficient = |reason: &str| AnalysisError::InsufficientData {
        workflow_id: graph.workflow_id().to_string(),
        reason: reason.to_string(),
    };

    let wall_clock = wall_clock_seconds.ok_or_else(|| insufficient("workflow still in progress"))?;
    if wall_clock <= 0.0 {
        return Err(insufficient("zero wall-clock duration"));
    }
    if graph.node_count() == 0 {
        return Err(insufficient("no invocations recorded"));
    }

    let agent_seconds = graph.total_duration();
    let overhead_percent = (wall_clock - agent_seconds) / wall_clock * 100.0;
    let already_parallelized = overhead_percent < 0.0;

    if already_parallelized {
        tracing::debug!(
            "Workflow '{}' agent time {:.1}s exceeds wall clock {:.1}s",
            graph.workflow_id(),
            agent_seconds,
            wall_clock
        );
    }

    Ok(OverheadMetric {
        wall_clock_seconds: wall_clock,
        agent_seconds,
        overhead_seconds: wall_clock - agent_seconds,
        overhead_percent,
        band: OverheadBand::classify(overhead_percent, thresholds),
        already_parallelized,
    })
}
