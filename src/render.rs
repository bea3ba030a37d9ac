//! Text and JSON rendering of reports
//!
//! Text output is for people at a terminal, JSON output for tooling. Both are
//! deterministic: floats are printed with one decimal in text mode and every
//! list arrives already sorted from the reporting layer.

use crate::cli::OutputFormat;
use crate::metric::Metric;
use crate::report::{AgentStats, RunListing, SummaryReport, WorkflowReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Pretty-printed JSON with a trailing newline
pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

pub fn render_report(report: &WorkflowReport, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(report_to_text(report)),
        OutputFormat::Json => to_json(report),
    }
}

pub fn render_listing(listing: &RunListing, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(listing_to_text(listing)),
        OutputFormat::Json => to_json(listing),
    }
}

pub fn render_summary(summary: &SummaryReport, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(summary_to_text(summary)),
        OutputFormat::Json => to_json(summary),
    }
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn section(out: &mut String, title: &str) {
    out.push('\n');
    out.push_str(title);
    out.push('\n');
    out.push_str(&"─".repeat(title.chars().count()));
    out.push('\n');
}

/// Write the value with `f`, or the reason it does not apply
fn metric_section<T>(out: &mut String, metric: &Metric<T>, f: impl FnOnce(&mut String, &T)) {
    match metric {
        Metric::Applicable(value) => f(out, value),
        Metric::NotApplicable { reason } => {
            let _ = writeln!(out, "  n/a: {}", reason);
        }
    }
}

fn agent_table(out: &mut String, agents: &[AgentStats]) {
    if agents.is_empty() {
        out.push_str("  (no invocations)\n");
        return;
    }
    let width = agents
        .iter()
        .map(|a| a.agent_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("agent".len());
    let _ = writeln!(
        out,
        "  {:<width$}  {:>11}  {:>10}  {:>8}",
        "agent",
        "invocations",
        "seconds",
        "failures",
        width = width
    );
    for a in agents {
        let _ = writeln!(
            out,
            "  {:<width$}  {:>11}  {:>10.1}  {:>8}",
            a.agent_name,
            a.invocations,
            a.total_seconds,
            a.failures,
            width = width
        );
    }
}

/// Human-readable report of one workflow run
pub fn report_to_text(report: &WorkflowReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Workflow: {}", report.workflow_id);
    if let Some(task) = &report.task {
        let _ = writeln!(out, "Task: {}", task);
    }
    let _ = write!(out, "Status: {}", report.status.label());
    if report.degraded {
        out.push_str(" (degraded)");
    }
    out.push('\n');
    let _ = write!(out, "Started: {}", timestamp(&report.started_at));
    if let Some(ended) = &report.ended_at {
        let _ = write!(out, "  Ended: {}", timestamp(ended));
    }
    out.push('\n');
    match report.wall_clock_seconds {
        Some(w) => {
            let _ = writeln!(out, "Wall clock: {:.1}s", w);
        }
        None => out.push_str("Wall clock: unknown\n"),
    }
    let _ = writeln!(
        out,
        "Invocations: {} ({} success, {} failure, {} in progress)  Handoffs: {}",
        report.invocation_count,
        report.outcomes.success,
        report.outcomes.failure,
        report.outcomes.in_progress,
        report.handoff_count
    );

    section(&mut out, "Coordination Overhead");
    metric_section(&mut out, &report.overhead, |out, o| {
        let _ = writeln!(
            out,
            "  {:.1}% ({})  wall clock {:.1}s, agent time {:.1}s",
            o.overhead_percent,
            o.band.label(),
            o.wall_clock_seconds,
            o.agent_seconds
        );
        if o.already_parallelized {
            out.push_str("  agent time exceeds wall clock: invocations already overlap\n");
        }
    });

    section(&mut out, "Bottlenecks");
    metric_section(&mut out, &report.bottlenecks, |out, b| {
        if b.is_empty() {
            let _ = writeln!(out, "  none above {:.1}% of wall clock", b.threshold_percent);
        }
        for bottleneck in &b.bottlenecks {
            let _ = writeln!(
                out,
                "  [{}] {} ({}): {:.1}s, {:.1}% of wall clock",
                bottleneck.severity,
                bottleneck.agent_name,
                bottleneck.invocation_id,
                bottleneck.duration_seconds,
                bottleneck.percent_of_wall_clock
            );
        }
    });

    section(&mut out, "Critical Path");
    metric_section(&mut out, &report.critical_path, |out, cp| {
        let chain: Vec<String> = cp
            .steps
            .iter()
            .map(|s| format!("{} ({:.1}s)", s.agent_name, s.duration_seconds))
            .collect();
        let _ = writeln!(out, "  {}", chain.join(" → "));
        let _ = write!(
            out,
            "  total {:.1}s, {:.1}% of agent time",
            cp.total_duration, cp.percent_of_agent_time
        );
        if let Some(speedup) = cp.max_theoretical_speedup {
            let _ = write!(out, ", max speedup {:.1}x", speedup);
        }
        out.push('\n');
    });

    section(&mut out, "Parallelization Candidates");
    metric_section(&mut out, &report.parallelization, |out, p| {
        if p.candidates.is_empty() {
            out.push_str("  none\n");
        }
        for c in &p.candidates {
            let _ = write!(
                out,
                "  {} ({}) ∥ {} ({}): save {:.1}s to {:.1}s",
                c.first_agent,
                c.first_invocation,
                c.second_agent,
                c.second_invocation,
                c.estimated_savings.low_seconds,
                c.estimated_savings.high_seconds
            );
            if !c.artifact_disjoint {
                let _ = write!(out, ", shares {}", c.shared_artifacts.join(", "));
            }
            out.push('\n');
        }
        if p.omitted > 0 {
            let _ = writeln!(out, "  ... {} more", p.omitted);
        }
    });

    section(&mut out, "Artifact Conflicts");
    if report.conflicts.is_empty() {
        out.push_str("  none\n");
    }
    for c in &report.conflicts.conflicts {
        let _ = write!(
            out,
            "  [{}] {}: {} ({})",
            c.severity,
            c.artifact,
            c.invocation_ids.join(", "),
            c.agents.join(", ")
        );
        if c.same_agent {
            out.push_str(", same agent");
        }
        out.push('\n');
    }

    section(&mut out, "Agents");
    agent_table(&mut out, &report.agents);

    if !report.warnings.is_empty() {
        section(&mut out, "Warnings");
        for w in &report.warnings {
            let _ = writeln!(out, "  {}", w);
        }
    }

    let _ = writeln!(out, "\nSnapshot: {}", report.snapshot_digest);
    out
}

/// One line per run: id, start, end (`-` while in progress), status, size
pub fn listing_to_text(listing: &RunListing) -> String {
    let mut out = String::new();
    if listing.runs.is_empty() {
        out.push_str("No workflow runs found.\n");
        return out;
    }
    for run in &listing.runs {
        let ended = run
            .ended_at
            .as_ref()
            .map_or_else(|| "-".to_string(), timestamp);
        let _ = writeln!(
            out,
            "{}  {}  {}  {}  {} invocations",
            run.workflow_id,
            timestamp(&run.started_at),
            ended,
            run.status.label(),
            run.invocation_count
        );
    }
    out
}

pub fn summary_to_text(summary: &SummaryReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Runs: {} ({} completed, {} in progress, {} degraded)",
        summary.total_runs, summary.completed_runs, summary.in_progress_runs, summary.degraded_runs
    );
    let _ = writeln!(out, "Invocations: {}", summary.total_invocations);
    match summary.average_overhead_percent {
        Some(avg) => {
            let _ = writeln!(
                out,
                "Average overhead: {:.1}% over {} runs",
                avg, summary.runs_with_overhead
            );
        }
        None => out.push_str("Average overhead: n/a\n"),
    }
    if summary.already_parallelized_runs > 0 {
        let _ = writeln!(out, "Already parallelized: {} runs", summary.already_parallelized_runs);
    }
    if let Some(b) = &summary.most_frequent_bottleneck {
        let _ = writeln!(
            out,
            "Most frequent bottleneck: {} ({} runs)",
            b.agent_name, b.occurrences
        );
    }
    let _ = writeln!(out, "Runs with conflicts: {}", summary.conflicted_runs);

    section(&mut out, "Agents");
    agent_table(&mut out, &summary.agents);

    let load = &summary.load;
    section(&mut out, "Logs");
    let _ = writeln!(
        out,
        "  {} lines, {} records, {} skipped, {} unknown, {} orphaned, {} duplicate",
        load.lines_read,
        load.records,
        load.skipped_lines,
        load.unknown_kind_lines,
        load.orphaned_invocations,
        load.duplicate_invocations
    );
    for skipped in &load.skipped_samples {
        let _ = writeln!(out, "  {}:{}: {}", skipped.source, skipped.line, skipped.reason);
    }

    let _ = writeln!(out, "\nSnapshot: {}", summary.snapshot_digest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfig;
    use crate::loader::LogSnapshot;
    use crate::report::{analyze_workflow, list_runs, summarize};

    const EVENTS: &str = concat!(
        r#"{"workflow_id":"wf-1","event":"workflow_start","timestamp":"2025-01-15T10:00:00Z","task":"add login"}"#,
        "\n",
        r#"{"workflow_id":"wf-1","event":"workflow_complete","timestamp":"2025-01-15T10:01:40Z"}"#,
        "\n",
    );

    const INVOCATIONS: &str = concat!(
        r#"{"invocation_id":"i1","workflow_id":"wf-1","agent_name":"planner","duration_seconds":10.0,"outcome":{"status":"success","files_modified":["plan.md"]}}"#,
        "\n",
        r#"{"invocation_id":"i2","workflow_id":"wf-1","agent_name":"coder","duration_seconds":60.0,"parent_invocation_id":"i1","outcome":{"status":"success","files_modified":["plan.md"]}}"#,
        "\n",
    );

    fn snapshot() -> LogSnapshot {
        LogSnapshot::from_strs(EVENTS, INVOCATIONS).unwrap()
    }

    #[test]
    fn test_report_text_sections() {
        let snapshot = snapshot();
        let report = analyze_workflow(&snapshot, "wf-1", &AnalyzerConfig::default()).unwrap();
        let text = report_to_text(&report);

        assert!(text.contains("Workflow: wf-1"));
        assert!(text.contains("Task: add login"));
        assert!(text.contains("Wall clock: 100.0s"));
        assert!(text.contains("30.0% (moderate)"));
        assert!(text.contains("[HIGH] coder (i2): 60.0s, 60.0% of wall clock"));
        assert!(text.contains("planner (10.0s) → coder (60.0s)"));
        assert!(text.contains("[HIGH] plan.md: i1, i2"));
        assert!(text.contains(snapshot.digest()));
    }

    #[test]
    fn test_report_text_is_deterministic() {
        let config = AnalyzerConfig::default();
        let a = report_to_text(&analyze_workflow(&snapshot(), "wf-1", &config).unwrap());
        let b = report_to_text(&analyze_workflow(&snapshot(), "wf-1", &config).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_report_json_shape() {
        let snapshot = snapshot();
        let report = analyze_workflow(&snapshot, "wf-1", &AnalyzerConfig::default()).unwrap();
        let json = render_report(&report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["workflow_id"], "wf-1");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["overhead"]["status"], "applicable");
        assert_eq!(value["overhead"]["band"], "moderate");
        assert_eq!(value["parallelization"]["status"], "applicable");
        assert_eq!(value["conflicts"]["conflicts"][0]["severity"], "HIGH");
    }

    #[test]
    fn test_listing_text() {
        let listing = list_runs(&snapshot(), None);
        let text = listing_to_text(&listing);
        assert_eq!(
            text,
            "wf-1  2025-01-15T10:00:00Z  2025-01-15T10:01:40Z  completed  2 invocations\n"
        );

        let empty = RunListing { runs: Vec::new() };
        assert_eq!(listing_to_text(&empty), "No workflow runs found.\n");
    }

    #[test]
    fn test_listing_text_in_progress_has_no_end() {
        let events = concat!(
            r#"{"workflow_id":"wf-2","event":"workflow_start","timestamp":"2025-01-16T08:00:00Z"}"#,
            "\n",
        );
        let snapshot = LogSnapshot::from_strs(events, "").unwrap();
        let text = listing_to_text(&list_runs(&snapshot, None));

        assert_eq!(
            text,
            "wf-2  2025-01-16T08:00:00Z  -  in progress  0 invocations\n"
        );
    }

    #[test]
    fn test_summary_text() {
        let summary = summarize(&snapshot(), &AnalyzerConfig::default());
        let text = summary_to_text(&summary);

        assert!(text.contains("Runs: 1 (1 completed, 0 in progress, 0 degraded)"));
        assert!(text.contains("Average overhead: 30.0% over 1 runs"));
        assert!(text.contains("Most frequent bottleneck: coder (1 runs)"));
    }
}
