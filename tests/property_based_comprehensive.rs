//! Property-based tests for the analysis core
//!
//! Core properties tested:
//! 1. Coordination overhead formula and the already-parallelized flag
//! 2. Bottleneck threshold boundary
//! 3. Critical path of a linear chain
//! 4. Order-independent, artifact-keyed conflict detection
//! 5. Line decoder robustness

use proptest::prelude::*;
use relevo::bottleneck::detect_bottlenecks;
use relevo::config::Thresholds;
use relevo::conflicts::detect_conflicts;
use relevo::critical_path::find_critical_path;
use relevo::loader::{decode_line, DecodedLine};
use relevo::overhead::compute_overhead;
use relevo::record::{InvocationRecord, InvocationStatus};
use relevo::workflow_graph::WorkflowGraph;
use std::collections::BTreeSet;

fn roots(durations: &[f64]) -> Vec<InvocationRecord> {
    durations
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            InvocationRecord::new(
                &format!("i{:03}", i),
                "wf",
                "agent",
                d,
                None,
                InvocationStatus::Success,
                &[],
            )
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_overhead_matches_formula(
        wall_clock in 0.1f64..10_000.0,
        durations in prop::collection::vec(0.0f64..5_000.0, 1..10),
    ) {
        let graph = WorkflowGraph::build("wf", &roots(&durations));
        let metric = compute_overhead(&graph, Some(wall_clock), &Thresholds::default()).unwrap();

        let agent_seconds: f64 = durations.iter().sum();
        let expected = (wall_clock - agent_seconds) / wall_clock * 100.0;

        prop_assert!((metric.overhead_percent - expected).abs() <= 1e-9 * expected.abs().max(1.0));
        prop_assert_eq!(metric.already_parallelized, agent_seconds > wall_clock);
        prop_assert_eq!(metric.overhead_percent < 0.0, agent_seconds > wall_clock);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_exact_threshold_never_flagged(k in 1u32..2_000) {
        // 2k / 5k is exactly 40%
        let wall_clock = 5.0 * k as f64;
        let graph = WorkflowGraph::build("wf", &roots(&[2.0 * k as f64]));
        let report = detect_bottlenecks(&graph, Some(wall_clock), 40.0).unwrap();
        prop_assert!(report.is_empty());
    }

    #[test]
    fn prop_above_threshold_flagged(k in 1u32..2_000) {
        let wall_clock = 5.0 * k as f64;
        let graph = WorkflowGraph::build("wf", &roots(&[wall_clock * 0.400001]));
        let report = detect_bottlenecks(&graph, Some(wall_clock), 40.0).unwrap();
        prop_assert_eq!(report.bottlenecks.len(), 1);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_linear_chain_path_is_whole_chain(
        durations in prop::collection::vec(0.001f64..1_000.0, 1..40),
    ) {
        let records: Vec<InvocationRecord> = durations
            .iter()
            .enumerate()
            .map(|(i, &d)| {
                let parent = (i > 0).then(|| format!("i{:03}", i - 1));
                InvocationRecord::new(
                    &format!("i{:03}", i),
                    "wf",
                    "agent",
                    d,
                    parent.as_deref(),
                    InvocationStatus::Success,
                    &[],
                )
            })
            .collect();
        let graph = WorkflowGraph::build("wf", &records);
        let path = find_critical_path(&graph).unwrap();

        let total: f64 = durations.iter().sum();
        prop_assert_eq!(path.steps.len(), durations.len());
        prop_assert!((path.total_duration - total).abs() < 1e-9 * total.max(1.0));
    }
}

fn touching_records() -> impl Strategy<Value = Vec<InvocationRecord>> {
    let files = prop::sample::subsequence(vec!["a.rs", "b.rs", "c.rs", "d.rs"], 0..4);
    prop::collection::vec((files, 0.0f64..10.0), 1..12).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (files, d))| {
                InvocationRecord::new(
                    &format!("i{:03}", i),
                    "wf",
                    &format!("agent{}", i % 3),
                    d,
                    None,
                    InvocationStatus::Success,
                    &files,
                )
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_conflicts_independent_of_record_order(
        (records, shuffled) in touching_records()
            .prop_flat_map(|records| (Just(records.clone()), Just(records).prop_shuffle())),
    ) {
        let a = detect_conflicts(&WorkflowGraph::build("wf", &records), None);
        let b = detect_conflicts(&WorkflowGraph::build("wf", &shuffled), None);
        prop_assert_eq!(&a, &b);

        for conflict in &a.conflicts {
            let expected: BTreeSet<&str> = records
                .iter()
                .filter(|r| r.artifacts().any(|f| f == conflict.artifact))
                .map(|r| r.invocation_id.as_str())
                .collect();
            let reported: BTreeSet<&str> =
                conflict.invocation_ids.iter().map(String::as_str).collect();
            prop_assert_eq!(reported, expected);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_decode_line_never_panics(line in ".{0,200}") {
        let _ = decode_line(&line);
    }

    #[test]
    fn prop_negative_duration_rejected(duration in -1.0e6f64..-0.001) {
        let line = format!(
            r#"{{"invocation_id":"i","workflow_id":"wf","agent_name":"a","duration_seconds":{},"outcome":{{"status":"success"}}}}"#,
            duration
        );
        prop_assert!(matches!(decode_line(&line), DecodedLine::Malformed(_)));
    }
}
