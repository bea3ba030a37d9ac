/// Workflow Graph Benchmarks
///
/// Target: <100ms to build and analyze a 1K-invocation run.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use relevo::config::ParallelismConfig;
use relevo::critical_path::find_critical_path;
use relevo::parallelism::find_parallel_candidates;
use relevo::record::{InvocationRecord, InvocationStatus};
use relevo::workflow_graph::WorkflowGraph;
use std::time::Duration;

fn create_invocation(index: usize, parent: Option<usize>) -> InvocationRecord {
    let parent_id = parent.map(|p| format!("inv-{:05}", p));
    let artifact = format!("src/module_{}.rs", index % 64);
    InvocationRecord::new(
        &format!("inv-{:05}", index),
        "bench",
        &format!("agent-{}", index % 8),
        1.0 + (index % 13) as f64,
        parent_id.as_deref(),
        InvocationStatus::Success,
        &[artifact.as_str()],
    )
}

fn linear_chain(n: usize) -> Vec<InvocationRecord> {
    (0..n)
        .map(|i| create_invocation(i, i.checked_sub(1)))
        .collect()
}

fn balanced_tree(n: usize) -> Vec<InvocationRecord> {
    (0..n)
        .map(|i| create_invocation(i, (i > 0).then(|| (i - 1) / 2)))
        .collect()
}

/// Benchmark: Graph construction (linear chain vs. balanced tree)
fn bench_graph_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_construction");
    group.measurement_time(Duration::from_secs(5));

    for size in [128, 1024] {
        group.throughput(Throughput::Elements(size as u64));

        let chain = linear_chain(size);
        group.bench_with_input(BenchmarkId::new("linear", size), &chain, |b, records| {
            b.iter(|| black_box(WorkflowGraph::build("bench", records)));
        });

        let tree = balanced_tree(size);
        group.bench_with_input(BenchmarkId::new("tree", size), &tree, |b, records| {
            b.iter(|| black_box(WorkflowGraph::build("bench", records)));
        });
    }

    group.finish();
}

/// Benchmark: Critical path on a prebuilt 1K graph
fn bench_critical_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("critical_path");
    group.measurement_time(Duration::from_secs(5));
    group.throughput(Throughput::Elements(1024));

    let chain = WorkflowGraph::build("bench", &linear_chain(1024));
    group.bench_function("linear_1k", |b| {
        b.iter(|| black_box(find_critical_path(&chain)));
    });

    let tree = WorkflowGraph::build("bench", &balanced_tree(1023));
    group.bench_function("tree_1k", |b| {
        b.iter(|| black_box(find_critical_path(&tree)));
    });

    group.finish();
}

/// Benchmark: Unrelated-pair search (linear in invocations plus unrelated pairs)
fn bench_parallel_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_candidates");
    group.measurement_time(Duration::from_secs(5));

    let config = ParallelismConfig::default();
    for size in [64, 256] {
        let graph = WorkflowGraph::build("bench", &balanced_tree(size));
        group.bench_with_input(BenchmarkId::new("tree", size), &graph, |b, graph| {
            b.iter(|| black_box(find_parallel_candidates(graph, &config)));
        });
    }

    let chain = WorkflowGraph::build("bench", &linear_chain(16_384));
    group.bench_function("linear_16k", |b| {
        b.iter(|| black_box(find_parallel_candidates(&chain, &config)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_graph_construction,
    bench_critical_path,
    bench_parallel_candidates
);
criterion_main!(benches);
