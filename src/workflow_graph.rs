//! Handoff graph construction for one workflow run
//!
//! Each invocation becomes a node; an edge runs from parent to child whenever
//! a record's `parent_invocation_id` names another invocation of the same run.
//!
//! ```text
//! design-simplicity-advisor (root)
//! └─ backend-architect
//!    ├─ security-auditor
//!    └─ unit-test-expert
//! ```
//!
//! # Storage
//!
//! Nodes live in an arena (`Vec<InvocationRecord>`) addressed by [`NodeId`];
//! parent references are resolved through an id → index map. Adjacency is kept
//! in both directions so path analysis can walk parents and children without
//! searching.
//!
//! # Validation
//!
//! Acyclicity is checked, not assumed. The check is an iterative depth-first
//! traversal with white/gray/black coloring, so deep handoff chains cannot
//! overflow the stack. A missing parent or a cycle marks the graph
//! [`GraphHealth::Degraded`]; the graph is still usable for per-invocation
//! metrics.
//!
//! # Example
//!
//! ```
//! use relevo::record::{InvocationRecord, InvocationStatus};
//! use relevo::workflow_graph::WorkflowGraph;
//!
//! let records = vec![
//!     InvocationRecord::new("i1", "wf", "planner", 10.0, None, InvocationStatus::Success, &[]),
//!     InvocationRecord::new("i2", "wf", "coder", 20.0, Some("i1"), InvocationStatus::Success, &[]),
//! ];
//!
//! let graph = WorkflowGraph::build("wf", &records);
//! assert_eq!(graph.node_count(), 2);
//! assert_eq!(graph.edge_count(), 1);
//! assert!(graph.is_dag());
//! ```

use crate::error::AnalysisError;
use crate::record::{InvocationRecord, WorkflowRun};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Index of an invocation in the graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

/// Structural state of a workflow graph
#[derive(Debug, Clone, PartialEq)]
pub enum GraphHealth {
    Healthy,
    /// Dangling references and/or cycles were found
    Degraded(Vec<AnalysisError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Directed handoff graph of one workflow run
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    workflow_id: String,

    /// Invocation arena indexed by `NodeId`
    nodes: Vec<InvocationRecord>,

    /// invocation_id → NodeId
    index: HashMap<String, NodeId>,

    children: Vec<Vec<NodeId>>,
    parents: Vec<Vec<NodeId>>,

    /// Invocations with no parent reference
    roots: Vec<NodeId>,

    health: GraphHealth,
}

impl WorkflowGraph {
    /// Build the graph for a loaded workflow run
    pub fn from_run(run: &WorkflowRun) -> Self {
        Self::build(&run.workflow_id, &run.invocations)
    }

    /// Build a graph from the invocations of one workflow run
    ///
    /// Duplicate invocation ids keep the first record. Records with a parent
    /// that is not part of `invocations` get no incoming edge and degrade the
    /// graph.
    pub fn build(workflow_id: &str, invocations: &[InvocationRecord]) -> Self {
        let mut nodes = Vec::with_capacity(invocations.len());
        let mut index = HashMap::with_capacity(invocations.len());

        // Phase 1: nodes
        for record in invocations {
            if index.contains_key(&record.invocation_id) {
                tracing::warn!(
                    "Duplicate invocation '{}' in workflow '{}' ignored",
                    record.invocation_id,
                    workflow_id
                );
                continue;
            }
            index.insert(record.invocation_id.clone(), NodeId(nodes.len()));
            nodes.push(record.clone());
        }

        let mut children = vec![Vec::new(); nodes.len()];
        let mut parents = vec![Vec::new(); nodes.len()];
        let mut roots = Vec::new();
        let mut problems = Vec::new();

        // Phase 2: parent → child edges
        for (idx, record) in nodes.iter().enumerate() {
            let child = NodeId(idx);
            let Some(parent_id) = record.parent_invocation_id.as_deref() else {
                roots.push(child);
                continue;
            };

            match index.get(parent_id) {
                Some(&parent) => {
                    children[parent.0].push(child);
                    parents[child.0].push(parent);
                }
                None => {
                    let err = AnalysisError::DanglingReference {
                        workflow_id: workflow_id.to_string(),
                        invocation_id: record.invocation_id.clone(),
                        parent_id: parent_id.to_string(),
                    };
                    tracing::warn!("{}", err);
                    problems.push(err);
                }
            }
        }

        // Deterministic adjacency order regardless of input order
        for list in children.iter_mut().chain(parents.iter_mut()) {
            list.sort_by(|a, b| nodes[a.0].invocation_id.cmp(&nodes[b.0].invocation_id));
        }
        roots.sort_by(|a, b| nodes[a.0].invocation_id.cmp(&nodes[b.0].invocation_id));

        let mut graph = Self {
            workflow_id: workflow_id.to_string(),
            nodes,
            index,
            children,
            parents,
            roots,
            health: GraphHealth::Healthy,
        };

        for node in graph.find_cycles() {
            let err = AnalysisError::CycleDetected {
                workflow_id: workflow_id.to_string(),
                invocation_id: graph.nodes[node.0].invocation_id.clone(),
            };
            tracing::warn!("{}", err);
            problems.push(err);
        }

        if !problems.is_empty() {
            graph.health = GraphHealth::Degraded(problems);
        }

        tracing::debug!(
            "Workflow '{}': {} nodes, {} edges, {} roots",
            workflow_id,
            graph.node_count(),
            graph.edge_count(),
            graph.roots.len()
        );

        graph
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.children.iter().map(Vec::len).sum()
    }

    /// Entry-point invocations, ordered by invocation id
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn health(&self) -> &GraphHealth {
        &self.health
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.health, GraphHealth::Degraded(_))
    }

    /// Structural problems found while building, empty when healthy
    pub fn problems(&self) -> &[AnalysisError] {
        match &self.health {
            GraphHealth::Healthy => &[],
            GraphHealth::Degraded(problems) => problems,
        }
    }

    /// Check that the parent links contain no cycle
    pub fn is_dag(&self) -> bool {
        !self
            .problems()
            .iter()
            .any(|p| matches!(p, AnalysisError::CycleDetected { .. }))
    }

    pub fn invocation(&self, node: NodeId) -> Option<&InvocationRecord> {
        self.nodes.get(node.0)
    }

    pub fn node_by_id(&self, invocation_id: &str) -> Option<NodeId> {
        self.index.get(invocation_id).copied()
    }

    /// All nodes with their invocation records, in arena order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &InvocationRecord)> {
        self.nodes.iter().enumerate().map(|(i, r)| (NodeId(i), r))
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.children.get(node.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parents(&self, node: NodeId) -> &[NodeId] {
        self.parents.get(node.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn duration(&self, node: NodeId) -> f64 {
        self.invocation(node).map_or(0.0, |r| r.duration_seconds)
    }

    /// Sum of all invocation durations
    pub fn total_duration(&self) -> f64 {
        self.nodes.iter().map(|r| r.duration_seconds).sum()
    }

    /// Every node reachable from `root`, including `root` itself
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            order.push(node);
            for &child in self.children(node).iter().rev() {
                if !visited.contains(&child) {
                    stack.push(child);
                }
            }
        }

        order
    }

    /// Whether `ancestor` reaches `node` through one or more handoffs
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<NodeId> = self.parents(node).to_vec();

        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if visited.insert(current) {
                stack.extend_from_slice(self.parents(current));
            }
        }

        false
    }

    /// Topological order (Kahn's algorithm), `None` if the graph has a cycle
    ///
    /// Among ready nodes the smallest invocation id goes first, so the order
    /// is deterministic.
    pub fn topological_order(&self) -> Option<Vec<NodeId>> {
        let mut in_degree: Vec<usize> = self.parents.iter().map(Vec::len).collect();
        let mut ready: BTreeSet<(&str, NodeId)> = self
            .nodes()
            .filter(|(node, _)| in_degree[node.0] == 0)
            .map(|(node, record)| (record.invocation_id.as_str(), node))
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(entry) = ready.pop_first() {
            let node = entry.1;
            order.push(node);
            for &child in self.children(node) {
                in_degree[child.0] -= 1;
                if in_degree[child.0] == 0 {
                    ready.insert((self.nodes[child.0].invocation_id.as_str(), child));
                }
            }
        }

        (order.len() == self.nodes.len()).then_some(order)
    }

    /// Iterative three-color DFS; returns the target of every back edge
    fn find_cycles(&self) -> Vec<NodeId> {
        let mut color = vec![Color::White; self.nodes.len()];
        let mut back_edge_targets = BTreeSet::new();

        let mut starts: Vec<NodeId> = (0..self.nodes.len()).map(NodeId).collect();
        starts.sort_by(|a, b| self.nodes[a.0].invocation_id.cmp(&self.nodes[b.0].invocation_id));

        for start in starts {
            if color[start.0] != Color::White {
                continue;
            }

            // (node, index of the next child to visit)
            let mut stack: Vec<(NodeId, usize)> = vec![(start, 0)];
            color[start.0] = Color::Gray;

            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                if let Some(&child) = self.children(node).get(next) {
                    frame.1 += 1;
                    match color[child.0] {
                        Color::White => {
                            color[child.0] = Color::Gray;
                            stack.push((child, 0));
                        }
                        Color::Gray => {
                            back_edge_targets.insert(child);
                        }
                        Color::Black => {}
                    }
                } else {
                    color[node.0] = Color::Black;
                    stack.pop();
                }
            }
        }

        back_edge_targets.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::InvocationStatus;

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

    #[test]
    fn test_empty_graph() {
        let graph = WorkflowGraph::build("wf", &[]);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.is_dag());
        assert_eq!(graph.topological_order(), Some(vec![]));
    }

    #[test]
    fn test_parent_child() {
        let graph = WorkflowGraph::build("wf", &[inv("a", None, 10.0), inv("b", Some("a"), 20.0)]);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.roots(), &[NodeId(0)]);
        assert_eq!(graph.children(NodeId(0)), &[NodeId(1)]);
        assert_eq!(graph.parents(NodeId(1)), &[NodeId(0)]);
        assert_eq!(*graph.health(), GraphHealth::Healthy);
    }

    #[test]
    fn test_child_before_parent_in_input() {
        let graph = WorkflowGraph::build("wf", &[inv("b", Some("a"), 20.0), inv("a", None, 10.0)]);

        assert_eq!(graph.edge_count(), 1);
        assert!(!graph.is_degraded());
        let a = graph.node_by_id("a").unwrap();
        let b = graph.node_by_id("b").unwrap();
        assert!(graph.is_ancestor(a, b));
        assert!(!graph.is_ancestor(b, a));
    }

    #[test]
    fn test_multiple_roots() {
        let graph = WorkflowGraph::build(
            "wf",
            &[inv("z", None, 1.0), inv("a", None, 1.0), inv("m", Some("a"), 1.0)],
        );
        let root_ids: Vec<&str> = graph
            .roots()
            .iter()
            .map(|&n| graph.invocation(n).unwrap().invocation_id.as_str())
            .collect();
        assert_eq!(root_ids, vec!["a", "z"]);
    }

    #[test]
    fn test_dangling_reference_degrades() {
        let graph = WorkflowGraph::build("wf", &[inv("a", None, 1.0), inv("b", Some("ghost"), 1.0)]);

        assert!(graph.is_degraded());
        assert!(graph.is_dag());
        assert_eq!(graph.edge_count(), 0);
        assert!(matches!(
            &graph.problems()[0],
            AnalysisError::DanglingReference { parent_id, .. } if parent_id == "ghost"
        ));
    }

    #[test]
    fn test_cycle_detected() {
        // a → b → c → a, plus an unrelated root
        let graph = WorkflowGraph::build(
            "wf",
            &[
                inv("a", Some("c"), 1.0),
                inv("b", Some("a"), 1.0),
                inv("c", Some("b"), 1.0),
                inv("r", None, 1.0),
            ],
        );

        assert!(graph.is_degraded());
        assert!(!graph.is_dag());
        assert!(graph.topological_order().is_none());
        assert_eq!(graph.problems().len(), 1);
    }

    #[test]
    fn test_self_parent_is_cycle() {
        let graph = WorkflowGraph::build("wf", &[inv("a", Some("a"), 1.0)]);
        assert!(!graph.is_dag());
    }

    #[test]
    fn test_deep_chain_no_stack_overflow() {
        let mut records = vec![inv("n00000", None, 1.0)];
        for i in 1..50_000 {
            let parent = format!("n{:05}", i - 1);
            records.push(inv(&format!("n{:05}", i), Some(&parent), 1.0));
        }
        let graph = WorkflowGraph::build("wf", &records);

        assert!(graph.is_dag());
        assert_eq!(graph.topological_order().unwrap().len(), 50_000);
        assert_eq!(graph.descendants(NodeId(0)).len(), 50_000);
    }

    #[test]
    fn test_topological_order_ties_by_id() {
        let graph = WorkflowGraph::build(
            "wf",
            &[inv("c", None, 1.0), inv("b", None, 1.0), inv("a", Some("c"), 1.0)],
        );
        let order: Vec<&str> = graph
            .topological_order()
            .unwrap()
            .into_iter()
            .map(|n| graph.invocation(n).unwrap().invocation_id.as_str())
            .collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let graph = WorkflowGraph::build("wf", &[inv("a", None, 1.0), inv("a", None, 99.0)]);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.total_duration(), 1.0);
    }
}
