//! Typed records for workflow lifecycle and agent invocation logs
//!
//! Two append-only JSONL streams feed the analyzer:
//!
//! ```text
//! workflow_events.jsonl                 agent_invocations.jsonl
//! ├─ {"event":"workflow_start", ...}    ├─ {"invocation_id":"i1", "parent_invocation_id":null, ...}
//! ├─ {"event":"agent_handoff", ...}     ├─ {"invocation_id":"i2", "parent_invocation_id":"i1", ...}
//! └─ {"event":"workflow_complete", ...} └─ ...
//! ```
//!
//! Every line decodes into exactly one [`LogRecord`] variant. Lifecycle events
//! are an internally tagged enum keyed on `event`, so an unrecognized event
//! name never produces a half-filled record.
//!
//! # Example
//!
//! ```
//! use relevo::record::{InvocationRecord, InvocationStatus};
//!
//! let record = InvocationRecord::new(
//!     "inv-2", "wf-1", "backend-architect", 132.8, Some("inv-1"),
//!     InvocationStatus::Success, &["src/api.rs"],
//! );
//!
//! assert!(!record.is_root());
//! assert_eq!(record.artifacts().count(), 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome status of a single agent invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    #[serde(alias = "ok", alias = "completed", alias = "succeeded")]
    Success,
    #[serde(alias = "failed", alias = "error")]
    Failure,
    #[serde(alias = "running", alias = "in-progress", alias = "pending")]
    InProgress,
}

/// Outcome payload of an invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub status: InvocationStatus,

    /// Artifact paths written by the invocation
    #[serde(default)]
    pub files_modified: Vec<String>,
}

/// One agent's execution record within a workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRecord {
    pub invocation_id: String,
    pub workflow_id: String,
    pub agent_name: String,

    /// Execution time in seconds, never negative
    pub duration_seconds: f64,

    /// Invocation that handed off to this one (`None` for entry points)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_invocation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    pub outcome: Outcome,
}

impl InvocationRecord {
    /// Create a record with no start timestamp
    pub fn new(
        invocation_id: &str,
        workflow_id: &str,
        agent_name: &str,
        duration_seconds: f64,
        parent_invocation_id: Option<&str>,
        status: InvocationStatus,
        files_modified: &[&str],
    ) -> Self {
        Self {
            invocation_id: invocation_id.to_string(),
            workflow_id: workflow_id.to_string(),
            agent_name: agent_name.to_string(),
            duration_seconds,
            parent_invocation_id: parent_invocation_id.map(str::to_string),
            started_at: None,
            outcome: Outcome {
                status,
                files_modified: files_modified.iter().map(|f| f.to_string()).collect(),
            },
        }
    }

    /// Check field invariants the JSON schema cannot express
    ///
    /// An empty `parent_invocation_id` is normalized to `None`.
    pub fn validated(mut self) -> Result<Self, String> {
        if self.invocation_id.trim().is_empty() {
            return Err("empty `invocation_id`".to_string());
        }
        if self.workflow_id.trim().is_empty() {
            return Err("empty `workflow_id`".to_string());
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds < 0.0 {
            return Err(format!(
                "invalid `duration_seconds` {} (must be finite and >= 0)",
                self.duration_seconds
            ));
        }
        if matches!(self.parent_invocation_id.as_deref(), Some(p) if p.trim().is_empty()) {
            self.parent_invocation_id = None;
        }
        Ok(self)
    }

    /// Check if this invocation is an entry point (no parent)
    pub fn is_root(&self) -> bool {
        self.parent_invocation_id.is_none()
    }

    /// Normalized, non-empty artifact paths touched by this invocation
    pub fn artifacts(&self) -> impl Iterator<Item = &str> {
        self.outcome
            .files_modified
            .iter()
            .map(|path| normalize_artifact(path))
            .filter(|path| !path.is_empty())
    }
}

/// Strip surrounding whitespace and leading `./` segments from an artifact path
pub fn normalize_artifact(path: &str) -> &str {
    let mut path = path.trim();
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path
}

/// Workflow lifecycle event, tagged by its `event` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    WorkflowStart {
        workflow_id: String,
        timestamp: DateTime<Utc>,
        task: Option<String>,
    },
    AgentHandoff {
        workflow_id: String,
        timestamp: DateTime<Utc>,
        from_agent: Option<String>,
        to_agent: Option<String>,
    },
    WorkflowComplete {
        workflow_id: String,
        timestamp: DateTime<Utc>,
        status: Option<String>,
    },
}

impl LifecycleEvent {
    /// Values of the `event` field this decoder understands
    pub const KINDS: [&'static str; 3] = ["workflow_start", "agent_handoff", "workflow_complete"];

    pub fn workflow_id(&self) -> &str {
        match self {
            LifecycleEvent::WorkflowStart { workflow_id, .. }
            | LifecycleEvent::AgentHandoff { workflow_id, .. }
            | LifecycleEvent::WorkflowComplete { workflow_id, .. } => workflow_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LifecycleEvent::WorkflowStart { timestamp, .. }
            | LifecycleEvent::AgentHandoff { timestamp, .. }
            | LifecycleEvent::WorkflowComplete { timestamp, .. } => *timestamp,
        }
    }

    /// Reject events that cannot be attributed to a run
    pub fn validated(self) -> Result<Self, String> {
        if self.workflow_id().trim().is_empty() {
            return Err("empty `workflow_id`".to_string());
        }
        Ok(self)
    }
}

/// A single decoded log line
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    Lifecycle(LifecycleEvent),
    Invocation(InvocationRecord),
}

impl LogRecord {
    pub fn workflow_id(&self) -> &str {
        match self {
            LogRecord::Lifecycle(event) => event.workflow_id(),
            LogRecord::Invocation(record) => &record.workflow_id,
        }
    }
}

/// Recorded handoff between two agents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Handoff {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_agent: Option<String>,
}

/// One workflow run assembled from lifecycle events and invocation records
///
/// Built once by the loader; analysis code only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRun {
    pub workflow_id: String,
    pub task: Option<String>,

    /// `workflow_start` timestamp, or the earliest lifecycle event when the
    /// start line is missing (see `start_inferred`)
    pub started_at: DateTime<Utc>,
    pub start_inferred: bool,

    /// `workflow_complete` timestamp; `None` while the run is in progress
    pub ended_at: Option<DateTime<Utc>>,
    pub completion_status: Option<String>,

    pub handoffs: Vec<Handoff>,
    pub invocations: Vec<InvocationRecord>,
}

impl WorkflowRun {
    /// Create an empty run first seen at `timestamp`
    pub fn new(workflow_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            task: None,
            started_at: timestamp,
            start_inferred: true,
            ended_at: None,
            completion_status: None,
            handoffs: Vec::new(),
            invocations: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Wall-clock duration in seconds (`end - start`), `None` while in progress
    pub fn wall_clock_seconds(&self) -> Option<f64> {
        let ended_at = self.ended_at?;
        let elapsed = ended_at.signed_duration_since(self.started_at);
        Some(match elapsed.num_microseconds() {
            Some(micros) => micros as f64 / 1_000_000.0,
            None => elapsed.num_milliseconds() as f64 / 1_000.0,
        })
    }

    /// Sum of invocation execution time in seconds
    pub fn agent_seconds(&self) -> f64 {
        self.invocations.iter().map(|i| i.duration_seconds).sum()
    }
}
