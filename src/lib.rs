//! Relevo - coordination analysis for multi-agent workflow logs
//!
//! This library reads two append-only JSON Lines logs, one of workflow
//! lifecycle events and one of agent invocations, rebuilds each run's handoff
//! graph and reports where time goes: coordination overhead, bottleneck
//! invocations, the critical path, pairs of invocations that could have run
//! concurrently, and artifacts written by more than one invocation.
//!
//! ```
//! use relevo::config::AnalyzerConfig;
//! use relevo::loader::LogSnapshot;
//! use relevo::report::analyze_workflow;
//!
//! # fn main() -> anyhow::Result<()> {
//! let events = concat!(
//!     r#"{"workflow_id":"wf","event":"workflow_start","timestamp":"2025-01-15T10:00:00Z"}"#, "\n",
//!     r#"{"workflow_id":"wf","event":"workflow_complete","timestamp":"2025-01-15T10:01:00Z"}"#, "\n",
//! );
//! let invocations = concat!(
//!     r#"{"invocation_id":"i1","workflow_id":"wf","agent_name":"coder","duration_seconds":45.0,"outcome":{"status":"success"}}"#, "\n",
//! );
//!
//! let snapshot = LogSnapshot::from_strs(events, invocations)?;
//! let report = analyze_workflow(&snapshot, "wf", &AnalyzerConfig::default())?;
//! assert_eq!(report.overhead.value().map(|o| o.overhead_percent), Some(25.0));
//! # Ok(())
//! # }
//! ```

pub mod bottleneck;
pub mod cli;
pub mod config;
pub mod conflicts;
pub mod critical_path;
pub mod error;
pub mod loader;
pub mod metric;
pub mod overhead;
pub mod parallelism;
pub mod record;
pub mod render;
pub mod report;
pub mod workflow_graph;
