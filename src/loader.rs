//! Record loader for workflow JSONL logs
//!
//! Reads the lifecycle and invocation streams, decodes each line on its own,
//! and merges the result into one [`WorkflowRun`] per workflow id.
//!
//! A corrupt line never blocks the load: it is logged with its location,
//! counted in [`LoadStats::skipped_lines`], and the next line is decoded.
//! Both streams go through the same decoder, so a record in the "wrong" file
//! is still picked up.
//!
//! # Example
//!
//! ```
//! use relevo::loader::LogSnapshot;
//!
//! # fn main() -> anyhow::Result<()> {
//! let lifecycle = r#"{"workflow_id":"wf-1","event":"workflow_start","timestamp":"2025-01-15T10:00:00Z"}
//! not json
//! {"workflow_id":"wf-1","event":"workflow_complete","timestamp":"2025-01-15T10:01:40Z"}"#;
//! let invocations = r#"{"invocation_id":"i1","workflow_id":"wf-1","agent_name":"planner","duration_seconds":60.0,"outcome":{"status":"success"}}"#;
//!
//! let snapshot = LogSnapshot::from_strs(lifecycle, invocations)?;
//! assert_eq!(snapshot.stats().skipped_lines, 1);
//! assert_eq!(snapshot.run("wf-1")?.wall_clock_seconds(), Some(100.0));
//! # Ok(())
//! # }
//! ```

use crate::error::AnalysisError;
use crate::record::{Handoff, InvocationRecord, LifecycleEvent, LogRecord, WorkflowRun};
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

/// How many skipped-line locations are kept for reporting
const MAX_SKIPPED_SAMPLES: usize = 20;

/// Result of decoding one line
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedLine {
    Record(LogRecord),
    /// Whitespace-only line
    Blank,
    /// Valid JSON object of a kind this decoder does not handle
    UnknownKind(String),
    /// Unparseable line or missing/invalid required field
    Malformed(String),
}

/// Decode a single JSONL line
///
/// Objects carrying an `event` field are lifecycle events; objects carrying
/// an `invocation_id` are invocation records. Anything else is an unknown
/// kind.
pub fn decode_line(line: &str) -> DecodedLine {
    let line = line.trim();
    if line.is_empty() {
        return DecodedLine::Blank;
    }

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return DecodedLine::Malformed(format!("invalid JSON: {}", e)),
    };

    let Some(object) = value.as_object() else {
        return DecodedLine::Malformed("expected a JSON object".to_string());
    };

    if let Some(kind) = object.get("event") {
        let Some(kind) = kind.as_str() else {
            return DecodedLine::Malformed("`event` must be a string".to_string());
        };
        if !LifecycleEvent::KINDS.contains(&kind) {
            return DecodedLine::UnknownKind(format!("event '{}'", kind));
        }
        return match serde_json::from_value::<LifecycleEvent>(value) {
            Ok(event) => match event.validated() {
                Ok(event) => DecodedLine::Record(LogRecord::Lifecycle(event)),
                Err(reason) => DecodedLine::Malformed(reason),
            },
            Err(e) => DecodedLine::Malformed(e.to_string()),
        };
    }

    if object.contains_key("invocation_id") {
        return match serde_json::from_value::<InvocationRecord>(value) {
            Ok(record) => match record.validated() {
                Ok(record) => DecodedLine::Record(LogRecord::Invocation(record)),
                Err(reason) => DecodedLine::Malformed(reason),
            },
            Err(e) => DecodedLine::Malformed(e.to_string()),
        };
    }

    DecodedLine::UnknownKind("record without `event` or `invocation_id`".to_string())
}

/// Location of a skipped line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedLine {
    pub source: String,
    pub line: usize,
    pub reason: String,
}

/// Statistics gathered while loading a log snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadStats {
    /// Non-blank lines read across all sources
    pub lines_read: usize,
    /// Lines decoded into a typed record
    pub records: usize,
    /// Malformed lines (parse failure or missing required field)
    pub skipped_lines: usize,
    /// Well-formed lines of an unrecognized kind
    pub unknown_kind_lines: usize,
    /// Invocations whose workflow id never appeared in a lifecycle event
    pub orphaned_invocations: usize,
    /// Invocations dropped because their id was already seen in the run
    pub duplicate_invocations: usize,
    /// First few skipped line locations
    pub skipped_samples: Vec<SkippedLine>,
}

impl LoadStats {
    fn absorb(&mut self, other: LoadStats) {
        self.lines_read += other.lines_read;
        self.records += other.records;
        self.skipped_lines += other.skipped_lines;
        self.unknown_kind_lines += other.unknown_kind_lines;
        self.orphaned_invocations += other.orphaned_invocations;
        self.duplicate_invocations += other.duplicate_invocations;
        for sample in other.skipped_samples {
            if self.skipped_samples.len() < MAX_SKIPPED_SAMPLES {
                self.skipped_samples.push(sample);
            }
        }
    }
}

/// Valid records decoded from one source, with the counts of what was not
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub records: Vec<LogRecord>,
    pub stats: LoadStats,
}

/// Decode every line of a JSONL stream
///
/// Only I/O failures are errors. Lines that are not valid UTF-8 are treated
/// as malformed.
pub fn read_records<R: BufRead>(mut reader: R, source_name: &str) -> Result<LoadedRecords> {
    let mut loaded = LoadedRecords::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("Failed to read {}", source_name))?;
        if n == 0 {
            break;
        }
        line_no += 1;

        let decoded = match std::str::from_utf8(&buf) {
            Ok(line) => decode_line(line),
            Err(_) => DecodedLine::Malformed("line is not valid UTF-8".to_string()),
        };

        let stats = &mut loaded.stats;
        match decoded {
            DecodedLine::Blank => continue,
            DecodedLine::Record(record) => {
                stats.lines_read += 1;
                stats.records += 1;
                loaded.records.push(record);
            }
            DecodedLine::UnknownKind(kind) => {
                stats.lines_read += 1;
                stats.unknown_kind_lines += 1;
                tracing::debug!("{}:{}: ignoring unknown record kind ({})", source_name, line_no, kind);
            }
            DecodedLine::Malformed(reason) => {
                stats.lines_read += 1;
                stats.skipped_lines += 1;
                let err = AnalysisError::RecordParse {
                    source_name: source_name.to_string(),
                    line: line_no,
                    reason: reason.clone(),
                };
                tracing::warn!("Skipping malformed line: {}", err);
                if stats.skipped_samples.len() < MAX_SKIPPED_SAMPLES {
                    stats.skipped_samples.push(SkippedLine {
                        source: source_name.to_string(),
                        line: line_no,
                        reason,
                    });
                }
            }
        }
    }

    tracing::debug!(
        "{}: {} records, {} skipped, {} unknown",
        source_name,
        loaded.stats.records,
        loaded.stats.skipped_lines,
        loaded.stats.unknown_kind_lines
    );

    Ok(loaded)
}

/// Immutable, merged view of one load of both log files
#[derive(Debug, Clone)]
pub struct LogSnapshot {
    runs: BTreeMap<String, WorkflowRun>,
    stats: LoadStats,
    digest: String,
}

impl LogSnapshot {
    /// Load and merge the lifecycle and invocation log files
    ///
    /// # Errors
    ///
    /// Returns an error only if a file cannot be read.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(lifecycle: P, invocations: Q) -> Result<Self> {
        let lifecycle = lifecycle.as_ref();
        let invocations = invocations.as_ref();

        let lifecycle_bytes = std::fs::read(lifecycle)
            .with_context(|| format!("Failed to read lifecycle log {}", lifecycle.display()))?;
        let invocation_bytes = std::fs::read(invocations)
            .with_context(|| format!("Failed to read invocation log {}", invocations.display()))?;

        Self::from_sources(&[
            (lifecycle.display().to_string(), lifecycle_bytes.as_slice()),
            (invocations.display().to_string(), invocation_bytes.as_slice()),
        ])
    }

    /// Build a snapshot from in-memory JSONL text
    pub fn from_strs(lifecycle: &str, invocations: &str) -> Result<Self> {
        Self::from_sources(&[
            ("lifecycle".to_string(), lifecycle.as_bytes()),
            ("invocations".to_string(), invocations.as_bytes()),
        ])
    }

    fn from_sources(sources: &[(String, &[u8])]) -> Result<Self> {
        let mut hasher = Sha256::new();
        let mut stats = LoadStats::default();
        let mut records = Vec::new();

        for (name, bytes) in sources {
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);

            let loaded = read_records(BufReader::new(Cursor::new(*bytes)), name)?;
            records.extend(loaded.records);
            stats.absorb(loaded.stats);
        }

        let digest = hex::encode(hasher.finalize());
        Ok(Self::from_records(records, stats, digest))
    }

    /// Merge decoded records into workflow runs
    ///
    /// Lifecycle events create runs; invocation records attach to them. The
    /// result does not depend on the relative order of the two streams.
    pub fn from_records(records: Vec<LogRecord>, mut stats: LoadStats, digest: String) -> Self {
        let mut runs: BTreeMap<String, WorkflowRun> = BTreeMap::new();
        let mut saw_start: HashSet<String> = HashSet::new();
        let mut invocations = Vec::new();

        for record in records {
            let event = match record {
                LogRecord::Lifecycle(event) => event,
                LogRecord::Invocation(inv) => {
                    invocations.push(inv);
                    continue;
                }
            };

            let timestamp = event.timestamp();
            let run = runs
                .entry(event.workflow_id().to_string())
                .or_insert_with(|| WorkflowRun::new(event.workflow_id(), timestamp));

            // Earliest event is the fallback start until a workflow_start shows up
            if run.start_inferred && timestamp < run.started_at {
                run.started_at = timestamp;
            }

            match event {
                LifecycleEvent::WorkflowStart {
                    workflow_id,
                    timestamp,
                    task,
                } => {
                    if saw_start.insert(workflow_id) || timestamp < run.started_at {
                        run.started_at = timestamp;
                    }
                    run.start_inferred = false;
                    if run.task.is_none() {
                        run.task = task;
                    }
                }
                LifecycleEvent::AgentHandoff {
                    timestamp,
                    from_agent,
                    to_agent,
                    ..
                } => {
                    run.handoffs.push(Handoff {
                        timestamp,
                        from_agent,
                        to_agent,
                    });
                }
                LifecycleEvent::WorkflowComplete {
                    timestamp, status, ..
                } => {
                    if run.ended_at.map_or(true, |ended| timestamp > ended) {
                        run.ended_at = Some(timestamp);
                        run.completion_status = status;
                    }
                }
            }
        }

        for run in runs.values_mut() {
            run.handoffs.sort_by_key(|h| h.timestamp);
            if run.start_inferred {
                tracing::warn!(
                    "Workflow '{}' has no workflow_start event; using earliest event at {}",
                    run.workflow_id,
                    run.started_at.to_rfc3339()
                );
            }
        }

        let mut seen: HashSet<(String, String)> = HashSet::new();
        for inv in invocations {
            let Some(run) = runs.get_mut(&inv.workflow_id) else {
                stats.orphaned_invocations += 1;
                tracing::warn!(
                    "Invocation '{}' references workflow '{}' with no lifecycle events",
                    inv.invocation_id,
                    inv.workflow_id
                );
                continue;
            };

            if !seen.insert((inv.workflow_id.clone(), inv.invocation_id.clone())) {
                stats.duplicate_invocations += 1;
                tracing::warn!(
                    "Duplicate invocation '{}' in workflow '{}'; keeping the first record",
                    inv.invocation_id,
                    inv.workflow_id
                );
                continue;
            }

            run.invocations.push(inv);
        }

        tracing::debug!("Loaded {} workflow runs", runs.len());

        Self {
            runs,
            stats,
            digest,
        }
    }

    /// Look up one workflow run
    pub fn run(&self, workflow_id: &str) -> Result<&WorkflowRun, AnalysisError> {
        self.runs
            .get(workflow_id)
            .ok_or_else(|| AnalysisError::WorkflowNotFound(workflow_id.to_string()))
    }

    /// All runs, ordered by workflow id
    pub fn runs(&self) -> impl Iterator<Item = &WorkflowRun> {
        self.runs.values()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// Hex SHA-256 of the raw log bytes this snapshot was built from
    pub fn digest(&self) -> &str {
        &self.digest
    }
}
