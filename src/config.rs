//! Configuration for workflow log analysis
//!
//! Loaded from `relevo.toml`. Every section and field is optional; anything
//! left out falls back to the defaults below. Command-line flags and
//! environment variables override the file (see `main.rs`).
//!
//! # Example relevo.toml
//!
//! ```toml
//! [logs]
//! lifecycle = "logs/workflow_events.jsonl"
//! invocations = "logs/agent_invocations.jsonl"
//!
//! [thresholds]
//! bottleneck_percent = 40.0
//! efficient_below_percent = 15.0
//! attention_above_percent = 30.0
//!
//! [parallelism]
//! mode = "ranked"
//! speedup_floor = 0.5
//! max_candidates = 50
//! ```

use crate::parallelism::ParallelMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "relevo.toml";

pub const DEFAULT_LIFECYCLE_LOG: &str = "logs/workflow_events.jsonl";
pub const DEFAULT_INVOCATION_LOG: &str = "logs/agent_invocations.jsonl";

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    pub logs: LogPaths,
    pub thresholds: Thresholds,
    pub parallelism: ParallelismConfig,
}

/// Locations of the two input streams
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogPaths {
    pub lifecycle: Option<PathBuf>,
    pub invocations: Option<PathBuf>,
}

impl LogPaths {
    pub fn lifecycle_or_default(&self) -> PathBuf {
        self.lifecycle
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LIFECYCLE_LOG))
    }

    pub fn invocations_or_default(&self) -> PathBuf {
        self.invocations
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INVOCATION_LOG))
    }
}

/// Percent thresholds for bottlenecks and overhead bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    /// An invocation strictly above this share of wall-clock time is a bottleneck
    pub bottleneck_percent: f64,

    /// Overhead below this is "efficient"
    pub efficient_below_percent: f64,

    /// Overhead above this "needs attention"; in between is "moderate"
    pub attention_above_percent: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            bottleneck_percent: 40.0,
            efficient_below_percent: 15.0,
            attention_above_percent: 30.0,
        }
    }
}

/// Parallelization candidate ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParallelismConfig {
    pub mode: ParallelMode,

    /// Low end of the savings range as a fraction of the shorter invocation
    pub speedup_floor: f64,

    /// Candidates kept in a report (highest ranked first)
    pub max_candidates: usize,
}

impl Default for ParallelismConfig {
    fn default() -> Self {
        Self {
            mode: ParallelMode::Ranked,
            speedup_floor: 0.5,
            max_candidates: 50,
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Load `explicit` if given, else `relevo.toml` if present, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                tracing::debug!("Using {}", DEFAULT_CONFIG_FILE);
                Self::from_file(DEFAULT_CONFIG_FILE)
            }
            None => Ok(Self::default()),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let t = &self.thresholds;
        for (name, value) in [
            ("bottleneck_percent", t.bottleneck_percent),
            ("efficient_below_percent", t.efficient_below_percent),
            ("attention_above_percent", t.attention_above_percent),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("{} must be in [0, 100], got {}", name, value));
            }
        }

        if t.efficient_below_percent > t.attention_above_percent {
            return Err(format!(
                "efficient_below_percent ({}) must not exceed attention_above_percent ({})",
                t.efficient_below_percent, t.attention_above_percent
            ));
        }

        let p = &self.parallelism;
        if !(0.0..=1.0).contains(&p.speedup_floor) {
            return Err(format!(
                "speedup_floor must be in [0, 1], got {}",
                p.speedup_floor
            ));
        }

        if p.max_candidates == 0 {
            return Err("max_candidates must be >= 1".to_string());
        }

        Ok(())
    }
}
