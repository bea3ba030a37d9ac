//! CLI argument parsing for Relevo

use crate::parallelism::ParallelMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "relevo")]
#[command(version)]
#[command(
    about = "Coordination analysis for multi-agent workflow logs",
    long_about = "Reads workflow lifecycle and agent invocation logs (JSON Lines) and reports \
                  coordination overhead, bottlenecks, the critical path, parallelization \
                  candidates and artifact conflicts. Without a subcommand, prints a summary \
                  across all runs."
)]
pub struct Cli {
    /// Workflow lifecycle log (JSON Lines)
    #[arg(
        long = "lifecycle-log",
        value_name = "PATH",
        env = "RELEVO_LIFECYCLE_LOG",
        global = true
    )]
    pub lifecycle_log: Option<PathBuf>,

    /// Agent invocation log (JSON Lines)
    #[arg(
        long = "invocation-log",
        value_name = "PATH",
        env = "RELEVO_INVOCATION_LOG",
        global = true
    )]
    pub invocation_log: Option<PathBuf>,

    /// Configuration file (default: ./relevo.toml if present)
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// How artifact overlap affects parallelization candidates
    #[arg(long = "parallel-mode", value_enum, global = true)]
    pub parallel_mode: Option<ParallelMode>,

    /// Share of wall-clock time above which an invocation is a bottleneck
    #[arg(long = "bottleneck-threshold", value_name = "PERCENT", global = true)]
    pub bottleneck_threshold: Option<f64>,

    /// Enable debug logging to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Analyze one workflow run
    Analyze {
        /// Workflow run id
        workflow_id: String,
    },
    /// List workflow runs found in the logs
    List {
        /// Only list ids matching this regular expression
        #[arg(long = "match", value_name = "REGEX")]
        pattern: Option<String>,
    },
    /// Summarize all workflow runs (default)
    Summary,
}
