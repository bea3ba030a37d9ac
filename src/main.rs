use anyhow::{Context, Result};
use clap::Parser;
use regex::Regex;
use relevo::cli::{Cli, Command};
use relevo::config::AnalyzerConfig;
use relevo::error::AnalysisError;
use relevo::loader::LogSnapshot;
use relevo::{render, report};
use std::io::Write;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status of `analyze` when the run's handoff graph is inconsistent
const EXIT_DEGRADED: u8 = 2;

/// Initialize tracing subscriber; RUST_LOG takes precedence over --debug
fn init_tracing(debug: bool) {
    let default_directive = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Merge config file, environment and command-line flags
fn resolve_config(args: &Cli) -> Result<AnalyzerConfig> {
    let mut config = AnalyzerConfig::discover(args.config.as_deref())?;

    // clap already folded RELEVO_* environment variables into these
    if let Some(path) = &args.lifecycle_log {
        config.logs.lifecycle = Some(path.clone());
    }
    if let Some(path) = &args.invocation_log {
        config.logs.invocations = Some(path.clone());
    }
    if let Some(mode) = args.parallel_mode {
        config.parallelism.mode = mode;
    }
    if let Some(threshold) = args.bottleneck_threshold {
        config.thresholds.bottleneck_percent = threshold;
    }

    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .context("Failed to write report")?;
    stdout.flush().context("Failed to write report")
}

fn run(args: Cli) -> Result<ExitCode> {
    let config = resolve_config(&args)?;

    let lifecycle = config.logs.lifecycle_or_default();
    let invocations = config.logs.invocations_or_default();
    tracing::debug!(
        "Reading {} and {}",
        lifecycle.display(),
        invocations.display()
    );
    let snapshot = LogSnapshot::load(&lifecycle, &invocations)?;

    match args.command.unwrap_or(Command::Summary) {
        Command::Analyze { workflow_id } => {
            let report = match report::analyze_workflow(&snapshot, &workflow_id, &config) {
                Ok(report) => report,
                Err(err @ AnalysisError::WorkflowNotFound(_)) => {
                    eprintln!("Error: {}", err);
                    return Ok(ExitCode::FAILURE);
                }
                Err(err) => return Err(err.into()),
            };
            emit(&render::render_report(&report, args.format)?)?;

            // Structural problems were already logged while building the graph
            if report.degraded {
                return Ok(ExitCode::from(EXIT_DEGRADED));
            }
        }
        Command::List { pattern } => {
            let pattern = pattern
                .as_deref()
                .map(Regex::new)
                .transpose()
                .context("Invalid --match pattern")?;
            let listing = report::list_runs(&snapshot, pattern.as_ref());
            emit(&render::render_listing(&listing, args.format)?)?;
        }
        Command::Summary => {
            let summary = report::summarize(&snapshot, &config);
            emit(&render::render_summary(&summary, args.format)?)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let args = Cli::parse();

    init_tracing(args.debug);

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
