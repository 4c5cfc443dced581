//! Claim - Development Tools

use std::path::PathBuf;
use std::process::ExitCode;

use claim_core::config::EngineConfig;
use claim_tools::trace::{self, TraceOutcome};
use claim_tools::validate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "claim-tools")]
#[command(about = "Development tools for the territory claim engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a building catalog file
    Validate {
        /// Path to the RON catalog
        #[arg(default_value = "data/buildings.ron")]
        path: PathBuf,
    },
    /// Replay a recorded fix file through a capture session
    Trace {
        /// Path to the fixes (.json or .ron)
        path: PathBuf,
        /// Engine configuration in RON; defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => run_validate(&path),
        Commands::Trace { path, config, json } => run_trace(&path, config.as_deref(), json),
    }
}

fn run_validate(path: &std::path::Path) -> ExitCode {
    tracing::info!("Validating catalog: {}", path.display());
    let report = match validate::validate_catalog_file(path) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Validation failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    for warning in &report.warnings {
        tracing::warn!("{warning}");
    }
    for error in &report.errors {
        tracing::error!("{error}");
    }

    if report.is_valid() {
        tracing::info!(
            templates = report.templates,
            warnings = report.warnings.len(),
            "Validation passed"
        );
        ExitCode::SUCCESS
    } else {
        tracing::error!(errors = report.errors.len(), "Validation failed");
        ExitCode::FAILURE
    }
}

fn run_trace(path: &std::path::Path, config: Option<&std::path::Path>, json: bool) -> ExitCode {
    let config = match config.map(EngineConfig::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            tracing::error!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    let fixes = match trace::load_fixes(path) {
        Ok(fixes) => fixes,
        Err(e) => {
            tracing::error!("Failed to load fixes: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report = trace::replay(&fixes, &config);

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                tracing::error!("Failed to encode report: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("fixes:     {} ({} accepted)", report.total, report.accepted);
        for (reason, count) in &report.rejected {
            println!("  {reason}: {count}");
        }
        println!("walked:    {:.1} m", report.path_length_m);
        if let Some(gap) = report.closing_gap_m {
            println!("gap:       {gap:.1} m");
        }
        match &report.outcome {
            TraceOutcome::Committed { vertices, area_m2 } => {
                println!("committed: {vertices} vertices, {area_m2:.0} m²");
            }
            TraceOutcome::Rejected { reason } => println!("rejected:  {reason}"),
        }
    }

    match report.outcome {
        TraceOutcome::Committed { .. } => ExitCode::SUCCESS,
        TraceOutcome::Rejected { .. } => ExitCode::FAILURE,
    }
}
