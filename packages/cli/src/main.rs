#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the deid2 benchmark toolchain.
//!
//! Builds ground truth from raw incidents, validates and scores
//! submissions, and writes blank submission formats. Input paths that are
//! not given on the command line default to files in the data directory
//! (`DEID2_DATA_DIR`, or `data` when unset).

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use deid2_bench_score_models::ReportFormat;

/// Environment variable naming the directory default inputs are read from.
const DATA_DIR_ENV: &str = "DEID2_DATA_DIR";

#[derive(Parser)]
#[command(name = "deid2_bench", about = "Deid2 benchmark ground truth and scoring tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate raw incident records into the ground-truth table
    GroundTruth {
        /// Raw incidents CSV (default: `<data dir>/incidents.csv`)
        #[arg(long)]
        incidents: Option<PathBuf>,
        /// Submission format CSV defining the required rows and columns
        /// (default: `<data dir>/submission_format.csv`)
        #[arg(long)]
        submission_format: Option<PathBuf>,
        /// Where to write the ground-truth CSV (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Score a submission against ground truth
    Score {
        /// Submission CSV
        submission: PathBuf,
        /// Ground-truth CSV
        ground_truth: PathBuf,
        /// Report format: "text" (summary) or "json" (every row)
        #[arg(long, default_value = "text")]
        format: ReportFormat,
        /// Shorthand for `--format json`
        #[arg(long, conflicts_with = "format")]
        json_report: bool,
        /// TOML file overriding metric weights and thresholds
        #[arg(long)]
        metric_config: Option<PathBuf>,
    },
    /// Check a submission's shape, index, columns, and values
    Validate {
        /// Submission CSV
        submission: PathBuf,
        /// Parameters JSON (default: `<data dir>/parameters.json`)
        #[arg(long)]
        parameters: Option<PathBuf>,
    },
    /// Write an all-zero submission format for the parameters
    Format {
        /// Parameters JSON (default: `<data dir>/parameters.json`)
        #[arg(long)]
        parameters: Option<PathBuf>,
        /// Where to write the submission format CSV (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Returns the data directory default inputs are resolved against.
fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV).map_or_else(|| PathBuf::from("data"), PathBuf::from)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = deid2_bench_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::GroundTruth {
            incidents,
            submission_format,
            output,
        } => {
            let incidents = incidents.unwrap_or_else(|| data_dir().join("incidents.csv"));
            let submission_format =
                submission_format.unwrap_or_else(|| data_dir().join("submission_format.csv"));
            commands::ground_truth(&multi, &incidents, &submission_format, output.as_deref())?;
        }
        Commands::Score {
            submission,
            ground_truth,
            format,
            json_report,
            metric_config,
        } => {
            let format = if json_report { ReportFormat::Json } else { format };
            commands::score(&submission, &ground_truth, format, metric_config.as_deref())?;
        }
        Commands::Validate {
            submission,
            parameters,
        } => {
            let parameters = parameters.unwrap_or_else(|| data_dir().join("parameters.json"));
            commands::validate(&submission, &parameters)?;
        }
        Commands::Format { parameters, output } => {
            let parameters = parameters.unwrap_or_else(|| data_dir().join("parameters.json"));
            commands::format(&parameters, output.as_deref())?;
        }
    }

    Ok(())
}
