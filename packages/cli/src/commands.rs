//! Subcommand implementations.

use std::path::Path;
use std::time::Instant;

use deid2_bench_cli_utils::{IndicatifProgress, MultiProgress};
use deid2_bench_metric::{Deid2Metric, MetricConfig};
use deid2_bench_score_models::ReportFormat;
use deid2_bench_table::CountTable;
use deid2_bench_table::csv_io::{read_table_from_path, write_table, write_table_to_path};
use deid2_bench_table::incidents::read_incidents_from_path;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub fn ground_truth(
    multi: &MultiProgress,
    incidents_path: &Path,
    submission_format_path: &Path,
    output: Option<&Path>,
) -> CommandResult {
    let start = Instant::now();

    let progress = IndicatifProgress::records_spinner(multi, "Reading incidents");
    let incidents = read_incidents_from_path(incidents_path, progress.as_ref())?;
    let submission_format: CountTable<f64> = read_table_from_path(submission_format_path)?;

    log::info!(
        "Building ground truth for {} rows x {} incident types",
        submission_format.n_rows(),
        submission_format.n_cols()
    );
    let ground_truth = deid2_bench_ground_truth::get_ground_truth(&incidents, &submission_format)?;

    write_output(&ground_truth, output)?;
    log::info!(
        "Ground truth complete in {:.1}s",
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

pub fn score(
    submission_path: &Path,
    ground_truth_path: &Path,
    format: ReportFormat,
    metric_config: Option<&Path>,
) -> CommandResult {
    let config = match metric_config {
        Some(path) => MetricConfig::load(path)?,
        None => MetricConfig::default(),
    };
    let metric = Deid2Metric::new(config)?;

    let ground_truth: CountTable<f64> = read_table_from_path(ground_truth_path)?;
    let submission: CountTable<f64> = read_table_from_path(submission_path)?;

    let start = Instant::now();
    let report = deid2_bench_score::score_submission(&metric, &ground_truth, &submission)?;
    log::debug!("Scored in {:.3}s", start.elapsed().as_secs_f64());

    print!("{}", deid2_bench_score::render(&report, format)?);
    if format == ReportFormat::Json {
        println!();
    }

    Ok(())
}

pub fn validate(submission_path: &Path, parameters_path: &Path) -> CommandResult {
    let params = deid2_bench_schema::load_parameters(parameters_path)?;
    let submission: CountTable<f64> = read_table_from_path(submission_path)?;

    let report = deid2_bench_schema::validate::validate_submission(&submission, &params);
    if report.is_valid() {
        println!("Submission is valid: {} rows", submission.n_rows());
        return Ok(());
    }

    for issue in &report.issues {
        println!("{issue}");
    }

    Err(format!("Submission has {} issue(s)", report.issues.len()).into())
}

pub fn format(parameters_path: &Path, output: Option<&Path>) -> CommandResult {
    let params = deid2_bench_schema::load_parameters(parameters_path)?;
    let table = deid2_bench_schema::submission_format(&params);

    log::info!(
        "Submission format has {} rows x {} incident types",
        table.n_rows(),
        table.n_cols()
    );
    write_output(&table, output)
}

fn write_output(table: &CountTable<i32>, output: Option<&Path>) -> CommandResult {
    match output {
        Some(path) => write_table_to_path(table, path)?,
        None => write_table(table, std::io::stdout().lock())?,
    }
    Ok(())
}
