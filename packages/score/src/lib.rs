#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scores a submission table against ground truth.
//!
//! Joins the metric's row scores back onto the submission's row keys to
//! build a [`ScoreReport`], and renders reports for output.

use deid2_bench_metric::{CountMatrix, Deid2Metric, MetricError};
use deid2_bench_schema_models::Epsilon;
use deid2_bench_score_models::{EpsilonSummary, ReportFormat, RowOutcome, ScoreReport};
use deid2_bench_table::CountTable;
use thiserror::Error;

/// Errors that can occur while scoring.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// Submission and ground truth are keyed differently.
    #[error(
        "Submission index or columns do not match ground truth; run `validate` on the submission for details"
    )]
    IndexMismatch,

    /// The metric rejected its inputs.
    #[error(transparent)]
    Metric(#[from] MetricError),

    /// Serializing the report failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Scores `submission` against `ground_truth`.
///
/// Both tables must have the same row index and columns in the same
/// order.
///
/// # Errors
///
/// Returns [`ScoreError::IndexMismatch`] if the tables are keyed
/// differently, or [`ScoreError::Metric`] if the metric rejects the
/// values.
pub fn score_submission(
    metric: &Deid2Metric,
    ground_truth: &CountTable<f64>,
    submission: &CountTable<f64>,
) -> Result<ScoreReport, ScoreError> {
    if !ground_truth.same_shape(submission) {
        return Err(ScoreError::IndexMismatch);
    }

    let (score, row_scores) =
        metric.score_with_rows(CountMatrix::from(ground_truth), CountMatrix::from(submission))?;
    log::info!("OVERALL SCORE: {score}");

    let details: Vec<RowOutcome> = submission
        .index()
        .iter()
        .zip(&row_scores)
        .map(|(key, &row_score)| RowOutcome::new(key, row_score))
        .collect();
    let by_epsilon = summarize_by_epsilon(&details);

    for summary in &by_epsilon {
        log::debug!(
            "epsilon={}: {} over {} rows",
            summary.epsilon,
            summary.score,
            summary.rows
        );
    }

    Ok(ScoreReport {
        score,
        details,
        by_epsilon,
    })
}

/// Renders a report in the requested format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(report: &ScoreReport, format: ReportFormat) -> Result<String, ScoreError> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Text => Ok(render_text(report)),
    }
}

fn render_text(report: &ScoreReport) -> String {
    let mut out = format!("OVERALL SCORE: {:.3}\n\n", report.score);
    out.push_str(&format!("{:<12} {:>10} {:>8}\n", "EPSILON", "SCORE", "ROWS"));
    out.push_str(&"-".repeat(32));
    out.push('\n');
    for summary in &report.by_epsilon {
        out.push_str(&format!(
            "{:<12} {:>10.3} {:>8}\n",
            summary.epsilon.to_string(),
            summary.score,
            summary.rows
        ));
    }
    out
}

/// Mean row score per epsilon, scaled like the overall score, in order of
/// first appearance.
fn summarize_by_epsilon(details: &[RowOutcome]) -> Vec<EpsilonSummary> {
    let mut sums: Vec<(Epsilon, f64, usize)> = Vec::new();

    for row in details {
        if let Some(entry) = sums.iter_mut().find(|(epsilon, _, _)| *epsilon == row.epsilon) {
            entry.1 += row.score;
            entry.2 += 1;
        } else {
            sums.push((row.epsilon, row.score, 1));
        }
    }

    sums.into_iter()
        .map(|(epsilon, total, rows)| {
            #[allow(clippy::cast_precision_loss)]
            let mean = total / rows as f64;
            EpsilonSummary {
                epsilon,
                score: mean * deid2_bench_metric::scorer::SCORE_SCALE,
                rows,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use deid2_bench_schema_models::{CellKey, IncidentTypeCode, RowKey};

    use super::*;

    fn table(values: Vec<f64>) -> CountTable<f64> {
        let index = [1.0, 10.0]
            .into_iter()
            .flat_map(|eps| {
                [1, 2].into_iter().map(move |month| {
                    RowKey::new(
                        Epsilon(eps),
                        CellKey {
                            neighborhood: 0,
                            year: 2019,
                            month,
                        },
                    )
                })
            })
            .collect();
        CountTable::new(index, vec![IncidentTypeCode(1), IncidentTypeCode(2)], values).unwrap()
    }

    #[test]
    fn report_rows_are_keyed_by_submission_index() {
        let truth = table(vec![10.0, 0.0, 5.0, 5.0, 10.0, 0.0, 5.0, 5.0]);
        let submission = table(vec![10.0, 0.0, 5.0, 5.0, 0.0, 800.0, 5.0, 5.0]);

        let report = score_submission(&Deid2Metric::default(), &truth, &submission).unwrap();

        assert_eq!(report.details.len(), 4);
        assert_eq!(report.details[2].epsilon, Epsilon(10.0));
        assert_eq!(report.details[2].month, 1);
        assert!(report.details[2].score.abs() < f64::EPSILON);
        assert!((report.score - 750.0).abs() < 1e-9);

        assert_eq!(report.by_epsilon.len(), 2);
        assert!((report.by_epsilon[0].score - 1000.0).abs() < 1e-9);
        assert!((report.by_epsilon[1].score - 500.0).abs() < 1e-9);
        assert_eq!(report.by_epsilon[1].rows, 2);
    }

    #[test]
    fn differently_keyed_tables_are_rejected() {
        let truth = table(vec![0.0; 8]);
        let other = CountTable::new(
            truth.index().to_vec(),
            vec![IncidentTypeCode(2), IncidentTypeCode(1)],
            vec![0.0; 8],
        )
        .unwrap();

        assert!(matches!(
            score_submission(&Deid2Metric::default(), &truth, &other),
            Err(ScoreError::IndexMismatch)
        ));
    }

    #[test]
    fn negative_submission_value_is_a_metric_error() {
        let truth = table(vec![0.0; 8]);
        let mut values = vec![0.0; 8];
        values[3] = -1.0;

        assert!(matches!(
            score_submission(&Deid2Metric::default(), &truth, &table(values)),
            Err(ScoreError::Metric(MetricError::NegativePrediction { .. }))
        ));
    }

    #[test]
    fn renders_text_and_json() {
        let truth = table(vec![1.0; 8]);
        let report = score_submission(&Deid2Metric::default(), &truth, &truth).unwrap();

        let text = render(&report, ReportFormat::Text).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "OVERALL SCORE: 1000.000");
        assert_eq!(lines[1], "");
        assert!(lines[2].starts_with("EPSILON"));
        assert_eq!(lines[3], "-".repeat(32));
        assert_eq!(lines.len(), 6);
        assert!(lines[5].starts_with("10 "));
        assert!(lines[5].contains("1000.000"));

        let json = render(&report, ReportFormat::Json).unwrap();
        let parsed: ScoreReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
