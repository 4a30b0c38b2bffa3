//! Submission format checks.
//!
//! Every check runs independently and all failures are collected, so a
//! participant sees the full list of problems with a submission in one
//! pass rather than fixing them one at a time.

use deid2_bench_schema_models::{IncidentTypeCode, Parameters, RowKey};
use deid2_bench_table::CountTable;
use thiserror::Error;

use crate::submission_index;

/// A single problem found in a submission.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionIssue {
    /// The table does not have one row per index entry and one column per
    /// incident type.
    #[error("Expected shape ({expected_rows}, {expected_columns}), found ({rows}, {columns})")]
    Shape {
        /// Rows required by the parameters.
        expected_rows: usize,
        /// Columns required by the parameters.
        expected_columns: usize,
        /// Rows in the submission.
        rows: usize,
        /// Columns in the submission.
        columns: usize,
    },

    /// A row key is out of place.
    #[error("Row {position}: expected index {expected}, found {found}")]
    Index {
        /// 0-based row position of the first mismatch.
        position: usize,
        /// Key the parameters require at this position.
        expected: RowKey,
        /// Key found in the submission.
        found: RowKey,
    },

    /// Incident-type columns differ from the parameters.
    #[error("Expected incident type columns {expected:?}, found {found:?}")]
    Columns {
        /// Required column order.
        expected: Vec<IncidentTypeCode>,
        /// Column order in the submission.
        found: Vec<IncidentTypeCode>,
    },

    /// Cells that do not hold whole numbers.
    #[error("{count} count value(s) are not integers, first at {first} column {column}: {value}")]
    NonInteger {
        /// Number of offending cells.
        count: usize,
        /// Row of the first offending cell.
        first: RowKey,
        /// Column of the first offending cell.
        column: IncidentTypeCode,
        /// Value of the first offending cell.
        value: f64,
    },

    /// Cells that are NaN or infinite.
    #[error("{count} count value(s) are not finite (NaN or inf), first at {first} column {column}")]
    NonFinite {
        /// Number of offending cells.
        count: usize,
        /// Row of the first offending cell.
        first: RowKey,
        /// Column of the first offending cell.
        column: IncidentTypeCode,
    },

    /// Cells below zero.
    #[error("{count} count value(s) are negative, first at {first} column {column}: {value}")]
    Negative {
        /// Number of offending cells.
        count: usize,
        /// Row of the first offending cell.
        first: RowKey,
        /// Column of the first offending cell.
        column: IncidentTypeCode,
        /// Value of the first offending cell.
        value: f64,
    },
}

/// All issues found in one submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Issues in check order.
    pub issues: Vec<SubmissionIssue>,
}

impl ValidationReport {
    /// Returns `true` if no issues were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Checks a submission against the shape and value rules implied by the
/// parameters.
#[must_use]
pub fn validate_submission(submission: &CountTable<f64>, params: &Parameters) -> ValidationReport {
    let expected_index = submission_index(params);
    let expected_columns = params.incident_type_codes();
    let mut issues = Vec::new();

    if submission.n_rows() != expected_index.len() || submission.n_cols() != expected_columns.len()
    {
        issues.push(SubmissionIssue::Shape {
            expected_rows: expected_index.len(),
            expected_columns: expected_columns.len(),
            rows: submission.n_rows(),
            columns: submission.n_cols(),
        });
    }

    if let Some((position, (expected, found))) = expected_index
        .iter()
        .zip(submission.index())
        .enumerate()
        .find(|(_, (expected, found))| expected != found)
    {
        issues.push(SubmissionIssue::Index {
            position,
            expected: *expected,
            found: *found,
        });
    }

    if submission.columns() != expected_columns.as_slice() {
        issues.push(SubmissionIssue::Columns {
            expected: expected_columns,
            found: submission.columns().to_vec(),
        });
    }

    issues.extend(check_values(submission));

    if issues.is_empty() {
        log::info!("Submission passed all format checks");
    } else {
        log::warn!("Submission failed {} format check(s)", issues.len());
    }

    ValidationReport { issues }
}

/// Tally of cells failing one value rule, keeping the first offender.
#[derive(Default)]
struct Offenders {
    count: usize,
    first: Option<(RowKey, IncidentTypeCode, f64)>,
}

impl Offenders {
    fn record(&mut self, key: RowKey, column: IncidentTypeCode, value: f64) {
        self.count += 1;
        if self.first.is_none() {
            self.first = Some((key, column, value));
        }
    }
}

fn check_values(submission: &CountTable<f64>) -> Vec<SubmissionIssue> {
    let mut non_finite = Offenders::default();
    let mut negative = Offenders::default();
    let mut non_integer = Offenders::default();

    for (key, row) in submission.rows() {
        for (&column, &value) in submission.columns().iter().zip(row) {
            if !value.is_finite() {
                non_finite.record(*key, column, value);
                continue;
            }
            if value < 0.0 {
                negative.record(*key, column, value);
            }
            if value.fract() != 0.0 {
                non_integer.record(*key, column, value);
            }
        }
    }

    let mut issues = Vec::new();

    if let Some((first, column, value)) = non_integer.first {
        issues.push(SubmissionIssue::NonInteger {
            count: non_integer.count,
            first,
            column,
            value,
        });
    }
    if let Some((first, column, _)) = non_finite.first {
        issues.push(SubmissionIssue::NonFinite {
            count: non_finite.count,
            first,
            column,
        });
    }
    if let Some((first, column, value)) = negative.first {
        issues.push(SubmissionIssue::Negative {
            count: negative.count,
            first,
            column,
            value,
        });
    }

    issues
}
