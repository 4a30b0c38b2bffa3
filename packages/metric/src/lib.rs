#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The deid2 scoring metric.
//!
//! Each `(epsilon, neighborhood, year, month)` row of a submission is
//! compared with the matching ground-truth row. The row penalty is the
//! Jensen-Shannon distance between the thresholded count distributions,
//! plus a flat penalty per hallucinated incident type and a flat penalty
//! when the raw counts are too far apart. Row scores are `1 - penalty`
//! clipped to `[0, 1]`; the overall score is their mean scaled to
//! `[0, 1000]`.

pub mod config;
pub mod matrix;
pub mod scorer;

pub use config::MetricConfig;
pub use matrix::CountMatrix;
pub use scorer::{Deid2Metric, PenaltyComponents};

use thiserror::Error;

/// Errors that can occur while configuring or running the metric.
#[derive(Debug, Error)]
pub enum MetricError {
    /// The two matrices do not have the same dimensions.
    #[error(
        "Shape mismatch: actual is {actual_rows}x{actual_cols}, predicted is {predicted_rows}x{predicted_cols}"
    )]
    ShapeMismatch {
        /// Rows in the ground truth.
        actual_rows: usize,
        /// Columns in the ground truth.
        actual_cols: usize,
        /// Rows in the submission.
        predicted_rows: usize,
        /// Columns in the submission.
        predicted_cols: usize,
    },

    /// There are no rows to score.
    #[error("No rows to score")]
    EmptyInput,

    /// A predicted count is NaN or infinite.
    #[error("Predicted value at row {row}, column {column} is not finite: {value}")]
    NonFinitePrediction {
        /// 0-based row.
        row: usize,
        /// 0-based column.
        column: usize,
        /// The offending value.
        value: f64,
    },

    /// A predicted count is negative.
    #[error("Predicted value at row {row}, column {column} is negative: {value}")]
    NegativePrediction {
        /// 0-based row.
        row: usize,
        /// 0-based column.
        column: usize,
        /// The offending value.
        value: f64,
    },

    /// A flat buffer does not divide into the stated dimensions.
    #[error("{len} values cannot form a {rows}x{cols} matrix")]
    InvalidMatrix {
        /// Number of values supplied.
        len: usize,
        /// Requested rows.
        rows: usize,
        /// Requested columns.
        cols: usize,
    },

    /// A configuration value is out of range.
    #[error("Invalid metric config: {field} = {value} ({reason})")]
    InvalidConfig {
        /// Offending key.
        field: &'static str,
        /// Offending value.
        value: f64,
        /// What the value must satisfy.
        reason: &'static str,
    },

    /// The configuration file is not valid TOML for [`MetricConfig`].
    #[error("Failed to parse metric config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Reading the configuration file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
