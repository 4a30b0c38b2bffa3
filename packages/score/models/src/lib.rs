#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Score report types.
//!
//! A [`ScoreReport`] is what the scorer hands to downstream reporting: the
//! overall score, one [`RowOutcome`] per submission row, and a
//! per-epsilon summary.

use deid2_bench_schema_models::{Epsilon, RowKey};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// How a score report is rendered for output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportFormat {
    /// Overall score and per-epsilon summary lines.
    #[default]
    Text,
    /// The full report, including every row, as pretty-printed JSON.
    Json,
}

/// Score for one submission row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowOutcome {
    /// Privacy budget of the row.
    pub epsilon: Epsilon,
    /// Neighborhood code.
    pub neighborhood: u32,
    /// Calendar year.
    pub year: i32,
    /// Calendar month.
    pub month: u32,
    /// Row score in `[0, 1]`.
    pub score: f64,
}

impl RowOutcome {
    /// Pairs a row key with its score.
    #[must_use]
    pub const fn new(key: &RowKey, score: f64) -> Self {
        Self {
            epsilon: key.epsilon,
            neighborhood: key.neighborhood,
            year: key.year,
            month: key.month,
            score,
        }
    }
}

/// Mean score over all rows sharing an epsilon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpsilonSummary {
    /// Privacy budget.
    pub epsilon: Epsilon,
    /// Mean row score scaled to `[0, 1000]`.
    pub score: f64,
    /// Number of rows with this epsilon.
    pub rows: usize,
}

/// Complete scoring outcome for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    /// Overall score in `[0, 1000]`.
    pub score: f64,
    /// Per-row scores, in submission order.
    pub details: Vec<RowOutcome>,
    /// Per-epsilon summaries, in order of first appearance.
    pub by_epsilon: Vec<EpsilonSummary>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn report_format_parses_from_cli_spelling() {
        assert_eq!(ReportFormat::from_str("json").unwrap(), ReportFormat::Json);
        assert_eq!(ReportFormat::from_str("text").unwrap(), ReportFormat::Text);
        assert!(ReportFormat::from_str("html").is_err());
        assert_eq!(ReportFormat::Json.as_ref(), "json");
    }

    #[test]
    fn report_serializes_with_detail_keys() {
        let report = ScoreReport {
            score: 500.0,
            details: vec![RowOutcome {
                epsilon: Epsilon(1.0),
                neighborhood: 3,
                year: 2019,
                month: 4,
                score: 0.5,
            }],
            by_epsilon: vec![EpsilonSummary {
                epsilon: Epsilon(1.0),
                score: 500.0,
                rows: 1,
            }],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["score"], 500.0);
        assert_eq!(json["details"][0]["neighborhood"], 3);
        assert_eq!(json["details"][0]["epsilon"], 1.0);
        assert_eq!(json["byEpsilon"][0]["rows"], 1);
    }
}
