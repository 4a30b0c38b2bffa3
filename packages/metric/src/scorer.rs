//! Row and overall scoring.

use std::f64::consts::LN_2;

use rayon::prelude::*;

use crate::{CountMatrix, MetricConfig, MetricError};

/// Scale applied to the mean row score.
pub const SCORE_SCALE: f64 = 1000.0;

/// The three penalty terms for one row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PenaltyComponents {
    /// Jensen-Shannon distance (base 2) between the thresholded rows.
    pub jsd: f64,
    /// `misleading_presence_penalty` times the number of hallucinated
    /// incident types.
    pub misleading_presence: f64,
    /// `bias_penalty` if the raw rows are too far apart, else 0.
    pub bias: f64,
}

impl PenaltyComponents {
    /// Sum of all terms. Not clipped.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.jsd + self.misleading_presence + self.bias
    }
}

/// Scores submissions against ground truth.
#[derive(Debug, Clone, Default)]
pub struct Deid2Metric {
    config: MetricConfig,
}

impl Deid2Metric {
    /// Creates a metric with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidConfig`] if a value is out of range.
    pub fn new(config: MetricConfig) -> Result<Self, MetricError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration in use.
    #[must_use]
    pub const fn config(&self) -> &MetricConfig {
        &self.config
    }

    /// Overall score in `[0, 1000]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrices differ in shape, have no rows, or
    /// `predicted` holds a non-finite or negative value. Nothing is scored
    /// in that case.
    pub fn score(
        &self,
        actual: CountMatrix<'_>,
        predicted: CountMatrix<'_>,
    ) -> Result<f64, MetricError> {
        self.score_with_rows(actual, predicted)
            .map(|(overall, _)| overall)
    }

    /// Overall score plus every row score, aligned with input row order.
    ///
    /// # Errors
    ///
    /// Same as [`Self::score`].
    pub fn score_with_rows(
        &self,
        actual: CountMatrix<'_>,
        predicted: CountMatrix<'_>,
    ) -> Result<(f64, Vec<f64>), MetricError> {
        check_inputs(actual, predicted)?;

        let rows: Vec<f64> = (0..actual.rows())
            .into_par_iter()
            .map(|i| self.score_row(actual.row(i), predicted.row(i)))
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let overall = rows.iter().sum::<f64>() / rows.len() as f64 * SCORE_SCALE;

        log::debug!("Scored {} rows, overall {overall}", rows.len());

        Ok((overall, rows))
    }

    /// Score for one row: `1 - penalty` clipped to `[0, 1]`. The penalty
    /// itself is [`Self::row_penalty`].
    #[must_use]
    pub fn score_row(&self, actual: &[f64], predicted: &[f64]) -> f64 {
        1.0 - self.row_penalty(actual, predicted)
    }

    /// Total penalty for one row, capped at 1.
    #[must_use]
    pub fn row_penalty(&self, actual: &[f64], predicted: &[f64]) -> f64 {
        self.penalty_components(actual, predicted)
            .total()
            .clamp(0.0, 1.0)
    }

    /// Penalty terms for one row.
    ///
    /// Identical rows short-circuit to all zeros. Otherwise both rows are
    /// thresholded, normalized, smoothed, and normalized again for the
    /// distance; the bias term uses the raw rows.
    #[must_use]
    pub fn penalty_components(&self, actual: &[f64], predicted: &[f64]) -> PenaltyComponents {
        if actual == predicted {
            return PenaltyComponents::default();
        }

        let gt = self.zero_below_threshold(actual);
        let dp = self.zero_below_threshold(predicted);

        let smooth = |row: &[f64]| -> Vec<f64> {
            row.iter().map(|v| v + self.config.epsilon_smoothing).collect()
        };
        let jsd = jensen_shannon_distance(&smooth(&normalize(&gt)), &smooth(&normalize(&dp)));

        let hallucinated = gt
            .iter()
            .zip(&dp)
            .filter(|&(&g, &d)| g == 0.0 && d > 0.0)
            .count();
        #[allow(clippy::cast_precision_loss)]
        let misleading_presence = hallucinated as f64 * self.config.misleading_presence_penalty;

        let raw_bias: f64 = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).abs())
            .sum();
        let bias = if raw_bias > self.config.allowable_raw_bias {
            self.config.bias_penalty
        } else {
            0.0
        };

        PenaltyComponents {
            jsd,
            misleading_presence,
            bias,
        }
    }

    /// Keeps the raw count wherever its share of the row total is at
    /// least the threshold, and zeroes the rest. An all-zero row stays
    /// all zero.
    #[must_use]
    pub fn zero_below_threshold(&self, row: &[f64]) -> Vec<f64> {
        normalize(row)
            .iter()
            .zip(row)
            .map(|(&freq, &count)| {
                if freq >= self.config.threshold {
                    count
                } else {
                    0.0
                }
            })
            .collect()
    }
}

fn check_inputs(actual: CountMatrix<'_>, predicted: CountMatrix<'_>) -> Result<(), MetricError> {
    if actual.rows() != predicted.rows() || actual.cols() != predicted.cols() {
        return Err(MetricError::ShapeMismatch {
            actual_rows: actual.rows(),
            actual_cols: actual.cols(),
            predicted_rows: predicted.rows(),
            predicted_cols: predicted.cols(),
        });
    }
    if actual.rows() == 0 {
        return Err(MetricError::EmptyInput);
    }

    let cols = predicted.cols().max(1);
    for (i, &value) in predicted.values().iter().enumerate() {
        if !value.is_finite() {
            return Err(MetricError::NonFinitePrediction {
                row: i / cols,
                column: i % cols,
                value,
            });
        }
        if value < 0.0 {
            return Err(MetricError::NegativePrediction {
                row: i / cols,
                column: i % cols,
                value,
            });
        }
    }

    Ok(())
}

/// Turns counts into frequencies; rows with nothing positive are returned
/// unchanged.
fn normalize(row: &[f64]) -> Vec<f64> {
    if row.iter().any(|&v| v > 0.0) {
        let total: f64 = row.iter().sum();
        row.iter().map(|v| v / total).collect()
    } else {
        row.to_vec()
    }
}

/// Jensen-Shannon distance with log base 2, so the result lies in
/// `[0, 1]`. Inputs are normalized here; they must have positive sums.
fn jensen_shannon_distance(p: &[f64], q: &[f64]) -> f64 {
    let p_total: f64 = p.iter().sum();
    let q_total: f64 = q.iter().sum();

    let divergence: f64 = p
        .iter()
        .zip(q)
        .map(|(&pi, &qi)| {
            let pi = pi / p_total;
            let qi = qi / q_total;
            let mi = 0.5 * (pi + qi);
            relative_entropy(pi, mi) + relative_entropy(qi, mi)
        })
        .sum::<f64>()
        / 2.0;

    // Rounding can leave a tiny negative divergence for near-equal inputs.
    (divergence / LN_2).max(0.0).sqrt().min(1.0)
}

fn relative_entropy(x: f64, y: f64) -> f64 {
    if x > 0.0 && y > 0.0 {
        x * (x / y).ln()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(values: &[f64], cols: usize) -> CountMatrix<'_> {
        CountMatrix::new(values, values.len() / cols, cols).unwrap()
    }

    #[test]
    fn identical_matrices_score_exactly_1000() {
        let values = [3.0, 0.0, 9.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 250.0, 4.0, 17.0];
        let m = matrix(&values, 3);
        let metric = Deid2Metric::default();

        let (overall, rows) = metric.score_with_rows(m, m).unwrap();
        assert!((overall - 1000.0).abs() < f64::EPSILON);
        assert!(rows.iter().all(|&s| (s - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn scores_stay_within_bounds() {
        let actual = [
            100.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 100.0, //
            5.0, 5.0, 5.0, 5.0, //
            0.0, 0.0, 0.0, 0.0, //
            900.0, 10.0, 0.0, 3.0,
        ];
        let predicted = [
            0.0, 100.0, 100.0, 100.0, //
            100.0, 100.0, 100.0, 0.0, //
            5.0, 6.0, 5.0, 5.0, //
            7.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 2000.0, 0.0,
        ];
        let metric = Deid2Metric::default();
        let (overall, rows) = metric
            .score_with_rows(matrix(&actual, 4), matrix(&predicted, 4))
            .unwrap();

        assert_eq!(rows.len(), 5);
        for score in &rows {
            assert!(score.is_finite());
            assert!((0.0..=1.0).contains(score), "row score {score} out of bounds");
        }
        assert!((0.0..=1000.0).contains(&overall));
        // Disjoint support plus three hallucinated types floors at zero.
        assert!(rows[1].abs() < f64::EPSILON);
    }

    #[test]
    fn differences_below_threshold_are_ignored() {
        let metric = Deid2Metric::default();
        let actual = [100.0, 100.0, 100.0, 100.0, 1.0];
        let predicted = [100.0, 100.0, 100.0, 100.0, 3.0];

        assert_eq!(metric.zero_below_threshold(&predicted), vec![100.0, 100.0, 100.0, 100.0, 0.0]);
        let components = metric.penalty_components(&actual, &predicted);
        assert_eq!(components, PenaltyComponents::default());
        assert!(
            (metric.score_row(&actual, &predicted) - metric.score_row(&actual, &actual)).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn threshold_keeps_raw_counts_not_frequencies() {
        let metric = Deid2Metric::default();
        assert_eq!(
            metric.zero_below_threshold(&[96.0, 4.0, 0.0]),
            vec![96.0, 0.0, 0.0]
        );
        assert_eq!(
            metric.zero_below_threshold(&[95.0, 5.0, 0.0]),
            vec![95.0, 5.0, 0.0]
        );
        assert_eq!(metric.zero_below_threshold(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn smoothing_applies_to_frequencies_not_counts() {
        let metric = Deid2Metric::default();
        let components = metric.penalty_components(&[10.0, 0.0], &[20.0, 0.0]);

        assert!(components.jsd == 0.0);
        assert_eq!(components, PenaltyComponents::default());
        assert!((metric.score_row(&[10.0, 0.0], &[20.0, 0.0]) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn hallucinated_type_adds_one_presence_penalty() {
        let metric = Deid2Metric::default();
        let actual = [100.0, 0.0, 0.0];
        let predicted = [100.0, 50.0, 0.0];

        let components = metric.penalty_components(&actual, &predicted);
        assert!((components.misleading_presence - 0.2).abs() < 1e-12);
        assert!(components.bias.abs() < f64::EPSILON);
        assert!(components.jsd > 0.0 && components.jsd < 1.0);

        let expected = (1.0 - components.jsd - 0.2).clamp(0.0, 1.0);
        assert!((metric.score_row(&actual, &predicted) - expected).abs() < 1e-12);
        assert!((metric.row_penalty(&actual, &predicted) - (1.0 - expected)).abs() < 1e-12);
    }

    #[test]
    fn bias_penalty_applies_only_above_allowance() {
        let metric = Deid2Metric::default();
        let actual = [1000.0, 0.0];

        let at_limit = metric.penalty_components(&actual, &[1500.0, 0.0]);
        assert!(at_limit.bias.abs() < f64::EPSILON);
        assert!(at_limit.misleading_presence.abs() < f64::EPSILON);

        let over_limit = metric.penalty_components(&actual, &[1501.0, 0.0]);
        assert!((over_limit.bias - 0.25).abs() < f64::EPSILON);
        assert!((over_limit.total() - at_limit.total() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn all_zero_ground_truth_row_stays_finite() {
        let metric = Deid2Metric::default();
        let components = metric.penalty_components(&[0.0, 0.0, 0.0], &[5.0, 0.0, 0.0]);

        assert!(components.jsd.is_finite());
        assert!((components.misleading_presence - 0.2).abs() < 1e-12);
    }

    #[test]
    fn row_scores_follow_input_order() {
        let actual = [10.0, 0.0, 0.0, 10.0, 10.0, 0.0];
        let predicted = [10.0, 0.0, 0.0, 0.0, 0.0, 700.0];
        let metric = Deid2Metric::default();

        let (overall, rows) = metric
            .score_with_rows(matrix(&actual, 3), matrix(&predicted, 3))
            .unwrap();
        assert!((rows[0] - 1.0).abs() < f64::EPSILON);
        assert!(rows[1].abs() < f64::EPSILON);
        assert!((metric.row_penalty(&actual[3..], &predicted[3..]) - 1.0).abs() < f64::EPSILON);
        assert!((overall - 500.0).abs() < 1e-9);
    }

    #[test]
    fn negative_prediction_is_rejected() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        let predicted = [1.0, 2.0, -3.0, 4.0];
        let err = Deid2Metric::default()
            .score(matrix(&actual, 2), matrix(&predicted, 2))
            .unwrap_err();
        assert!(matches!(
            err,
            MetricError::NegativePrediction {
                row: 1,
                column: 0,
                ..
            }
        ));
    }

    #[test]
    fn non_finite_prediction_is_rejected() {
        let actual = [1.0, 2.0];
        let predicted = [1.0, f64::NAN];
        assert!(matches!(
            Deid2Metric::default().score(matrix(&actual, 2), matrix(&predicted, 2)),
            Err(MetricError::NonFinitePrediction { row: 0, column: 1, .. })
        ));
    }

    #[test]
    fn mismatched_or_empty_inputs_are_rejected() {
        let metric = Deid2Metric::default();
        let a = [1.0, 2.0, 3.0, 4.0];
        assert!(matches!(
            metric.score(matrix(&a, 2), matrix(&a, 4)),
            Err(MetricError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            metric.score(matrix(&[], 2), matrix(&[], 2)),
            Err(MetricError::EmptyInput)
        ));
    }

    #[test]
    fn alternate_configurations_coexist() {
        let strict = Deid2Metric::new(MetricConfig {
            bias_penalty: 0.5,
            ..MetricConfig::default()
        })
        .unwrap();
        let standard = Deid2Metric::default();
        let actual = [1000.0, 0.0];
        let predicted = [1600.0, 0.0];

        let strict_score = strict.score_row(&actual, &predicted);
        let standard_score = standard.score_row(&actual, &predicted);
        assert!((standard_score - strict_score - 0.25).abs() < 1e-6);
        assert!((standard.config().bias_penalty - 0.25).abs() < f64::EPSILON);
    }
}
