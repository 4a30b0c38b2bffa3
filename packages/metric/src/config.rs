//! Metric weights and thresholds.
//!
//! [`MetricConfig::default`] holds the competition constants. Alternate
//! weightings can be loaded from TOML; any key left out keeps its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::MetricError;

/// Immutable configuration for [`crate::Deid2Metric`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricConfig {
    /// Minimum share of a row's total for a count to take part in the
    /// distribution comparison.
    pub threshold: f64,
    /// Penalty per incident type present in the submission but absent
    /// from ground truth (after thresholding).
    pub misleading_presence_penalty: f64,
    /// Flat penalty when the raw counts differ by more than
    /// `allowable_raw_bias` in total.
    pub bias_penalty: f64,
    /// Largest total absolute difference between raw rows that is not
    /// penalized.
    pub allowable_raw_bias: f64,
    /// Mass added to every bin before normalizing for the distance.
    pub epsilon_smoothing: f64,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            misleading_presence_penalty: 0.2,
            bias_penalty: 0.25,
            allowable_raw_bias: 500.0,
            epsilon_smoothing: 1e-9,
        }
    }
}

impl MetricConfig {
    /// Checks every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidConfig`] naming the first bad key.
    pub fn validate(&self) -> Result<(), MetricError> {
        let invalid = |field, value, reason| MetricError::InvalidConfig {
            field,
            value,
            reason,
        };

        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(invalid("threshold", self.threshold, "must be within [0, 1]"));
        }
        for (field, value) in [
            ("misleading_presence_penalty", self.misleading_presence_penalty),
            ("bias_penalty", self.bias_penalty),
            ("allowable_raw_bias", self.allowable_raw_bias),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, value, "must be finite and non-negative"));
            }
        }
        if !self.epsilon_smoothing.is_finite() || self.epsilon_smoothing <= 0.0 {
            return Err(invalid(
                "epsilon_smoothing",
                self.epsilon_smoothing,
                "must be finite and positive",
            ));
        }

        Ok(())
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed, has unknown keys, or a
    /// value is out of range.
    pub fn from_toml_str(toml: &str) -> Result<Self, MetricError> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or
    /// [`Self::from_toml_str`] fails.
    pub fn load(path: &Path) -> Result<Self, MetricError> {
        log::info!("Reading metric config from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| MetricError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        MetricConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config = MetricConfig::from_toml_str("threshold = 0.1\nbias_penalty = 0.5\n").unwrap();
        assert!((config.threshold - 0.1).abs() < f64::EPSILON);
        assert!((config.bias_penalty - 0.5).abs() < f64::EPSILON);
        assert!((config.allowable_raw_bias - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            MetricConfig::from_toml_str("bias_penalty = -1.0"),
            Err(MetricError::InvalidConfig {
                field: "bias_penalty",
                ..
            })
        ));
        assert!(matches!(
            MetricConfig::from_toml_str("threshold = 1.5"),
            Err(MetricError::InvalidConfig {
                field: "threshold",
                ..
            })
        ));
        assert!(matches!(
            MetricConfig::from_toml_str("epsilon_smoothing = 0.0"),
            Err(MetricError::InvalidConfig {
                field: "epsilon_smoothing",
                ..
            })
        ));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            MetricConfig::from_toml_str("treshold = 0.1"),
            Err(MetricError::Toml(_))
        ));
    }
}
