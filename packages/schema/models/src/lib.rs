#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parameters schema and row key types for deid2 scoring.
//!
//! This crate defines the shapes shared across the whole harness: the
//! competition's `parameters.json` schema, the `(epsilon, neighborhood,
//! year, month)` key that indexes every count table, incident-type codes,
//! and the raw incident record that ground truth is aggregated from.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Names of the index columns, in the order every count table lists them.
pub const INDEX_COLUMNS: [&str; 4] = ["epsilon", "neighborhood", "year", "month"];

/// A differential-privacy budget value.
///
/// Wraps an `f64` with a total ordering so it can be used as part of a
/// sortable, hashable row key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epsilon(pub f64);

impl PartialEq for Epsilon {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Epsilon {}

impl PartialOrd for Epsilon {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Epsilon {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for Epsilon {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl std::fmt::Display for Epsilon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Epsilon {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Self)
            .ok_or_else(|| ParseKeyError::new("epsilon", s))
    }
}

/// Integer code identifying an incident type.
///
/// Column headers and raw incident records spell codes as text; both are
/// normalized through [`FromStr`] so that `"7"`, `" 7 "` and `"7.0"` all
/// refer to the same column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct IncidentTypeCode(pub u32);

impl std::fmt::Display for IncidentTypeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IncidentTypeCode {
    type Err = ParseKeyError;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if let Ok(code) = trimmed.parse::<u32>() {
            return Ok(Self(code));
        }

        // Integral float spelling, e.g. a column written out as "7.0".
        match trimmed.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&v) => {
                Ok(Self(v as u32))
            }
            _ => Err(ParseKeyError::new("incident_type", s)),
        }
    }
}

/// Error returned when an index or column value cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKeyError {
    /// Which key component was being parsed.
    pub field: &'static str,
    /// The offending text.
    pub value: String,
}

impl ParseKeyError {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

impl std::fmt::Display for ParseKeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {} value {:?}", self.field, self.value)
    }
}

impl std::error::Error for ParseKeyError {}

/// A `(neighborhood, year, month)` cell, independent of epsilon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellKey {
    /// Neighborhood code.
    pub neighborhood: u32,
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
}

/// The full row index of a count table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowKey {
    /// Privacy budget the row was produced under.
    pub epsilon: Epsilon,
    /// Neighborhood code.
    pub neighborhood: u32,
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
}

impl RowKey {
    /// Builds a row key from an epsilon and a cell.
    #[must_use]
    pub const fn new(epsilon: Epsilon, cell: CellKey) -> Self {
        Self {
            epsilon,
            neighborhood: cell.neighborhood,
            year: cell.year,
            month: cell.month,
        }
    }

    /// Returns the epsilon-independent part of this key.
    #[must_use]
    pub const fn cell(&self) -> CellKey {
        CellKey {
            neighborhood: self.neighborhood,
            year: self.year,
            month: self.month,
        }
    }
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.epsilon, self.neighborhood, self.year, self.month
        )
    }
}

/// A `(year, month)` reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
}

/// A neighborhood entry from the parameters schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborhoodDef {
    /// Code used in incident records and table indexes.
    pub code: u32,
    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,
}

/// An incident-type entry from the parameters schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentTypeDef {
    /// Code used as the table column header.
    pub code: IncidentTypeCode,
    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,
}

/// The `schema` section of `parameters.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametersSchema {
    /// Valid neighborhoods, in table order.
    pub neighborhood: Vec<NeighborhoodDef>,
    /// Valid periods, in table order.
    pub periods: Vec<Period>,
    /// Valid incident types, in column order.
    pub incident_type: Vec<IncidentTypeDef>,
}

/// One scoring run from `parameters.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Privacy budget for this run.
    pub epsilon: Epsilon,
}

/// The competition parameters file.
///
/// Read-only input shared by the ground-truth builder, the validator, and
/// the scorer. Keys not modelled here are ignored on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Enumerations that define the table shape.
    pub schema: ParametersSchema,
    /// Runs to evaluate, one per epsilon.
    pub runs: Vec<Run>,
}

impl Parameters {
    /// Returns the epsilon of every run, in file order.
    #[must_use]
    pub fn epsilons(&self) -> Vec<Epsilon> {
        self.runs.iter().map(|run| run.epsilon).collect()
    }

    /// Returns every neighborhood code, in file order.
    #[must_use]
    pub fn neighborhood_codes(&self) -> Vec<u32> {
        self.schema.neighborhood.iter().map(|n| n.code).collect()
    }

    /// Returns every incident-type code, in column order.
    #[must_use]
    pub fn incident_type_codes(&self) -> Vec<IncidentTypeCode> {
        self.schema.incident_type.iter().map(|t| t.code).collect()
    }

    /// Returns the `(neighborhood, year, month)` cells for one epsilon,
    /// neighborhood-major.
    #[must_use]
    pub fn cells(&self) -> Vec<CellKey> {
        self.schema
            .neighborhood
            .iter()
            .flat_map(|n| {
                self.schema.periods.iter().map(move |p| CellKey {
                    neighborhood: n.code,
                    year: p.year,
                    month: p.month,
                })
            })
            .collect()
    }
}

/// One raw incident, as read from the incidents file.
///
/// `incident_type` is kept as text; it is reconciled with the column codes
/// when ground truth is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRecord {
    /// Neighborhood code.
    pub neighborhood: u32,
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// Incident-type code as spelled in the source data.
    pub incident_type: String,
}

impl IncidentRecord {
    /// Returns the cell this incident falls into.
    #[must_use]
    pub const fn cell(&self) -> CellKey {
        CellKey {
            neighborhood: self.neighborhood,
            year: self.year,
            month: self.month,
        }
    }
}
