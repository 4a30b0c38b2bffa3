#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Competition parameters and the submission shape they imply.
//!
//! Loads `parameters.json`, derives the canonical submission index (the
//! cross-product of epsilons, neighborhoods, and periods), and checks
//! submitted tables against it in [`validate`].

pub mod validate;

use std::collections::HashSet;
use std::hash::Hash;
use std::path::Path;

use deid2_bench_schema_models::{Parameters, RowKey};
use deid2_bench_table::CountTable;
use thiserror::Error;

/// Errors that can occur while loading parameters.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Reading the parameters file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The parameters file is not valid JSON for the schema.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An enumeration that defines the table shape is empty.
    #[error("Parameters enumerate no {0}")]
    Empty(&'static str),

    /// An enumeration lists the same entry twice.
    #[error("Parameters list duplicate {what}: {value}")]
    Duplicate {
        /// Which enumeration holds the duplicate.
        what: &'static str,
        /// The duplicated entry.
        value: String,
    },
}

/// Parses and checks a parameters document.
///
/// # Errors
///
/// Returns an error if the JSON does not match the schema, or any of the
/// runs, neighborhoods, periods, or incident types is empty or repeated.
pub fn parse_parameters(json: &str) -> Result<Parameters, SchemaError> {
    let params: Parameters = serde_json::from_str(json)?;

    check_enumeration("runs", &params.epsilons())?;
    check_enumeration("neighborhoods", &params.neighborhood_codes())?;
    check_enumeration("periods", &params.schema.periods)?;
    check_enumeration("incident types", &params.incident_type_codes())?;

    log::debug!(
        "Parameters: {} epsilons x {} neighborhoods x {} periods, {} incident types",
        params.runs.len(),
        params.schema.neighborhood.len(),
        params.schema.periods.len(),
        params.schema.incident_type.len(),
    );

    Ok(params)
}

/// Reads and parses a parameters file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or [`parse_parameters`]
/// fails.
pub fn load_parameters(path: &Path) -> Result<Parameters, SchemaError> {
    log::info!("Reading parameters from {}", path.display());
    let json = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_parameters(&json)
}

/// Returns the row index every submission must have, epsilon-major, then
/// neighborhood, then period.
#[must_use]
pub fn submission_index(params: &Parameters) -> Vec<RowKey> {
    let cells = params.cells();
    params
        .epsilons()
        .into_iter()
        .flat_map(|epsilon| cells.iter().map(move |cell| RowKey::new(epsilon, *cell)))
        .collect()
}

/// Builds an all-zero submission-format table for the given parameters.
#[must_use]
pub fn submission_format(params: &Parameters) -> CountTable<i32> {
    CountTable::filled(submission_index(params), params.incident_type_codes(), 0)
}

fn check_enumeration<T>(what: &'static str, items: &[T]) -> Result<(), SchemaError>
where
    T: Eq + Hash + std::fmt::Debug,
{
    if items.is_empty() {
        return Err(SchemaError::Empty(what));
    }

    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item) {
            return Err(SchemaError::Duplicate {
                what,
                value: format!("{item:?}"),
            });
        }
    }

    Ok(())
}
