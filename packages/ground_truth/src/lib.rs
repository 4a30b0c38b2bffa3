#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ground-truth construction from raw incident records.
//!
//! Incidents are pivoted into counts per `(neighborhood, year, month)` and
//! incident type, reindexed onto the exact cells and columns of the
//! submission format, and the resulting block is repeated for every
//! epsilon. Ground truth does not depend on epsilon; epsilon only labels
//! which submission run a row is compared against.

use std::collections::HashMap;

use deid2_bench_schema_models::{
    CellKey, Epsilon, IncidentRecord, IncidentTypeCode, ParseKeyError,
};
use deid2_bench_table::{CountTable, TableError};
use thiserror::Error;

/// Errors that can occur while building ground truth.
#[derive(Debug, Error)]
pub enum GroundTruthError {
    /// The submission format has no rows to reindex onto.
    #[error("Submission format has no rows")]
    EmptySubmissionFormat,

    /// An epsilon slice lists different cells than the first slice.
    #[error(
        "Rows for epsilon {epsilon} do not match the (neighborhood, year, month) rows for epsilon {representative}"
    )]
    InconsistentEpsilonSlice {
        /// The slice that differs.
        epsilon: Epsilon,
        /// The slice used as the reference.
        representative: Epsilon,
    },

    /// An incident type in the data cannot be matched to the column codes.
    #[error("Incident type {value:?} cannot be reconciled with incident type column codes")]
    IncompatibleIncidentType {
        /// Incident type as spelled in the data.
        value: String,
        /// Parse failure.
        source: ParseKeyError,
    },

    /// A count does not fit the ground-truth cell type.
    #[error("Count {count} for {cell:?} incident type {code} overflows i32")]
    CountOverflow {
        /// Cell holding the count.
        cell: CellKey,
        /// Column holding the count.
        code: IncidentTypeCode,
        /// The count.
        count: u64,
    },

    /// Assembling the output table failed.
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Builds the ground-truth table for a submission format.
///
/// The output has exactly the submission format's row index and columns,
/// in the same order. Cells with no incidents are 0; incidents whose cell
/// or incident type is not part of the format are dropped.
///
/// # Errors
///
/// Returns an error if the submission format is empty or its epsilon
/// slices disagree, an incident type cannot be reconciled with the column
/// codes, or a count overflows `i32`.
pub fn get_ground_truth<T>(
    incidents: &[IncidentRecord],
    submission_format: &CountTable<T>,
) -> Result<CountTable<i32>, GroundTruthError> {
    log::debug!("... creating pivot table");
    let counts = pivot_counts(incidents)?;

    let cells = representative_cells(submission_format)?;
    let block = reindex(&counts, &cells, submission_format.columns())?;

    log::debug!("... duplicating the counts for every (neighborhood, year, month) to each epsilon");
    let n_cols = submission_format.n_cols();
    let positions: HashMap<CellKey, usize> =
        cells.iter().enumerate().map(|(i, cell)| (*cell, i)).collect();

    let mut values = Vec::with_capacity(submission_format.n_rows() * n_cols);
    for key in submission_format.index() {
        // Every slice was checked against `cells`, so the lookup always hits.
        if let Some(&i) = positions.get(&key.cell()) {
            values.extend_from_slice(&block[i * n_cols..(i + 1) * n_cols]);
        }
    }

    Ok(CountTable::new(
        submission_format.index().to_vec(),
        submission_format.columns().to_vec(),
        values,
    )?)
}

/// Counts incidents per `(cell, incident type)`, keeping only observed
/// combinations.
fn pivot_counts(
    incidents: &[IncidentRecord],
) -> Result<HashMap<(CellKey, IncidentTypeCode), u64>, GroundTruthError> {
    let mut counts = HashMap::new();

    for incident in incidents {
        let code: IncidentTypeCode = incident.incident_type.parse().map_err(|e| {
            GroundTruthError::IncompatibleIncidentType {
                value: incident.incident_type.clone(),
                source: e,
            }
        })?;
        *counts.entry((incident.cell(), code)).or_insert(0) += 1;
    }

    log::debug!(
        "Pivoted {} incidents into {} observed (cell, incident type) combinations",
        incidents.len(),
        counts.len()
    );

    Ok(counts)
}

/// Returns the cell sequence of the lowest epsilon's rows, after checking
/// that every other epsilon lists the same sequence.
fn representative_cells<T>(
    submission_format: &CountTable<T>,
) -> Result<Vec<CellKey>, GroundTruthError> {
    let epsilons = submission_format.epsilons();
    let Some(&representative) = epsilons.first() else {
        return Err(GroundTruthError::EmptySubmissionFormat);
    };

    let slice = |epsilon: Epsilon| -> Vec<CellKey> {
        submission_format
            .index()
            .iter()
            .filter(|key| key.epsilon == epsilon)
            .map(|key| key.cell())
            .collect()
    };

    let cells = slice(representative);
    for &epsilon in &epsilons[1..] {
        if slice(epsilon) != cells {
            return Err(GroundTruthError::InconsistentEpsilonSlice {
                epsilon,
                representative,
            });
        }
    }

    Ok(cells)
}

/// Lays the sparse counts out as a dense row-major block over exactly
/// `cells` x `columns`.
fn reindex(
    counts: &HashMap<(CellKey, IncidentTypeCode), u64>,
    cells: &[CellKey],
    columns: &[IncidentTypeCode],
) -> Result<Vec<i32>, GroundTruthError> {
    let cell_pos: HashMap<CellKey, usize> =
        cells.iter().enumerate().map(|(i, cell)| (*cell, i)).collect();
    let col_pos: HashMap<IncidentTypeCode, usize> =
        columns.iter().enumerate().map(|(j, code)| (*code, j)).collect();

    let mut block = vec![0_i32; cells.len() * columns.len()];
    let mut dropped = 0u64;

    for (&(cell, code), &count) in counts {
        let (Some(&i), Some(&j)) = (cell_pos.get(&cell), col_pos.get(&code)) else {
            dropped += count;
            continue;
        };
        block[i * columns.len() + j] =
            i32::try_from(count).map_err(|_| GroundTruthError::CountOverflow { cell, code, count })?;
    }

    if dropped > 0 {
        log::debug!("Dropped {dropped} incidents outside the submission format");
    }

    Ok(block)
}
