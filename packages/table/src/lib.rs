#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Count tables and their CSV representation.
//!
//! A [`CountTable`] is the in-memory form of every submission, submission
//! format, and ground-truth file: a row index of [`RowKey`]s, one column per
//! [`IncidentTypeCode`], and a dense row-major block of cell values. The
//! [`csv_io`] module reads and writes the on-disk layout and
//! [`incidents`] loads the raw incident records ground truth is built from.

pub mod csv_io;
pub mod incidents;
pub mod progress;

use std::collections::BTreeSet;

use deid2_bench_schema_models::{Epsilon, IncidentTypeCode, ParseKeyError, RowKey};
use thiserror::Error;

/// Errors that can occur while building, reading, or writing tables.
#[derive(Debug, Error)]
pub enum TableError {
    /// Opening or creating a file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The leading header columns are not the expected index columns.
    #[error("Expected index columns {expected:?}, found {found:?}")]
    MissingIndexColumns {
        /// Required index column names.
        expected: Vec<String>,
        /// Header row as read.
        found: Vec<String>,
    },

    /// A column header is not a valid incident-type code.
    #[error("Invalid column header: {0}")]
    InvalidColumn(#[from] ParseKeyError),

    /// The same incident-type code appears twice in the header.
    #[error("Duplicate incident type column {0}")]
    DuplicateColumn(IncidentTypeCode),

    /// A cell could not be parsed.
    #[error("Line {line}: invalid {column} value {value:?}: {message}")]
    InvalidCell {
        /// 1-based line number in the file.
        line: u64,
        /// Column header of the offending cell.
        column: String,
        /// Raw cell text.
        value: String,
        /// Parser message.
        message: String,
    },

    /// Index, columns, and values disagree on the table dimensions.
    #[error("Table shape mismatch: {rows} rows x {columns} columns but {values} values")]
    Shape {
        /// Number of index entries.
        rows: usize,
        /// Number of columns.
        columns: usize,
        /// Number of cell values supplied.
        values: usize,
    },
}

/// A dense table of counts indexed by `(epsilon, neighborhood, year, month)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CountTable<T> {
    index: Vec<RowKey>,
    columns: Vec<IncidentTypeCode>,
    values: Vec<T>,
}

impl<T> CountTable<T> {
    /// Builds a table from an index, a column list, and row-major values.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Shape`] if `values` does not hold exactly one
    /// cell per `(row, column)` pair.
    pub fn new(
        index: Vec<RowKey>,
        columns: Vec<IncidentTypeCode>,
        values: Vec<T>,
    ) -> Result<Self, TableError> {
        if index.len() * columns.len() != values.len() {
            return Err(TableError::Shape {
                rows: index.len(),
                columns: columns.len(),
                values: values.len(),
            });
        }

        Ok(Self {
            index,
            columns,
            values,
        })
    }

    /// Builds a table of the given shape with every cell set to `value`.
    #[must_use]
    pub fn filled(index: Vec<RowKey>, columns: Vec<IncidentTypeCode>, value: T) -> Self
    where
        T: Clone,
    {
        let values = vec![value; index.len() * columns.len()];
        Self {
            index,
            columns,
            values,
        }
    }

    /// Returns the row index.
    #[must_use]
    pub fn index(&self) -> &[RowKey] {
        &self.index
    }

    /// Returns the incident-type columns, in order.
    #[must_use]
    pub fn columns(&self) -> &[IncidentTypeCode] {
        &self.columns
    }

    /// Returns every cell, row-major.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    /// Number of incident-type columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Returns the cells of row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    #[must_use]
    pub fn row(&self, i: usize) -> &[T] {
        let n = self.n_cols();
        &self.values[i * n..(i + 1) * n]
    }

    /// Iterates over `(key, cells)` pairs in index order.
    pub fn rows(&self) -> impl Iterator<Item = (&RowKey, &[T])> {
        self.index
            .iter()
            .enumerate()
            .map(move |(i, key)| (key, self.row(i)))
    }

    /// Returns the distinct epsilons in the index, sorted ascending.
    #[must_use]
    pub fn epsilons(&self) -> Vec<Epsilon> {
        self.index
            .iter()
            .map(|key| key.epsilon)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns a table of the same shape with `f` applied to every cell.
    #[must_use]
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> CountTable<U> {
        CountTable {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values: self.values.iter().map(f).collect(),
        }
    }

    /// Returns `true` if both tables have the same index and columns, in
    /// the same order.
    #[must_use]
    pub fn same_shape<U>(&self, other: &CountTable<U>) -> bool {
        self.index == other.index && self.columns == other.columns
    }
}

impl<T: Copy + Into<f64>> CountTable<T> {
    /// Widens every cell to `f64` for scoring.
    #[must_use]
    pub fn to_f64(&self) -> CountTable<f64> {
        self.map(|v| (*v).into())
    }
}

#[cfg(test)]
mod tests {
    use deid2_bench_schema_models::CellKey;

    use super::*;

    fn key(epsilon: f64, neighborhood: u32) -> RowKey {
        RowKey::new(
            Epsilon(epsilon),
            CellKey {
                neighborhood,
                year: 2019,
                month: 1,
            },
        )
    }

    #[test]
    fn new_rejects_mismatched_value_count() {
        let result = CountTable::new(
            vec![key(1.0, 0), key(1.0, 1)],
            vec![IncidentTypeCode(1), IncidentTypeCode(2)],
            vec![0_i32; 3],
        );
        assert!(matches!(
            result,
            Err(TableError::Shape {
                rows: 2,
                columns: 2,
                values: 3
            })
        ));
    }

    #[test]
    fn rows_slice_row_major_values() {
        let table = CountTable::new(
            vec![key(1.0, 0), key(1.0, 1)],
            vec![IncidentTypeCode(1), IncidentTypeCode(2)],
            vec![1_i32, 2, 3, 4],
        )
        .unwrap();

        let rows: Vec<_> = table.rows().map(|(k, r)| (k.neighborhood, r.to_vec())).collect();
        assert_eq!(rows, vec![(0, vec![1, 2]), (1, vec![3, 4])]);
        assert_eq!(table.to_f64().row(1), &[3.0, 4.0]);
    }

    #[test]
    fn epsilons_are_sorted_and_distinct() {
        let table = CountTable::filled(
            vec![key(10.0, 0), key(1.0, 0), key(10.0, 1), key(2.0, 0)],
            vec![IncidentTypeCode(1)],
            0_i32,
        );
        assert_eq!(
            table.epsilons(),
            vec![Epsilon(1.0), Epsilon(2.0), Epsilon(10.0)]
        );
    }

    #[test]
    fn zero_column_table_has_empty_rows() {
        let table = CountTable::<i32>::filled(vec![key(1.0, 0)], Vec::new(), 0);
        assert!(table.row(0).is_empty());
    }
}
