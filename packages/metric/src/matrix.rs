//! Borrowed row-major view of a count table's cells.

use deid2_bench_table::CountTable;

use crate::MetricError;

/// A read-only `rows x cols` matrix of counts.
#[derive(Debug, Clone, Copy)]
pub struct CountMatrix<'a> {
    values: &'a [f64],
    rows: usize,
    cols: usize,
}

impl<'a> CountMatrix<'a> {
    /// Views a row-major buffer as a matrix.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidMatrix`] if `values` does not hold
    /// exactly `rows * cols` entries.
    pub fn new(values: &'a [f64], rows: usize, cols: usize) -> Result<Self, MetricError> {
        if rows * cols != values.len() {
            return Err(MetricError::InvalidMatrix {
                len: values.len(),
                rows,
                cols,
            });
        }
        Ok(Self { values, rows, cols })
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Returns row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    #[must_use]
    pub fn row(&self, i: usize) -> &'a [f64] {
        &self.values[i * self.cols..(i + 1) * self.cols]
    }

    pub(crate) const fn values(&self) -> &'a [f64] {
        self.values
    }
}

impl<'a> From<&'a CountTable<f64>> for CountMatrix<'a> {
    fn from(table: &'a CountTable<f64>) -> Self {
        Self {
            values: table.values(),
            rows: table.n_rows(),
            cols: table.n_cols(),
        }
    }
}
