//! Reads and writes count tables in the competition's CSV layout.
//!
//! The header is `epsilon,neighborhood,year,month` followed by one column
//! per incident-type code; every following line is one [`RowKey`] and its
//! counts.

use std::fmt::Display;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use deid2_bench_schema_models::{INDEX_COLUMNS, IncidentTypeCode, RowKey};

use crate::{CountTable, TableError};

/// Reads a count table from any CSV source.
///
/// # Errors
///
/// Returns an error if the header does not start with the index columns,
/// a column header is not an incident-type code, or any cell fails to
/// parse.
pub fn read_table<T>(reader: impl Read) -> Result<CountTable<T>, TableError>
where
    T: FromStr,
    T::Err: Display,
{
    let mut reader = csv::ReaderBuilder::new().from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    if headers.len() < INDEX_COLUMNS.len()
        || headers
            .iter()
            .zip(INDEX_COLUMNS)
            .any(|(found, expected)| found != expected)
    {
        return Err(TableError::MissingIndexColumns {
            expected: INDEX_COLUMNS.iter().map(ToString::to_string).collect(),
            found: headers,
        });
    }

    let mut columns: Vec<IncidentTypeCode> = Vec::with_capacity(headers.len() - INDEX_COLUMNS.len());
    for header in &headers[INDEX_COLUMNS.len()..] {
        let code: IncidentTypeCode = header.parse()?;
        if columns.contains(&code) {
            return Err(TableError::DuplicateColumn(code));
        }
        columns.push(code);
    }

    let mut index = Vec::new();
    let mut values = Vec::new();

    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, csv::Position::line);

        let cell = |i: usize| record.get(i).unwrap_or("").trim();

        let key = RowKey {
            epsilon: parse_cell(line, &headers[0], cell(0))?,
            neighborhood: parse_cell(line, &headers[1], cell(1))?,
            year: parse_cell(line, &headers[2], cell(2))?,
            month: parse_cell(line, &headers[3], cell(3))?,
        };
        index.push(key);

        for (i, header) in headers.iter().enumerate().skip(INDEX_COLUMNS.len()) {
            values.push(parse_cell(line, header, cell(i))?);
        }
    }

    log::debug!(
        "Read table with {} rows and {} incident type columns",
        index.len(),
        columns.len()
    );

    CountTable::new(index, columns, values)
}

/// Reads a count table from a CSV file on disk.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or [`read_table`] fails.
pub fn read_table_from_path<T>(path: &Path) -> Result<CountTable<T>, TableError>
where
    T: FromStr,
    T::Err: Display,
{
    log::info!("Reading table from {}", path.display());
    let file = File::open(path).map_err(|e| TableError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let table = read_table(file)?;
    log::info!("Read table with {} rows", table.n_rows());
    Ok(table)
}

/// Writes a count table as CSV.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn write_table<T: Display>(table: &CountTable<T>, writer: impl Write) -> Result<(), TableError> {
    let mut writer = csv::WriterBuilder::new().from_writer(writer);

    let header = INDEX_COLUMNS
        .iter()
        .map(ToString::to_string)
        .chain(table.columns().iter().map(ToString::to_string));
    writer.write_record(header)?;

    for (key, row) in table.rows() {
        let record = [
            key.epsilon.to_string(),
            key.neighborhood.to_string(),
            key.year.to_string(),
            key.month.to_string(),
        ]
        .into_iter()
        .chain(row.iter().map(ToString::to_string));
        writer.write_record(record)?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes a count table to a CSV file, replacing any existing file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or [`write_table`] fails.
pub fn write_table_to_path<T: Display>(
    table: &CountTable<T>,
    path: &Path,
) -> Result<(), TableError> {
    log::info!("Writing {} rows to {}", table.n_rows(), path.display());
    let file = File::create(path).map_err(|e| TableError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    write_table(table, file)
}

fn parse_cell<V>(line: u64, column: &str, value: &str) -> Result<V, TableError>
where
    V: FromStr,
    V::Err: Display,
{
    value.parse().map_err(|e: V::Err| TableError::InvalidCell {
        line,
        column: column.to_string(),
        value: value.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use deid2_bench_schema_models::Epsilon;

    use super::*;

    const SUBMISSION: &str = "\
epsilon,neighborhood,year,month,1,7,12
1.0,0,2019,1,3,0,1
1.0,0,2019,2,0,0,0
10.0,0,2019,1,2,5,0
10.0,0,2019,2,1,1,1
";

    #[test]
    fn reads_index_columns_and_values() {
        let table: CountTable<f64> = read_table(SUBMISSION.as_bytes()).unwrap();

        assert_eq!(table.n_rows(), 4);
        assert_eq!(
            table.columns(),
            &[IncidentTypeCode(1), IncidentTypeCode(7), IncidentTypeCode(12)]
        );
        assert_eq!(table.index()[2].epsilon, Epsilon(10.0));
        assert_eq!(table.index()[1].month, 2);
        assert_eq!(table.row(2), &[2.0, 5.0, 0.0]);
    }

    #[test]
    fn write_then_read_preserves_table() {
        let table: CountTable<i32> = read_table(SUBMISSION.as_bytes()).unwrap();
        let mut out = Vec::new();
        write_table(&table, &mut out).unwrap();

        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with("epsilon,neighborhood,year,month,1,7,12\n1,0,2019,1,3,0,1\n"));

        let reread: CountTable<i32> = read_table(out.as_slice()).unwrap();
        assert_eq!(reread, table);
    }

    #[test]
    fn rejects_missing_index_columns() {
        let err = read_table::<f64>("neighborhood,year,month,1\n0,2019,1,3\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, TableError::MissingIndexColumns { .. }));
    }

    #[test]
    fn rejects_non_code_and_duplicate_columns() {
        let err = read_table::<f64>("epsilon,neighborhood,year,month,theft\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, TableError::InvalidColumn(_)));

        let err = read_table::<f64>("epsilon,neighborhood,year,month,3,3.0\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, TableError::DuplicateColumn(IncidentTypeCode(3))));
    }

    #[test]
    fn reports_line_of_unparseable_cell() {
        let err = read_table::<i32>(
            "epsilon,neighborhood,year,month,1\n1,0,2019,1,2\n1,0,2019,2,x\n".as_bytes(),
        )
        .unwrap_err();
        match err {
            TableError::InvalidCell {
                line,
                column,
                value,
                ..
            } => {
                assert_eq!(line, 3);
                assert_eq!(column, "1");
                assert_eq!(value, "x");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
