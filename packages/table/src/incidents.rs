//! Loads raw incident records.
//!
//! The incidents file carries one row per reported incident. Only the
//! `neighborhood`, `year`, `month` and `incident_type` columns are read;
//! any other columns (including a leading unnamed row index) are ignored.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use deid2_bench_schema_models::IncidentRecord;

use crate::TableError;
use crate::progress::{ProgressCallback, REPORT_EVERY};

/// Reads every incident record from a CSV source.
///
/// Rows are read strictly: a malformed row fails the whole load, since a
/// silently skipped incident would change the ground truth.
///
/// # Errors
///
/// Returns an error if the CSV is malformed or a required column is
/// missing or unparseable.
pub fn read_incidents(
    reader: impl Read,
    progress: &dyn ProgressCallback,
) -> Result<Vec<IncidentRecord>, TableError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut records = Vec::new();
    let mut pending = 0u64;

    for result in reader.deserialize::<IncidentRecord>() {
        records.push(result?);

        pending += 1;
        if pending == REPORT_EVERY {
            progress.inc(pending);
            pending = 0;
        }
    }

    progress.inc(pending);
    progress.finish(format!("Read {} incidents", records.len()));

    Ok(records)
}

/// Reads every incident record from a CSV file on disk.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or [`read_incidents`]
/// fails.
pub fn read_incidents_from_path(
    path: &Path,
    progress: &dyn ProgressCallback,
) -> Result<Vec<IncidentRecord>, TableError> {
    log::info!("Reading raw incident data from {}", path.display());
    progress.set_message(format!("Reading {}", path.display()));

    let file = File::open(path).map_err(|e| TableError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let records = read_incidents(file, progress)?;

    log::info!("Read {} incident records", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use crate::progress::NullProgress;

    use super::*;

    #[test]
    fn reads_required_columns_and_ignores_extras() {
        let csv = "\
,incident_id,neighborhood,year,month,incident_type,sim_resident
0,a1,3,2019,1,7,x
1,a2,3,2019,2, 12 ,y
";
        let records = read_incidents(csv.as_bytes(), &NullProgress).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].neighborhood, 3);
        assert_eq!(records[1].month, 2);
        assert_eq!(records[1].incident_type, "12");
    }

    #[test]
    fn fails_on_missing_required_column() {
        let csv = "neighborhood,year,incident_type\n3,2019,7\n";
        assert!(read_incidents(csv.as_bytes(), &NullProgress).is_err());
    }
}
