//! CSV exports.
//!
//! - the mapped test results table (4 columns, spreadsheet friendly)
//! - series / observation tables, used when writing a synthetic dataset

use std::fs::File;
use std::path::Path;

use crate::domain::{LabeledPoint, ObservationPoint, SeriesTable};
use crate::error::MatchError;
use crate::io::ingest::COORDINATE_COLUMN;

/// File name of the mapped results table inside an output directory.
pub const MAPPED_RESULTS_FILE: &str = "mapped_test_results.csv";

/// Column names of the mapped results table (CSV header and database table).
pub const MAPPED_RESULTS_COLUMNS: [&str; 4] = ["X (test func)", "Y (test func)", "Delta Y (test func)", "No. of ideal func"];

/// Write labeled points as `x, y, residual, candidate`.
pub fn write_labeled_points_csv(path: &Path, points: &[LabeledPoint]) -> Result<(), MatchError> {
    let mut out = create(path)?;
    let err = |e: csv::Error| write_error(path, e);

    out.write_record(MAPPED_RESULTS_COLUMNS).map_err(err)?;
    for p in points {
        out.write_record([p.x.to_string(), p.y.to_string(), p.residual.to_string(), p.candidate.clone()])
            .map_err(err)?;
    }
    out.flush().map_err(|e| write_error(path, e))?;

    log::info!("Wrote {} mapped points to {}", points.len(), path.display());
    Ok(())
}

/// Write a series table as `x,<col1>,<col2>,...`.
pub fn write_series_csv(path: &Path, table: &SeriesTable) -> Result<(), MatchError> {
    let mut out = create(path)?;
    let err = |e: csv::Error| write_error(path, e);

    let header = std::iter::once(COORDINATE_COLUMN).chain(table.columns().iter().map(|c| c.name.as_str()));
    out.write_record(header).map_err(err)?;

    for (row, x) in table.x().iter().enumerate() {
        let values = table.columns().iter().map(|c| c.values[row].to_string());
        out.write_record(std::iter::once(x.to_string()).chain(values)).map_err(err)?;
    }
    out.flush().map_err(|e| write_error(path, e))?;
    Ok(())
}

/// Write observation points as `x,y`.
pub fn write_observations_csv(path: &Path, points: &[ObservationPoint]) -> Result<(), MatchError> {
    let mut out = create(path)?;
    let err = |e: csv::Error| write_error(path, e);

    out.write_record([COORDINATE_COLUMN, "y"]).map_err(err)?;
    for p in points {
        out.write_record([p.x.to_string(), p.y.to_string()]).map_err(err)?;
    }
    out.flush().map_err(|e| write_error(path, e))?;
    Ok(())
}

fn create(path: &Path) -> Result<csv::Writer<File>, MatchError> {
    csv::Writer::from_path(path)
        .map_err(|e| MatchError::data_access(path.display().to_string(), format!("failed to create file: {e}")))
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> MatchError {
    MatchError::data_access(path.display().to_string(), format!("write failed: {e}"))
}
