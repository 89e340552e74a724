//! CSV ingest and normalization.
//!
//! Turns the three input CSV files into in-memory tables:
//!
//! - series tables (`x` + named value columns) are read strictly: any bad cell
//!   fails the whole table, since a missing row would silently shrink the domain
//! - observation files (`x` + one value column) are read leniently: bad rows
//!   are skipped and reported, the rest are kept

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{ObservationPoint, SeriesColumn, SeriesTable};
use crate::error::MatchError;

/// Name of the coordinate column shared by all tables.
pub const COORDINATE_COLUMN: &str = "x";

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Observation ingest output: parsed points + skipped rows.
#[derive(Debug, Clone, Default)]
pub struct ObservationSet {
    pub points: Vec<ObservationPoint>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl ObservationSet {
    pub fn from_points(points: Vec<ObservationPoint>) -> Self {
        Self {
            rows_read: points.len(),
            points,
            row_errors: Vec::new(),
        }
    }
}

/// Load a series table (`x` + value columns) from a CSV file.
pub fn load_series_table(path: &Path, label: &str) -> Result<SeriesTable, MatchError> {
    let source = path.display().to_string();
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|e| MatchError::data_access(&source, format!("failed to read CSV headers: {e}")))?
        .clone();

    let (x_idx, value_cols) = split_header(&headers, &source)?;
    if value_cols.is_empty() {
        return Err(MatchError::config(format!("'{source}' has no value columns.")));
    }

    let mut x = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); value_cols.len()];

    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map_or(0, |p| p.line() as usize);
            MatchError::data_access(&source, format!("CSV parse error on line {line}: {e}"))
        })?;
        let line = record_line(&record);

        x.push(parse_cell(&record, x_idx, line).map_err(|e| MatchError::data_access(&source, e))?);
        for (slot, (col_idx, _)) in value_cols.iter().enumerate() {
            let v = parse_cell(&record, *col_idx, line).map_err(|e| MatchError::data_access(&source, e))?;
            values[slot].push(v);
        }
    }

    let columns = value_cols
        .into_iter()
        .zip(values)
        .map(|((_, name), vals)| SeriesColumn::new(name, vals))
        .collect();

    let table = SeriesTable::new(label, x, columns)?;
    log::debug!(
        "Loaded table '{label}' from {source}: {} rows x {} columns",
        table.len(),
        table.column_count()
    );
    Ok(table)
}

/// Load observation points (`x` + exactly one value column) from a CSV file.
pub fn load_observations(path: &Path) -> Result<ObservationSet, MatchError> {
    let source = path.display().to_string();
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|e| MatchError::data_access(&source, format!("failed to read CSV headers: {e}")))?
        .clone();

    let (x_idx, value_cols) = split_header(&headers, &source)?;
    let y_idx = match value_cols.as_slice() {
        [(idx, _)] => *idx,
        _ => {
            return Err(MatchError::config(format!(
                "'{source}' must have exactly one value column besides '{COORDINATE_COLUMN}', found {}.",
                value_cols.len()
            )));
        }
    };

    let mut out = ObservationSet::default();
    for result in reader.records() {
        out.rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                out.row_errors.push(RowError {
                    line: e.position().map_or(0, |p| p.line() as usize),
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        let line = record_line(&record);

        let parsed = parse_cell(&record, x_idx, line)
            .and_then(|x| parse_cell(&record, y_idx, line).map(|y| ObservationPoint { x, y }));
        match parsed {
            Ok(point) => out.points.push(point),
            Err(message) => out.row_errors.push(RowError { line, message }),
        }
    }

    for err in &out.row_errors {
        log::warn!("Skipping observation row {} of {source}: {}", err.line, err.message);
    }

    Ok(out)
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>, MatchError> {
    let file = File::open(path).map_err(|e| MatchError::data_access(path.display().to_string(), e.to_string()))?;
    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

/// Locate the coordinate column and list the value columns in header order.
fn split_header(headers: &StringRecord, source: &str) -> Result<(usize, Vec<(usize, String)>), MatchError> {
    let header_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect();

    let x_idx = *header_map.get(COORDINATE_COLUMN).ok_or_else(|| {
        MatchError::config(format!(
            "'{source}' is missing the '{COORDINATE_COLUMN}' coordinate column."
        ))
    })?;

    let value_cols = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != x_idx)
        .map(|(idx, name)| (idx, clean_header_name(name)))
        .collect();

    Ok((x_idx, value_cols))
}

fn clean_header_name(name: &str) -> String {
    // Excel and friends sometimes emit a UTF-8 BOM before the first header.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn normalize_header_name(name: &str) -> String {
    clean_header_name(name).to_ascii_lowercase()
}

/// Line on which `record` starts; quoted fields may span several lines.
fn record_line(record: &StringRecord) -> usize {
    record.position().map_or(0, |p| p.line() as usize)
}

fn parse_cell(record: &StringRecord, idx: usize, line: usize) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .ok_or_else(|| format!("line {line}: missing column {}", idx + 1))?;
    let v: f64 = raw
        .parse()
        .map_err(|_| format!("line {line}: '{raw}' is not a number"))?;
    if !v.is_finite() {
        return Err(format!("line {line}: non-finite value '{raw}'"));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_tmp(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ifit-ingest-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_series_table_with_bom_and_mixed_case_header() {
        let path = write_tmp("train.csv", "\u{feff}X,y1,y2\n1,10,1\n2,20,2\n3,30,3\n");
        let table = load_series_table(&path, "train").unwrap();
        assert_eq!(table.x(), &[1.0, 2.0, 3.0]);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.columns()[0].name, "y1");
        assert_eq!(table.columns()[1].values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn series_table_without_coordinate_is_config_error() {
        let path = write_tmp("noxs.csv", "t,y1\n1,2\n");
        let err = load_series_table(&path, "train").unwrap_err();
        assert!(matches!(err, MatchError::Configuration(_)));
    }

    #[test]
    fn repeated_value_header_is_config_error() {
        let path = write_tmp("repeated.csv", "x,a,a\n1,0,5\n2,0,5\n");
        let err = load_series_table(&path, "ideal").unwrap_err();
        assert!(matches!(err, MatchError::Configuration(_)));
    }

    #[test]
    fn bad_series_cell_fails_whole_table() {
        let path = write_tmp("bad.csv", "x,y1\n1,2\n2,oops\n");
        let err = load_series_table(&path, "train").unwrap_err();
        assert!(matches!(err, MatchError::DataAccess { .. }));
    }

    #[test]
    fn missing_file_is_data_access_error() {
        let err = load_series_table(Path::new("/definitely/not/here.csv"), "train").unwrap_err();
        assert!(matches!(err, MatchError::DataAccess { .. }));
    }

    #[test]
    fn observations_skip_bad_rows() {
        let path = write_tmp("test.csv", "x,y\n1,2\n2,\n3,4\nnan,1\n");
        let set = load_observations(&path).unwrap();
        assert_eq!(set.rows_read, 4);
        assert_eq!(set.points, vec![ObservationPoint { x: 1.0, y: 2.0 }, ObservationPoint { x: 3.0, y: 4.0 }]);
        assert_eq!(set.row_errors.len(), 2);
        assert_eq!(set.row_errors[0].line, 3);
    }

    #[test]
    fn row_errors_report_the_starting_line_after_multiline_records() {
        let path = write_tmp("multiline.csv", "x,y\n1,2\n3,\"4\n\"\nbad,5\n");
        let set = load_observations(&path).unwrap();
        assert_eq!(set.points.len(), 2);
        assert_eq!(set.row_errors.len(), 1);
        assert_eq!(set.row_errors[0].line, 5);
    }

    #[test]
    fn observations_need_exactly_one_value_column() {
        let path = write_tmp("wide.csv", "x,y,z\n1,2,3\n");
        let err = load_observations(&path).unwrap_err();
        assert!(matches!(err, MatchError::Configuration(_)));
    }
}
