//! Shared domain types.
//!
//! These types are kept small and (where useful) serializable so they can be:
//!
//! - used in-memory during fitting and mapping
//! - exported to CSV/JSON
//! - reloaded later for reporting

use std::collections::{HashMap, HashSet};
use std::f64::consts::SQRT_2;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// Expected number of value columns in the training and candidate tables.
///
/// The fitter and mapper take this as a parameter so the same selection rules
/// apply to pools of any size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableShape {
    pub training_columns: usize,
    pub candidate_columns: usize,
}

impl TableShape {
    pub fn new(training_columns: usize, candidate_columns: usize) -> Self {
        Self {
            training_columns,
            candidate_columns,
        }
    }
}

impl Default for TableShape {
    fn default() -> Self {
        Self::new(4, 50)
    }
}

/// One named y-column of a `SeriesTable`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesColumn {
    pub name: String,
    pub values: Vec<f64>,
}

impl SeriesColumn {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// A coordinate domain plus one or more named value columns indexed by it.
///
/// Invariants (checked by `SeriesTable::new`):
/// - coordinates are finite and unique
/// - column names are unique
/// - every column has one finite value per coordinate
#[derive(Debug, Clone)]
pub struct SeriesTable {
    label: String,
    x: Vec<f64>,
    columns: Vec<SeriesColumn>,
    index: HashMap<u64, usize>,
}

impl SeriesTable {
    pub fn new(label: impl Into<String>, x: Vec<f64>, columns: Vec<SeriesColumn>) -> Result<Self, MatchError> {
        let label = label.into();

        let mut index = HashMap::with_capacity(x.len());
        for (row, &xv) in x.iter().enumerate() {
            if !xv.is_finite() {
                return Err(MatchError::config(format!(
                    "Table '{label}' has a non-finite coordinate at row {}.",
                    row + 1
                )));
            }
            if index.insert(coord_key(xv), row).is_some() {
                return Err(MatchError::config(format!(
                    "Table '{label}' has duplicate coordinate x={xv}."
                )));
            }
        }

        let mut names = HashSet::with_capacity(columns.len());
        for col in &columns {
            if !names.insert(col.name.as_str()) {
                return Err(MatchError::config(format!(
                    "Table '{label}' has more than one column named '{}'.",
                    col.name
                )));
            }
            if col.values.len() != x.len() {
                return Err(MatchError::config(format!(
                    "Column '{}' of table '{label}' has {} values but the domain has {}.",
                    col.name,
                    col.values.len(),
                    x.len()
                )));
            }
            if let Some(row) = col.values.iter().position(|v| !v.is_finite()) {
                return Err(MatchError::config(format!(
                    "Column '{}' of table '{label}' has a non-finite value at row {}.",
                    col.name,
                    row + 1
                )));
            }
        }

        Ok(Self {
            label,
            x,
            columns,
            index,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn columns(&self) -> &[SeriesColumn] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows (coordinates).
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Look up a column by name, returning its position as well.
    pub fn column(&self, name: &str) -> Option<(usize, &SeriesColumn)> {
        self.columns.iter().enumerate().find(|(_, c)| c.name == name)
    }

    /// Row holding coordinate `x` (exact match, no interpolation).
    pub fn row_of(&self, x: f64) -> Option<usize> {
        if !x.is_finite() {
            return None;
        }
        self.index.get(&coord_key(x)).copied()
    }

    /// Value of column `col` at coordinate `x`, if `x` is on the domain.
    pub fn value_at(&self, col: usize, x: f64) -> Option<f64> {
        let row = self.row_of(x)?;
        self.columns.get(col).map(|c| c.values[row])
    }
}

/// Hash key for an exact coordinate lookup; `-0.0` and `0.0` share a key.
fn coord_key(x: f64) -> u64 {
    if x == 0.0 { 0.0f64.to_bits() } else { x.to_bits() }
}

/// A single unlabeled `(x, y)` observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationPoint {
    pub x: f64,
    pub y: f64,
}

/// Best candidate found for one training column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMatch {
    /// Training column name.
    pub training: String,
    /// Chosen candidate column name.
    pub candidate: String,
    /// Position of the candidate in the pool (0-based).
    pub candidate_index: usize,
    /// Sum of squared errors over the common domain.
    pub sse: f64,
    /// Maximum absolute residual over the common domain.
    pub max_deviation: f64,
}

impl FunctionMatch {
    /// Tolerance used when mapping observations to this candidate.
    pub fn threshold(&self) -> f64 {
        self.max_deviation * SQRT_2
    }
}

/// Assignment + deviation bound for every training column, in training-column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOutcome {
    pub matches: Vec<FunctionMatch>,
    /// Number of coordinates shared by the training and candidate domains.
    pub common_points: usize,
}

impl FitOutcome {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn get(&self, training: &str) -> Option<&FunctionMatch> {
        self.matches.iter().find(|m| m.training == training)
    }

    /// Candidate assigned to `training`.
    pub fn assignment(&self, training: &str) -> Option<&str> {
        self.get(training).map(|m| m.candidate.as_str())
    }

    /// Deviation bound observed for `training`.
    pub fn deviation_bound(&self, training: &str) -> Option<f64> {
        self.get(training).map(|m| m.max_deviation)
    }
}

/// An observation that was assigned to one of the selected candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub x: f64,
    pub y: f64,
    /// `|y - candidate(x)|`, never negative.
    pub residual: f64,
    pub candidate: String,
}

/// Output of a mapping pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingOutcome {
    /// Labeled points in input order.
    pub points: Vec<LabeledPoint>,
    /// Observations examined.
    pub observed: usize,
    /// Observations with no eligible candidate (dropped).
    pub unmatched: usize,
    /// Malformed observation rows skipped before mapping.
    pub skipped_rows: usize,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus `.env` / defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub train_path: PathBuf,
    pub ideal_path: PathBuf,
    pub test_path: PathBuf,
    pub shape: TableShape,

    /// Directory for `mapped_test_results.csv` and `fit_summary.json`.
    pub out_dir: Option<PathBuf>,
    /// SQLite database the inputs are loaded into and the results saved to.
    pub db_path: Option<PathBuf>,
    /// Labeled rows printed in the terminal report.
    pub rows: usize,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SeriesTable {
        SeriesTable::new(
            "ideal",
            vec![-1.0, 0.0, 1.5],
            vec![
                SeriesColumn::new("y1", vec![1.0, 2.0, 3.0]),
                SeriesColumn::new("y2", vec![4.0, 5.0, 6.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn lookup_is_exact_and_treats_signed_zero_alike() {
        let t = table();
        assert_eq!(t.row_of(1.5), Some(2));
        assert_eq!(t.row_of(-0.0), Some(1));
        assert_eq!(t.row_of(1.5000001), None);
        assert_eq!(t.value_at(1, 0.0), Some(5.0));
        assert_eq!(t.value_at(2, 0.0), None);
        assert_eq!(t.column("y2").map(|(i, _)| i), Some(1));
    }

    #[test]
    fn rejects_duplicate_coordinates() {
        let err = SeriesTable::new("train", vec![1.0, 1.0], vec![SeriesColumn::new("y1", vec![0.0, 0.0])])
            .unwrap_err();
        assert!(matches!(err, MatchError::Configuration(_)));
    }

    #[test]
    fn rejects_repeated_column_names() {
        let err = SeriesTable::new(
            "ideal",
            vec![1.0, 2.0],
            vec![
                SeriesColumn::new("a", vec![0.0, 0.0]),
                SeriesColumn::new("a", vec![5.0, 5.0]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, MatchError::Configuration(_)));
    }

    #[test]
    fn rejects_ragged_and_non_finite_columns() {
        let ragged = SeriesTable::new("train", vec![1.0, 2.0], vec![SeriesColumn::new("y1", vec![0.0])]);
        assert!(ragged.is_err());

        let nan = SeriesTable::new("train", vec![1.0, 2.0], vec![SeriesColumn::new("y1", vec![0.0, f64::NAN])]);
        assert!(nan.is_err());
    }

    #[test]
    fn threshold_is_sqrt_two_times_bound() {
        let m = FunctionMatch {
            training: "y1".to_string(),
            candidate: "y7".to_string(),
            candidate_index: 6,
            sse: 1.0,
            max_deviation: 0.5,
        };
        assert_eq!(m.threshold(), 0.5 * SQRT_2);
    }
}
