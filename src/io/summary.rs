//! Read/write the run summary JSON.
//!
//! The summary is the portable record of a run:
//! - which candidate each training column was assigned to
//! - SSE, deviation bound and mapping threshold per assignment
//! - how many test points were mapped or dropped

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FitOutcome, MappingOutcome, TableShape};
use crate::error::MatchError;

/// File name of the summary inside an output directory.
pub const SUMMARY_FILE: &str = "fit_summary.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub shape: TableShape,
    pub common_points: usize,
    pub assignments: Vec<AssignmentSummary>,
    pub test_points: MappingCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSummary {
    pub training: String,
    pub candidate: String,
    pub sse: f64,
    pub max_deviation: f64,
    pub threshold: f64,
    /// Test points labeled with this candidate.
    pub mapped_points: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingCounts {
    pub observed: usize,
    pub mapped: usize,
    pub unmatched: usize,
    pub skipped_rows: usize,
}

impl RunSummary {
    pub fn new(shape: TableShape, fit: &FitOutcome, mapping: &MappingOutcome) -> Self {
        let assignments = fit
            .matches
            .iter()
            .map(|m| AssignmentSummary {
                training: m.training.clone(),
                candidate: m.candidate.clone(),
                sse: m.sse,
                max_deviation: m.max_deviation,
                threshold: m.threshold(),
                mapped_points: mapping.points.iter().filter(|p| p.candidate == m.candidate).count(),
            })
            .collect();

        Self {
            tool: "ifit".to_string(),
            generated_at: Utc::now(),
            shape,
            common_points: fit.common_points,
            assignments,
            test_points: MappingCounts {
                observed: mapping.observed,
                mapped: mapping.points.len(),
                unmatched: mapping.unmatched,
                skipped_rows: mapping.skipped_rows,
            },
        }
    }
}

/// Write a summary JSON file.
pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), MatchError> {
    let file = File::create(path)
        .map_err(|e| MatchError::data_access(path.display().to_string(), format!("failed to create file: {e}")))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| MatchError::data_access(path.display().to_string(), format!("failed to write JSON: {e}")))?;
    log::info!("Wrote run summary to {}", path.display());
    Ok(())
}

/// Read a summary JSON file.
pub fn read_summary_json(path: &Path) -> Result<RunSummary, MatchError> {
    let file = File::open(path).map_err(|e| MatchError::data_access(path.display().to_string(), e.to_string()))?;
    serde_json::from_reader(file)
        .map_err(|e| MatchError::data_access(path.display().to_string(), format!("invalid summary JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FunctionMatch, LabeledPoint};

    fn sample() -> RunSummary {
        let fit = FitOutcome {
            matches: vec![
                FunctionMatch {
                    training: "y1".to_string(),
                    candidate: "y36".to_string(),
                    candidate_index: 35,
                    sse: 33.5,
                    max_deviation: 0.25,
                },
                FunctionMatch {
                    training: "y2".to_string(),
                    candidate: "y11".to_string(),
                    candidate_index: 10,
                    sse: 32.75,
                    max_deviation: 0.5,
                },
            ],
            common_points: 400,
        };
        let labeled = |candidate: &str| LabeledPoint {
            x: 0.0,
            y: 0.0,
            residual: 0.0,
            candidate: candidate.to_string(),
        };
        let mapping = MappingOutcome {
            points: vec![labeled("y36"), labeled("y36"), labeled("y11")],
            observed: 5,
            unmatched: 2,
            skipped_rows: 1,
        };
        RunSummary::new(TableShape::new(2, 50), &fit, &mapping)
    }

    #[test]
    fn counts_points_per_assignment() {
        let s = sample();
        assert_eq!(s.assignments[0].mapped_points, 2);
        assert_eq!(s.assignments[1].mapped_points, 1);
        assert_eq!(s.assignments[0].threshold, 0.25 * std::f64::consts::SQRT_2);
        assert_eq!(
            s.test_points,
            MappingCounts {
                observed: 5,
                mapped: 3,
                unmatched: 2,
                skipped_rows: 1
            }
        );
    }

    #[test]
    fn summary_survives_a_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("ifit-summary-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(SUMMARY_FILE);

        let s = sample();
        write_summary_json(&path, &s).unwrap();
        assert_eq!(read_summary_json(&path).unwrap(), s);
    }

    #[test]
    fn invalid_json_is_data_access_error() {
        let dir = std::env::temp_dir().join(format!("ifit-summary-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_summary_json(&path), Err(MatchError::DataAccess { .. })));
    }
}
