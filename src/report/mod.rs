//! Reporting utilities: per-candidate tallies and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{FitOutcome, LabeledPoint};

/// How many test points landed on one selected candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTally {
    pub training: String,
    pub candidate: String,
    pub points: usize,
    /// Largest residual among those points (0 when none).
    pub max_residual: f64,
}

/// Tally mapped points per assignment, in assignment order.
pub fn tally_by_candidate(fit: &FitOutcome, points: &[LabeledPoint]) -> Vec<CandidateTally> {
    fit.matches
        .iter()
        .map(|m| {
            let mine = points.iter().filter(|p| p.candidate == m.candidate);
            let (count, max_residual) = mine.fold((0usize, 0.0f64), |(n, mx), p| (n + 1, mx.max(p.residual)));
            CandidateTally {
                training: m.training.clone(),
                candidate: m.candidate.clone(),
                points: count,
                max_residual,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FunctionMatch;

    #[test]
    fn tally_counts_and_tracks_worst_residual() {
        let fit = FitOutcome {
            matches: ["a", "b"]
                .iter()
                .enumerate()
                .map(|(i, c)| FunctionMatch {
                    training: format!("y{}", i + 1),
                    candidate: c.to_string(),
                    candidate_index: i,
                    sse: 0.0,
                    max_deviation: 1.0,
                })
                .collect(),
            common_points: 1,
        };
        let lp = |candidate: &str, residual: f64| LabeledPoint {
            x: 0.0,
            y: 0.0,
            residual,
            candidate: candidate.to_string(),
        };
        let tallies = tally_by_candidate(&fit, &[lp("a", 0.2), lp("a", 0.7), lp("a", 0.1)]);

        assert_eq!(tallies[0].points, 3);
        assert_eq!(tallies[0].max_residual, 0.7);
        assert_eq!(tallies[1].points, 0);
        assert_eq!(tallies[1].max_residual, 0.0);
    }
}
