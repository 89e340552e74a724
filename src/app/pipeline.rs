//! Shared fit-and-map pipeline used by the `run` and `demo` commands.
//!
//! store -> fitter -> (assignment, deviation bound) -> mapper -> labeled points
//!
//! The commands then focus on presentation (printing, plots, exports).

use crate::domain::{FitOutcome, MappingOutcome, SeriesTable, TableShape};
use crate::error::MatchError;
use crate::fit::{FunctionFitter, TestPointMapper};
use crate::io::store::{CachedStore, SeriesStore};

/// All computed outputs of a single run, plus the tables they were computed from.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub training: SeriesTable,
    pub candidates: SeriesTable,
    pub fit: FitOutcome,
    pub mapping: MappingOutcome,
}

/// Execute the full pipeline against `store`, reading each table once.
pub fn run_pipeline<S: SeriesStore + ?Sized>(store: &S, shape: TableShape) -> Result<RunOutput, MatchError> {
    let store = CachedStore::new(store);

    log::info!("Step 1: fitting ideal functions");
    let fit = FunctionFitter::new(&store, shape).find_best_functions()?;

    log::info!("Step 2: mapping test data");
    let mapping = TestPointMapper::new(&store, &fit)?.map_test_points()?;

    Ok(RunOutput {
        training: store.load_training()?,
        candidates: store.load_candidates()?,
        fit,
        mapping,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SampleConfig, generate_sample};
    use crate::io::store::MemoryStore;

    #[test]
    fn pipeline_on_synthetic_sample_is_deterministic() {
        let s = generate_sample(&SampleConfig::default()).unwrap();
        let store = MemoryStore::new(s.training.clone(), s.candidates.clone(), s.observations.clone());

        let a = run_pipeline(&store, TableShape::default()).unwrap();
        let b = run_pipeline(&store, TableShape::default()).unwrap();
        assert_eq!(a.fit, b.fit);
        assert_eq!(a.mapping, b.mapping);

        assert_eq!(a.fit.matches.len(), 4);
        assert_eq!(a.mapping.observed, 100);
        assert_eq!(a.mapping.skipped_rows, 0);
        assert_eq!(a.mapping.points.len() + a.mapping.unmatched, 100);
        assert_eq!(a.candidates.column_count(), 50);
        for p in &a.mapping.points {
            let m = a.fit.matches.iter().find(|m| m.candidate == p.candidate).unwrap();
            assert!(p.residual >= 0.0);
            assert!(p.residual <= m.threshold());
        }
    }

    #[test]
    fn shape_mismatch_fails_before_mapping() {
        let s = generate_sample(&SampleConfig::default()).unwrap();
        let store = MemoryStore::new(s.training, s.candidates, s.observations);
        let err = run_pipeline(&store, TableShape::new(4, 49)).unwrap_err();
        assert!(matches!(err, MatchError::Configuration(_)));
    }
}
