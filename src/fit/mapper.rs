//! Assigning observation points to the selected candidates.
//!
//! A point is eligible for a selected candidate when the candidate is defined
//! at exactly the point's `x` and `|y - c(x)| <= max_deviation * sqrt(2)`.
//! Among eligible candidates the smallest residual wins; ties go to the
//! earlier slot in assignment order. Points with no eligible candidate are
//! dropped.

use rayon::prelude::*;

use crate::domain::{FitOutcome, LabeledPoint, MappingOutcome, ObservationPoint, SeriesTable};
use crate::error::MatchError;
use crate::io::store::SeriesStore;

/// One selected candidate with its tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct MapperSlot {
    pub training: String,
    pub candidate: String,
    /// Column position the fitter selected in the candidate table.
    pub candidate_index: usize,
    pub threshold: f64,
}

/// Slot whose column position was checked against the candidate table.
struct ResolvedSlot<'s> {
    slot: &'s MapperSlot,
    column: usize,
}

/// Labels observation points against the candidates chosen by the fitter.
pub struct TestPointMapper<'a, S: SeriesStore + ?Sized> {
    store: &'a S,
    slots: Vec<MapperSlot>,
}

impl<'a, S: SeriesStore + ?Sized> TestPointMapper<'a, S> {
    /// Fails if `outcome` is empty or carries an invalid deviation bound.
    pub fn new(store: &'a S, outcome: &FitOutcome) -> Result<Self, MatchError> {
        if outcome.is_empty() {
            return Err(MatchError::config(
                "Test point mapping needs a non-empty assignment and deviation bound.",
            ));
        }

        let slots = outcome
            .matches
            .iter()
            .map(|m| {
                if !(m.max_deviation.is_finite() && m.max_deviation >= 0.0) {
                    return Err(MatchError::config(format!(
                        "Deviation bound for '{}' must be a non-negative number, got {}.",
                        m.training, m.max_deviation
                    )));
                }
                Ok(MapperSlot {
                    training: m.training.clone(),
                    candidate: m.candidate.clone(),
                    candidate_index: m.candidate_index,
                    threshold: m.threshold(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { store, slots })
    }

    pub fn slots(&self) -> &[MapperSlot] {
        &self.slots
    }

    /// Load candidates and observations from the store and label them.
    ///
    /// Observation rows the store had to skip are reported in
    /// `MappingOutcome::skipped_rows`.
    pub fn map_test_points(&self) -> Result<MappingOutcome, MatchError> {
        let candidates = self.store.load_candidates()?;
        let observations = self.store.load_observations()?;
        let mut outcome = self.map_points(&candidates, &observations.points)?;
        outcome.skipped_rows = observations.row_errors.len();
        Ok(outcome)
    }

    /// Label `points` against the selected columns of `candidates`.
    pub fn map_points(
        &self,
        candidates: &SeriesTable,
        points: &[ObservationPoint],
    ) -> Result<MappingOutcome, MatchError> {
        let resolved = self
            .slots
            .iter()
            .map(|slot| match candidates.columns().get(slot.candidate_index) {
                Some(column) if column.name == slot.candidate => Ok(ResolvedSlot {
                    slot,
                    column: slot.candidate_index,
                }),
                _ => Err(MatchError::config(format!(
                    "Selected candidate '{}' is not at column index {} of table '{}'.",
                    slot.candidate,
                    slot.candidate_index,
                    candidates.label()
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Order-preserving: rayon collects filter_map output in input order.
        let labeled: Vec<LabeledPoint> = points
            .par_iter()
            .filter_map(|p| classify(p, candidates, &resolved))
            .collect();

        let unmatched = points.len() - labeled.len();
        log::info!(
            "Mapped {} of {} test points ({} without an eligible candidate)",
            labeled.len(),
            points.len(),
            unmatched
        );
        if labeled.is_empty() && !points.is_empty() {
            log::warn!("No test point fell within any candidate threshold.");
        }

        Ok(MappingOutcome {
            points: labeled,
            observed: points.len(),
            unmatched,
            skipped_rows: 0,
        })
    }
}

fn classify(point: &ObservationPoint, candidates: &SeriesTable, slots: &[ResolvedSlot<'_>]) -> Option<LabeledPoint> {
    let mut best: Option<(&ResolvedSlot<'_>, f64)> = None;

    for rs in slots {
        let Some(value) = candidates.value_at(rs.column, point.x) else {
            continue;
        };
        let residual = (point.y - value).abs();
        if residual > rs.slot.threshold {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, best_residual)) => residual < best_residual,
        };
        if better {
            best = Some((rs, residual));
        }
    }

    match best {
        Some((rs, residual)) => Some(LabeledPoint {
            x: point.x,
            y: point.y,
            residual,
            candidate: rs.slot.candidate.clone(),
        }),
        None => {
            log::debug!("Dropping test point ({}, {}): no eligible candidate", point.x, point.y);
            None
        }
    }
}
