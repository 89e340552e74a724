//! Least-squares selection of the best candidate per training column.
//!
//! Given:
//! - a training table with `shape.training_columns` y-columns
//! - a candidate table with `shape.candidate_columns` y-columns
//!
//! we score, for each training column, every candidate by its SSE over the
//! common domain and keep the lowest. Candidates are scored in parallel; the
//! selection scan runs in pool order so ties always go to the lower index.

use rayon::prelude::*;

use crate::domain::{FitOutcome, FunctionMatch, SeriesColumn, SeriesTable, TableShape};
use crate::error::MatchError;
use crate::io::store::SeriesStore;

/// Finds the best candidate for every training column of a store.
pub struct FunctionFitter<'a, S: SeriesStore + ?Sized> {
    store: &'a S,
    shape: TableShape,
}

impl<'a, S: SeriesStore + ?Sized> FunctionFitter<'a, S> {
    pub fn new(store: &'a S, shape: TableShape) -> Self {
        Self { store, shape }
    }

    /// Load the training and candidate tables and select the best candidates.
    pub fn find_best_functions(&self) -> Result<FitOutcome, MatchError> {
        let training = self.store.load_training()?;
        let candidates = self.store.load_candidates()?;
        fit_best_functions(&training, &candidates, self.shape)
    }
}

/// Row pairs `(training_row, candidate_row)` for every coordinate present in
/// both tables, in training-domain order.
pub fn common_domain(training: &SeriesTable, candidates: &SeriesTable) -> Vec<(usize, usize)> {
    training
        .x()
        .iter()
        .enumerate()
        .filter_map(|(t_row, &x)| candidates.row_of(x).map(|c_row| (t_row, c_row)))
        .collect()
}

/// Select the best candidate (lowest SSE) for every training column.
pub fn fit_best_functions(
    training: &SeriesTable,
    candidates: &SeriesTable,
    shape: TableShape,
) -> Result<FitOutcome, MatchError> {
    check_shape(training, shape.training_columns)?;
    check_shape(candidates, shape.candidate_columns)?;

    let pairs = common_domain(training, candidates);
    if pairs.is_empty() {
        // Every SSE would be 0 and the "best" candidate arbitrary.
        return Err(MatchError::config(format!(
            "Tables '{}' and '{}' share no coordinates.",
            training.label(),
            candidates.label()
        )));
    }

    log::info!(
        "Fitting {} training columns against {} candidates over {} shared points",
        training.column_count(),
        candidates.column_count(),
        pairs.len()
    );

    let matches = training
        .columns()
        .iter()
        .map(|column| best_candidate(column, candidates.columns(), &pairs))
        .collect::<Result<Vec<_>, _>>()?;

    for m in &matches {
        log::info!(
            "{} -> {} (SSE {:.4}, max deviation {:.4})",
            m.training,
            m.candidate,
            m.sse,
            m.max_deviation
        );
    }

    Ok(FitOutcome {
        matches,
        common_points: pairs.len(),
    })
}

fn check_shape(table: &SeriesTable, expected: usize) -> Result<(), MatchError> {
    if table.column_count() != expected {
        return Err(MatchError::config(format!(
            "Table '{}' has {} value columns, expected {expected}.",
            table.label(),
            table.column_count()
        )));
    }
    Ok(())
}

fn best_candidate(
    training: &SeriesColumn,
    candidates: &[SeriesColumn],
    pairs: &[(usize, usize)],
) -> Result<FunctionMatch, MatchError> {
    // Indexed collect keeps pool order regardless of which thread scored what.
    let scores: Vec<f64> = candidates
        .par_iter()
        .map(|c| sum_squared_error(&training.values, &c.values, pairs))
        .collect();

    let mut best: Option<(usize, f64)> = None;
    for (idx, &sse) in scores.iter().enumerate() {
        // Strict `<`: the first candidate reaching the minimum keeps it.
        let better = match best {
            None => true,
            Some((_, best_sse)) => sse < best_sse,
        };
        if better {
            best = Some((idx, sse));
        }
    }

    let Some((idx, sse)) = best else {
        return Err(MatchError::config("Candidate table has no value columns."));
    };

    let chosen = &candidates[idx];
    log::debug!("{}: best of {} candidates is {} (index {idx})", training.name, scores.len(), chosen.name);

    Ok(FunctionMatch {
        training: training.name.clone(),
        candidate: chosen.name.clone(),
        candidate_index: idx,
        sse,
        max_deviation: max_abs_deviation(&training.values, &chosen.values, pairs),
    })
}

/// `Σ (t(x) - c(x))²` over the paired rows, summed in pair order.
pub fn sum_squared_error(training: &[f64], candidate: &[f64], pairs: &[(usize, usize)]) -> f64 {
    pairs
        .iter()
        .map(|&(t, c)| {
            let d = training[t] - candidate[c];
            d * d
        })
        .sum()
}

/// `max |t(x) - c(x)|` over the paired rows.
pub fn max_abs_deviation(training: &[f64], candidate: &[f64], pairs: &[(usize, usize)]) -> f64 {
    pairs
        .iter()
        .map(|&(t, c)| (training[t] - candidate[c]).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::MemoryStore;

    fn table(label: &str, x: &[f64], cols: Vec<(&str, Vec<f64>)>) -> SeriesTable {
        SeriesTable::new(
            label,
            x.to_vec(),
            cols.into_iter().map(|(n, v)| SeriesColumn::new(n, v)).collect(),
        )
        .unwrap()
    }

    /// Pool of `n` constant candidates `y{i} = [i, i, i]`.
    fn constant_pool(n: usize) -> Vec<(String, Vec<f64>)> {
        (1..=n).map(|i| (format!("y{i}"), vec![i as f64; 3])).collect()
    }

    fn ideal(pool: Vec<(String, Vec<f64>)>) -> SeriesTable {
        table(
            "ideal",
            &[1.0, 2.0, 3.0],
            pool.iter().map(|(n, v)| (n.as_str(), v.clone())).collect(),
        )
    }

    #[test]
    fn identical_candidate_wins_with_zero_deviation() {
        let train = table("train", &[1.0, 2.0, 3.0], vec![("y1", vec![10.0, 20.0, 30.0])]);
        let mut pool = constant_pool(50);
        pool[36].1 = vec![10.0, 20.0, 30.0];

        let outcome = fit_best_functions(&train, &ideal(pool), TableShape::new(1, 50)).unwrap();
        let m = &outcome.matches[0];
        assert_eq!(m.candidate, "y37");
        assert_eq!(m.candidate_index, 36);
        assert_eq!(m.sse, 0.0);
        assert_eq!(m.max_deviation, 0.0);
        assert_eq!(format!("{:.4}", m.max_deviation), "0.0000");
        assert_eq!(outcome.common_points, 3);
    }

    #[test]
    fn swapped_candidates_are_cross_matched() {
        let train = table(
            "train",
            &[1.0, 2.0, 3.0],
            vec![
                ("y1", vec![10.0, 20.0, 30.0]),
                ("y2", vec![1.0, 2.0, 3.0]),
                ("y3", vec![1.0, 2.0, 3.0]),
                ("y4", vec![1.0, 2.0, 3.0]),
            ],
        );
        let mut pool = constant_pool(50);
        pool[0].1 = vec![1.0, 2.0, 3.0];
        pool[1].1 = vec![10.0, 20.0, 30.0];

        let outcome = fit_best_functions(&train, &ideal(pool), TableShape::default()).unwrap();
        assert_eq!(outcome.assignment("y1"), Some("y2"));
        assert_eq!(outcome.assignment("y2"), Some("y1"));
        assert_eq!(outcome.deviation_bound("y1"), Some(0.0));
        assert_eq!(outcome.deviation_bound("y2"), Some(0.0));
        assert_eq!(outcome.matches.len(), 4);
    }

    #[test]
    fn equal_sse_goes_to_lower_index() {
        // y = 2 is equidistant from candidates 1 and 3 at every point.
        let train = table("train", &[1.0, 2.0, 3.0], vec![("t", vec![2.0, 2.0, 2.0])]);
        let pool = vec![
            ("c0".to_string(), vec![5.0, 5.0, 5.0]),
            ("c1".to_string(), vec![3.0, 3.0, 3.0]),
            ("c2".to_string(), vec![9.0, 9.0, 9.0]),
            ("c3".to_string(), vec![1.0, 1.0, 1.0]),
        ];
        let candidates = ideal(pool);

        // Repeat to exercise different rayon schedules.
        for _ in 0..20 {
            let outcome = fit_best_functions(&train, &candidates, TableShape::new(1, 4)).unwrap();
            assert_eq!(outcome.matches[0].candidate, "c1");
            assert_eq!(outcome.matches[0].sse, 3.0);
            assert_eq!(outcome.matches[0].max_deviation, 1.0);
        }
    }

    #[test]
    fn only_common_coordinates_are_scored() {
        let train = table("train", &[0.0, 1.0, 2.0, 5.0], vec![("t", vec![100.0, 1.0, 2.0, 100.0])]);
        let candidates = table(
            "ideal",
            &[1.0, 2.0, 3.0],
            vec![("a", vec![1.0, 2.0, 50.0]), ("b", vec![0.0, 0.0, 0.0])],
        );

        let outcome = fit_best_functions(&train, &candidates, TableShape::new(1, 2)).unwrap();
        assert_eq!(outcome.common_points, 2);
        assert_eq!(outcome.matches[0].candidate, "a");
        assert_eq!(outcome.matches[0].sse, 0.0);
    }

    #[test]
    fn empty_common_domain_is_rejected() {
        let train = table("train", &[10.0, 11.0], vec![("t", vec![1.0, 2.0])]);
        let candidates = table("ideal", &[1.0, 2.0], vec![("a", vec![1.0, 2.0])]);

        let err = fit_best_functions(&train, &candidates, TableShape::new(1, 1)).unwrap_err();
        assert!(matches!(err, MatchError::Configuration(_)));
    }

    #[test]
    fn wrong_column_counts_are_rejected() {
        let train = table("train", &[1.0, 2.0, 3.0], vec![("y1", vec![1.0, 2.0, 3.0])]);
        let candidates = ideal(constant_pool(50));

        let err = fit_best_functions(&train, &candidates, TableShape::default()).unwrap_err();
        assert!(matches!(err, MatchError::Configuration(_)));

        let err = fit_best_functions(&train, &candidates, TableShape::new(1, 49)).unwrap_err();
        assert!(matches!(err, MatchError::Configuration(_)));
    }

    #[test]
    fn fitter_reads_through_store_and_propagates_access_errors() {
        let train = table("train", &[1.0, 2.0, 3.0], vec![("y1", vec![3.0, 3.0, 3.0])]);
        let store = MemoryStore::default()
            .with_training(train.clone())
            .with_candidates(ideal(constant_pool(5)));

        let outcome = FunctionFitter::new(&store, TableShape::new(1, 5)).find_best_functions().unwrap();
        assert_eq!(outcome.assignment("y1"), Some("y3"));

        let missing = MemoryStore::default().with_training(train);
        let err = FunctionFitter::new(&missing, TableShape::new(1, 5))
            .find_best_functions()
            .unwrap_err();
        assert!(matches!(err, MatchError::DataAccess { .. }));
    }
}
