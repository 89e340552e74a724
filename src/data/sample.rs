//! Synthetic dataset generation.
//!
//! Builds a candidate pool of closed-form functions, derives training columns
//! from randomly chosen pool members plus Gaussian noise, and draws test points
//! around the chosen functions (with a share of uniform outliers).

use rand::prelude::*;
use rand::rngs::StdRng;
use rand::seq::index;
use rand_distr::Normal;

use crate::domain::{ObservationPoint, SeriesColumn, SeriesTable, TableShape};
use crate::error::MatchError;

/// Grid start (inclusive).
const X_START: f64 = -20.0;
/// Grid spacing.
const X_STEP: f64 = 0.1;
/// Grid length: x in [-20, 20).
const GRID_LEN: usize = 400;

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub seed: u64,
    pub shape: TableShape,
    /// Number of test points.
    pub test_points: usize,
    /// Std dev of the noise added to training columns and test points.
    pub noise: f64,
    /// Share of test points drawn uniformly instead of near a chosen function.
    pub outlier_fraction: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            shape: TableShape::default(),
            test_points: 100,
            noise: 0.3,
            outlier_fraction: 0.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleData {
    pub training: SeriesTable,
    pub candidates: SeriesTable,
    pub observations: Vec<ObservationPoint>,
    /// Pool index behind each training column.
    pub chosen: Vec<usize>,
}

pub fn generate_sample(config: &SampleConfig) -> Result<SampleData, MatchError> {
    let shape = config.shape;
    if shape.training_columns == 0 || shape.candidate_columns == 0 {
        return Err(MatchError::config("Sample shape needs at least one training and one candidate column."));
    }
    if shape.training_columns > shape.candidate_columns {
        return Err(MatchError::config(format!(
            "Cannot derive {} distinct training columns from {} candidates.",
            shape.training_columns, shape.candidate_columns
        )));
    }
    if !(config.noise.is_finite() && config.noise >= 0.0) {
        return Err(MatchError::config("Sample noise must be a non-negative number."));
    }
    if !(0.0..=1.0).contains(&config.outlier_fraction) {
        return Err(MatchError::config("Outlier fraction must be within [0, 1]."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, config.noise)
        .map_err(|e| MatchError::config(format!("Noise distribution error: {e}")))?;

    let x = grid();

    let pool: Vec<SeriesColumn> = (0..shape.candidate_columns)
        .map(|k| SeriesColumn::new(format!("y{}", k + 1), x.iter().map(|&xv| candidate_value(k, xv)).collect()))
        .collect();

    let chosen = index::sample(&mut rng, shape.candidate_columns, shape.training_columns).into_vec();

    let training_cols: Vec<SeriesColumn> = chosen
        .iter()
        .enumerate()
        .map(|(i, &k)| {
            let values = pool[k].values.iter().map(|v| v + normal.sample(&mut rng)).collect();
            SeriesColumn::new(format!("y{}", i + 1), values)
        })
        .collect();

    let (y_lo, y_hi) = pool_range(&pool, &chosen);
    let mut observations = Vec::with_capacity(config.test_points);
    for _ in 0..config.test_points {
        let row = rng.gen_range(0..x.len());
        let y = if rng.gen_bool(config.outlier_fraction) {
            rng.gen_range(y_lo..=y_hi)
        } else {
            let k = chosen[rng.gen_range(0..chosen.len())];
            pool[k].values[row] + normal.sample(&mut rng)
        };
        observations.push(ObservationPoint { x: x[row], y });
    }

    log::debug!(
        "Generated sample (seed {}): training built from pool columns {:?}",
        config.seed,
        chosen.iter().map(|k| k + 1).collect::<Vec<_>>()
    );

    Ok(SampleData {
        training: SeriesTable::new("train", x.clone(), training_cols)?,
        candidates: SeriesTable::new("ideal", x, pool)?,
        observations,
        chosen,
    })
}

/// `x` grid rounded to one decimal so coordinates print and parse exactly.
fn grid() -> Vec<f64> {
    (0..GRID_LEN)
        .map(|i| ((X_START + i as f64 * X_STEP) * 10.0).round() / 10.0)
        .collect()
}

/// Closed-form candidate `k` (0-based) evaluated at `x`.
///
/// Six families, each scaled by a factor that grows every six indices, so
/// every index yields a distinct function.
pub fn candidate_value(k: usize, x: f64) -> f64 {
    let a = 1.0 + (k / 6) as f64 * 0.5;
    match k % 6 {
        0 => a * x.sin(),
        1 => a * x.cos(),
        2 => a * x,
        3 => a * x * x / 20.0,
        4 => a * 5.0 * (x / 10.0).tanh(),
        _ => a * x.abs().sqrt(),
    }
}

/// y-range spanned by the chosen pool members, for outliers.
fn pool_range(pool: &[SeriesColumn], chosen: &[usize]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &k in chosen {
        for &v in &pool[k].values {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if hi > lo { (lo, hi) } else { (lo - 1.0, lo + 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::fitter::fit_best_functions;

    #[test]
    fn grid_is_exact_and_unique() {
        let x = grid();
        assert_eq!(x.len(), GRID_LEN);
        assert_eq!(x[0], -20.0);
        assert_eq!(x[1], -19.9);
        assert_eq!(x[200], 0.0);
        assert_eq!(x[399], 19.9);
    }

    #[test]
    fn same_seed_same_sample() {
        let a = generate_sample(&SampleConfig::default()).unwrap();
        let b = generate_sample(&SampleConfig::default()).unwrap();
        assert_eq!(a.chosen, b.chosen);
        assert_eq!(a.observations, b.observations);
        assert_eq!(a.training.columns(), b.training.columns());
    }

    #[test]
    fn shapes_follow_config() {
        let config = SampleConfig {
            shape: TableShape::new(3, 12),
            test_points: 17,
            ..SampleConfig::default()
        };
        let s = generate_sample(&config).unwrap();
        assert_eq!(s.training.column_count(), 3);
        assert_eq!(s.candidates.column_count(), 12);
        assert_eq!(s.observations.len(), 17);
        assert!(s.observations.iter().all(|p| s.candidates.row_of(p.x).is_some()));
    }

    #[test]
    fn fitter_recovers_noise_free_choices() {
        let config = SampleConfig {
            noise: 0.0,
            ..SampleConfig::default()
        };
        let s = generate_sample(&config).unwrap();
        let fit = fit_best_functions(&s.training, &s.candidates, config.shape).unwrap();
        let picked: Vec<usize> = fit.matches.iter().map(|m| m.candidate_index).collect();
        assert_eq!(picked, s.chosen);
        assert!(fit.matches.iter().all(|m| m.max_deviation == 0.0));
    }

    #[test]
    fn rejects_impossible_shapes() {
        let config = SampleConfig {
            shape: TableShape::new(5, 4),
            ..SampleConfig::default()
        };
        assert!(generate_sample(&config).is_err());
    }
}
