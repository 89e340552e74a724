//! Series stores: where the fitter and mapper get their tables from.
//!
//! Both analysis components only need read access to three named tables, so the
//! store is passed to them as a dependency instead of living in a shared base.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::domain::{ObservationPoint, RunConfig, SeriesTable};
use crate::error::MatchError;
use crate::io::ingest::{ObservationSet, load_observations, load_series_table};

/// Read access to the training, candidate and observation tables.
pub trait SeriesStore {
    fn load_training(&self) -> Result<SeriesTable, MatchError>;
    fn load_candidates(&self) -> Result<SeriesTable, MatchError>;
    fn load_observations(&self) -> Result<ObservationSet, MatchError>;
}

/// Store backed by three CSV files.
#[derive(Debug, Clone)]
pub struct CsvStore {
    train_path: PathBuf,
    ideal_path: PathBuf,
    test_path: PathBuf,
}

impl CsvStore {
    pub fn new(train_path: impl Into<PathBuf>, ideal_path: impl Into<PathBuf>, test_path: impl Into<PathBuf>) -> Self {
        Self {
            train_path: train_path.into(),
            ideal_path: ideal_path.into(),
            test_path: test_path.into(),
        }
    }

    /// `train.csv`, `ideal.csv` and `test.csv` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("train.csv"), dir.join("ideal.csv"), dir.join("test.csv"))
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            config.train_path.clone(),
            config.ideal_path.clone(),
            config.test_path.clone(),
        )
    }
}

impl SeriesStore for CsvStore {
    fn load_training(&self) -> Result<SeriesTable, MatchError> {
        load_series_table(&self.train_path, "train")
    }

    fn load_candidates(&self) -> Result<SeriesTable, MatchError> {
        load_series_table(&self.ideal_path, "ideal")
    }

    fn load_observations(&self) -> Result<ObservationSet, MatchError> {
        load_observations(&self.test_path)
    }
}

/// Store over tables that are already in memory.
///
/// A missing table behaves like an unreadable file: `DataAccess`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    training: Option<SeriesTable>,
    candidates: Option<SeriesTable>,
    observations: Option<Vec<ObservationPoint>>,
}

impl MemoryStore {
    pub fn new(training: SeriesTable, candidates: SeriesTable, observations: Vec<ObservationPoint>) -> Self {
        Self {
            training: Some(training),
            candidates: Some(candidates),
            observations: Some(observations),
        }
    }

    pub fn with_training(mut self, table: SeriesTable) -> Self {
        self.training = Some(table);
        self
    }

    pub fn with_candidates(mut self, table: SeriesTable) -> Self {
        self.candidates = Some(table);
        self
    }

    pub fn with_observations(mut self, points: Vec<ObservationPoint>) -> Self {
        self.observations = Some(points);
        self
    }
}

impl SeriesStore for MemoryStore {
    fn load_training(&self) -> Result<SeriesTable, MatchError> {
        self.training
            .clone()
            .ok_or_else(|| MatchError::data_access("train", "table not loaded"))
    }

    fn load_candidates(&self) -> Result<SeriesTable, MatchError> {
        self.candidates
            .clone()
            .ok_or_else(|| MatchError::data_access("ideal", "table not loaded"))
    }

    fn load_observations(&self) -> Result<ObservationSet, MatchError> {
        self.observations
            .clone()
            .map(ObservationSet::from_points)
            .ok_or_else(|| MatchError::data_access("test", "table not loaded"))
    }
}

/// Wraps another store so each table is read from it at most once.
///
/// A run hands the same store to the fitter, the mapper and the plots; the
/// wrapper keeps them from re-reading files or re-querying the database.
pub struct CachedStore<'a, S: SeriesStore + ?Sized> {
    inner: &'a S,
    training: OnceLock<SeriesTable>,
    candidates: OnceLock<SeriesTable>,
    observations: OnceLock<ObservationSet>,
}

impl<'a, S: SeriesStore + ?Sized> CachedStore<'a, S> {
    pub fn new(inner: &'a S) -> Self {
        Self {
            inner,
            training: OnceLock::new(),
            candidates: OnceLock::new(),
            observations: OnceLock::new(),
        }
    }
}

fn cached<T: Clone>(cell: &OnceLock<T>, load: impl FnOnce() -> Result<T, MatchError>) -> Result<T, MatchError> {
    if let Some(value) = cell.get() {
        return Ok(value.clone());
    }
    let value = load()?;
    Ok(cell.get_or_init(|| value).clone())
}

impl<S: SeriesStore + ?Sized> SeriesStore for CachedStore<'_, S> {
    fn load_training(&self) -> Result<SeriesTable, MatchError> {
        cached(&self.training, || self.inner.load_training())
    }

    fn load_candidates(&self) -> Result<SeriesTable, MatchError> {
        cached(&self.candidates, || self.inner.load_candidates())
    }

    fn load_observations(&self) -> Result<ObservationSet, MatchError> {
        cached(&self.observations, || self.inner.load_observations())
    }
}
