//! SQLite-backed series store.
//!
//! Tables:
//! - `train_data`, `ideal_data`: `x` plus one REAL column per series
//! - `test_data`: `x`, `y`
//! - `mapped_test_results`: the four result columns, written after a run
//!
//! Importing replaces a table wholesale, so re-running on the same database
//! file always reflects the latest inputs.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use crate::domain::{LabeledPoint, ObservationPoint, SeriesColumn, SeriesTable};
use crate::error::MatchError;
use crate::io::export::MAPPED_RESULTS_COLUMNS;
use crate::io::ingest::{COORDINATE_COLUMN, ObservationSet, RowError};
use crate::io::store::SeriesStore;

pub const TRAINING_TABLE: &str = "train_data";
pub const CANDIDATE_TABLE: &str = "ideal_data";
pub const OBSERVATION_TABLE: &str = "test_data";
pub const MAPPED_RESULTS_TABLE: &str = "mapped_test_results";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    location: String,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, MatchError> {
        let location = path.display().to_string();
        let conn = Connection::open(path).map_err(|e| MatchError::data_access(&location, e.to_string()))?;
        log::debug!("Opened database {location}");
        Ok(Self {
            conn: Mutex::new(conn),
            location,
        })
    }

    pub fn open_in_memory() -> Result<Self, MatchError> {
        let conn = Connection::open_in_memory().map_err(|e| MatchError::data_access(":memory:", e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            location: ":memory:".to_string(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, MatchError> {
        self.conn
            .lock()
            .map_err(|_| MatchError::data_access(&self.location, "database connection lock poisoned"))
    }

    /// Copy all three input tables from `source` into the database.
    ///
    /// Returns the number of observation rows `source` had to skip; those rows
    /// are not stored.
    pub fn import_from<S: SeriesStore + ?Sized>(&self, source: &S) -> Result<usize, MatchError> {
        self.import_series(TRAINING_TABLE, &source.load_training()?)?;
        self.import_series(CANDIDATE_TABLE, &source.load_candidates()?)?;
        let observations = source.load_observations()?;
        self.import_observations(&observations.points)?;

        log::info!(
            "Loaded {TRAINING_TABLE}, {CANDIDATE_TABLE} and {OBSERVATION_TABLE} into {}",
            self.location
        );
        Ok(observations.row_errors.len())
    }

    /// Replace `table` with the contents of a series table.
    pub fn import_series(&self, table: &str, data: &SeriesTable) -> Result<(), MatchError> {
        let columns: Vec<(&str, &str)> = std::iter::once((COORDINATE_COLUMN, "REAL"))
            .chain(data.columns().iter().map(|c| (c.name.as_str(), "REAL")))
            .collect();
        let rows = data.x().iter().enumerate().map(|(row, &x)| {
            std::iter::once(Value::Real(x))
                .chain(data.columns().iter().map(|c| Value::Real(c.values[row])))
                .collect::<Vec<Value>>()
        });

        let mut conn = self.lock()?;
        replace_table(&mut conn, table, &columns, rows).map_err(|e| MatchError::data_access(table, e.to_string()))
    }

    /// Replace the observation table.
    pub fn import_observations(&self, points: &[ObservationPoint]) -> Result<(), MatchError> {
        let columns = [(COORDINATE_COLUMN, "REAL"), ("y", "REAL")];
        let rows = points.iter().map(|p| vec![Value::Real(p.x), Value::Real(p.y)]);

        let mut conn = self.lock()?;
        replace_table(&mut conn, OBSERVATION_TABLE, &columns, rows)
            .map_err(|e| MatchError::data_access(OBSERVATION_TABLE, e.to_string()))
    }

    /// Replace `mapped_test_results` with `points`.
    pub fn save_mapped_results(&self, points: &[LabeledPoint]) -> Result<(), MatchError> {
        let [x, y, delta, candidate] = MAPPED_RESULTS_COLUMNS;
        let columns = [(x, "REAL"), (y, "REAL"), (delta, "REAL"), (candidate, "TEXT")];
        let rows = points.iter().map(|p| {
            vec![
                Value::Real(p.x),
                Value::Real(p.y),
                Value::Real(p.residual),
                Value::Text(p.candidate.clone()),
            ]
        });

        let mut conn = self.lock()?;
        replace_table(&mut conn, MAPPED_RESULTS_TABLE, &columns, rows)
            .map_err(|e| MatchError::data_access(MAPPED_RESULTS_TABLE, e.to_string()))?;
        log::info!("Saved {} mapped points to {MAPPED_RESULTS_TABLE} in {}", points.len(), self.location);
        Ok(())
    }

    /// Read `mapped_test_results` back, in insertion order.
    pub fn load_mapped_results(&self) -> Result<Vec<LabeledPoint>, MatchError> {
        let err = |e: rusqlite::Error| MatchError::data_access(MAPPED_RESULTS_TABLE, e.to_string());
        let conn = self.lock()?;

        let select = MAPPED_RESULTS_COLUMNS.map(quote_ident).join(", ");
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {select} FROM {} ORDER BY rowid",
                quote_ident(MAPPED_RESULTS_TABLE)
            ))
            .map_err(err)?;
        let points = stmt
            .query_map([], |row| {
                Ok(LabeledPoint {
                    x: row.get(0)?,
                    y: row.get(1)?,
                    residual: row.get(2)?,
                    candidate: row.get(3)?,
                })
            })
            .map_err(err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(err)?;
        Ok(points)
    }

    fn read_series(&self, table: &str, label: &str) -> Result<SeriesTable, MatchError> {
        let err = |e: rusqlite::Error| MatchError::data_access(table, e.to_string());
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote_ident(table)))
            .map_err(err)?;
        let (x_idx, value_cols) = split_columns(&stmt, table)?;
        if value_cols.is_empty() {
            return Err(MatchError::config(format!("Table '{table}' has no value columns.")));
        }

        let mut x = Vec::new();
        let mut values: Vec<Vec<f64>> = vec![Vec::new(); value_cols.len()];
        let mut rows = stmt.query([]).map_err(err)?;
        while let Some(row) = rows.next().map_err(err)? {
            x.push(row.get::<_, f64>(x_idx).map_err(err)?);
            for (slot, (idx, _)) in value_cols.iter().enumerate() {
                values[slot].push(row.get::<_, f64>(*idx).map_err(err)?);
            }
        }

        let columns = value_cols
            .into_iter()
            .zip(values)
            .map(|((_, name), vals)| SeriesColumn::new(name, vals))
            .collect();
        SeriesTable::new(label, x, columns)
    }
}

impl SeriesStore for SqliteStore {
    fn load_training(&self) -> Result<SeriesTable, MatchError> {
        self.read_series(TRAINING_TABLE, "train")
    }

    fn load_candidates(&self) -> Result<SeriesTable, MatchError> {
        self.read_series(CANDIDATE_TABLE, "ideal")
    }

    /// NULL or non-finite cells become row errors, numbered by row position.
    fn load_observations(&self) -> Result<ObservationSet, MatchError> {
        let err = |e: rusqlite::Error| MatchError::data_access(OBSERVATION_TABLE, e.to_string());
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote_ident(OBSERVATION_TABLE)))
            .map_err(err)?;
        let (x_idx, value_cols) = split_columns(&stmt, OBSERVATION_TABLE)?;
        let y_idx = match value_cols.as_slice() {
            [(idx, _)] => *idx,
            _ => {
                return Err(MatchError::config(format!(
                    "Table '{OBSERVATION_TABLE}' must have exactly one value column besides '{COORDINATE_COLUMN}', found {}.",
                    value_cols.len()
                )));
            }
        };

        let mut out = ObservationSet::default();
        let mut rows = stmt.query([]).map_err(err)?;
        while let Some(row) = rows.next().map_err(err)? {
            out.rows_read += 1;
            let x = row.get::<_, Option<f64>>(x_idx).map_err(err)?;
            let y = row.get::<_, Option<f64>>(y_idx).map_err(err)?;
            match (x, y) {
                (Some(x), Some(y)) if x.is_finite() && y.is_finite() => out.points.push(ObservationPoint { x, y }),
                _ => out.row_errors.push(RowError {
                    line: out.rows_read,
                    message: "missing or non-finite value".to_string(),
                }),
            }
        }

        for e in &out.row_errors {
            log::warn!("Skipping row {} of {OBSERVATION_TABLE}: {}", e.line, e.message);
        }
        Ok(out)
    }
}

/// Coordinate column index and the value columns, in table order.
fn split_columns(stmt: &rusqlite::Statement<'_>, table: &str) -> Result<(usize, Vec<(usize, String)>), MatchError> {
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let x_idx = names
        .iter()
        .position(|n| n.eq_ignore_ascii_case(COORDINATE_COLUMN))
        .ok_or_else(|| {
            MatchError::config(format!("Table '{table}' is missing the '{COORDINATE_COLUMN}' coordinate column."))
        })?;
    let value_cols = names
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| *idx != x_idx)
        .collect();
    Ok((x_idx, value_cols))
}

fn replace_table(
    conn: &mut Connection,
    table: &str,
    columns: &[(&str, &str)],
    rows: impl Iterator<Item = Vec<Value>>,
) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    let name = quote_ident(table);
    let defs: Vec<String> = columns.iter().map(|(c, ty)| format!("{} {ty}", quote_ident(c))).collect();
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {name}; CREATE TABLE {name} ({});",
        defs.join(", ")
    ))?;
    {
        let names: Vec<String> = columns.iter().map(|(c, _)| quote_ident(c)).collect();
        let slots: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {name} ({}) VALUES ({})",
            names.join(", "),
            slots.join(", ")
        ))?;
        for row in rows {
            stmt.execute(params_from_iter(row))?;
        }
    }
    tx.commit()
}

/// SQL identifier quoting; column names come straight from CSV headers.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
