//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - table stores used by the fitter and mapper (`store`)
//! - result exports (CSV) (`export`)
//! - SQLite tables for inputs and results (`sqlite`)
//! - run summary JSON read/write (`summary`)

pub mod export;
pub mod ingest;
pub mod sqlite;
pub mod store;
pub mod summary;

pub use export::*;
pub use ingest::*;
pub use sqlite::*;
pub use store::*;
pub use summary::*;
