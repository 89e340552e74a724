//! `ideal-fit` library crate.
//!
//! Selects, for each training series, the best-fitting ideal function from a
//! candidate pool (least squares), then maps test points onto the selected
//! functions with a `max deviation × √2` tolerance.
//!
//! The binary (`ifit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitter and mapper can be driven from any `SeriesStore`

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod plot;
pub mod report;
