//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - series tables and observation points (`SeriesTable`, `ObservationPoint`)
//! - fit outputs (`FunctionMatch`, `FitOutcome`)
//! - mapping outputs (`LabeledPoint`, `MappingOutcome`)
//! - run configuration (`RunConfig`, `TableShape`)

pub mod types;

pub use types::*;
