//! Candidate selection and test point mapping.
//!
//! Responsibilities:
//!
//! - score every candidate against every training column (parallel)
//! - select the best candidate per column with a deterministic tie-break
//! - label observation points against the selected candidates

pub mod fitter;
pub mod mapper;

pub use fitter::*;
pub use mapper::*;
