//! Data models for test run execution
//!
//! This module contains the run definition and the per-target outcome types.

mod outcome;
mod test_run;

pub use outcome::{ProbeOutcome, ResultSet};
pub use test_run::{TestRun, TestRunError};
