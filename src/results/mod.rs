//! Result aggregation module
//!
//! Builds the per-run result set and its persisted encoding.

mod aggregator;

pub use aggregator::{AggregateError, ResultAggregator};
