//! Test run execution engine
//!
//! Provides the per-target probe supervisor and the run orchestrator.

mod orchestrator;
mod supervisor;

#[cfg(all(test, unix))]
mod testutil;

pub use orchestrator::{RunOrchestrator, RunState, StartSignal};
