//! Test run orchestration
//!
//! Drives one run from the agent cache to the stored result set:
//! start gate, fetch, resolve, fan-out, barrier, aggregate, persist.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use super::supervisor::ProbeSupervisor;
use crate::models::{ResultSet, TestRunError};
use crate::results::{AggregateError, ResultAggregator};
use crate::store::{RunStore, StoreError};
use crate::testlet::{ResolveError, TestletResolver};
use crate::utils::{PhaseTimer, PhaseTimings};

/// Run-level failures; each one aborts the run
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid test run: {0}")]
    InvalidRun(#[from] TestRunError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// When probes may start generating load
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartSignal {
    Immediate,

    /// Fixed rendezvous delay, giving the distribution layer time to reach
    /// every agent
    Delay(Duration),

    /// Scheduled start supplied by the distribution layer
    At(DateTime<Utc>),
}

impl StartSignal {
    /// Time left to wait, measured from `now`
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        match self {
            StartSignal::Immediate => Duration::ZERO,
            StartSignal::Delay(delay) => *delay,
            StartSignal::At(at) => (*at - now).to_std().unwrap_or(Duration::ZERO),
        }
    }

    pub async fn wait(&self) {
        let remaining = self.remaining(Utc::now());
        if !remaining.is_zero() {
            debug!("Waiting {}ms before starting", remaining.as_millis());
            tokio::time::sleep(remaining).await;
        }
    }
}

impl Default for StartSignal {
    fn default() -> Self {
        StartSignal::Delay(Duration::from_secs(3))
    }
}

/// Outcome of a completed run
#[derive(Clone, Debug)]
pub struct RunReport {
    pub run_id: String,
    pub results: ResultSet,
    pub timings: PhaseTimings,
}

/// Terminal state of a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunState {
    Completed,
    Failed(String),
}

impl RunState {
    pub fn from_result(result: &Result<RunReport, RunError>) -> Self {
        match result {
            Ok(_) => RunState::Completed,
            Err(e) => RunState::Failed(e.to_string()),
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Completed => write!(f, "completed"),
            RunState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Executes test runs installed in the agent cache
pub struct RunOrchestrator {
    store: Arc<dyn RunStore>,
    resolver: TestletResolver,
    start: StartSignal,
}

impl RunOrchestrator {
    pub fn new(store: Arc<dyn RunStore>, resolver: TestletResolver) -> Self {
        Self {
            store,
            resolver,
            start: StartSignal::default(),
        }
    }

    pub fn with_start(mut self, start: StartSignal) -> Self {
        self.start = start;
        self
    }

    /// Execute a run and persist its results
    pub async fn execute(&self, run_id: &str) -> Result<RunReport, RunError> {
        let result = self.execute_inner(run_id).await;
        match &result {
            Ok(report) => info!(
                "Test run {} completed in {}ms ({}ms probing): {} ok, {} error, {} timeout",
                run_id,
                report.timings.total.as_millis(),
                report.timings.get("probe").unwrap_or_default().as_millis(),
                report.results.output_count(),
                report.results.error_count(),
                report.results.timeout_count()
            ),
            Err(e) => error!("Test run {} failed: {}", run_id, e),
        }
        result
    }

    async fn execute_inner(&self, run_id: &str) -> Result<RunReport, RunError> {
        let mut timer = PhaseTimer::start();

        self.start.wait().await;
        timer.lap("start");

        let run = self.store.fetch(run_id)?;
        run.validate()?;
        info!("Executing test run {}", run);

        let invocation = self.resolver.resolve(&run.testlet)?;
        timer.lap("fetch");

        let supervisor = ProbeSupervisor::new(invocation, run.args.clone(), run.time_limit());
        let results = supervisor.run_all(&run.targets).await;
        timer.lap("probe");

        let encoded = ResultAggregator::serialize(&results)?;
        self.store.persist(run_id, &encoded)?;
        timer.lap("persist");
        debug!("Wrote combined post-test data for {} to cache", run_id);

        let timings = timer.finish();
        debug!("Test run {} timings: {}", run_id, timings);

        Ok(RunReport {
            run_id: run_id.to_string(),
            results,
            timings,
        })
    }
}
