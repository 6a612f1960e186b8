//! Probe supervision
//!
//! Runs one testlet process per target, all at once, each raced against the
//! run's time limit. Workers never share state: every worker owns its stdout
//! buffer and hands back a single outcome through its join handle, and the
//! outcomes are merged only after every worker has finished.

use futures::future::join_all;
use std::collections::HashSet;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::models::{ProbeOutcome, ResultSet};
use crate::results::ResultAggregator;
use crate::testlet::Invocation;

/// Worker-local probe failures; never escalated past the worker
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to wait for testlet: {0}")]
    Wait(#[source] io::Error),

    #[error("Testlet exited with {0}")]
    Exit(ExitStatus),

    #[error("Failed to read testlet output: {0}")]
    Output(#[source] io::Error),

    #[error("Time limit of {}s exceeded", .0.as_secs())]
    Timeout(Duration),
}

impl ProbeError {
    fn into_outcome(self) -> ProbeOutcome {
        match self {
            ProbeError::Timeout(_) => ProbeOutcome::Timeout,
            _ => ProbeOutcome::Error,
        }
    }
}

/// Fans a testlet out across targets
pub struct ProbeSupervisor {
    invocation: Arc<Invocation>,
    args: Arc<str>,
    time_limit: Duration,
}

impl ProbeSupervisor {
    pub fn new(invocation: Invocation, args: impl Into<String>, time_limit: Duration) -> Self {
        Self {
            invocation: Arc::new(invocation),
            args: Arc::from(args.into()),
            time_limit,
        }
    }

    /// Probe every target concurrently and wait for all of them
    ///
    /// The returned set has exactly one entry per distinct target.
    pub async fn run_all(&self, targets: &[String]) -> ResultSet {
        let mut launched = HashSet::with_capacity(targets.len());
        let mut handles = Vec::with_capacity(targets.len());

        for target in targets {
            if !launched.insert(target.as_str()) {
                warn!("Target {} listed more than once, probing it once", target);
                continue;
            }

            let worker = ProbeWorker {
                invocation: self.invocation.clone(),
                args: self.args.clone(),
                target: target.clone(),
                time_limit: self.time_limit,
            };
            handles.push((target.clone(), tokio::spawn(worker.run())));
        }

        info!(
            "Launched {} workers for {} ({}s limit)",
            handles.len(),
            self.invocation,
            self.time_limit.as_secs()
        );

        gather(handles).await
    }
}

/// Wait for every worker; a worker that panicked or was cancelled counts as an error
async fn gather(handles: Vec<(String, JoinHandle<ProbeOutcome>)>) -> ResultSet {
    let outcomes = join_all(handles.into_iter().map(|(target, handle)| async move {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Worker for {} did not complete: {}", target, e);
                ProbeOutcome::Error
            }
        };
        (target, outcome)
    }))
    .await;

    ResultAggregator::collect(outcomes)
}

// About 30 years
const FAR_FUTURE_SECS: u64 = 86_400 * 365 * 30;

/// Deadline `limit` from now, saturating far in the future for huge limits
fn deadline_after(limit: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(limit)
        .unwrap_or_else(|| now + Duration::from_secs(FAR_FUTURE_SECS))
}

/// One testlet invocation against one target
struct ProbeWorker {
    invocation: Arc<Invocation>,
    args: Arc<str>,
    target: String,
    time_limit: Duration,
}

impl ProbeWorker {
    async fn run(self) -> ProbeOutcome {
        match self.probe().await {
            Ok(output) => {
                debug!(
                    "Testlet {} against {} completed without error",
                    self.invocation, self.target
                );
                ProbeOutcome::Output(output)
            }
            Err(e) => {
                warn!("Testlet {} against {}: {}", self.invocation, self.target, e);
                e.into_outcome()
            }
        }
    }

    async fn probe(&self) -> Result<String, ProbeError> {
        debug!(
            "Full testlet command and args: '{} {} {}'",
            self.invocation, self.target, self.args
        );

        let deadline = deadline_after(self.time_limit);

        let mut child = Command::new(self.invocation.program())
            .arg(&self.target)
            .arg(&*self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProbeError::Launch {
                program: self.invocation.to_string(),
                source,
            })?;

        // Drain stdout concurrently so a full pipe cannot stall the testlet
        let mut stdout = child.stdout.take();
        let mut reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(stdout) = stdout.as_mut() {
                stdout.read_to_end(&mut buf).await?;
            }
            Ok::<_, io::Error>(buf)
        });

        let status = match timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                reader.abort();
                return Err(ProbeError::Wait(e));
            }
            Err(_) => {
                reader.abort();
                match child.kill().await {
                    Ok(()) => debug!("Successfully killed {}", self.invocation),
                    Err(e) => error!(
                        "Failed to kill {} after timeout: {}",
                        self.invocation, e
                    ),
                }
                return Err(ProbeError::Timeout(self.time_limit));
            }
        };

        if !status.success() {
            reader.abort();
            return Err(ProbeError::Exit(status));
        }

        // A descendant may still hold stdout open after the testlet exits
        let output = match timeout_at(deadline, &mut reader).await {
            Ok(Ok(read)) => read.map_err(ProbeError::Output)?,
            Ok(Err(join)) => return Err(ProbeError::Output(io::Error::other(join))),
            Err(_) => {
                reader.abort();
                return Err(ProbeError::Timeout(self.time_limit));
            }
        };

        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}
