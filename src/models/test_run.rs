//! Test run definition
//!
//! A test run is installed into the agent cache by the distribution layer
//! and executed later by id.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Validation failures for a test run definition
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TestRunError {
    #[error("Test run id is empty")]
    EmptyId,

    #[error("Test run {0} does not name a testlet")]
    EmptyTestlet(String),
}

/// A single execution unit: one testlet run against a set of targets
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRun {
    /// Unique run ID
    pub id: String,

    /// Testlet name (native capability or external asset)
    pub testlet: String,

    /// Targets to run the testlet against
    #[serde(default)]
    pub targets: Vec<String>,

    /// Argument string passed verbatim to every invocation
    #[serde(default)]
    pub args: String,

    /// Per-invocation time limit in seconds
    #[serde(alias = "timelimit")]
    pub time_limit_secs: u64,
}

impl TestRun {
    /// Create a new test run with no targets
    pub fn new(id: impl Into<String>, testlet: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            testlet: testlet.into(),
            targets: Vec::new(),
            args: String::new(),
            time_limit_secs: 30,
        }
    }

    /// Add a target
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    /// Replace the target list
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Set the argument string
    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = args.into();
        self
    }

    /// Set the time limit
    pub fn with_time_limit(mut self, secs: u64) -> Self {
        self.time_limit_secs = secs;
        self
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }

    /// Check the definition is executable
    pub fn validate(&self) -> Result<(), TestRunError> {
        if self.id.trim().is_empty() {
            return Err(TestRunError::EmptyId);
        }
        if self.testlet.trim().is_empty() {
            return Err(TestRunError::EmptyTestlet(self.id.clone()));
        }
        Ok(())
    }
}

impl fmt::Display for TestRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} x {} targets, {}s limit)",
            self.id,
            self.testlet,
            self.targets.len(),
            self.time_limit_secs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_run_builder() {
        let run = TestRun::new("run-1", "ping")
            .with_targets(["10.0.0.1", "10.0.0.2"])
            .with_args("-c 3")
            .with_time_limit(5);

        assert_eq!(run.targets.len(), 2);
        assert_eq!(run.args, "-c 3");
        assert_eq!(run.time_limit(), Duration::from_secs(5));
        assert!(run.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert_eq!(TestRun::new(" ", "ping").validate(), Err(TestRunError::EmptyId));
        assert_eq!(
            TestRun::new("run-1", "").validate(),
            Err(TestRunError::EmptyTestlet("run-1".to_string()))
        );
    }

    #[test]
    fn test_deserialize_record() {
        let json = r#"{
            "id": "abc",
            "testlet": "http",
            "targets": ["web1", "web2"],
            "args": "--port 80",
            "timelimit": 10
        }"#;

        let run: TestRun = serde_json::from_str(json).unwrap();
        assert_eq!(run.id, "abc");
        assert_eq!(run.targets, vec!["web1", "web2"]);
        assert_eq!(run.time_limit_secs, 10);
    }
}
