//! Probe outcomes and result sets

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Sentinel recorded when a testlet fails to launch or exits non-zero
pub const ERROR_SENTINEL: &str = "error";

/// Sentinel recorded when a testlet exceeds the run's time limit
pub const TIMEOUT_SENTINEL: &str = "timeout";

/// Result of one testlet invocation against one target
///
/// Encoded as a single string in the persisted record: the captured
/// stdout, or one of the sentinels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Output(String),
    Error,
    Timeout,
}

impl ProbeOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            ProbeOutcome::Output(output) => output,
            ProbeOutcome::Error => ERROR_SENTINEL,
            ProbeOutcome::Timeout => TIMEOUT_SENTINEL,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            ERROR_SENTINEL => ProbeOutcome::Error,
            TIMEOUT_SENTINEL => ProbeOutcome::Timeout,
            other => ProbeOutcome::Output(other.to_string()),
        }
    }

    pub fn is_output(&self) -> bool {
        matches!(self, ProbeOutcome::Output(_))
    }

    /// Short label for tables
    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Output(_) => "OK",
            ProbeOutcome::Error => "ERROR",
            ProbeOutcome::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProbeOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProbeOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ProbeOutcome::parse(&s))
    }
}

/// Outcomes for every target of a run, keyed by target
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    outcomes: BTreeMap<String, ProbeOutcome>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome, returning the one it replaced
    pub fn insert(
        &mut self,
        target: impl Into<String>,
        outcome: ProbeOutcome,
    ) -> Option<ProbeOutcome> {
        self.outcomes.insert(target.into(), outcome)
    }

    pub fn get(&self, target: &str) -> Option<&ProbeOutcome> {
        self.outcomes.get(target)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProbeOutcome)> {
        self.outcomes.iter()
    }

    pub fn output_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_output()).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(&ProbeOutcome::Error)
    }

    pub fn timeout_count(&self) -> usize {
        self.count(&ProbeOutcome::Timeout)
    }

    fn count(&self, outcome: &ProbeOutcome) -> usize {
        self.outcomes.values().filter(|o| *o == outcome).count()
    }
}

impl FromIterator<(String, ProbeOutcome)> for ResultSet {
    fn from_iter<I: IntoIterator<Item = (String, ProbeOutcome)>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}
