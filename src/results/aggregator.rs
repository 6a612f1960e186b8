//! Result aggregation
//!
//! Merges per-target outcomes into one result set and encodes it for the
//! agent cache.

use thiserror::Error;
use tracing::warn;

use crate::models::{ProbeOutcome, ResultSet};

/// Aggregation errors
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Failed to serialize result set: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Failed to parse stored result set: {0}")]
    Deserialization(#[source] serde_json::Error),
}

pub struct ResultAggregator;

impl ResultAggregator {
    /// Merge worker outcomes; the first outcome seen for a target wins
    pub fn collect<I>(outcomes: I) -> ResultSet
    where
        I: IntoIterator<Item = (String, ProbeOutcome)>,
    {
        let mut set = ResultSet::new();
        for (target, outcome) in outcomes {
            if set.get(&target).is_some() {
                warn!("Dropping duplicate outcome for target {}", target);
                continue;
            }
            set.insert(target, outcome);
        }
        set
    }

    /// Encode a result set as a JSON object of target to outcome
    pub fn serialize(set: &ResultSet) -> Result<String, AggregateError> {
        serde_json::to_string(set).map_err(AggregateError::Serialization)
    }

    pub fn deserialize(encoded: &str) -> Result<ResultSet, AggregateError> {
        serde_json::from_str(encoded).map_err(AggregateError::Deserialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_keeps_first_outcome() {
        let set = ResultAggregator::collect([
            ("a".to_string(), ProbeOutcome::Output("OK".to_string())),
            ("a".to_string(), ProbeOutcome::Error),
            ("b".to_string(), ProbeOutcome::Timeout),
        ]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("a"), Some(&ProbeOutcome::Output("OK".to_string())));
    }

    #[test]
    fn test_serialize_stored_record() {
        let set = ResultAggregator::collect([
            ("10.0.0.2".to_string(), ProbeOutcome::Error),
            ("10.0.0.1".to_string(), ProbeOutcome::Output("rtt=1.2\n".to_string())),
        ]);

        let encoded = ResultAggregator::serialize(&set).unwrap();
        assert_eq!(encoded, r#"{"10.0.0.1":"rtt=1.2\n","10.0.0.2":"error"}"#);

        let decoded = ResultAggregator::deserialize(&encoded).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn test_deserialize_rejects_non_object() {
        assert!(matches!(
            ResultAggregator::deserialize("[1, 2]"),
            Err(AggregateError::Deserialization(_))
        ));
    }
}
