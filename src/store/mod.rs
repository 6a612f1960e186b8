//! Agent cache access
//!
//! Test run definitions are installed into the cache ahead of execution,
//! and the encoded result set of each run is written back under the same id.

mod file;
mod memory;

pub use file::FileRunStore;
#[allow(unused_imports)]
pub use memory::MemoryRunStore;

use thiserror::Error;

use crate::models::TestRun;

/// Agent cache errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Test run {0} not found in agent cache")]
    RunNotFound(String),

    #[error("Test run {id} is corrupt: {reason}")]
    CorruptRecord { id: String, reason: String },

    #[error("Failed to persist results for {id}: {reason}")]
    Persist { id: String, reason: String },

    #[error("Results for {0} have already been stored")]
    AlreadyPersisted(String),
}

impl StoreError {
    fn persist(id: &str, reason: impl ToString) -> Self {
        StoreError::Persist {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Read/write accessor over the agent's persistent cache
pub trait RunStore: Send + Sync {
    /// Install a test run definition
    fn install(&self, run: &TestRun) -> Result<(), StoreError>;

    /// Look up a test run by id
    fn fetch(&self, run_id: &str) -> Result<TestRun, StoreError>;

    /// Store the encoded result set for a run; allowed once per run id
    fn persist(&self, run_id: &str, encoded: &str) -> Result<(), StoreError>;

    /// Read back a stored result record
    fn results(&self, run_id: &str) -> Result<Option<String>, StoreError>;
}

/// Run ids become file names, so they must be a single plain path component
pub(crate) fn is_safe_id(run_id: &str) -> bool {
    !run_id.is_empty()
        && run_id != "."
        && run_id != ".."
        && !run_id.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_safe_id() {
        assert!(is_safe_id("3f2a9c1e-run"));
        assert!(!is_safe_id(""));
        assert!(!is_safe_id(".."));
        assert!(!is_safe_id("../etc/passwd"));
        assert!(!is_safe_id("a\\b"));
    }
}
