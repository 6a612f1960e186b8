//! In-memory agent cache

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{RunStore, StoreError};
use crate::models::TestRun;

#[derive(Default)]
struct Inner {
    runs: HashMap<String, TestRun>,
    data: HashMap<String, String>,
}

/// Agent cache held in process memory
#[derive(Default)]
pub struct MemoryRunStore {
    inner: Mutex<Inner>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with runs already installed
    pub fn with_runs(runs: impl IntoIterator<Item = TestRun>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for run in runs {
                inner.runs.insert(run.id.clone(), run);
            }
        }
        store
    }

    // A poisoned lock only means another thread panicked mid-insert; the
    // maps themselves are still consistent.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RunStore for MemoryRunStore {
    fn install(&self, run: &TestRun) -> Result<(), StoreError> {
        self.lock().runs.insert(run.id.clone(), run.clone());
        Ok(())
    }

    fn fetch(&self, run_id: &str) -> Result<TestRun, StoreError> {
        self.lock()
            .runs
            .get(run_id)
            .cloned()
            .ok_or_else(|| StoreError::RunNotFound(run_id.to_string()))
    }

    fn persist(&self, run_id: &str, encoded: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.data.contains_key(run_id) {
            return Err(StoreError::AlreadyPersisted(run_id.to_string()));
        }
        inner.data.insert(run_id.to_string(), encoded.to_string());
        Ok(())
    }

    fn results(&self, run_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().data.get(run_id).cloned())
    }
}
