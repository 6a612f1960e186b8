//! File-backed agent cache
//!
//! Layout under the cache directory:
//!
//! ```text
//! testruns/<id>.json   test run definitions
//! testdata/<id>.json   encoded result sets
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, ErrorKind, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use super::{is_safe_id, RunStore, StoreError};
use crate::models::TestRun;

/// Agent cache stored as JSON files
pub struct FileRunStore {
    /// Base directory for the cache
    base_dir: PathBuf,
}

impl FileRunStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.base_dir.join("testruns").join(format!("{run_id}.json"))
    }

    fn data_path(&self, run_id: &str) -> PathBuf {
        self.base_dir.join("testdata").join(format!("{run_id}.json"))
    }
}

impl RunStore for FileRunStore {
    fn install(&self, run: &TestRun) -> Result<(), StoreError> {
        if !is_safe_id(&run.id) {
            return Err(StoreError::persist(&run.id, "invalid run id"));
        }

        let path = self.run_path(&run.id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::persist(&run.id, e))?;
        }

        let content =
            serde_json::to_string_pretty(run).map_err(|e| StoreError::persist(&run.id, e))?;
        fs::write(&path, content).map_err(|e| StoreError::persist(&run.id, e))?;

        info!("Installed test run {} to {}", run.id, path.display());
        Ok(())
    }

    fn fetch(&self, run_id: &str) -> Result<TestRun, StoreError> {
        if !is_safe_id(run_id) {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }

        let path = self.run_path(run_id);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::RunNotFound(run_id.to_string()));
            }
            Err(e) => {
                return Err(StoreError::CorruptRecord {
                    id: run_id.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let run: TestRun = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            StoreError::CorruptRecord {
                id: run_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        debug!("Loaded test run {} from {}", run_id, path.display());
        Ok(run)
    }

    fn persist(&self, run_id: &str, encoded: &str) -> Result<(), StoreError> {
        if !is_safe_id(run_id) {
            return Err(StoreError::persist(run_id, "invalid run id"));
        }

        let path = self.data_path(run_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::persist(run_id, e))?;
        }

        // create_new makes the exactly-once check atomic
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyPersisted(run_id.to_string()));
            }
            Err(e) => return Err(StoreError::persist(run_id, e)),
        };

        file.write_all(encoded.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| StoreError::persist(run_id, e))?;

        debug!("Wrote results for {} to {}", run_id, path.display());
        Ok(())
    }

    fn results(&self, run_id: &str) -> Result<Option<String>, StoreError> {
        if !is_safe_id(run_id) {
            return Ok(None);
        }

        match fs::read_to_string(self.data_path(run_id)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::CorruptRecord {
                id: run_id.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_install_and_fetch() {
        let dir = tempdir().unwrap();
        let store = FileRunStore::new(dir.path());

        let run = TestRun::new("run-1", "ping").with_targets(["a", "b"]);
        store.install(&run).unwrap();

        let fetched = store.fetch("run-1").unwrap();
        assert_eq!(fetched, run);
        assert!(dir.path().join("testruns/run-1.json").exists());
    }

    #[test]
    fn test_fetch_missing() {
        let dir = tempdir().unwrap();
        let store = FileRunStore::new(dir.path());

        assert!(matches!(
            store.fetch("nope"),
            Err(StoreError::RunNotFound(id)) if id == "nope"
        ));
        assert!(matches!(
            store.fetch("../nope"),
            Err(StoreError::RunNotFound(_))
        ));
    }

    #[test]
    fn test_fetch_corrupt() {
        let dir = tempdir().unwrap();
        let store = FileRunStore::new(dir.path());
        fs::create_dir_all(dir.path().join("testruns")).unwrap();
        fs::write(dir.path().join("testruns/bad.json"), "{not json").unwrap();

        assert!(matches!(
            store.fetch("bad"),
            Err(StoreError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn test_persist_exactly_once() {
        let dir = tempdir().unwrap();
        let store = FileRunStore::new(dir.path());

        assert_eq!(store.results("run-1").unwrap(), None);

        store.persist("run-1", r#"{"a":"OK"}"#).unwrap();
        assert_eq!(
            store.results("run-1").unwrap().as_deref(),
            Some(r#"{"a":"OK"}"#)
        );

        assert!(matches!(
            store.persist("run-1", "{}"),
            Err(StoreError::AlreadyPersisted(_))
        ));
        assert_eq!(
            store.results("run-1").unwrap().as_deref(),
            Some(r#"{"a":"OK"}"#)
        );
    }

    #[test]
    fn test_persist_rejects_path_ids() {
        let dir = tempdir().unwrap();
        let store = FileRunStore::new(dir.path());

        assert!(matches!(
            store.persist("../escape", "{}"),
            Err(StoreError::Persist { .. })
        ));
    }
}
