//! Testlet resolution
//!
//! A testlet is either a native capability shipped with the agent (expected
//! on `PATH`) or an external executable installed under the asset directory.
//! Resolution happens once per run, before any worker is launched.

#![allow(dead_code)]

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Native testlets and the program each one maps to
const NATIVE_TESTLETS: &[(&str, &str)] = &[
    ("ping", "toddping"),
    ("http", "toddhttp"),
    ("bandwidth", "toddbw"),
];

/// Testlet resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Testlet {name} does not exist on this agent (expected {})", path.display())]
    MissingAsset { name: String, path: PathBuf },
}

/// How a resolved testlet is invoked
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    /// Native capability, looked up through the process search path
    Native { program: String },

    /// External asset, invoked by absolute path
    External { path: PathBuf },
}

impl Invocation {
    pub fn is_native(&self) -> bool {
        matches!(self, Invocation::Native { .. })
    }

    /// Program handed to the process spawner
    pub fn program(&self) -> &std::ffi::OsStr {
        match self {
            Invocation::Native { program } => program.as_ref(),
            Invocation::External { path } => path.as_os_str(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Native { program } => write!(f, "{program} (native)"),
            Invocation::External { path } => write!(f, "{}", path.display()),
        }
    }
}

/// Maps testlet names to invocations
#[derive(Clone, Debug)]
pub struct TestletResolver {
    testlet_dir: PathBuf,
}

impl TestletResolver {
    /// Create a resolver for the agent's opt directory
    pub fn new(opt_dir: impl AsRef<Path>) -> Self {
        Self {
            testlet_dir: opt_dir.as_ref().join("assets").join("testlets"),
        }
    }

    /// Native program for a testlet name, if it is a built-in capability
    pub fn native_program(name: &str) -> Option<&'static str> {
        NATIVE_TESTLETS
            .iter()
            .find(|(testlet, _)| *testlet == name)
            .map(|(_, program)| *program)
    }

    pub fn resolve(&self, name: &str) -> Result<Invocation, ResolveError> {
        if let Some(program) = Self::native_program(name) {
            debug!("Testlet {} is native, invoking {}", name, program);
            return Ok(Invocation::Native {
                program: program.to_string(),
            });
        }

        let path = self.testlet_dir.join(name);
        if !is_plain_name(name) || !path.is_file() {
            return Err(ResolveError::MissingAsset {
                name: name.to_string(),
                path,
            });
        }

        debug!("Testlet {} resolved to {}", name, path.display());
        Ok(Invocation::External { path })
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_native_testlets() {
        let resolver = TestletResolver::new("/nonexistent");

        let invocation = resolver.resolve("ping").unwrap();
        assert!(invocation.is_native());
        assert_eq!(invocation.program(), "toddping");
        assert_eq!(TestletResolver::native_program("http"), Some("toddhttp"));
        assert_eq!(TestletResolver::native_program("custom"), None);
    }

    #[test]
    fn test_external_testlet() {
        let dir = tempdir().unwrap();
        let testlets = dir.path().join("assets").join("testlets");
        std::fs::create_dir_all(&testlets).unwrap();
        std::fs::write(testlets.join("dns"), "#!/bin/sh\n").unwrap();

        let resolver = TestletResolver::new(dir.path());
        let invocation = resolver.resolve("dns").unwrap();

        assert!(!invocation.is_native());
        assert_eq!(
            invocation,
            Invocation::External {
                path: testlets.join("dns")
            }
        );
    }

    #[test]
    fn test_missing_asset() {
        let dir = tempdir().unwrap();
        let resolver = TestletResolver::new(dir.path());

        let err = resolver.resolve("dns").unwrap_err();
        assert!(matches!(err, ResolveError::MissingAsset { ref name, .. } if name == "dns"));
    }

    #[test]
    fn test_rejects_path_names() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets").join("escape"), "").unwrap();

        let resolver = TestletResolver::new(dir.path());
        assert!(resolver.resolve("../escape").is_err());
    }
}
