//! Configuration module
//!
//! Handles loading and managing agent configuration.

mod env;

pub use env::{print_env_help, EnvConfig};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./probe-agent.yaml",
    "./probe-agent.yml",
    "~/.config/probe-agent/config.yaml",
    "/etc/probe-agent/config.yaml",
];

/// Agent configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent opt directory; assets live under `<opt_dir>/assets`
    pub opt_dir: PathBuf,

    /// Agent cache directory holding test runs and their results
    pub cache_dir: PathBuf,

    /// Delay before a run starts when no scheduled start is given
    pub rendezvous_delay_secs: u64,

    /// HTTP timeout for asset downloads
    pub download_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            opt_dir: PathBuf::from("/opt/probe-agent"),
            cache_dir: default_cache_dir(),
            rendezvous_delay_secs: 3,
            download_timeout_secs: 60,
            log_level: "info".to_string(),
        }
    }
}

impl AgentConfig {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load configuration from an explicit path, a standard location, or
    /// defaults, then apply environment overrides
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let env = EnvConfig::load();

        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env.config_file.as_ref().map(PathBuf::from))
            .or_else(Self::find);

        let mut config = match path {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };

        env.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.opt_dir.as_os_str().is_empty() {
            anyhow::bail!("opt_dir must not be empty");
        }
        if self.cache_dir.as_os_str().is_empty() {
            anyhow::bail!("cache_dir must not be empty");
        }
        if self.download_timeout_secs == 0 {
            anyhow::bail!("download_timeout_secs must be greater than zero");
        }
        if let Err(e) = self.log_level.parse::<crate::utils::LogLevel>() {
            anyhow::bail!("Invalid log_level: {e}");
        }
        Ok(())
    }

    pub fn rendezvous_delay(&self) -> Duration {
        Duration::from_secs(self.rendezvous_delay_secs)
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("probe-agent")
        .join("cache")
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
