//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;
use std::path::PathBuf;

use super::AgentConfig;

/// Environment variable prefix
const ENV_PREFIX: &str = "PROBE_AGENT";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvConfig {
    /// Opt directory from PROBE_AGENT_OPT_DIR
    pub opt_dir: Option<String>,
    /// Cache directory from PROBE_AGENT_CACHE_DIR
    pub cache_dir: Option<String>,
    /// Rendezvous delay from PROBE_AGENT_RENDEZVOUS_DELAY
    pub rendezvous_delay: Option<u64>,
    /// Download timeout from PROBE_AGENT_DOWNLOAD_TIMEOUT
    pub download_timeout: Option<u64>,
    /// Log level from PROBE_AGENT_LOG_LEVEL
    pub log_level: Option<String>,
    /// Config file from PROBE_AGENT_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}"));

        Self {
            opt_dir: get("OPT_DIR"),
            cache_dir: get("CACHE_DIR"),
            rendezvous_delay: get("RENDEZVOUS_DELAY").and_then(|v| v.parse().ok()),
            download_timeout: get("DOWNLOAD_TIMEOUT").and_then(|v| v.parse().ok()),
            log_level: get("LOG_LEVEL"),
            config_file: get("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.opt_dir.is_some()
            || self.cache_dir.is_some()
            || self.rendezvous_delay.is_some()
            || self.download_timeout.is_some()
            || self.log_level.is_some()
            || self.config_file.is_some()
    }

    /// Override file or default settings with whatever is set
    pub fn apply(&self, config: &mut AgentConfig) {
        if let Some(opt_dir) = &self.opt_dir {
            config.opt_dir = PathBuf::from(opt_dir);
        }
        if let Some(cache_dir) = &self.cache_dir {
            config.cache_dir = PathBuf::from(cache_dir);
        }
        if let Some(delay) = self.rendezvous_delay {
            config.rendezvous_delay_secs = delay;
        }
        if let Some(timeout) = self.download_timeout {
            config.download_timeout_secs = timeout;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_OPT_DIR:           {:?}", ENV_PREFIX, self.opt_dir);
        println!("  {}_CACHE_DIR:         {:?}", ENV_PREFIX, self.cache_dir);
        println!("  {}_RENDEZVOUS_DELAY:  {:?}", ENV_PREFIX, self.rendezvous_delay);
        println!("  {}_DOWNLOAD_TIMEOUT:  {:?}", ENV_PREFIX, self.download_timeout);
        println!("  {}_LOG_LEVEL:         {:?}", ENV_PREFIX, self.log_level);
        println!("  {}_CONFIG:            {:?}", ENV_PREFIX, self.config_file);
    }
}

/// Print all PROBE_AGENT environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_OPT_DIR           Agent opt directory (assets live under it)");
    println!("  {ENV_PREFIX}_CACHE_DIR         Agent cache directory");
    println!("  {ENV_PREFIX}_RENDEZVOUS_DELAY  Seconds to wait before a run starts");
    println!("  {ENV_PREFIX}_DOWNLOAD_TIMEOUT  Asset download timeout in seconds");
    println!("  {ENV_PREFIX}_LOG_LEVEL         Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_CONFIG            Path to configuration file");
}
