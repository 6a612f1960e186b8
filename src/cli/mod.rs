//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Agent-side executor for distributed network test runs
#[derive(Parser, Debug)]
#[command(name = "probe-agent")]
#[command(version)]
#[command(about = "Execute installed test runs against their targets")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a test run installed in the agent cache
    Run(RunArgs),

    /// Install a test run definition into the agent cache
    Install(InstallArgs),

    /// Show stored results for a test run
    Show(ShowArgs),

    /// Download testlet and fact collector assets
    Download(DownloadArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Test run ID
    pub run_id: String,

    /// Scheduled start time (RFC 3339), replaces the rendezvous delay
    #[arg(long, conflicts_with = "no_delay")]
    pub start_at: Option<String>,

    /// Start immediately
    #[arg(long)]
    pub no_delay: bool,

    /// Output format for the results (table, json, json-pretty, csv)
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Arguments for install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Test run definition file (JSON)
    pub file: PathBuf,
}

/// Arguments for show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Test run ID
    pub run_id: String,

    /// Output format (table, json, json-pretty, csv)
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Arguments for download command
#[derive(Parser, Debug)]
pub struct DownloadArgs {
    /// Asset URLs
    #[arg(required = true)]
    pub urls: Vec<String>,
}

/// Arguments for config management
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Output file path
        #[arg(default_value = "./probe-agent.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Show environment variable overrides only
        #[arg(long)]
        env: bool,

        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },
}
